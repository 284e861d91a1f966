//! Bean scopes
//!
//! A scope decides how instances are shared:
//!
//! - `Dependent`: a new instance per injection, owned by the injecting bean
//! - `Singleton`: one instance per deployment, handed out directly
//! - `ApplicationScoped` / `RequestScoped`: normal scopes, injected through a
//!   client proxy that looks up the contextual instance on every call

use crate::index::DotName;
use crate::names;
use std::fmt;

/// Built-in scope of a bean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScopeInfo {
    /// Pseudo-scope: no sharing, no proxy
    #[default]
    Dependent,
    /// Pseudo-scope: one shared instance, no proxy
    Singleton,
    /// Normal scope living as long as the application
    ApplicationScoped,
    /// Normal scope bound to a request
    RequestScoped,
}

impl ScopeInfo {
    /// Every built-in scope
    pub const ALL: [ScopeInfo; 4] = [
        ScopeInfo::Dependent,
        ScopeInfo::Singleton,
        ScopeInfo::ApplicationScoped,
        ScopeInfo::RequestScoped,
    ];

    /// Scope for a scope annotation name, if it is one
    pub fn from_name(name: &DotName) -> Option<Self> {
        Self::ALL.into_iter().find(|scope| &scope.dot_name() == name)
    }

    /// Annotation name of this scope
    pub fn dot_name(self) -> DotName {
        match self {
            Self::Dependent => names::DEPENDENT.clone(),
            Self::Singleton => names::SINGLETON.clone(),
            Self::ApplicationScoped => names::APPLICATION_SCOPED.clone(),
            Self::RequestScoped => names::REQUEST_SCOPED.clone(),
        }
    }

    /// Normal scopes are accessed through a client proxy
    #[inline]
    pub fn is_normal(self) -> bool {
        matches!(self, Self::ApplicationScoped | Self::RequestScoped)
    }

    /// True for `@Dependent`
    #[inline]
    pub fn is_default(self) -> bool {
        self == Self::Dependent
    }
}

impl fmt::Display for ScopeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dependent => "Dependent",
            Self::Singleton => "Singleton",
            Self::ApplicationScoped => "ApplicationScoped",
            Self::RequestScoped => "RequestScoped",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_lookup() {
        assert_eq!(
            ScopeInfo::from_name(&names::APPLICATION_SCOPED),
            Some(ScopeInfo::ApplicationScoped)
        );
        assert_eq!(ScopeInfo::from_name(&names::INJECT), None);
        assert_eq!(ScopeInfo::default(), ScopeInfo::Dependent);
    }

    #[test]
    fn test_normal_scopes() {
        assert!(ScopeInfo::RequestScoped.is_normal());
        assert!(ScopeInfo::ApplicationScoped.is_normal());
        assert!(!ScopeInfo::Singleton.is_normal());
        assert!(!ScopeInfo::Dependent.is_normal());
        assert!(ScopeInfo::Dependent.is_default());
    }
}
