//! Error types for bean deployment processing
//!
//! Every error is fatal to the processing run. Variants carry enough context
//! to identify the offending class, method or field.

use thiserror::Error;

/// Broad classification of a [`DeploymentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The model could not be built from the index
    Structural,
    /// An injection point or name could not be resolved uniquely
    Resolution,
    /// A generator could not produce an artifact
    Generation,
    /// A build extension failed
    Extension,
    /// Writing a resource failed
    Output,
}

/// Errors that can occur while processing a bean deployment
#[derive(Error, Debug, Clone)]
pub enum DeploymentError {
    /// A type required by the model is missing from the index
    #[error("Class not found in index: {name}")]
    ClassNotFound { name: String },

    /// A producer matches more than one disposer method
    #[error("Multiple disposer methods found for {producer}")]
    MultipleDisposers { producer: String },

    /// Invalid bean, producer, observer or interceptor declaration
    #[error("Definition error: {0}")]
    Definition(String),

    /// No bean satisfies an injection point
    #[error(
        "Unsatisfied dependency for type {required_type} and qualifiers {qualifiers}\n\t- member: {member}\n\t- declared on {declared_on}"
    )]
    UnsatisfiedDependency {
        required_type: String,
        qualifiers: String,
        member: String,
        declared_on: String,
    },

    /// More than one bean satisfies an injection point
    #[error(
        "Ambiguous dependencies for type {required_type} and qualifiers {qualifiers}\n\t- member: {member}\n\t- declared on {declared_on}\n\t- available beans:\n\t\t- {}",
        .candidates.join("\n\t\t- ")
    )]
    AmbiguousDependency {
        required_type: String,
        qualifiers: String,
        member: String,
        declared_on: String,
        candidates: Vec<String>,
    },

    /// Several beans share a name and none of them wins
    #[error("Unresolvable ambiguous bean name detected: {name}\nBeans:\n{}", .beans.join("\n"))]
    AmbiguousName { name: String, beans: Vec<String> },

    /// A dependency cycle cannot be wired safely
    #[error("Circular dependency detected: {path}")]
    CircularDependency { path: String },

    /// An annotation member value cannot be materialized as a literal
    #[error("Unsupported member {member} of annotation {annotation}: {reason}")]
    UnsupportedAnnotationMember {
        annotation: String,
        member: String,
        reason: String,
    },

    /// Generated code has no way to instantiate a class
    #[error("No accessible constructor found for {class}")]
    NoAccessibleConstructor { class: String },

    /// A client proxy or subclass cannot be generated for a type
    #[error("Type {class} cannot be proxied: {reason}")]
    Unproxyable { class: String, reason: String },

    /// A build extension failed to initialize or run
    #[error("Build extension {extension} failed: {reason}")]
    Extension { extension: String, reason: String },

    /// Problem reported by a deployment validator
    #[error("Deployment problem: {0}")]
    Validation(String),

    /// A generated resource could not be written
    #[error("Failed to write resource {name}: {reason}")]
    Output { name: String, reason: String },

    /// Several problems found in one phase
    #[error("Multiple deployment problems occurred: [{}]", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", "))]
    Multiple(Vec<DeploymentError>),
}

impl DeploymentError {
    /// Create a ClassNotFound error
    #[inline]
    pub fn class_not_found(name: impl ToString) -> Self {
        Self::ClassNotFound {
            name: name.to_string(),
        }
    }

    /// Create a Definition error
    #[inline]
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition(message.into())
    }

    /// Create an Extension error
    #[inline]
    pub fn extension(extension: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Extension {
            extension: extension.into(),
            reason: reason.into(),
        }
    }

    /// Create an Unproxyable error
    #[inline]
    pub fn unproxyable(class: impl ToString, reason: impl Into<String>) -> Self {
        Self::Unproxyable {
            class: class.to_string(),
            reason: reason.into(),
        }
    }

    /// Collapse a list of problems into a single error.
    ///
    /// Returns `None` for an empty list; a single problem is returned as is.
    pub fn aggregate(mut errors: Vec<DeploymentError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ClassNotFound { .. } | Self::MultipleDisposers { .. } | Self::Definition(_) => {
                ErrorKind::Structural
            }
            Self::UnsatisfiedDependency { .. }
            | Self::AmbiguousDependency { .. }
            | Self::AmbiguousName { .. }
            | Self::CircularDependency { .. } => ErrorKind::Resolution,
            Self::UnsupportedAnnotationMember { .. }
            | Self::NoAccessibleConstructor { .. }
            | Self::Unproxyable { .. } => ErrorKind::Generation,
            Self::Extension { .. } | Self::Validation(_) => ErrorKind::Extension,
            Self::Output { .. } => ErrorKind::Output,
            Self::Multiple(errors) => errors
                .first()
                .map(DeploymentError::kind)
                .unwrap_or(ErrorKind::Structural),
        }
    }

    /// Iterate over this error and, for [`DeploymentError::Multiple`], every nested problem
    pub fn problems(&self) -> Vec<&DeploymentError> {
        match self {
            Self::Multiple(errors) => errors.iter().flat_map(|e| e.problems()).collect(),
            other => vec![other],
        }
    }

    /// True if this error, or any nested problem, is an unsatisfied dependency
    pub fn is_unsatisfied(&self) -> bool {
        self.problems()
            .iter()
            .any(|e| matches!(e, Self::UnsatisfiedDependency { .. }))
    }

    /// True if this error, or any nested problem, is an ambiguous dependency
    pub fn is_ambiguous(&self) -> bool {
        self.problems()
            .iter()
            .any(|e| matches!(e, Self::AmbiguousDependency { .. }))
    }
}

/// Result type alias for deployment processing
pub type Result<T> = std::result::Result<T, DeploymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_single_is_unwrapped() {
        let err = DeploymentError::aggregate(vec![DeploymentError::class_not_found("a.B")]).unwrap();
        assert!(matches!(err, DeploymentError::ClassNotFound { .. }));
        assert!(DeploymentError::aggregate(Vec::new()).is_none());
    }

    #[test]
    fn test_multiple_problems_are_flattened() {
        let err = DeploymentError::Multiple(vec![
            DeploymentError::definition("x"),
            DeploymentError::UnsatisfiedDependency {
                required_type: "a.A".into(),
                qualifiers: "[]".into(),
                member: "f".into(),
                declared_on: "a.B".into(),
            },
        ]);
        assert_eq!(err.problems().len(), 2);
        assert!(err.is_unsatisfied());
        assert!(!err.is_ambiguous());
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let err = DeploymentError::AmbiguousDependency {
            required_type: "a.Service".into(),
            qualifiers: "[@Default]".into(),
            member: "a.Client#service".into(),
            declared_on: "CLASS bean [a.Client]".into(),
            candidates: vec!["C1".into(), "C2".into()],
        };
        let message = err.to_string();
        assert!(message.contains("C1"));
        assert!(message.contains("C2"));
        assert_eq!(err.kind(), ErrorKind::Resolution);
    }
}
