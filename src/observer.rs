//! Observer and disposer method descriptors

use crate::bean::{BeanId, priority_value};
use crate::deployment::Discovery;
use crate::error::{DeploymentError, Result};
use crate::index::{AnnotationInstance, MethodInfo, Type};
use crate::injection::Injection;
use crate::names;
use std::fmt;

/// Priority of an observer without `@Priority` on its event parameter
pub const DEFAULT_OBSERVER_PRIORITY: i32 = 2500;

/// An observer method of a bean
#[derive(Debug, Clone)]
pub struct ObserverInfo {
    declaring_bean: BeanId,
    method: MethodInfo,
    event_position: usize,
    metadata_position: Option<usize>,
    observed_type: Type,
    observed_qualifiers: Vec<AnnotationInstance>,
    is_async: bool,
    priority: i32,
    injection: Injection,
}

impl ObserverInfo {
    /// Describe an observer method; `event_position` is the parameter
    /// annotated `@Observes` or `@ObservesAsync`
    pub(crate) fn create(
        discovery: &mut Discovery<'_>,
        declaring_bean: BeanId,
        method: &MethodInfo,
        event_position: usize,
    ) -> Result<Self> {
        let event = &method.parameters()[event_position];
        let is_async = event.has_annotation(&names::OBSERVES_ASYNC);
        if is_async && event.has_annotation(&names::OBSERVES) {
            return Err(DeploymentError::definition(format!(
                "Observer parameter is annotated both @Observes and @ObservesAsync: {method}"
            )));
        }
        if discovery.store.method_has(method, &names::PRODUCES) || discovery.store.method_has(method, &names::INJECT) {
            return Err(DeploymentError::definition(format!(
                "Observer method must not be a producer or initializer: {method}"
            )));
        }
        let metadata_position = method
            .parameters()
            .iter()
            .position(|p| p.ty().raw_name() == Some(&*names::EVENT_METADATA));
        let priority = match event.annotation_named(&names::PRIORITY) {
            Some(annotation) => priority_value(annotation, method)?,
            None => None,
        }
        .unwrap_or(DEFAULT_OBSERVER_PRIORITY);
        let observed_qualifiers = discovery.qualifiers_of(event.annotations());

        let mut skipped = vec![event_position];
        skipped.extend(metadata_position);
        let injection = Injection::for_observer(discovery, method, &skipped);

        Ok(Self {
            declaring_bean,
            method: method.clone(),
            event_position,
            metadata_position,
            observed_type: event.ty().clone(),
            observed_qualifiers,
            is_async,
            priority,
            injection,
        })
    }

    #[inline]
    pub fn declaring_bean(&self) -> BeanId {
        self.declaring_bean
    }

    pub fn method(&self) -> &MethodInfo {
        &self.method
    }

    #[inline]
    pub fn event_position(&self) -> usize {
        self.event_position
    }

    /// Position of an `EventMetadata` parameter
    pub fn metadata_position(&self) -> Option<usize> {
        self.metadata_position
    }

    pub fn observed_type(&self) -> &Type {
        &self.observed_type
    }

    /// Qualifiers on the event parameter; empty observes every event of the type
    pub fn observed_qualifiers(&self) -> &[AnnotationInstance] {
        &self.observed_qualifiers
    }

    #[inline]
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    #[inline]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Injected parameters other than the event and its metadata
    pub fn injection(&self) -> &Injection {
        &self.injection
    }
}

impl fmt::Display for ObserverInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}observer [type={}, method={}]",
            if self.is_async { "async " } else { "" },
            self.observed_type,
            self.method
        )
    }
}

/// A disposer method of a bean
#[derive(Debug, Clone)]
pub struct DisposerInfo {
    declaring_bean: BeanId,
    method: MethodInfo,
    disposed_position: usize,
    disposed_qualifiers: Vec<AnnotationInstance>,
    injection: Injection,
}

impl DisposerInfo {
    pub(crate) fn create(
        discovery: &mut Discovery<'_>,
        declaring_bean: BeanId,
        method: &MethodInfo,
        disposed_position: usize,
    ) -> Result<Self> {
        let disposed_count = method
            .parameters()
            .iter()
            .filter(|p| p.has_annotation(&names::DISPOSES))
            .count();
        if disposed_count > 1 {
            return Err(DeploymentError::definition(format!(
                "Disposer method declares more than one @Disposes parameter: {method}"
            )));
        }
        if discovery.store.method_has(method, &names::PRODUCES) || discovery.store.method_has(method, &names::INJECT) {
            return Err(DeploymentError::definition(format!(
                "Disposer method must not be a producer or initializer: {method}"
            )));
        }
        let disposed = &method.parameters()[disposed_position];
        let disposed_qualifiers = discovery.qualifiers_of(disposed.annotations());
        let injection = Injection::for_disposer(discovery, method, disposed_position);
        Ok(Self {
            declaring_bean,
            method: method.clone(),
            disposed_position,
            disposed_qualifiers,
            injection,
        })
    }

    #[inline]
    pub fn declaring_bean(&self) -> BeanId {
        self.declaring_bean
    }

    pub fn method(&self) -> &MethodInfo {
        &self.method
    }

    #[inline]
    pub fn disposed_position(&self) -> usize {
        self.disposed_position
    }

    pub fn disposed_type(&self) -> &Type {
        self.method.parameters()[self.disposed_position].ty()
    }

    /// Qualifiers declared on the disposed parameter
    pub fn disposed_qualifiers(&self) -> &[AnnotationInstance] {
        &self.disposed_qualifiers
    }

    /// Injected parameters other than the disposed one
    pub fn injection(&self) -> &Injection {
        &self.injection
    }
}

impl fmt::Display for DisposerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "disposer [method={}]", self.method)
    }
}
