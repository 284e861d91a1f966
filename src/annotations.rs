//! Transformed view of index annotations
//!
//! Discovery never reads class, method or field annotations from the index
//! directly. It asks the [`AnnotationStore`], which applies every registered
//! [`AnnotationsTransformer`] once per target and caches the result for the
//! rest of the run.

use crate::extension::{AnnotationsTransformer, BuildContext, TransformationContext};
use crate::index::{AnnotationInstance, AnnotationTarget, ClassInfo, DotName, FieldInfo, MethodInfo};
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Shared, cached annotation lookups
pub struct AnnotationStore {
    transformers: Vec<Arc<dyn AnnotationsTransformer>>,
    build: Arc<BuildContext>,
    cache: DashMap<AnnotationTarget, Arc<[AnnotationInstance]>, RandomState>,
}

impl AnnotationStore {
    /// Store applying the given transformers, highest priority first
    pub fn new(transformers: Vec<Arc<dyn AnnotationsTransformer>>, build: Arc<BuildContext>) -> Self {
        Self {
            transformers,
            build,
            cache: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Store without transformers
    pub fn plain() -> Self {
        Self::new(Vec::new(), Arc::new(BuildContext::new()))
    }

    pub fn class_annotations(&self, class: &ClassInfo) -> Arc<[AnnotationInstance]> {
        self.annotations(class.target(), class.annotations())
    }

    pub fn method_annotations(&self, method: &MethodInfo) -> Arc<[AnnotationInstance]> {
        self.annotations(method.target(), method.annotations())
    }

    pub fn field_annotations(&self, field: &FieldInfo) -> Arc<[AnnotationInstance]> {
        self.annotations(field.target(), field.annotations())
    }

    pub fn class_has(&self, class: &ClassInfo, name: &DotName) -> bool {
        self.class_annotations(class).iter().any(|a| a.name() == name)
    }

    pub fn method_has(&self, method: &MethodInfo, name: &DotName) -> bool {
        self.method_annotations(method).iter().any(|a| a.name() == name)
    }

    pub fn field_has(&self, field: &FieldInfo, name: &DotName) -> bool {
        self.field_annotations(field).iter().any(|a| a.name() == name)
    }

    pub fn class_annotation(&self, class: &ClassInfo, name: &DotName) -> Option<AnnotationInstance> {
        self.class_annotations(class)
            .iter()
            .find(|a| a.name() == name)
            .cloned()
    }

    pub fn method_annotation(&self, method: &MethodInfo, name: &DotName) -> Option<AnnotationInstance> {
        self.method_annotations(method)
            .iter()
            .find(|a| a.name() == name)
            .cloned()
    }

    pub fn field_annotation(&self, field: &FieldInfo, name: &DotName) -> Option<AnnotationInstance> {
        self.field_annotations(field)
            .iter()
            .find(|a| a.name() == name)
            .cloned()
    }

    fn annotations(&self, target: AnnotationTarget, declared: &[AnnotationInstance]) -> Arc<[AnnotationInstance]> {
        if let Some(cached) = self.cache.get(&target) {
            return Arc::clone(&cached);
        }
        let transformed: Arc<[AnnotationInstance]> = self.transform(&target, declared).into();
        self.cache.insert(target, Arc::clone(&transformed));
        transformed
    }

    fn transform(&self, target: &AnnotationTarget, declared: &[AnnotationInstance]) -> Vec<AnnotationInstance> {
        let kind = target.kind();
        let mut annotations = declared.to_vec();
        for transformer in self.transformers.iter().filter(|t| t.applies_to(kind)) {
            let mut context = TransformationContext::new(target, annotations, &self.build);
            transformer.transform(&mut context);
            annotations = context.into_annotations();
        }
        #[cfg(feature = "logging")]
        if annotations.as_slice() != declared {
            trace!(
                target: "bean_processor",
                target_element = %target,
                count = annotations.len(),
                "Annotations transformed"
            );
        }
        annotations
    }

    /// Number of cached targets
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl std::fmt::Debug for AnnotationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationStore")
            .field("transformers", &self.transformers.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::BuildExtension;
    use crate::index::TargetKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AddSingleton {
        calls: AtomicUsize,
    }

    impl BuildExtension for AddSingleton {}

    impl AnnotationsTransformer for AddSingleton {
        fn applies_to(&self, kind: TargetKind) -> bool {
            kind == TargetKind::Class
        }

        fn transform(&self, context: &mut TransformationContext<'_>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let AnnotationTarget::Class(name) = context.target() {
                if name.as_str() == "a.Foo" {
                    context.add(AnnotationInstance::marker("javax.inject.Singleton"));
                }
            }
        }
    }

    #[test]
    fn test_transformer_applied_once_per_target() {
        let transformer = Arc::new(AddSingleton {
            calls: AtomicUsize::new(0),
        });
        let store = AnnotationStore::new(
            vec![transformer.clone() as Arc<dyn AnnotationsTransformer>],
            Arc::new(BuildContext::new()),
        );
        let foo = ClassInfo::builder("a.Foo").build();
        let bar = ClassInfo::builder("a.Bar").build();
        let singleton = DotName::new("javax.inject.Singleton");

        assert!(store.class_has(&foo, &singleton));
        assert!(store.class_has(&foo, &singleton));
        assert!(!store.class_has(&bar, &singleton));
        assert_eq!(transformer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.cached(), 2);
    }

    #[test]
    fn test_transformer_skips_other_kinds() {
        let transformer = Arc::new(AddSingleton {
            calls: AtomicUsize::new(0),
        });
        let store = AnnotationStore::new(
            vec![transformer.clone() as Arc<dyn AnnotationsTransformer>],
            Arc::new(BuildContext::new()),
        );
        let method = MethodInfo::new("run");
        assert!(store.method_annotations(&method).is_empty());
        assert_eq!(transformer.calls.load(Ordering::SeqCst), 0);
    }
}
