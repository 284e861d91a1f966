//! Generated resources and where they go

use super::shape::ClassShape;
use crate::error::{DeploymentError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use std::fmt;

/// Tag telling the orchestrator what a generated class provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialType {
    Bean,
    InterceptorBean,
    Observer,
}

/// Kind of a generated resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A class in the emitter's format
    Class,
    /// A `META-INF/services` entry
    ServiceProvider,
}

/// A named unit of generated output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    name: String,
    kind: ResourceKind,
    data: Vec<u8>,
    special_type: Option<SpecialType>,
}

impl Resource {
    /// A generated class; `name` is the slash separated binary name
    pub fn class(name: impl Into<String>, data: Vec<u8>, special_type: Option<SpecialType>) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::Class,
            data,
            special_type,
        }
    }

    /// A service provider file naming `implementations` for `service`
    pub fn service_provider(service: &str, implementations: &[String]) -> Self {
        let mut data = implementations.join("\n");
        data.push('\n');
        Self {
            name: format!("META-INF/services/{service}"),
            kind: ResourceKind::ServiceProvider,
            data: data.into_bytes(),
            special_type: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dot separated form of the name
    pub fn fully_qualified_name(&self) -> String {
        self.name.replace('/', ".")
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Data as text, if it is valid UTF-8
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    pub fn special_type(&self) -> Option<SpecialType> {
        self.special_type
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.name, self.data.len())
    }
}

/// Turns a class shape into a loadable unit
pub trait ClassEmitter: Send + Sync {
    fn emit(&self, shape: &ClassShape) -> Result<Vec<u8>>;
}

/// Emits the textual listing of a shape
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderingEmitter;

impl ClassEmitter for RenderingEmitter {
    fn emit(&self, shape: &ClassShape) -> Result<Vec<u8>> {
        Ok(shape.to_string().into_bytes())
    }
}

/// Sink for generated resources
pub trait ResourceOutput: Send + Sync {
    fn write_resource(&self, resource: Resource) -> Result<()>;
}

/// Keeps every written resource in memory, keyed by name
pub struct InMemoryOutput {
    resources: DashMap<String, Resource, RandomState>,
}

impl InMemoryOutput {
    pub fn new() -> Self {
        Self {
            resources: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    pub fn get(&self, name: &str) -> Option<Resource> {
        self.resources.get(name).map(|r| r.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    /// Names of all resources, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.resources.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Resources tagged with `special_type`, sorted by name
    pub fn resources_of(&self, special_type: SpecialType) -> Vec<Resource> {
        let mut found: Vec<Resource> = self
            .resources
            .iter()
            .filter(|r| r.special_type() == Some(special_type))
            .map(|r| r.value().clone())
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl Default for InMemoryOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceOutput for InMemoryOutput {
    fn write_resource(&self, resource: Resource) -> Result<()> {
        if self.resources.contains_key(resource.name()) {
            return Err(DeploymentError::Output {
                name: resource.name.clone(),
                reason: "resource already written".to_string(),
            });
        }
        self.resources.insert(resource.name.clone(), resource);
        Ok(())
    }
}

impl fmt::Debug for InMemoryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryOutput")
            .field("resources", &self.resources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_output() {
        let output = InMemoryOutput::new();
        output
            .write_resource(Resource::class("a/Foo_Bean", b"x".to_vec(), Some(SpecialType::Bean)))
            .unwrap();
        output
            .write_resource(Resource::service_provider("a.Service", &["a.Impl".to_string()]))
            .unwrap();
        assert_eq!(output.names(), vec!["META-INF/services/a.Service", "a/Foo_Bean"]);
        assert_eq!(output.resources_of(SpecialType::Bean).len(), 1);
        assert_eq!(output.get("a/Foo_Bean").unwrap().fully_qualified_name(), "a.Foo_Bean");
        assert_eq!(output.get("META-INF/services/a.Service").unwrap().text(), Some("a.Impl\n"));

        let duplicate = output.write_resource(Resource::class("a/Foo_Bean", Vec::new(), None));
        assert!(matches!(duplicate, Err(DeploymentError::Output { .. })));
    }
}
