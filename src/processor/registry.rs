use dashmap::DashMap;
use tracing::debug;

use super::builtin::{Filter, Noop, Reject, SetMetadata, Sleep, Split, Uppercase};
use super::traits::{BuildContext, Processor, ProcessorFactory};
use crate::config::ProcessorConfig;
use crate::domain::ProcessorError;

/// Constructor function registered under a processor type name
pub type Constructor =
    fn(&ProcessorConfig, &BuildContext) -> Result<Box<dyn Processor>, ProcessorError>;

/// Named processor constructors
///
/// Registration goes through `&self`, so a registry can be shared behind an
/// `Arc` while plugins add their own types.
#[derive(Default)]
pub struct Registry {
    constructors: DashMap<String, Constructor>,
}

impl Registry {
    /// Create a registry with no processor types
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in processor type
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register("noop", Noop::build);
        registry.register("uppercase", Uppercase::build);
        registry.register("filter", Filter::build);
        registry.register("reject", Reject::build);
        registry.register("split", Split::build);
        registry.register("sleep", Sleep::build);
        registry.register("metadata", SetMetadata::build);
        registry
    }

    /// Register a constructor, replacing any previous one with the same name
    pub fn register(&self, kind: impl Into<String>, constructor: Constructor) {
        self.constructors.insert(kind.into(), constructor);
    }

    /// Check if a processor type is known
    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Registered type names, sorted
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.constructors.iter().map(|e| e.key().clone()).collect();
        kinds.sort();
        kinds
    }
}

impl ProcessorFactory for Registry {
    fn build(
        &self,
        config: &ProcessorConfig,
        context: &BuildContext,
    ) -> Result<Box<dyn Processor>, ProcessorError> {
        // Copy the fn pointer out so no shard lock is held while constructing
        let constructor = self
            .constructors
            .get(config.kind.as_str())
            .map(|entry| *entry.value())
            .ok_or_else(|| ProcessorError::UnknownType(config.kind.clone()))?;

        debug!(kind = %config.kind, path = %context.label(), lane = context.lane(), "Building processor");
        constructor(config, context)
    }
}
