//! Per-run analyzer configuration.

use indexmap::IndexMap;

use tessera_core::value::{Metadata, Value};

/// Metadata overrides, namespaced by observer name.
///
/// When an item does not declare a metadata key its schema accepts, the value
/// configured for the active observer is used before the key's default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyzerConfig {
    overrides: IndexMap<String, Metadata>,
}

impl AnalyzerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an override for `key` in the `observer` namespace.
    pub fn with_override(
        mut self,
        observer: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.overrides
            .entry(observer.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Overrides configured for an observer.
    pub fn overrides_for(&self, observer: &str) -> Option<&Metadata> {
        self.overrides.get(observer).filter(|md| !md.is_empty())
    }
}

impl From<IndexMap<String, Metadata>> for AnalyzerConfig {
    fn from(overrides: IndexMap<String, Metadata>) -> Self {
        Self { overrides }
    }
}
