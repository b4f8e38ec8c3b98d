//! Configuration types for Tessera schema analysis.
//!
//! [`AppConfig`] implements [`serde::Deserialize`] and is usually loaded from
//! a TOML file. Each `[metadata.<observer>]` table lists metadata values used
//! for declarations that leave those keys unset, when analyzing for the
//! observer of that name.
//!
//! # Example
//!
//! ```
//! # use tessera::config::AppConfig;
//! let config = AppConfig::from_toml_str(
//!     r#"
//!     [metadata.cpp]
//!     max_length = 255
//!     "#,
//! )?;
//! assert!(config.metadata_for("cpp").is_some());
//! # Ok::<(), tessera::TesseraError>(())
//! ```

use std::{fs, path::Path};

use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;

use tessera_analyzer::AnalyzerConfig;
use tessera_core::value::Metadata;

use crate::TesseraError;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Metadata overrides, keyed by observer name.
    #[serde(default)]
    metadata: IndexMap<String, Metadata>,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] with the given per-observer metadata.
    pub fn new(metadata: IndexMap<String, Metadata>) -> Self {
        Self { metadata }
    }

    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::Config`] when the text is not valid TOML or
    /// does not match the configuration layout.
    pub fn from_toml_str(text: &str) -> Result<Self, TesseraError> {
        toml::from_str(text)
            .map_err(|err| TesseraError::Config(format!("Failed to parse TOML configuration: {err}")))
    }

    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::Io`] when the file cannot be read, and
    /// [`TesseraError::Config`] when it cannot be parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TesseraError> {
        let path = path.as_ref();
        debug!(path = path.display().to_string(); "Loading configuration file");
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Returns the metadata overrides for one observer.
    pub fn metadata_for(&self, observer: &str) -> Option<&Metadata> {
        self.metadata.get(observer)
    }

    /// The in-memory form used by the analyzer.
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig::from(self.metadata.clone())
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::value::Value;

    use super::*;

    #[test]
    fn test_parse_metadata_tables() {
        let config = AppConfig::from_toml_str(
            r#"
            [metadata.cpp]
            max_length = 255
            values = ["a", "b"]

            [metadata.python]
            description = "generated"
            "#,
        )
        .unwrap();

        let cpp = config.metadata_for("cpp").unwrap();
        assert_eq!(cpp.get("max_length"), Some(&Value::Int(255)));
        assert_eq!(cpp.get("values"), Some(&Value::from(vec!["a", "b"])));
        assert_eq!(
            config.analyzer_config().overrides_for("python").and_then(|md| md.get("description")),
            Some(&Value::from("generated"))
        );
    }

    #[test]
    fn test_empty_config() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert!(config.metadata_for("cpp").is_none());
        assert_eq!(config.analyzer_config(), AnalyzerConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        let err = AppConfig::from_toml_str("[metadata.cpp\n").unwrap_err();
        assert!(matches!(err, TesseraError::Config(_)));
    }
}
