//! Tessera - semantic analysis for a schema definition language.
//!
//! Turns the declaration tree produced by a front end into an immutable tree of
//! typed elements for code generators. References are resolved, declarations
//! classified, names and metadata checked, and metadata defaults filled in from
//! the schema language and from configuration.

pub mod config;
pub mod report;

mod error;

pub use tessera_analyzer::{
    AnalyzerConfig, DeclarationTag, DefaultObserver, Diagnostic, ErrorCode, ErrorKind,
    ExtensionInfo, Flags, ItemType, Observer, RawItem,
};
pub use tessera_core::{arity, element, location, typeinfo, value};

pub use error::TesseraError;

use log::{debug, info, trace};

use tessera_core::element::ElementTree;

use config::AppConfig;

/// Builder for analyzing Tessera schemas.
///
/// # Examples
///
/// ```rust
/// use tessera::{DefaultObserver, RawItem, SchemaBuilder, typeinfo::FundamentalKind};
///
/// let roots = vec![
///     RawItem::fundamental("id", FundamentalKind::Integer),
///     RawItem::object("Person").with_child(RawItem::reference("id", "id")),
/// ];
///
/// let builder = SchemaBuilder::default();
/// let tree = builder
///     .analyze(roots, &DefaultObserver::default())
///     .expect("Failed to analyze");
/// assert_eq!(tree.roots().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    config: AppConfig,
}

impl SchemaBuilder {
    /// Create a new schema builder with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration, including metadata overrides
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Analyze a declaration tree into an element tree.
    ///
    /// Runs reference resolution, classification, name and metadata checks,
    /// then lowers the validated declarations into elements.
    ///
    /// # Arguments
    ///
    /// * `roots` - Top-level declarations from the front end
    /// * `observer` - Feature policy of the code generator being targeted
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::Analysis`] with the first diagnostic raised.
    pub fn analyze(
        &self,
        roots: Vec<RawItem>,
        observer: &dyn Observer,
    ) -> Result<ElementTree, TesseraError> {
        info!(observer = observer.name(); "Analyzing schema");

        let config = self.config.analyzer_config();
        let tree = tessera_analyzer::analyze(roots, observer, &config)?;

        debug!(roots = tree.roots().len(); "Schema analyzed successfully");
        trace!(elements:? = tree.elements().iter().map(|e| e.to_string()).collect::<Vec<_>>(); "Lowered elements");

        Ok(tree)
    }
}
