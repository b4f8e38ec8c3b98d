//! # Tessera Analyzer
//!
//! Semantic analysis for the Tessera schema language. A front end hands over a
//! tree of unclassified [`RawItem`]s; the analyzer resolves references,
//! classifies and freezes every item, checks names and metadata, and lowers
//! the result into an immutable [`ElementTree`] for code generators.
//!
//! ## Usage
//!
//! ```
//! use tessera_analyzer::{AnalyzerConfig, DefaultObserver, RawItem, analyze};
//! use tessera_core::typeinfo::FundamentalKind;
//!
//! let roots = vec![
//!     RawItem::fundamental("name", FundamentalKind::String).with_metadata("max_length", "64"),
//!     RawItem::object("Person").with_child(RawItem::reference("name", "name")),
//! ];
//!
//! let tree = analyze(roots, &DefaultObserver::default(), &AnalyzerConfig::default())?;
//! assert!(tree.find("Person.name").is_some());
//! # Ok::<(), tessera_analyzer::Diagnostic>(())
//! ```

pub mod config;
pub mod error;
pub mod item;
pub mod metadata;
pub mod observer;
pub mod populate;
pub mod schema;
mod transform;
mod validate;

pub use config::AnalyzerConfig;
pub use error::{Diagnostic, ErrorCode, ErrorKind, Label, Result};
pub use item::{Item, ItemId, ItemKey, ItemTree, Reference, Subtype};
pub use observer::{DefaultObserver, ExtensionInfo, Flags, Observer};
pub use populate::{DeclarationTag, ItemType, RawItem};
pub use schema::{Schema, SchemaItem};
pub use transform::{Builder, transform};
pub use validate::validate;

use log::info;

use tessera_core::element::ElementTree;

/// Analyze a tree of raw declarations.
///
/// Runs the whole pipeline:
///
/// 1. **Populate** - arrange the raw items into an [`ItemTree`]
/// 2. **Validate** - resolve, commit, check names and resolve metadata
/// 3. **Transform** - lower the validated [`Schema`] into elements
///
/// # Errors
///
/// Returns the first [`Diagnostic`] raised by any stage.
pub fn analyze(
    roots: Vec<RawItem>,
    observer: &dyn Observer,
    config: &AnalyzerConfig,
) -> Result<ElementTree> {
    info!(observer = observer.name(), roots = roots.len(); "Analyzing schema");

    let tree = ItemTree::from_raw(roots)?;
    let schema = validate(tree, observer, config)?;
    let elements = transform(&schema)?;

    info!(elements = elements.elements().len(); "Schema analysis completed successfully");
    Ok(elements)
}

#[cfg(test)]
mod proptest_tests {
    use std::collections::{BTreeMap, BTreeSet, HashSet};

    use proptest::prelude::*;
    use tessera_core::{arity::Arity, typeinfo::FundamentalKind};

    use super::*;

    // ===================
    // Strategies
    // ===================

    /// Objects with distinct names, each with distinct named children and a
    /// few unnamed ones.
    fn object_tree_strategy() -> impl Strategy<Value = BTreeMap<String, (BTreeSet<String>, usize)>> {
        prop::collection::btree_map(
            "[a-e]{1,2}",
            (prop::collection::btree_set("[a-e]{1,2}", 0..4), 0usize..3),
            1..5,
        )
    }

    fn arity_strategy() -> impl Strategy<Value = Arity> {
        (0u32..3, prop::option::of(1u32..5))
            .prop_map(|(min, max)| Arity::new(min, max))
            .prop_filter("valid arity", Arity::is_valid)
    }

    // ===================
    // Property Test Functions
    // ===================

    fn check_keys_are_unique(
        objects: &BTreeMap<String, (BTreeSet<String>, usize)>,
    ) -> std::result::Result<(), TestCaseError> {
        let roots = objects
            .iter()
            .map(|(name, (children, unnamed))| {
                let named = children
                    .iter()
                    .map(|child| RawItem::fundamental(child.as_str(), FundamentalKind::String));
                let unnamed = (0..*unnamed)
                    .map(|_| RawItem::fundamental("value", FundamentalKind::Integer).unnamed());
                RawItem::object(name.as_str()).with_children(named.chain(unnamed))
            })
            .collect();

        let tree = ItemTree::from_raw(roots).map_err(|err| TestCaseError::fail(err.to_string()))?;
        let schema = validate(tree, &DefaultObserver::default(), &AnalyzerConfig::default())
            .map_err(|err| TestCaseError::fail(err.to_string()))?;

        let keys: HashSet<String> = schema.items().iter().map(|item| item.key().to_string()).collect();
        prop_assert_eq!(keys.len(), schema.len());
        Ok(())
    }

    fn check_alias_chain_arity(arity: Arity, length: usize) -> std::result::Result<(), TestCaseError> {
        let mut roots = vec![RawItem::fundamental("base", FundamentalKind::String).with_arity(arity)];
        let mut previous = "base".to_string();
        for index in 0..length {
            let name = format!("alias{index}");
            roots.push(RawItem::reference(name.as_str(), previous.as_str()));
            previous = name;
        }

        let tree = analyze(roots, &DefaultObserver::default(), &AnalyzerConfig::default())
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        let last = tree.find(&previous);
        prop_assert!(last.is_some());
        prop_assert_eq!(last.map(|element| element.type_arity()), Some(arity));
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn keys_are_unique(objects in object_tree_strategy()) {
            check_keys_are_unique(&objects)?;
        }

        #[test]
        fn alias_chain_arity(arity in arity_strategy(), length in 1usize..6) {
            check_alias_chain_arity(arity, length)?;
        }
    }
}
