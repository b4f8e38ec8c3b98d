//! Whole-tree validation passes.
//!
//! Validation turns a raw [`ItemTree`] into a [`Schema`] by running four
//! passes, each to completion over every item before the next starts:
//!
//! 1. **ResolveReferences** - turn reference names into item ids
//! 2. **Commit** - classify each item and freeze it
//! 3. **EnsureUniqueNames** - reject colliding names per scope
//! 4. **ResolveMetadata** - check, default and coerce metadata
//!
//! The first error aborts the run.

mod commit;
mod metadata;
mod resolve;
mod unique_names;

pub(crate) use metadata::type_info_diagnostic;

use log::debug;

use crate::{
    config::AnalyzerConfig,
    error::Result,
    item::{ItemId, ItemTree},
    observer::Observer,
    schema::Schema,
};

/// A validation pass, visiting items in pre-order.
pub(crate) trait Pass {
    /// Name used in logs.
    const NAME: &'static str;

    /// Visit the synthetic root before any item.
    fn visit_root(&mut self, _tree: &mut ItemTree) -> Result<()> {
        Ok(())
    }

    /// Visit one item.
    fn visit_item(&mut self, tree: &mut ItemTree, id: ItemId) -> Result<()>;
}

fn run_pass<P: Pass>(mut pass: P, tree: &mut ItemTree) -> Result<()> {
    debug!(pass = P::NAME, items = tree.len(); "Running validation pass");
    pass.visit_root(tree)?;
    for id in tree.ids() {
        pass.visit_item(tree, id)?;
    }
    Ok(())
}

/// Run every validation pass and freeze the result.
pub fn validate(
    mut tree: ItemTree,
    observer: &dyn Observer,
    config: &AnalyzerConfig,
) -> Result<Schema> {
    run_pass(resolve::ResolveReferences::new(observer), &mut tree)?;
    run_pass(commit::Commit::new(observer), &mut tree)?;
    run_pass(unique_names::EnsureUniqueNames, &mut tree)?;
    run_pass(metadata::ResolveMetadata::new(observer, config), &mut tree)?;
    tree.finalize()
}

#[cfg(test)]
mod tests {
    use tessera_core::typeinfo::FundamentalKind;

    use super::*;
    use crate::{item::Subtype, observer::DefaultObserver, populate::RawItem};

    fn validate_all(roots: Vec<RawItem>) -> Result<Schema> {
        validate(
            ItemTree::from_raw(roots)?,
            &DefaultObserver::default(),
            &AnalyzerConfig::default(),
        )
    }

    #[test]
    fn test_validate_produces_schema() {
        let schema = validate_all(vec![
            RawItem::fundamental("text", FundamentalKind::String),
            RawItem::reference("name", "text"),
            RawItem::reference("label", "name").with_metadata("max_length", "20"),
        ])
        .unwrap();
        assert_eq!(schema.len(), 3);
        assert!(schema.find("missing").is_none());

        let name = schema.find("name").unwrap();
        assert_eq!(name.subtype(), Subtype::Alias);
        assert!(!name.is_new_type());

        let label = schema.find("label").unwrap();
        assert_eq!(label.subtype(), Subtype::Augmented);
        assert!(label.is_new_type());
        assert_eq!(schema.resolve(label.id()).name(), Some("text"));
        assert_eq!(schema.resolve(name.id()).name(), Some("text"));
    }

    #[test]
    fn test_validate_stops_at_first_error() {
        let err = validate_all(vec![
            RawItem::reference("a", "missing"),
            RawItem::fundamental("b", FundamentalKind::Enum),
        ])
        .unwrap_err();
        assert!(matches!(err.kind(), crate::error::ErrorKind::UnresolvedReference { .. }));
    }
}
