//! Name uniqueness per scope.
//!
//! The scope of an item is its own children plus the children contributed by
//! its reference chain, so an object cannot redeclare a member of its base.
//! Repeatable extensions at the top level are exempt.

use std::collections::HashMap;

use crate::{
    error::{Diagnostic, ErrorKind, Result},
    item::{ItemId, ItemTree, Subtype},
    validate::Pass,
};

pub(crate) struct EnsureUniqueNames;

impl Pass for EnsureUniqueNames {
    const NAME: &'static str = "ensure_unique_names";

    fn visit_root(&mut self, tree: &mut ItemTree) -> Result<()> {
        check_scopes(tree, &[ItemId::ROOT])
    }

    fn visit_item(&mut self, tree: &mut ItemTree, id: ItemId) -> Result<()> {
        // Farthest base first, so the redeclaring item is the one reported.
        let mut scopes: Vec<ItemId> = tree.reference_chain(id).collect();
        scopes.reverse();
        scopes.push(id);
        check_scopes(tree, &scopes)
    }
}

fn is_exempt(tree: &ItemTree, id: ItemId) -> bool {
    tree.is_root_item(id)
        && tree
            .get(id)
            .committed()
            .is_some_and(|c| c.subtype == Subtype::Extension && c.allows_duplicates)
}

fn check_scopes(tree: &ItemTree, scopes: &[ItemId]) -> Result<()> {
    let mut seen: HashMap<&str, ItemId> = HashMap::new();
    for &scope in scopes {
        for &child in tree.get(scope).children() {
            let Some(name) = tree.get(child).name() else {
                continue;
            };
            if is_exempt(tree, child) {
                continue;
            }
            if let Some(&first) = seen.get(name) {
                let duplicate = tree.get(child);
                return Err(Diagnostic::at(
                    ErrorKind::DuplicateName {
                        name: name.to_string(),
                    },
                    duplicate.location(),
                    "duplicate declaration",
                )
                .with_secondary_label(tree.get(first).location().clone(), "first declared here")
                .with_help("rename one of the declarations"));
            }
            seen.insert(name, child);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tessera_core::{location::SourceLocation, typeinfo::FundamentalKind};

    use super::*;
    use crate::{
        error::ErrorCode,
        observer::{DefaultObserver, ExtensionInfo},
        populate::RawItem,
        validate::{commit::Commit, resolve::ResolveReferences, run_pass},
    };

    fn check(roots: Vec<RawItem>, observer: &DefaultObserver) -> Result<()> {
        let mut tree = ItemTree::from_raw(roots)?;
        run_pass(ResolveReferences::new(observer), &mut tree)?;
        run_pass(Commit::new(observer), &mut tree)?;
        run_pass(EnsureUniqueNames, &mut tree)
    }

    fn at(line: u32) -> SourceLocation {
        SourceLocation::new("schema.tsr", line, 1)
    }

    #[test]
    fn test_duplicate_children() {
        let err = check(
            vec![
                RawItem::object("Person")
                    .with_child(RawItem::fundamental("id", FundamentalKind::Integer).with_location(at(2)))
                    .with_child(RawItem::fundamental("id", FundamentalKind::String).with_location(at(3))),
            ],
            &DefaultObserver::default(),
        )
        .unwrap_err();

        assert_eq!(err.code(), ErrorCode::E201);
        assert_eq!(err.location().map(SourceLocation::line), Some(3));
        assert_eq!(err.labels()[1].location().line(), 2);
    }

    #[test]
    fn test_base_members_cannot_be_redeclared() {
        let err = check(
            vec![
                RawItem::object("Base")
                    .with_child(RawItem::fundamental("id", FundamentalKind::Integer).with_location(at(2))),
                RawItem::object("Derived")
                    .with_reference("Base")
                    .with_child(RawItem::fundamental("id", FundamentalKind::String).with_location(at(5))),
            ],
            &DefaultObserver::default(),
        )
        .unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::DuplicateName { name } if name == "id"));
        assert_eq!(err.location().map(SourceLocation::line), Some(5));
    }

    #[test]
    fn test_duplicate_root_declarations() {
        let err = check(
            vec![
                RawItem::fundamental("a", FundamentalKind::Integer),
                RawItem::fundamental("a", FundamentalKind::Integer),
            ],
            &DefaultObserver::default(),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::E201);
    }

    #[test]
    fn test_repeatable_root_extensions_are_exempt() {
        let roots = || {
            vec![
                RawItem::extension("include").with_positional_argument("a.tsr"),
                RawItem::extension("include").with_positional_argument("b.tsr"),
            ]
        };

        let observer = DefaultObserver::default().with_extension(ExtensionInfo::new("include", true));
        assert!(check(roots(), &observer).is_ok());

        let observer = DefaultObserver::default().with_extension(ExtensionInfo::new("include", false));
        assert!(check(roots(), &observer).is_err());
    }
}
