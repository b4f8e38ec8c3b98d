//! Reference resolution.
//!
//! A dotted reference name is looked up segment by segment. The first segment
//! is searched among the children of the referring item's parent, then in each
//! enclosing scope outward up to the top level. Remaining segments descend
//! through the children of the match. An item never resolves to itself, and
//! extension invocations are not referenceable.

use log::trace;

use crate::{
    error::{Diagnostic, ErrorKind, Result},
    item::{ItemId, ItemTree, Reference},
    observer::{Flags, Observer},
    populate::DeclarationTag,
    validate::Pass,
};

pub(crate) struct ResolveReferences<'a> {
    observer: &'a dyn Observer,
}

impl<'a> ResolveReferences<'a> {
    pub(crate) fn new(observer: &'a dyn Observer) -> Self {
        Self { observer }
    }
}

impl Pass for ResolveReferences<'_> {
    const NAME: &'static str = "resolve_references";

    fn visit_item(&mut self, tree: &mut ItemTree, id: ItemId) -> Result<()> {
        if !self.observer.flags().contains(Flags::RESOLVE_REFERENCES) {
            return Ok(());
        }
        let Some(Reference::Unresolved(name)) = tree.get(id).reference().cloned() else {
            return Ok(());
        };

        let Some(target) = lookup(tree, id, &name) else {
            let item = tree.get(id);
            return Err(Diagnostic::at(
                ErrorKind::UnresolvedReference {
                    name: item.display_name(),
                    reference: name,
                },
                item.location(),
                "referenced here",
            )
            .with_help("declare the referenced type in this scope or an enclosing one"));
        };

        trace!(reference = name.as_str(), target = target.index(); "Resolved reference");
        tree.push_referenced_by(target, id)?;
        tree.set_reference(id, Reference::Resolved(target))
    }
}

fn is_referenceable(tree: &ItemTree, candidate: ItemId, name: &str, referrer: ItemId) -> bool {
    let item = tree.get(candidate);
    candidate != referrer
        && item.name() == Some(name)
        && item.tag() != Some(DeclarationTag::Extension)
}

fn find_child(tree: &ItemTree, scope: ItemId, name: &str, referrer: ItemId) -> Option<ItemId> {
    tree.get(scope)
        .children()
        .iter()
        .copied()
        .find(|&child| is_referenceable(tree, child, name, referrer))
}

/// Find the item a dotted `name` refers to from `referrer`.
pub(crate) fn lookup(tree: &ItemTree, referrer: ItemId, name: &str) -> Option<ItemId> {
    let mut segments = name.split('.');
    let first = segments.next()?;

    let mut scope = tree.get(referrer).parent();
    let mut found = None;
    while let Some(current) = scope {
        found = find_child(tree, current, first, referrer);
        if found.is_some() {
            break;
        }
        scope = tree.get(current).parent();
    }

    segments.try_fold(found?, |current, segment| {
        find_child(tree, current, segment, referrer)
    })
}

#[cfg(test)]
mod tests {
    use tessera_core::typeinfo::FundamentalKind;

    use super::*;
    use crate::{observer::DefaultObserver, populate::RawItem, validate::run_pass};

    fn resolve(roots: Vec<RawItem>, observer: &DefaultObserver) -> Result<ItemTree> {
        let mut tree = ItemTree::from_raw(roots)?;
        run_pass(ResolveReferences::new(observer), &mut tree)?;
        Ok(tree)
    }

    fn id_of(tree: &ItemTree, key: &str) -> ItemId {
        tree.ids()
            .find(|&id| tree.compute_key(id).to_string() == key)
            .unwrap()
    }

    #[test]
    fn test_resolves_outward_through_scopes() {
        let tree = resolve(
            vec![
                RawItem::fundamental("name", FundamentalKind::String),
                RawItem::object("Person")
                    .with_child(RawItem::reference("name", "name"))
                    .with_child(RawItem::reference("nick", "name")),
            ],
            &DefaultObserver::default(),
        )
        .unwrap();

        let root_name = id_of(&tree, "name");
        let child_name = id_of(&tree, "Person.name");
        let nick = id_of(&tree, "Person.nick");

        // A declaration never resolves to itself.
        assert_eq!(tree.get(child_name).target(), Some(root_name));
        // Siblings are searched before enclosing scopes.
        assert_eq!(tree.get(nick).target(), Some(child_name));
        assert_eq!(tree.get(root_name).referenced_by(), &[child_name]);
    }

    #[test]
    fn test_resolves_dotted_names() {
        let tree = resolve(
            vec![
                RawItem::object("Outer").with_child(
                    RawItem::object("Inner")
                        .with_child(RawItem::fundamental("value", FundamentalKind::Integer)),
                ),
                RawItem::reference("v", "Outer.Inner.value"),
            ],
            &DefaultObserver::default(),
        )
        .unwrap();

        assert_eq!(
            tree.get(id_of(&tree, "v")).target(),
            Some(id_of(&tree, "Outer.Inner.value"))
        );
    }

    #[test]
    fn test_unresolved_reference_fails() {
        let err = resolve(
            vec![RawItem::reference("a", "missing")],
            &DefaultObserver::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::UnresolvedReference { reference, .. } if reference == "missing"
        ));
    }

    #[test]
    fn test_disabled_resolution_keeps_names() {
        let observer = DefaultObserver::default().without(Flags::RESOLVE_REFERENCES);
        let tree = resolve(vec![RawItem::reference("a", "missing")], &observer).unwrap();
        let id = id_of(&tree, "a");
        assert_eq!(
            tree.get(id).reference(),
            Some(&Reference::Unresolved("missing".to_string()))
        );
    }

    #[test]
    fn test_extensions_are_not_referenceable() {
        let err = resolve(
            vec![
                RawItem::extension("include"),
                RawItem::reference("a", "include"),
            ],
            &DefaultObserver::default(),
        )
        .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::E100);
    }
}
