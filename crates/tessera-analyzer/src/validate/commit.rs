//! Classification of items.
//!
//! Each item gets exactly one [`Subtype`] derived from its declaration tag and,
//! for objects and references, from what its reference chain reaches. An
//! item's reference is committed before the item itself; the stack of items
//! being committed doubles as the cycle detector.

use tessera_core::typeinfo::FundamentalKind;

use crate::{
    error::{Diagnostic, ErrorKind, Result},
    item::{Committed, ItemId, ItemTree, Reference, Subtype},
    metadata::{self, DEFAULT, DESCRIPTION, PLURAL},
    observer::{Flags, Observer},
    populate::{DeclarationTag, ItemType},
    validate::Pass,
};

pub(crate) struct Commit<'a> {
    observer: &'a dyn Observer,
    stack: Vec<ItemId>,
}

impl Pass for Commit<'_> {
    const NAME: &'static str = "commit";

    fn visit_item(&mut self, tree: &mut ItemTree, id: ItemId) -> Result<()> {
        self.commit(tree, id)
    }
}

impl<'a> Commit<'a> {
    pub(crate) fn new(observer: &'a dyn Observer) -> Self {
        Self {
            observer,
            stack: Vec::new(),
        }
    }

    fn commit(&mut self, tree: &mut ItemTree, id: ItemId) -> Result<()> {
        if tree.get(id).is_committed() {
            return Ok(());
        }
        if let Some(start) = self.stack.iter().position(|&active| active == id) {
            let path = self.stack[start..]
                .iter()
                .chain(std::iter::once(&id))
                .map(|&step| tree.compute_key(step).to_string())
                .collect();
            return Err(Diagnostic::at(
                ErrorKind::CircularDependency { path },
                tree.get(id).location(),
                "cycle closes here",
            ));
        }

        self.stack.push(id);
        let result = self.commit_unguarded(tree, id);
        self.stack.pop();
        result
    }

    fn commit_unguarded(&mut self, tree: &mut ItemTree, id: ItemId) -> Result<()> {
        if let Some(target) = tree.get(id).target() {
            self.commit(tree, target)?;
        }
        let committed = self.classify(tree, id)?;
        tree.commit(id, committed)
    }

    fn flags(&self) -> Flags {
        self.observer.flags()
    }

    fn require(&self, tree: &ItemTree, id: ItemId, flag: Flags, feature: &'static str) -> Result<()> {
        if self.flags().contains(flag) {
            return Ok(());
        }
        Err(Diagnostic::at(
            ErrorKind::UnsupportedFeature {
                feature,
                observer: self.observer.name().to_string(),
            },
            tree.get(id).location(),
            "used here",
        ))
    }

    /// Named/unnamed and root/child gating for declarations or objects.
    fn require_placement(&self, tree: &ItemTree, id: ItemId, is_object: bool) -> Result<()> {
        let named = tree.get(id).name().is_some();
        let root = tree.is_root_item(id);
        let (flag, feature) = match (is_object, named) {
            (true, true) => (Flags::NAMED_OBJECTS, "named objects"),
            (true, false) => (Flags::UNNAMED_OBJECTS, "unnamed objects"),
            (false, true) => (Flags::NAMED_DECLARATIONS, "named declarations"),
            (false, false) => (Flags::UNNAMED_DECLARATIONS, "unnamed declarations"),
        };
        self.require(tree, id, flag, feature)?;

        let (flag, feature) = match (is_object, root) {
            (true, true) => (Flags::ROOT_OBJECTS, "root objects"),
            (true, false) => (Flags::CHILD_OBJECTS, "child objects"),
            (false, true) => (Flags::ROOT_DECLARATIONS, "root declarations"),
            (false, false) => (Flags::CHILD_DECLARATIONS, "child declarations"),
        };
        self.require(tree, id, flag, feature)
    }

    fn classify(&self, tree: &ItemTree, id: ItemId) -> Result<Committed> {
        let item = tree.get(id);
        let name = item.display_name();
        let location = item.location();

        let Some(tag) = item.tag() else {
            return Err(Diagnostic::at(
                ErrorKind::MalformedItem {
                    name,
                    reason: "declaration has no classification tag".to_string(),
                },
                location,
                "declared here",
            ));
        };

        if let Some(arity) = item.arity()
            && !arity.is_valid()
        {
            return Err(Diagnostic::at(
                ErrorKind::InvalidArity { name, arity },
                location,
                "declared here",
            )
            .with_help("the maximum must be at least 1 and not below the minimum"));
        }
        if item.item_type() == ItemType::Attribute {
            self.require(tree, id, Flags::ATTRIBUTES, "attributes")?;
        }
        if item.is_external() {
            self.require(tree, id, Flags::INCLUDE_STATEMENTS, "include statements")?;
        }

        let mut committed = Committed {
            key: tree.compute_key(id),
            subtype: Subtype::Fundamental,
            is_new_type: true,
            fundamental: None,
            allows_duplicates: false,
        };

        match tag {
            DeclarationTag::Extension => {
                let ext_name = item.name().unwrap_or_default();
                let Some(info) = self.observer.extension(ext_name) else {
                    return Err(Diagnostic::at(
                        ErrorKind::UnknownExtension {
                            name: ext_name.to_string(),
                        },
                        location,
                        "invoked here",
                    ));
                };
                if !item.children().is_empty() {
                    return Err(malformed(tree, id, "extensions cannot have children"));
                }
                committed.subtype = Subtype::Extension;
                committed.allows_duplicates = info.allow_duplicates;
            }
            DeclarationTag::Fundamental(kind) => {
                self.require_placement(tree, id, false)?;
                if !item.children().is_empty() {
                    return Err(invalid_fundamental(tree, id, "children"));
                }
                if item.reference().is_some() {
                    return Err(invalid_fundamental(tree, id, "a reference"));
                }
                committed.fundamental = Some(kind);
            }
            DeclarationTag::Object => {
                self.require_placement(tree, id, true)?;
                match item.target() {
                    None => committed.subtype = Subtype::Compound,
                    Some(target) => {
                        let base = tree.get(defining_item(tree, target));
                        match base.subtype() {
                            Some(Subtype::Compound) => committed.subtype = Subtype::Compound,
                            Some(Subtype::Fundamental | Subtype::Simple) => {
                                self.require(tree, id, Flags::SIMPLE_OBJECTS, "simple objects")?;
                                check_simple_children(tree, id)?;
                                committed.subtype = Subtype::Simple;
                                committed.fundamental =
                                    base.committed().and_then(|c| c.fundamental);
                            }
                            _ => {
                                return Err(malformed(
                                    tree,
                                    id,
                                    "objects cannot derive from an extension",
                                ));
                            }
                        }
                    }
                }
            }
            DeclarationTag::Reference => {
                self.require_placement(tree, id, false)?;
                if !item.children().is_empty() {
                    return Err(malformed(tree, id, "references cannot have children"));
                }
                match item.reference() {
                    None => return Err(malformed(tree, id, "reference without a target")),
                    // Resolution disabled: lowered as a placeholder fundamental.
                    Some(Reference::Unresolved(_)) => {}
                    Some(Reference::Resolved(target)) => {
                        let target = *target;
                        let base = tree.get(defining_item(tree, target));
                        if base.subtype() == Some(Subtype::Extension) {
                            return Err(malformed(tree, id, "cannot refer to an extension"));
                        }
                        let fundamental = tree.get(target).committed().and_then(|c| c.fundamental);
                        committed.fundamental = fundamental;

                        if is_augmentation(tree, id) {
                            self.require(tree, id, Flags::AUGMENTATIONS, "augmentations")?;
                            committed.subtype = Subtype::Augmented;
                            committed.is_new_type = self.augmentation_is_new_type(
                                tree,
                                id,
                                fundamental,
                                base.subtype() == Some(Subtype::Fundamental),
                            );
                        } else {
                            self.require(tree, id, Flags::ALIASES, "aliases")?;
                            committed.subtype = Subtype::Alias;
                            committed.is_new_type = false;
                        }
                    }
                }
            }
        }
        Ok(committed)
    }

    fn augmentation_is_new_type(
        &self,
        tree: &ItemTree,
        id: ItemId,
        fundamental: Option<FundamentalKind>,
        is_fundamental_reference: bool,
    ) -> bool {
        let item = tree.get(id);
        let has_new_type_key = fundamental.is_some_and(|kind| {
            let set = metadata::fundamental(kind);
            item.metadata()
                .keys()
                .any(|key| set.get(key).is_some_and(|d| d.is_new_type()))
        });
        let optional_new_type = item.arity().is_some_and(|arity| arity.is_optional())
            && self
                .observer
                .does_optional_reference_represent_new_type(is_fundamental_reference);
        has_new_type_key || optional_new_type
    }
}

/// Follow alias and augmentation references to the item that defines a type.
pub(crate) fn defining_item(tree: &ItemTree, id: ItemId) -> ItemId {
    let mut current = id;
    for _ in 0..tree.len() {
        let item = tree.get(current);
        match (item.subtype(), item.target()) {
            (Some(subtype), Some(target)) if subtype.is_reference() => current = target,
            _ => break,
        }
    }
    current
}

/// A reference is an augmentation when it declares an arity or metadata
/// beyond documentation, plural names and defaults.
fn is_augmentation(tree: &ItemTree, id: ItemId) -> bool {
    let item = tree.get(id);
    item.arity().is_some()
        || item.metadata().keys().any(|key| {
            !matches!(key.as_str(), PLURAL | DESCRIPTION | DEFAULT) && !metadata::is_pragma(key)
        })
}

fn check_simple_children(tree: &ItemTree, id: ItemId) -> Result<()> {
    let item = tree.get(id);
    for &child in item.children() {
        let child_item = tree.get(child);
        if child_item.item_type() != ItemType::Attribute {
            return Err(Diagnostic::at(
                ErrorKind::InvalidSimpleObjectChild {
                    name: item.display_name(),
                    child: child_item.display_name(),
                },
                child_item.location(),
                "not an attribute",
            )
            .with_secondary_label(item.location().clone(), "simple object declared here"));
        }
    }
    Ok(())
}

fn malformed(tree: &ItemTree, id: ItemId, reason: &str) -> Diagnostic {
    let item = tree.get(id);
    Diagnostic::at(
        ErrorKind::MalformedItem {
            name: item.display_name(),
            reason: reason.to_string(),
        },
        item.location(),
        "declared here",
    )
}

fn invalid_fundamental(tree: &ItemTree, id: ItemId, what: &'static str) -> Diagnostic {
    let item = tree.get(id);
    Diagnostic::at(
        ErrorKind::InvalidFundamental {
            name: item.display_name(),
            what,
        },
        item.location(),
        "declared here",
    )
}

#[cfg(test)]
mod tests {
    use tessera_core::arity::Arity;

    use super::*;
    use crate::{
        error::ErrorCode,
        observer::{DefaultObserver, ExtensionInfo},
        populate::RawItem,
        validate::{resolve::ResolveReferences, run_pass},
    };

    fn commit_with(roots: Vec<RawItem>, observer: &DefaultObserver) -> Result<ItemTree> {
        let mut tree = ItemTree::from_raw(roots)?;
        run_pass(ResolveReferences::new(observer), &mut tree)?;
        run_pass(Commit::new(observer), &mut tree)?;
        Ok(tree)
    }

    fn commit_all(roots: Vec<RawItem>) -> Result<ItemTree> {
        commit_with(roots, &DefaultObserver::default())
    }

    fn subtype_of(tree: &ItemTree, key: &str) -> Subtype {
        tree.ids()
            .find(|&id| tree.get(id).key().is_some_and(|k| k.to_string() == key))
            .and_then(|id| tree.get(id).subtype())
            .unwrap()
    }

    #[test]
    fn test_classification() {
        let tree = commit_all(vec![
            RawItem::fundamental("text", FundamentalKind::String),
            RawItem::reference("name", "text"),
            RawItem::reference("names", "text").with_arity(Arity::zero_or_more()),
            RawItem::reference("short", "text").with_metadata("max_length", "8"),
            RawItem::reference("doc", "text").with_metadata("description", "docs"),
            RawItem::object("Base").with_child(RawItem::reference("id", "text")),
            RawItem::object("Derived").with_reference("Base"),
            RawItem::object("Tagged")
                .with_reference("name")
                .with_child(RawItem::reference("lang", "text").attribute()),
        ])
        .unwrap();

        assert_eq!(subtype_of(&tree, "text"), Subtype::Fundamental);
        assert_eq!(subtype_of(&tree, "name"), Subtype::Alias);
        assert_eq!(subtype_of(&tree, "names"), Subtype::Augmented);
        assert_eq!(subtype_of(&tree, "short"), Subtype::Augmented);
        assert_eq!(subtype_of(&tree, "doc"), Subtype::Alias);
        assert_eq!(subtype_of(&tree, "Base"), Subtype::Compound);
        assert_eq!(subtype_of(&tree, "Derived"), Subtype::Compound);
        assert_eq!(subtype_of(&tree, "Tagged"), Subtype::Simple);
    }

    #[test]
    fn test_new_type_flags() {
        let tree = commit_all(vec![
            RawItem::fundamental("text", FundamentalKind::String),
            RawItem::reference("names", "text").with_arity(Arity::zero_or_more()),
            RawItem::reference("short", "text").with_metadata("max_length", "8"),
        ])
        .unwrap();

        let is_new = |key: &str| {
            tree.ids()
                .filter_map(|id| tree.get(id).committed())
                .find(|c| c.key.to_string() == key)
                .map(|c| c.is_new_type)
        };
        assert_eq!(is_new("text"), Some(true));
        assert_eq!(is_new("names"), Some(false));
        assert_eq!(is_new("short"), Some(true));
    }

    #[test]
    fn test_cycle_reports_full_path() {
        let err = commit_all(vec![
            RawItem::reference("A", "B"),
            RawItem::reference("B", "A"),
        ])
        .unwrap_err();

        let ErrorKind::CircularDependency { path } = err.kind() else {
            panic!("expected a cycle, got {err}");
        };
        assert_eq!(path, &["A", "B", "A"]);
    }

    #[test]
    fn test_simple_object_requires_attributes() {
        let err = commit_all(vec![
            RawItem::fundamental("text", FundamentalKind::String),
            RawItem::object("Tagged")
                .with_reference("text")
                .with_child(RawItem::reference("lang", "text")),
        ])
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::E202);
    }

    #[test]
    fn test_fundamental_cannot_have_children() {
        let err = commit_all(vec![
            RawItem::fundamental("text", FundamentalKind::String)
                .with_child(RawItem::fundamental("inner", FundamentalKind::Boolean)),
        ])
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidFundamental { what: "children", .. }));
    }

    #[test]
    fn test_invalid_arity() {
        let err = commit_all(vec![
            RawItem::fundamental("n", FundamentalKind::Integer).with_arity(Arity::new(3, Some(2))),
        ])
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::E204);
    }

    #[test]
    fn test_extensions_must_be_registered() {
        let err = commit_all(vec![RawItem::extension("include")]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::E205);

        let observer = DefaultObserver::default().with_extension(ExtensionInfo::new("include", true));
        let tree = commit_with(vec![RawItem::extension("include")], &observer).unwrap();
        let committed = tree.get(tree.roots()[0]).committed().unwrap();
        assert_eq!(committed.subtype, Subtype::Extension);
        assert!(committed.allows_duplicates);
    }

    #[test]
    fn test_feature_gates() {
        let roots = || {
            vec![
                RawItem::fundamental("text", FundamentalKind::String),
                RawItem::reference("name", "text"),
            ]
        };
        let observer = DefaultObserver::default().without(Flags::ALIASES);
        let err = commit_with(roots(), &observer).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnsupportedFeature { feature: "aliases", .. }));

        let observer = DefaultObserver::default().without(Flags::ROOT_DECLARATIONS);
        let err = commit_with(roots(), &observer).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::UnsupportedFeature { feature: "root declarations", .. }
        ));

        let text = || RawItem::fundamental("text", FundamentalKind::String);
        let cases = vec![
            (
                Flags::SIMPLE_OBJECTS,
                vec![text(), RawItem::object("Code").with_reference("text")],
                "simple objects",
            ),
            (
                Flags::AUGMENTATIONS,
                vec![text(), RawItem::reference("short", "text").with_metadata("max_length", "3")],
                "augmentations",
            ),
            (
                Flags::ATTRIBUTES,
                vec![RawItem::object("Person").with_child(text().attribute())],
                "attributes",
            ),
            (Flags::INCLUDE_STATEMENTS, vec![text().external()], "include statements"),
            (
                Flags::CHILD_DECLARATIONS,
                vec![RawItem::object("Person").with_child(text())],
                "child declarations",
            ),
            (
                Flags::CHILD_OBJECTS,
                vec![RawItem::object("Person").with_child(RawItem::object("Address"))],
                "child objects",
            ),
            (Flags::UNNAMED_DECLARATIONS, vec![text().unnamed()], "unnamed declarations"),
            (
                Flags::UNNAMED_OBJECTS,
                vec![RawItem::object("Person").with_child(RawItem::object("Address").unnamed())],
                "unnamed objects",
            ),
        ];
        for (flag, roots, expected) in cases {
            let observer = DefaultObserver::default().without(flag);
            let err = commit_with(roots, &observer).unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::UnsupportedFeature { feature, .. } if *feature == expected),
                "{expected}: {:?}",
                err.kind()
            );
        }
    }

    #[test]
    fn test_unresolved_reference_becomes_placeholder() {
        let observer = DefaultObserver::default().without(Flags::RESOLVE_REFERENCES);
        let tree = commit_with(vec![RawItem::reference("a", "Missing")], &observer).unwrap();
        let committed = tree.get(tree.roots()[0]).committed().unwrap();
        assert_eq!(committed.subtype, Subtype::Fundamental);
        assert_eq!(committed.fundamental, None);
    }

    #[test]
    fn test_optional_reference_new_type_hook() {
        struct Nullable(DefaultObserver);
        impl Observer for Nullable {
            fn name(&self) -> &str {
                self.0.name()
            }
            fn flags(&self) -> Flags {
                self.0.flags()
            }
            fn does_optional_reference_represent_new_type(&self, is_fundamental: bool) -> bool {
                is_fundamental
            }
        }

        let observer = Nullable(DefaultObserver::default());
        let mut tree = ItemTree::from_raw(vec![
            RawItem::fundamental("text", FundamentalKind::String),
            RawItem::reference("maybe", "text").with_arity(Arity::optional()),
        ])
        .unwrap();
        run_pass(ResolveReferences::new(&observer), &mut tree).unwrap();
        run_pass(Commit::new(&observer), &mut tree).unwrap();

        let committed = tree.get(tree.roots()[1]).committed().unwrap();
        assert_eq!(committed.subtype, Subtype::Augmented);
        assert!(committed.is_new_type);
    }
}
