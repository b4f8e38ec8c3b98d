//! Metadata resolution.
//!
//! For each item, in order:
//!
//! 1. restrict `plural`, `default`, `polymorphic` and `suppress_polymorphic`
//!    to the items they make sense on
//! 2. reject keys outside the item's metadata set (pragmas pass through)
//! 3. fill missing keys from configuration overrides, then defaults, and
//!    apply the restrictions of step 1 to keys set by configuration
//! 4. require required keys
//! 5. coerce every value through its descriptor's type info
//! 6. check parameters that constrain each other (min/max, enum counts)
//!
//! Referenced items are resolved first so their coerced metadata can be used.
//! A type parameter already set somewhere along the reference chain is never
//! filled on the referrer, so configuration cannot widen a constraint the
//! referenced type declares.

use log::trace;

use tessera_core::{
    element::{POLYMORPHIC, SUPPRESS_POLYMORPHIC},
    location::SourceLocation,
    typeinfo::TypeInfoError,
    value::{Metadata, Value},
};

use crate::{
    config::AnalyzerConfig,
    error::{Diagnostic, ErrorKind, Result},
    item::{Committed, ItemId, ItemTree, Subtype},
    metadata::{self, DEFAULT, ItemContext, MetadataSet, PLURAL},
    observer::{Flags, Observer},
    validate::{Pass, commit::defining_item},
};

pub(crate) struct ResolveMetadata<'a> {
    observer: &'a dyn Observer,
    config: &'a AnalyzerConfig,
}

impl Pass for ResolveMetadata<'_> {
    const NAME: &'static str = "resolve_metadata";

    fn visit_root(&mut self, tree: &mut ItemTree) -> Result<()> {
        if self.overrides().is_some() && !self.observer.flags().contains(Flags::CONFIG_DECLARATIONS) {
            let location = tree
                .roots()
                .first()
                .map(|&id| tree.get(id).location().clone())
                .unwrap_or_default();
            return Err(Diagnostic::at(
                ErrorKind::UnsupportedFeature {
                    feature: "configuration declarations",
                    observer: self.observer.name().to_string(),
                },
                &location,
                "configuration applies here",
            )
            .with_help("remove the metadata overrides for this observer from the configuration"));
        }
        Ok(())
    }

    fn visit_item(&mut self, tree: &mut ItemTree, id: ItemId) -> Result<()> {
        self.resolve(tree, id)
    }
}

impl<'a> ResolveMetadata<'a> {
    pub(crate) fn new(observer: &'a dyn Observer, config: &'a AnalyzerConfig) -> Self {
        Self { observer, config }
    }

    fn overrides(&self) -> Option<&'a Metadata> {
        self.config.overrides_for(self.observer.name())
    }

    fn resolve(&self, tree: &mut ItemTree, id: ItemId) -> Result<()> {
        if tree.get(id).is_metadata_resolved() {
            return Ok(());
        }
        if let Some(target) = tree.get(id).target() {
            self.resolve(tree, target)?;
        }
        let metadata = self.resolved_metadata(tree, id)?;
        trace!(item:% = tree.get(id).display_name(), keys = metadata.len(); "Resolved metadata");
        tree.set_resolved_metadata(id, metadata)
    }

    fn resolved_metadata(&self, tree: &ItemTree, id: ItemId) -> Result<Metadata> {
        let item = tree.get(id);
        let Some(committed) = item.committed() else {
            return Err(Diagnostic::at(
                ErrorKind::NotCommitted {
                    name: item.display_name(),
                },
                item.location(),
                "declared here",
            ));
        };
        if committed.subtype == Subtype::Extension {
            return Ok(item.metadata().clone());
        }

        let name = item.display_name();
        let location = item.location();
        let arity = tree.effective_arity(id);

        check_usage(
            tree,
            id,
            committed,
            item.metadata().keys().map(String::as_str),
            "given here",
        )?;

        let set = applicable_set(tree, id, committed);
        let is_placeholder = committed.subtype == Subtype::Fundamental && committed.fundamental.is_none();
        let accepts = |key: &str| metadata::is_pragma(key) || is_placeholder || set.contains(key);

        if let Some(key) = item.metadata().keys().find(|key| !accepts(key)) {
            return Err(Diagnostic::at(
                ErrorKind::UnknownMetadata {
                    name,
                    key: key.clone(),
                },
                location,
                "declared here",
            ));
        }

        let mut resolved = item.metadata().clone();
        let context = ItemContext {
            name: item.name(),
            arity,
        };
        let base = base_set(tree, id);
        let mut configured = Vec::new();
        for descriptor in set.iter() {
            let key = descriptor.name();
            if resolved.contains_key(key) || (!base.contains(key) && chain_sets(tree, id, key)) {
                continue;
            }
            if let Some(value) = self.overrides().and_then(|overrides| overrides.get(key).cloned()) {
                configured.push(key);
                resolved.insert(key.to_string(), value);
            } else if let Some(value) = descriptor.default_value().and_then(|d| d.evaluate(&context)) {
                resolved.insert(key.to_string(), value);
            }
        }
        check_usage(tree, id, committed, configured, "set by configuration")?;

        if let Some(missing) = set
            .iter()
            .find(|d| d.is_required() && !resolved.contains_key(d.name()))
        {
            return Err(Diagnostic::at(
                ErrorKind::MissingMetadata {
                    name,
                    key: missing.name().to_string(),
                },
                location,
                "declared here",
            ));
        }

        for (key, value) in resolved.iter_mut() {
            let Some(descriptor) = set.get(key) else {
                continue;
            };
            let raw = std::mem::replace(value, Value::Bool(false));
            *value = descriptor.type_info().coerce(raw).map_err(|err| {
                Diagnostic::at(
                    ErrorKind::InvalidMetadata {
                        name: name.clone(),
                        key: key.clone(),
                        reason: err.to_string(),
                    },
                    location,
                    "declared here",
                )
            })?;
        }

        if let Some(kind) = committed.fundamental {
            let mut chain: Vec<ItemId> = tree.reference_chain(id).collect();
            chain.reverse();
            let layers = chain
                .iter()
                .map(|&link| tree.get(link).metadata())
                .chain(std::iter::once(&resolved));
            let parameters = metadata::overlay_parameters(kind, layers);
            kind.check_parameters(&parameters)
                .map_err(|err| type_info_diagnostic(err, &name, kind.name(), location))?;
        }

        Ok(resolved)
    }
}

/// Keys every item may carry: universal keys and those of its arity.
fn base_set(tree: &ItemTree, id: ItemId) -> MetadataSet {
    metadata::universal().merge(metadata::for_arity(tree.effective_arity(id)))
}

/// Universal and arity keys, plus the keys of the item's kind. References and
/// simple objects may override the keys of the type they refer to.
fn applicable_set(tree: &ItemTree, id: ItemId, committed: &Committed) -> MetadataSet {
    let base = base_set(tree, id);
    let kind_set = match committed.subtype {
        Subtype::Compound => metadata::compound(),
        Subtype::Fundamental => committed
            .fundamental
            .map(metadata::fundamental)
            .unwrap_or_default(),
        Subtype::Simple => committed
            .fundamental
            .map(metadata::fundamental)
            .unwrap_or_default()
            .relaxed(),
        Subtype::Alias | Subtype::Augmented => {
            let defining = tree.get(tree.get(id).target().map_or(id, |t| defining_item(tree, t)));
            match (defining.subtype(), committed.fundamental) {
                (Some(Subtype::Compound), _) => metadata::compound().relaxed(),
                (_, Some(kind)) => metadata::fundamental(kind).relaxed(),
                _ => MetadataSet::default(),
            }
        }
        Subtype::Extension => MetadataSet::default(),
    };
    base.merge(kind_set)
}

fn check_usage<'k>(
    tree: &ItemTree,
    id: ItemId,
    committed: &Committed,
    keys: impl IntoIterator<Item = &'k str>,
    origin: &str,
) -> Result<()> {
    let item = tree.get(id);
    let name = item.display_name();
    let arity = tree.effective_arity(id);

    for key in keys {
        let kind = match key {
            PLURAL if item.name().is_none() => Some(ErrorKind::PluralMisuse {
                name: name.clone(),
                reason: "the declaration is unnamed",
            }),
            PLURAL if !arity.is_collection() => Some(ErrorKind::PluralMisuse {
                name: name.clone(),
                reason: "the declaration holds a single value",
            }),
            DEFAULT if !arity.is_optional() => Some(ErrorKind::DefaultMisuse { name: name.clone() }),
            POLYMORPHIC
                if committed.subtype != Subtype::Compound || item.referenced_by().is_empty() =>
            {
                Some(ErrorKind::PolymorphicMisuse { name: name.clone() })
            }
            SUPPRESS_POLYMORPHIC if !chain_is_polymorphic(tree, id) => {
                Some(ErrorKind::SuppressPolymorphicMisuse { name: name.clone() })
            }
            _ => None,
        };
        if let Some(kind) = kind {
            return Err(Diagnostic::at(kind, item.location(), format!("`{key}` {origin}")));
        }
    }
    Ok(())
}

/// Does any item the reference chain reaches already carry `key`?
fn chain_sets(tree: &ItemTree, id: ItemId, key: &str) -> bool {
    tree.reference_chain(id)
        .any(|link| tree.get(link).metadata().contains_key(key))
}

/// Does any item the reference chain reaches declare `polymorphic = true`?
fn chain_is_polymorphic(tree: &ItemTree, id: ItemId) -> bool {
    tree.reference_chain(id).any(|link| {
        tree.get(link)
            .metadata()
            .get(POLYMORPHIC)
            .is_some_and(|value| value.as_bool() == Some(true))
    })
}

/// Map a type info failure to a diagnostic for the item `name`.
pub(crate) fn type_info_diagnostic(
    err: TypeInfoError,
    name: &str,
    key_hint: &str,
    location: &SourceLocation,
) -> Diagnostic {
    let kind = match err {
        TypeInfoError::Ordering {
            min_key,
            min,
            max_key,
            max,
        } => ErrorKind::MinMaxOrdering {
            name: name.to_string(),
            min_key: min_key.to_string(),
            min,
            max_key: max_key.to_string(),
            max,
        },
        TypeInfoError::CountMismatch {
            values,
            friendly_values,
        } => ErrorKind::EnumValueCountMismatch {
            name: name.to_string(),
            values,
            friendly_values,
        },
        TypeInfoError::MissingParameter { key } => ErrorKind::MissingMetadata {
            name: name.to_string(),
            key: key.to_string(),
        },
        TypeInfoError::InvalidWidth { key, .. } => ErrorKind::InvalidMetadata {
            name: name.to_string(),
            key: key.to_string(),
            reason: err.to_string(),
        },
        other => ErrorKind::InvalidMetadata {
            name: name.to_string(),
            key: key_hint.to_string(),
            reason: other.to_string(),
        },
    };
    Diagnostic::at(kind, location, "declared here")
}
