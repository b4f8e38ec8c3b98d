//! Lowering of a validated [`Schema`] into an [`ElementTree`].
//!
//! Construction is depth-first and never follows references: each element is
//! built from its own item and its already-built children. Items sharing a key
//! lower to the same element, except repeatable extensions which are rebuilt
//! every time.
//!
//! Links between elements are bound after construction, in two steps:
//!
//! 1. every child gets its parent, exactly once
//! 2. references, compound bases and derived lists are bound by per-item
//!    fixups. A fixup first runs the fixup of its target, so an element only
//!    copies from a target whose own links are complete.

use std::{collections::HashMap, rc::Rc};

use indexmap::IndexMap;
use log::{debug, trace};

use tessera_core::{
    element::{Element, ElementError, ElementInfo, ElementKind, ElementTree},
    typeinfo::{PlaceholderTypeInfo, TypeInfo},
    value::Metadata,
};

use crate::{
    error::{Diagnostic, ErrorKind, Result},
    item::{ItemId, ItemKey, Reference, Subtype},
    metadata::{self, DEFAULT},
    populate::ItemType,
    schema::{Schema, SchemaItem},
    validate::type_info_diagnostic,
};

/// Lower a validated schema.
pub fn transform(schema: &Schema) -> Result<ElementTree> {
    Builder::new(schema).build()
}

/// Per-run lowering state.
pub struct Builder<'a> {
    schema: &'a Schema,
    cache: HashMap<ItemKey, Rc<Element>>,
    lowered: HashMap<ItemId, Rc<Element>>,
    elements: Vec<Rc<Element>>,
    /// Scheduled fixups in construction order, with their done flag.
    fixups: IndexMap<ItemId, bool>,
}

impl<'a> Builder<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            cache: HashMap::new(),
            lowered: HashMap::new(),
            elements: Vec::new(),
            fixups: IndexMap::new(),
        }
    }

    pub fn build(mut self) -> Result<ElementTree> {
        debug!(items = self.schema.len(); "Lowering schema");
        let roots = self
            .schema
            .roots()
            .iter()
            .map(|&id| self.lower(id))
            .collect::<Result<Vec<_>>>()?;

        self.assign_parents()?;

        let scheduled: Vec<ItemId> = self.fixups.keys().copied().collect();
        for id in scheduled {
            self.run_fixup(id)?;
        }

        debug!(roots = roots.len(), elements = self.elements.len(); "Lowered schema");
        Ok(ElementTree::new(roots, self.elements))
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Lower one item and its children, reusing the cached element for its key.
    pub fn lower(&mut self, id: ItemId) -> Result<Rc<Element>> {
        let schema = self.schema;
        let item = schema.get(id);

        if item.is_cacheable()
            && let Some(element) = self.cache.get(item.key())
        {
            let element = Rc::clone(element);
            self.lowered.insert(id, Rc::clone(&element));
            return Ok(element);
        }

        let children = item
            .children()
            .iter()
            .map(|&child| self.lower(child))
            .collect::<Result<Vec<_>>>()?;

        let mut metadata = item.metadata().clone();
        let type_info = self.type_info(item, &mut metadata)?;

        if let Some(type_info) = &type_info
            && let Some(default) = metadata.get_mut(DEFAULT)
        {
            let raw = default.clone();
            *default = type_info.coerce(raw).map_err(|err| {
                type_info_diagnostic(err, &display_name(item), DEFAULT, item.location())
            })?;
        }

        let kind = match (item.subtype(), type_info) {
            (Subtype::Fundamental, Some(type_info)) => ElementKind::fundamental(type_info),
            (Subtype::Fundamental, None) => ElementKind::fundamental(placeholder(item)),
            (Subtype::Compound, _) => ElementKind::compound(children),
            (Subtype::Simple, Some(type_info)) => ElementKind::simple(type_info, children),
            (Subtype::Simple, None) => {
                return Err(invalid_link(item, "simple object without a fundamental type"));
            }
            (Subtype::Alias, _) => ElementKind::alias(),
            (Subtype::Augmented, type_info) => ElementKind::augmented(
                type_info.filter(|_| declares_own_parameters(item)),
            ),
            (Subtype::Extension, _) => ElementKind::extension(
                item.positional_arguments().to_vec(),
                item.keyword_arguments().clone(),
            ),
        };

        let element = Element::new(element_info(item, metadata), kind);
        trace!(key:% = item.key(), kind = element.kind().name(); "Lowered item");

        if item.is_cacheable() {
            self.cache.insert(item.key().clone(), Rc::clone(&element));
        }
        self.lowered.insert(id, Rc::clone(&element));
        self.elements.push(Rc::clone(&element));
        if matches!(
            item.subtype(),
            Subtype::Compound | Subtype::Simple | Subtype::Alias | Subtype::Augmented
        ) {
            self.fixups.entry(id).or_insert(false);
        }
        Ok(element)
    }

    /// Build the type info of an item from the parameters along its reference
    /// chain, and strip the item's own parameter keys from `metadata`.
    ///
    /// `None` for compounds, extensions and placeholders.
    fn type_info(
        &self,
        item: &SchemaItem,
        metadata: &mut Metadata,
    ) -> Result<Option<Rc<dyn TypeInfo>>> {
        let Some(kind) = item.fundamental() else {
            return Ok(None);
        };

        let mut chain: Vec<ItemId> = self.schema.reference_chain(item.id()).collect();
        chain.reverse();
        let layers = chain
            .iter()
            .map(|&link| self.schema.get(link).metadata())
            .chain(std::iter::once(item.metadata()));
        let mut parameters = metadata::overlay_parameters(kind, layers);
        let type_info = kind
            .create_type_info(&mut parameters)
            .map_err(|err| type_info_diagnostic(err, &display_name(item), kind.name(), item.location()))?;

        for key in kind.parameter_names() {
            metadata.shift_remove(*key);
        }
        Ok(Some(type_info))
    }

    // ========================================================================
    // Links
    // ========================================================================

    fn element(&self, id: ItemId) -> Result<Rc<Element>> {
        self.lowered
            .get(&id)
            .cloned()
            .ok_or_else(|| invalid_link(self.schema.get(id), "item was never lowered"))
    }

    fn assign_parents(&self) -> Result<()> {
        for item in self.schema.items() {
            let Some(parent) = item.parent() else {
                continue;
            };
            let child = self.element(item.id())?;
            let parent = self.element(parent)?;
            child.set_parent(&parent).map_err(|_| {
                Diagnostic::at(
                    ErrorKind::ParentAlreadyAssigned {
                        name: display_name(item),
                    },
                    item.location(),
                    "declared here",
                )
            })?;
        }
        Ok(())
    }

    fn run_fixup(&mut self, id: ItemId) -> Result<()> {
        match self.fixups.get_mut(&id) {
            Some(done) if !*done => *done = true,
            _ => return Ok(()),
        }

        let schema = self.schema;
        let item = schema.get(id);
        let target = item.target();
        if let Some(target) = target {
            self.run_fixup(target)?;
        }

        let element = self.element(id)?;
        let target = target.map(|target| self.element(target)).transpose()?;
        if let Some(target) = &target {
            element
                .bind_reference(target)
                .map_err(|err| link_error(item, err))?;
        }

        match item.subtype() {
            Subtype::Compound => {
                let derived = item
                    .referenced_by()
                    .iter()
                    .copied()
                    .filter(|&referrer| {
                        let referrer = schema.get(referrer);
                        referrer.subtype() == Subtype::Compound && !referrer.children().is_empty()
                    })
                    .map(|referrer| self.element(referrer))
                    .collect::<Result<Vec<_>>>()?;
                element
                    .bind_derived(&derived)
                    .map_err(|err| link_error(item, err))?;

                if element.is_polymorphic() {
                    for child in derived.iter().filter(|d| !d.suppresses_polymorphic()) {
                        child
                            .inherit_polymorphic()
                            .map_err(|err| link_error(item, err))?;
                    }
                }
                trace!(key:% = item.key(), derived = derived.len(); "Bound derived elements");
            }
            Subtype::Augmented => {
                if let Some(target) = &target {
                    let inherited = |own: &Metadata, theirs: Metadata| -> Metadata {
                        theirs
                            .into_iter()
                            .filter(|(key, _)| !own.contains_key(key))
                            .collect()
                    };
                    let metadata = inherited(element.metadata(), target.effective_metadata());
                    let pragmas = inherited(element.pragmas(), target.effective_pragmas());
                    element
                        .bind_inherited_metadata(metadata, pragmas)
                        .map_err(|err| link_error(item, err))?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn element_info(item: &SchemaItem, metadata: Metadata) -> ElementInfo {
    let (pragmas, metadata): (Metadata, Metadata) = metadata
        .into_iter()
        .partition(|(key, _)| metadata::is_pragma(key));
    let type_arity = item.type_arity();
    ElementInfo {
        name: item.name().map(str::to_string),
        type_arity,
        data_arity: (item.item_type() != ItemType::Definition).then_some(type_arity),
        location: item.location().clone(),
        is_external: item.is_external(),
        metadata,
        pragmas,
    }
}

fn declares_own_parameters(item: &SchemaItem) -> bool {
    item.fundamental().is_some_and(|kind| {
        kind.parameter_names()
            .iter()
            .any(|key| item.metadata().contains_key(*key))
    })
}

fn placeholder(item: &SchemaItem) -> Rc<dyn TypeInfo> {
    let name = match item.reference() {
        Some(Reference::Unresolved(name)) => name.clone(),
        _ => display_name(item),
    };
    Rc::new(PlaceholderTypeInfo::new(name))
}

fn display_name(item: &SchemaItem) -> String {
    item.key().to_string()
}

fn invalid_link(item: &SchemaItem, reason: impl Into<String>) -> Diagnostic {
    Diagnostic::at(
        ErrorKind::InvalidLink {
            name: display_name(item),
            reason: reason.into(),
        },
        item.location(),
        "declared here",
    )
}

fn link_error(item: &SchemaItem, err: ElementError) -> Diagnostic {
    invalid_link(item, err.to_string())
}
