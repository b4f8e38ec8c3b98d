//! Immutable validated schema, the input of lowering.
//!
//! A [`Schema`] is produced by [`ItemTree::finalize`](crate::item::ItemTree::finalize)
//! once every item is classified and its metadata resolved. Unlike
//! [`Item`](crate::item::Item), a [`SchemaItem`] has no optional commit
//! state and no mutators.

use tessera_core::{
    arity::Arity,
    location::SourceLocation,
    typeinfo::FundamentalKind,
    value::{Metadata, Value},
};

use crate::{
    item::{ItemId, ItemKey, Reference, Subtype},
    populate::ItemType,
};

/// A classified, metadata-complete declaration.
#[derive(Debug, Clone)]
pub struct SchemaItem {
    pub(crate) id: ItemId,
    pub(crate) item_type: ItemType,
    pub(crate) parent: Option<ItemId>,
    pub(crate) name: Option<String>,
    pub(crate) reference: Option<Reference>,
    pub(crate) metadata: Metadata,
    pub(crate) arity: Option<Arity>,
    pub(crate) type_arity: Arity,
    pub(crate) children: Vec<ItemId>,
    pub(crate) positional_arguments: Vec<Value>,
    pub(crate) keyword_arguments: Metadata,
    pub(crate) referenced_by: Vec<ItemId>,
    pub(crate) location: SourceLocation,
    pub(crate) is_external: bool,
    pub(crate) key: ItemKey,
    pub(crate) subtype: Subtype,
    pub(crate) is_new_type: bool,
    pub(crate) fundamental: Option<FundamentalKind>,
    pub(crate) allows_duplicates: bool,
}

impl SchemaItem {
    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    /// Parent item; `None` for top-level declarations.
    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn reference(&self) -> Option<&Reference> {
        self.reference.as_ref()
    }

    pub fn target(&self) -> Option<ItemId> {
        match self.reference {
            Some(Reference::Resolved(id)) => Some(id),
            _ => None,
        }
    }

    /// Resolved metadata, including defaults and configuration overrides.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The explicitly declared arity.
    pub fn arity(&self) -> Option<Arity> {
        self.arity
    }

    /// Declared arity, or the arity inherited through an alias chain.
    pub fn type_arity(&self) -> Arity {
        self.type_arity
    }

    pub fn children(&self) -> &[ItemId] {
        &self.children
    }

    pub fn positional_arguments(&self) -> &[Value] {
        &self.positional_arguments
    }

    pub fn keyword_arguments(&self) -> &Metadata {
        &self.keyword_arguments
    }

    pub fn referenced_by(&self) -> &[ItemId] {
        &self.referenced_by
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn is_external(&self) -> bool {
        self.is_external
    }

    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    pub fn subtype(&self) -> Subtype {
        self.subtype
    }

    pub fn is_new_type(&self) -> bool {
        self.is_new_type
    }

    pub fn fundamental(&self) -> Option<FundamentalKind> {
        self.fundamental
    }

    /// Items sharing a key lower to one element, except repeatable extensions.
    pub fn is_cacheable(&self) -> bool {
        !(self.subtype == Subtype::Extension && self.allows_duplicates)
    }
}

/// The validated declaration tree.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    roots: Vec<ItemId>,
    /// Items indexed by `ItemId - 1`; the synthetic root is not stored.
    items: Vec<SchemaItem>,
}

impl Schema {
    pub(crate) fn new(roots: Vec<ItemId>, items: Vec<SchemaItem>) -> Self {
        Self { roots, items }
    }

    /// Top-level declarations.
    pub fn roots(&self) -> &[ItemId] {
        &self.roots
    }

    pub fn get(&self, id: ItemId) -> &SchemaItem {
        &self.items[id.0 - 1]
    }

    /// Every item in pre-order.
    pub fn items(&self) -> &[SchemaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find an item by dotted key.
    pub fn find(&self, key: &str) -> Option<&SchemaItem> {
        self.items.iter().find(|item| item.key.to_string() == key)
    }

    /// Resolved references starting after `id`, nearest first.
    pub fn reference_chain(&self, id: ItemId) -> impl Iterator<Item = ItemId> + '_ {
        let mut remaining = self.items.len();
        std::iter::successors(self.get(id).target(), move |&current| {
            remaining = remaining.checked_sub(1)?;
            self.get(current).target().filter(|&next| next != id)
        })
    }

    /// Follow references to the first item that is not an alias or
    /// augmentation.
    pub fn resolve(&self, id: ItemId) -> &SchemaItem {
        let mut current = self.get(id);
        for _ in 0..self.items.len() {
            match current.target() {
                Some(target) if current.subtype.is_reference() => current = self.get(target),
                _ => break,
            }
        }
        current
    }
}
