//! Mutable declaration items used while validating.
//!
//! The [`ItemTree`] is an arena of [`Item`]s addressed by [`ItemId`], with a
//! synthetic root at index 0 whose children are the top-level declarations.
//! Ids are assigned in pre-order, so iterating ids in order visits parents
//! before children and siblings in declaration order.
//!
//! Items are mutable until they are committed. Commit assigns the subtype, the
//! key and the new-type flag, and consumes the declaration tag; after that
//! every mutator fails with [`ErrorKind::AlreadyCommitted`]. Metadata
//! resolution is the one step that runs after commit, and it may run once.
//! Once validation is done, [`ItemTree::finalize`] converts the arena into an
//! immutable [`Schema`].

use std::fmt;

use log::trace;

use tessera_core::{
    arity::Arity,
    location::SourceLocation,
    typeinfo::FundamentalKind,
    value::{Metadata, Value},
};

use crate::{
    error::{Diagnostic, ErrorKind, Result},
    populate::{DeclarationTag, ItemType, RawItem},
    schema::{Schema, SchemaItem},
};

/// Index of an item in its [`ItemTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub(crate) usize);

impl ItemId {
    /// The synthetic root.
    pub const ROOT: ItemId = ItemId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// A reference to another item, by name until resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Unresolved(String),
    Resolved(ItemId),
}

/// The classification assigned to an item at commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subtype {
    Extension,
    Compound,
    Simple,
    Fundamental,
    Alias,
    Augmented,
}

impl Subtype {
    pub fn name(&self) -> &'static str {
        match self {
            Subtype::Extension => "extension",
            Subtype::Compound => "compound",
            Subtype::Simple => "simple",
            Subtype::Fundamental => "fundamental",
            Subtype::Alias => "alias",
            Subtype::Augmented => "augmented",
        }
    }

    /// Alias and augmented items describe an existing type.
    pub fn is_reference(&self) -> bool {
        matches!(self, Subtype::Alias | Subtype::Augmented)
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Identity of a committed item: the names from the outermost ancestor down to
/// the item itself. Unnamed items contribute `<index>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey(Vec<String>);

impl ItemKey {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// State assigned exactly once, at commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed {
    pub key: ItemKey,
    pub subtype: Subtype,
    pub is_new_type: bool,
    /// Fundamental kind of the item, or of the fundamental its reference chain
    /// reaches. `None` for objects without one and for unresolved placeholders.
    pub fundamental: Option<FundamentalKind>,
    /// Extension invocation that may repeat at the root scope.
    pub allows_duplicates: bool,
}

/// One declaration or attribute.
#[derive(Debug, Clone)]
pub struct Item {
    item_type: ItemType,
    parent: Option<ItemId>,
    name: Option<String>,
    tag: Option<DeclarationTag>,
    reference: Option<Reference>,
    metadata: Metadata,
    arity: Option<Arity>,
    children: Vec<ItemId>,
    positional_arguments: Vec<Value>,
    keyword_arguments: Metadata,
    referenced_by: Vec<ItemId>,
    location: SourceLocation,
    is_external: bool,
    committed: Option<Committed>,
    metadata_resolved: bool,
}

impl Item {
    fn root() -> Self {
        Self {
            item_type: ItemType::Standard,
            parent: None,
            name: None,
            tag: None,
            reference: None,
            metadata: Metadata::new(),
            arity: None,
            children: Vec::new(),
            positional_arguments: Vec::new(),
            keyword_arguments: Metadata::new(),
            referenced_by: Vec::new(),
            location: SourceLocation::default(),
            is_external: false,
            committed: None,
            metadata_resolved: false,
        }
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The raw declaration tag; `None` once committed.
    pub fn tag(&self) -> Option<DeclarationTag> {
        self.tag
    }

    pub fn reference(&self) -> Option<&Reference> {
        self.reference.as_ref()
    }

    /// The resolved reference target, if any.
    pub fn target(&self) -> Option<ItemId> {
        match self.reference {
            Some(Reference::Resolved(id)) => Some(id),
            _ => None,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The explicitly declared arity.
    pub fn arity(&self) -> Option<Arity> {
        self.arity
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

    /// Items whose reference resolved to this item, in resolution order.
    pub fn referenced_by(&self) -> &[ItemId] {
        &self.referenced_by
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn is_external(&self) -> bool {
        self.is_external
    }

    pub fn committed(&self) -> Option<&Committed> {
        self.committed.as_ref()
    }

    pub fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    pub fn subtype(&self) -> Option<Subtype> {
        self.committed.as_ref().map(|c| c.subtype)
    }

    pub fn key(&self) -> Option<&ItemKey> {
        self.committed.as_ref().map(|c| &c.key)
    }

    pub fn is_metadata_resolved(&self) -> bool {
        self.metadata_resolved
    }

    /// Name used in error messages.
    pub fn display_name(&self) -> String {
        match (&self.committed, &self.name) {
            (Some(committed), _) => committed.key.to_string(),
            (None, Some(name)) => name.clone(),
            (None, None) => "<unnamed>".to_string(),
        }
    }
}

/// Arena of items with a synthetic root.
#[derive(Debug, Clone)]
pub struct ItemTree {
    items: Vec<Item>,
}

impl ItemTree {
    /// Build the arena from the front end's top-level declarations.
    ///
    /// Fails when a declaration repeats a metadata key.
    pub fn from_raw(roots: Vec<RawItem>) -> Result<Self> {
        let mut tree = Self {
            items: vec![Item::root()],
        };
        for raw in roots {
            let id = tree.insert(raw, ItemId::ROOT)?;
            tree.items[0].children.push(id);
        }
        trace!(items = tree.items.len() - 1; "Built item tree");
        Ok(tree)
    }

    fn insert(&mut self, raw: RawItem, parent: ItemId) -> Result<ItemId> {
        let RawItem {
            item_type,
            name,
            tag,
            reference,
            metadata: raw_metadata,
            arity,
            children,
            positional_arguments,
            keyword_arguments,
            location,
            is_external,
        } = raw;

        let mut metadata = Metadata::new();
        for (key, value) in raw_metadata {
            if metadata.contains_key(&key) {
                return Err(Diagnostic::at(
                    ErrorKind::DuplicateMetadata {
                        name: name.clone().unwrap_or_else(|| "<unnamed>".to_string()),
                        key,
                    },
                    &location,
                    "metadata repeated here",
                ));
            }
            metadata.insert(key, value);
        }

        let id = ItemId(self.items.len());
        self.items.push(Item {
            item_type,
            parent: Some(parent),
            name,
            tag: Some(tag),
            reference: reference.map(Reference::Unresolved),
            metadata,
            arity,
            children: Vec::new(),
            positional_arguments,
            keyword_arguments,
            referenced_by: Vec::new(),
            location,
            is_external,
            committed: None,
            metadata_resolved: false,
        });

        for child in children {
            let child_id = self.insert(child, id)?;
            self.items[id.0].children.push(child_id);
        }
        Ok(id)
    }

    pub fn get(&self, id: ItemId) -> &Item {
        &self.items[id.0]
    }

    /// Top-level declarations.
    pub fn roots(&self) -> &[ItemId] {
        &self.items[0].children
    }

    /// Every item except the synthetic root, in pre-order.
    pub fn ids(&self) -> impl Iterator<Item = ItemId> + use<> {
        (1..self.items.len()).map(ItemId)
    }

    /// Number of items, excluding the synthetic root.
    pub fn len(&self) -> usize {
        self.items.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ancestors of an item, nearest first, excluding the synthetic root.
    pub fn ancestors(&self, id: ItemId) -> impl Iterator<Item = ItemId> + '_ {
        std::iter::successors(self.get(id).parent, |&p| self.get(p).parent)
            .filter(|&p| p != ItemId::ROOT)
    }

    /// Is the item a direct child of the synthetic root?
    pub fn is_root_item(&self, id: ItemId) -> bool {
        self.get(id).parent == Some(ItemId::ROOT)
    }

    /// Follow resolved references starting after `id`. Stops on a revisit so it
    /// terminates on cyclic input.
    pub fn reference_chain(&self, id: ItemId) -> impl Iterator<Item = ItemId> + '_ {
        let mut remaining = self.items.len();
        std::iter::successors(self.get(id).target(), move |&current| {
            remaining = remaining.checked_sub(1)?;
            self.get(current).target().filter(|&next| next != id)
        })
    }

    /// Compute the key of an item from its position in the tree.
    pub fn compute_key(&self, id: ItemId) -> ItemKey {
        let mut path: Vec<ItemId> = self.ancestors(id).collect();
        path.reverse();
        path.push(id);
        let segments = path
            .into_iter()
            .map(|item_id| {
                let item = self.get(item_id);
                match &item.name {
                    Some(name) => name.clone(),
                    None => {
                        let parent = item.parent.unwrap_or(ItemId::ROOT);
                        let index = self
                            .get(parent)
                            .children
                            .iter()
                            .position(|&c| c == item_id)
                            .unwrap_or_default();
                        format!("<{index}>")
                    }
                }
            })
            .collect();
        ItemKey(segments)
    }

    /// Type arity of a committed item: the declared arity, else the target's
    /// for aliases and augmentations that do not define a new type, else single.
    pub fn effective_arity(&self, id: ItemId) -> Arity {
        let mut current = id;
        for _ in 0..self.items.len() {
            let item = self.get(current);
            if let Some(arity) = item.arity {
                return arity;
            }
            let Some(committed) = &item.committed else {
                return Arity::single();
            };
            let inherits = match committed.subtype {
                Subtype::Alias => true,
                Subtype::Augmented => !committed.is_new_type,
                _ => false,
            };
            match item.target() {
                Some(target) if inherits => current = target,
                _ => return Arity::single(),
            }
        }
        Arity::single()
    }

    // ========================================================================
    // Mutators
    // ========================================================================

    fn ensure_uncommitted(&self, id: ItemId) -> Result<()> {
        let item = self.get(id);
        if item.is_committed() {
            return Err(Diagnostic::at(
                ErrorKind::AlreadyCommitted {
                    name: item.display_name(),
                },
                &item.location,
                "modified after commit",
            ));
        }
        Ok(())
    }

    pub fn set_reference(&mut self, id: ItemId, reference: Reference) -> Result<()> {
        self.ensure_uncommitted(id)?;
        self.items[id.0].reference = Some(reference);
        Ok(())
    }

    pub fn push_referenced_by(&mut self, target: ItemId, referrer: ItemId) -> Result<()> {
        self.ensure_uncommitted(target)?;
        self.items[target.0].referenced_by.push(referrer);
        Ok(())
    }

    /// Assign the commit state and consume the declaration tag.
    pub fn commit(&mut self, id: ItemId, committed: Committed) -> Result<()> {
        self.ensure_uncommitted(id)?;
        let item = &mut self.items[id.0];
        item.tag.take();
        trace!(key:% = committed.key, subtype:% = committed.subtype; "Committed item");
        item.committed = Some(committed);
        Ok(())
    }

    /// Replace the raw metadata with the resolved metadata.
    pub fn set_resolved_metadata(&mut self, id: ItemId, metadata: Metadata) -> Result<()> {
        let item = self.get(id);
        if !item.is_committed() {
            return Err(Diagnostic::at(
                ErrorKind::NotCommitted {
                    name: item.display_name(),
                },
                &item.location,
                "metadata resolved before commit",
            ));
        }
        if item.metadata_resolved {
            return Err(Diagnostic::at(
                ErrorKind::AlreadyCommitted {
                    name: item.display_name(),
                },
                &item.location,
                "metadata already resolved",
            ));
        }
        let item = &mut self.items[id.0];
        item.metadata = metadata;
        item.metadata_resolved = true;
        Ok(())
    }

    /// Convert the validated arena into an immutable schema.
    ///
    /// Fails when an item was never committed.
    pub fn finalize(self) -> Result<Schema> {
        let type_arities: Vec<Arity> = (0..self.items.len())
            .map(|idx| self.effective_arity(ItemId(idx)))
            .collect();

        let mut items = self.items.into_iter().zip(type_arities).enumerate();
        let Some((_, (root, _))) = items.next() else {
            return Ok(Schema::new(Vec::new(), Vec::new()));
        };

        let schema_items = items
            .map(|(idx, (item, type_arity))| {
                let Some(committed) = item.committed else {
                    return Err(Diagnostic::at(
                        ErrorKind::NotCommitted {
                            name: item.name.unwrap_or_else(|| format!("<{idx}>")),
                        },
                        &item.location,
                        "never classified",
                    ));
                };
                Ok(SchemaItem {
                    id: ItemId(idx),
                    item_type: item.item_type,
                    parent: item.parent.filter(|&p| p != ItemId::ROOT),
                    name: item.name,
                    reference: item.reference,
                    metadata: item.metadata,
                    arity: item.arity,
                    type_arity,
                    children: item.children,
                    positional_arguments: item.positional_arguments,
                    keyword_arguments: item.keyword_arguments,
                    referenced_by: item.referenced_by,
                    location: item.location,
                    is_external: item.is_external,
                    key: committed.key,
                    subtype: committed.subtype,
                    is_new_type: committed.is_new_type,
                    fundamental: committed.fundamental,
                    allows_duplicates: committed.allows_duplicates,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Schema::new(root.children, schema_items))
    }
}
