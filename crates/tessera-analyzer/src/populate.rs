//! Raw declaration trees handed over by a front end.
//!
//! A front end (grammar, lexer and tree builder) turns schema source text into
//! a tree of [`RawItem`]s. Items are unclassified at this point: each only
//! carries the grammar production it came from as a [`DeclarationTag`].

use tessera_core::{
    arity::Arity,
    location::SourceLocation,
    typeinfo::FundamentalKind,
    value::{Metadata, Value},
};

/// The grammar production a declaration was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationTag {
    /// A built-in fundamental type such as `string` or `int`.
    Fundamental(FundamentalKind),
    /// An object with a body of children, optionally based on a reference.
    Object,
    /// A syntactic extension invocation.
    Extension,
    /// A reference to another declaration.
    Reference,
}

/// Role of an item within its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemType {
    /// A regular data member.
    #[default]
    Standard,
    /// An attribute of a simple object.
    Attribute,
    /// A type definition that holds no data.
    Definition,
}

/// An unclassified declaration node.
#[derive(Debug, Clone)]
pub struct RawItem {
    pub(crate) item_type: ItemType,
    pub(crate) name: Option<String>,
    pub(crate) tag: DeclarationTag,
    pub(crate) reference: Option<String>,
    pub(crate) metadata: Vec<(String, Value)>,
    pub(crate) arity: Option<Arity>,
    pub(crate) children: Vec<RawItem>,
    pub(crate) positional_arguments: Vec<Value>,
    pub(crate) keyword_arguments: Metadata,
    pub(crate) location: SourceLocation,
    pub(crate) is_external: bool,
}

impl RawItem {
    fn new(tag: DeclarationTag, name: Option<String>) -> Self {
        Self {
            item_type: ItemType::Standard,
            name,
            tag,
            reference: None,
            metadata: Vec::new(),
            arity: None,
            children: Vec::new(),
            positional_arguments: Vec::new(),
            keyword_arguments: Metadata::new(),
            location: SourceLocation::default(),
            is_external: false,
        }
    }

    /// A declaration of a built-in fundamental type.
    pub fn fundamental(name: impl Into<String>, kind: FundamentalKind) -> Self {
        Self::new(DeclarationTag::Fundamental(kind), Some(name.into()))
    }

    /// An object declaration; add a base with [`RawItem::with_reference`].
    pub fn object(name: impl Into<String>) -> Self {
        Self::new(DeclarationTag::Object, Some(name.into()))
    }

    /// A declaration referring to another declaration by (dotted) name.
    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(DeclarationTag::Reference, Some(name.into())).with_reference(target)
    }

    /// An extension invocation, such as an `include` statement.
    pub fn extension(name: impl Into<String>) -> Self {
        Self::new(DeclarationTag::Extension, Some(name.into()))
    }

    /// Remove the name, producing an unnamed declaration.
    pub fn unnamed(mut self) -> Self {
        self.name = None;
        self
    }

    pub fn with_item_type(mut self, item_type: ItemType) -> Self {
        self.item_type = item_type;
        self
    }

    /// Shorthand for `with_item_type(ItemType::Attribute)`.
    pub fn attribute(self) -> Self {
        self.with_item_type(ItemType::Attribute)
    }

    /// Shorthand for `with_item_type(ItemType::Definition)`.
    pub fn definition(self) -> Self {
        self.with_item_type(ItemType::Definition)
    }

    pub fn with_reference(mut self, target: impl Into<String>) -> Self {
        self.reference = Some(target.into());
        self
    }

    /// Append a metadata entry. Repeated keys are kept and rejected later.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    pub fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn with_child(mut self, child: RawItem) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = RawItem>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_positional_argument(mut self, value: impl Into<Value>) -> Self {
        self.positional_arguments.push(value.into());
        self
    }

    pub fn with_keyword_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword_arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    /// Mark the declaration as coming from an included source.
    pub fn external(mut self) -> Self {
        self.is_external = true;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn tag(&self) -> DeclarationTag {
        self.tag
    }

    pub fn children(&self) -> &[RawItem] {
        &self.children
    }
}
