//! Immutable lowered schema elements.
//!
//! An [`Element`] is what code generators consume. Each element is one
//! variant of [`ElementKind`] over a common set of base fields. Elements are
//! shared through `Rc` and never mutated after construction, with one
//! exception: links that can only be known once the whole tree exists
//! (parent, reference targets, derived elements) live in `OnceCell`s and are
//! bound exactly once by the lowering pass.
//!
//! Parent, reference and derived links are `Weak`. Schemas may be recursive
//! (a compound containing a list of itself), so the [`ElementTree`] returned by
//! lowering owns every element and keeps the graph alive.

use std::{
    cell::OnceCell,
    fmt,
    rc::{Rc, Weak},
};

use thiserror::Error;

use crate::{
    arity::Arity,
    location::SourceLocation,
    typeinfo::TypeInfo,
    value::{Metadata, Value},
};

/// Metadata key marking a compound as polymorphic.
pub const POLYMORPHIC: &str = "polymorphic";
/// Metadata key opting a derived compound out of inherited polymorphism.
pub const SUPPRESS_POLYMORPHIC: &str = "suppress_polymorphic";

/// Errors raised when a write-once link is bound twice or on the wrong variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElementError {
    #[error("parent of `{name}` is already assigned")]
    ParentAlreadySet { name: String },

    #[error("reference of `{name}` is already bound")]
    ReferenceAlreadyBound { name: String },

    #[error("derived elements of `{name}` are already bound")]
    DerivedAlreadyBound { name: String },

    #[error("inherited metadata of `{name}` is already bound")]
    MetadataAlreadyBound { name: String },

    #[error("`{name}` is a {kind} element and has no {link}")]
    UnsupportedLink {
        name: String,
        kind: &'static str,
        link: &'static str,
    },
}

/// Base fields shared by every element variant.
#[derive(Debug, Clone, Default)]
pub struct ElementInfo {
    pub name: Option<String>,
    pub type_arity: Arity,
    /// `None` for definition-only elements, which describe a type but hold no data.
    pub data_arity: Option<Arity>,
    pub location: SourceLocation,
    pub is_external: bool,
    pub metadata: Metadata,
    pub pragmas: Metadata,
}

/// A fundamental value type.
#[derive(Debug)]
pub struct FundamentalElement {
    type_info: Rc<dyn TypeInfo>,
}

/// An object with named children, optionally deriving from a base compound.
#[derive(Debug)]
pub struct CompoundElement {
    children: Vec<Rc<Element>>,
    base: OnceCell<Weak<Element>>,
    derived: OnceCell<Vec<Weak<Element>>>,
    inherits_polymorphic: OnceCell<()>,
}

/// A fundamental value decorated with attributes.
#[derive(Debug)]
pub struct SimpleElement {
    type_info: Rc<dyn TypeInfo>,
    attributes: Vec<Rc<Element>>,
    base: OnceCell<Weak<Element>>,
}

/// Another name (and arity) for an existing type.
#[derive(Debug)]
pub struct AliasElement {
    reference: OnceCell<Weak<Element>>,
}

/// An existing type narrowed or extended with its own arity or metadata.
#[derive(Debug)]
pub struct AugmentedElement {
    reference: OnceCell<Weak<Element>>,
    type_info: Option<Rc<dyn TypeInfo>>,
    inherited_metadata: OnceCell<Metadata>,
    inherited_pragmas: OnceCell<Metadata>,
}

/// A syntactic extension invocation.
#[derive(Debug)]
pub struct ExtensionElement {
    positional: Vec<Value>,
    keyword: Metadata,
}

/// The variant-specific part of an [`Element`].
#[derive(Debug)]
pub enum ElementKind {
    Fundamental(FundamentalElement),
    Compound(CompoundElement),
    Simple(SimpleElement),
    Alias(AliasElement),
    Augmented(AugmentedElement),
    Extension(ExtensionElement),
}

impl ElementKind {
    pub fn fundamental(type_info: Rc<dyn TypeInfo>) -> Self {
        ElementKind::Fundamental(FundamentalElement { type_info })
    }

    pub fn compound(children: Vec<Rc<Element>>) -> Self {
        ElementKind::Compound(CompoundElement {
            children,
            base: OnceCell::new(),
            derived: OnceCell::new(),
            inherits_polymorphic: OnceCell::new(),
        })
    }

    pub fn simple(type_info: Rc<dyn TypeInfo>, attributes: Vec<Rc<Element>>) -> Self {
        ElementKind::Simple(SimpleElement {
            type_info,
            attributes,
            base: OnceCell::new(),
        })
    }

    pub fn alias() -> Self {
        ElementKind::Alias(AliasElement {
            reference: OnceCell::new(),
        })
    }

    pub fn augmented(type_info: Option<Rc<dyn TypeInfo>>) -> Self {
        ElementKind::Augmented(AugmentedElement {
            reference: OnceCell::new(),
            type_info,
            inherited_metadata: OnceCell::new(),
            inherited_pragmas: OnceCell::new(),
        })
    }

    pub fn extension(positional: Vec<Value>, keyword: Metadata) -> Self {
        ElementKind::Extension(ExtensionElement { positional, keyword })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Fundamental(_) => "fundamental",
            ElementKind::Compound(_) => "compound",
            ElementKind::Simple(_) => "simple",
            ElementKind::Alias(_) => "alias",
            ElementKind::Augmented(_) => "augmented",
            ElementKind::Extension(_) => "extension",
        }
    }
}

/// A lowered, immutable schema element.
#[derive(Debug)]
pub struct Element {
    info: ElementInfo,
    parent: OnceCell<Weak<Element>>,
    kind: ElementKind,
}

impl Element {
    pub fn new(info: ElementInfo, kind: ElementKind) -> Rc<Self> {
        Rc::new(Self {
            info,
            parent: OnceCell::new(),
            kind,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.info.name.as_deref()
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn type_arity(&self) -> Arity {
        self.info.type_arity
    }

    pub fn data_arity(&self) -> Option<Arity> {
        self.info.data_arity
    }

    /// Returns `true` for definition-only elements.
    pub fn is_definition(&self) -> bool {
        self.info.data_arity.is_none()
    }

    pub fn location(&self) -> &SourceLocation {
        &self.info.location
    }

    /// Declared in an included source rather than the primary one.
    pub fn is_external(&self) -> bool {
        self.info.is_external
    }

    /// Additional metadata declared on this element.
    pub fn metadata(&self) -> &Metadata {
        &self.info.metadata
    }

    /// Pragma metadata declared on this element.
    pub fn pragmas(&self) -> &Metadata {
        &self.info.pragmas
    }

    /// Look up additional metadata, falling back to metadata inherited from
    /// an augmented element's target.
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.info.metadata.get(key).or_else(|| match &self.kind {
            ElementKind::Augmented(aug) => aug.inherited_metadata.get()?.get(key),
            _ => None,
        })
    }

    /// Look up pragma metadata, falling back to inherited pragmas.
    pub fn pragma_value(&self, key: &str) -> Option<&Value> {
        self.info.pragmas.get(key).or_else(|| match &self.kind {
            ElementKind::Augmented(aug) => aug.inherited_pragmas.get()?.get(key),
            _ => None,
        })
    }

    /// Own additional metadata followed by inherited entries.
    pub fn effective_metadata(&self) -> Metadata {
        let mut metadata = self.info.metadata.clone();
        if let ElementKind::Augmented(aug) = &self.kind
            && let Some(inherited) = aug.inherited_metadata.get()
        {
            for (key, value) in inherited {
                metadata
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }
        metadata
    }

    /// Own pragmas followed by inherited entries.
    pub fn effective_pragmas(&self) -> Metadata {
        let mut pragmas = self.info.pragmas.clone();
        if let ElementKind::Augmented(aug) = &self.kind
            && let Some(inherited) = aug.inherited_pragmas.get()
        {
            for (key, value) in inherited {
                pragmas.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        pragmas
    }

    pub fn parent(&self) -> Option<Rc<Element>> {
        self.parent.get().and_then(Weak::upgrade)
    }

    /// Iterate over ancestors, nearest first.
    pub fn parents(&self) -> impl Iterator<Item = Rc<Element>> {
        std::iter::successors(self.parent(), |element| element.parent())
    }

    /// Names from the outermost ancestor down to this element, joined with `.`.
    pub fn dotted_name(&self) -> String {
        let mut names: Vec<String> = self
            .parents()
            .map(|p| p.name().unwrap_or("<unnamed>").to_string())
            .collect();
        names.reverse();
        names.push(self.name().unwrap_or("<unnamed>").to_string());
        names.join(".")
    }

    /// Child elements of compound and simple elements; empty otherwise.
    pub fn children(&self) -> &[Rc<Element>] {
        match &self.kind {
            ElementKind::Compound(compound) => &compound.children,
            ElementKind::Simple(simple) => &simple.attributes,
            _ => &[],
        }
    }

    pub fn type_info(&self) -> Option<&Rc<dyn TypeInfo>> {
        match &self.kind {
            ElementKind::Fundamental(f) => Some(&f.type_info),
            ElementKind::Simple(s) => Some(&s.type_info),
            ElementKind::Augmented(a) => a.type_info.as_ref(),
            _ => None,
        }
    }

    /// The referenced element: the target of an alias or augmentation, or the
    /// base of a compound or simple object.
    pub fn reference(&self) -> Option<Rc<Element>> {
        self.reference_cell()?.get().and_then(Weak::upgrade)
    }

    /// Follow alias and augmentation references to the defining element.
    pub fn resolve(self: &Rc<Self>) -> Rc<Element> {
        let mut current = Rc::clone(self);
        while matches!(
            current.kind,
            ElementKind::Alias(_) | ElementKind::Augmented(_)
        ) {
            match current.reference() {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    /// Compound elements registered as deriving from this one.
    pub fn derived_elements(&self) -> Vec<Rc<Element>> {
        match &self.kind {
            ElementKind::Compound(compound) => compound
                .derived
                .get()
                .map(|derived| derived.iter().filter_map(Weak::upgrade).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// A compound is polymorphic when marked so, or when it derives from a
    /// polymorphic compound and does not suppress it.
    ///
    /// Derived compounds carry no `polymorphic` metadata of their own, so this
    /// is the query to use for inherited polymorphism.
    pub fn is_polymorphic(&self) -> bool {
        match &self.kind {
            ElementKind::Compound(compound) => {
                self.flag(POLYMORPHIC) || compound.inherits_polymorphic.get().is_some()
            }
            _ => false,
        }
    }

    pub fn suppresses_polymorphic(&self) -> bool {
        self.flag(SUPPRESS_POLYMORPHIC)
    }

    pub fn positional_arguments(&self) -> &[Value] {
        match &self.kind {
            ElementKind::Extension(ext) => &ext.positional,
            _ => &[],
        }
    }

    pub fn keyword_arguments(&self) -> Option<&Metadata> {
        match &self.kind {
            ElementKind::Extension(ext) => Some(&ext.keyword),
            _ => None,
        }
    }

    /// Assign the parent link. Fails when a parent was already assigned.
    pub fn set_parent(&self, parent: &Rc<Element>) -> Result<(), ElementError> {
        self.parent
            .set(Rc::downgrade(parent))
            .map_err(|_| ElementError::ParentAlreadySet {
                name: self.display_name(),
            })
    }

    /// Bind the reference (or base) link.
    pub fn bind_reference(&self, target: &Rc<Element>) -> Result<(), ElementError> {
        let cell = self.reference_cell().ok_or_else(|| self.unsupported("reference"))?;
        cell.set(Rc::downgrade(target))
            .map_err(|_| ElementError::ReferenceAlreadyBound {
                name: self.display_name(),
            })
    }

    /// Bind the list of derived compounds.
    pub fn bind_derived(&self, derived: &[Rc<Element>]) -> Result<(), ElementError> {
        match &self.kind {
            ElementKind::Compound(compound) => compound
                .derived
                .set(derived.iter().map(Rc::downgrade).collect())
                .map_err(|_| ElementError::DerivedAlreadyBound {
                    name: self.display_name(),
                }),
            _ => Err(self.unsupported("derived elements")),
        }
    }

    /// Record that this compound inherits polymorphism from its base.
    pub fn inherit_polymorphic(&self) -> Result<(), ElementError> {
        match &self.kind {
            ElementKind::Compound(compound) => {
                // Repeated propagation is harmless; the flag only ever turns on.
                let _ = compound.inherits_polymorphic.set(());
                Ok(())
            }
            _ => Err(self.unsupported("polymorphism")),
        }
    }

    /// Bind metadata and pragmas inherited by an augmented element.
    pub fn bind_inherited_metadata(
        &self,
        metadata: Metadata,
        pragmas: Metadata,
    ) -> Result<(), ElementError> {
        match &self.kind {
            ElementKind::Augmented(aug) => {
                let already = || ElementError::MetadataAlreadyBound {
                    name: self.display_name(),
                };
                aug.inherited_metadata.set(metadata).map_err(|_| already())?;
                aug.inherited_pragmas.set(pragmas).map_err(|_| already())
            }
            _ => Err(self.unsupported("inherited metadata")),
        }
    }

    fn reference_cell(&self) -> Option<&OnceCell<Weak<Element>>> {
        match &self.kind {
            ElementKind::Compound(compound) => Some(&compound.base),
            ElementKind::Simple(simple) => Some(&simple.base),
            ElementKind::Alias(alias) => Some(&alias.reference),
            ElementKind::Augmented(aug) => Some(&aug.reference),
            ElementKind::Fundamental(_) | ElementKind::Extension(_) => None,
        }
    }

    fn flag(&self, key: &str) -> bool {
        self.metadata_value(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn display_name(&self) -> String {
        self.name().unwrap_or("<unnamed>").to_string()
    }

    fn unsupported(&self, link: &'static str) -> ElementError {
        ElementError::UnsupportedLink {
            name: self.display_name(),
            kind: self.kind.name(),
            link,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.dotted_name(), self.type_arity())
    }
}

/// The result of lowering: top-level elements plus ownership of every element
/// reachable through weak links.
#[derive(Debug, Default)]
pub struct ElementTree {
    roots: Vec<Rc<Element>>,
    elements: Vec<Rc<Element>>,
}

impl ElementTree {
    pub fn new(roots: Vec<Rc<Element>>, elements: Vec<Rc<Element>>) -> Self {
        Self { roots, elements }
    }

    /// Top-level elements in declaration order.
    pub fn roots(&self) -> &[Rc<Element>] {
        &self.roots
    }

    /// Every element produced by lowering, in construction order.
    pub fn elements(&self) -> &[Rc<Element>] {
        &self.elements
    }

    /// Find an element by its dotted name.
    pub fn find(&self, dotted_name: &str) -> Option<&Rc<Element>> {
        self.elements
            .iter()
            .find(|element| element.dotted_name() == dotted_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeinfo::BooleanTypeInfo;

    fn named(name: &str) -> ElementInfo {
        ElementInfo {
            name: Some(name.to_string()),
            data_arity: Some(Arity::single()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parent_is_assigned_once() {
        let child = Element::new(named("child"), ElementKind::fundamental(Rc::new(BooleanTypeInfo)));
        let parent = Element::new(named("parent"), ElementKind::compound(vec![Rc::clone(&child)]));

        child.set_parent(&parent).unwrap();
        assert_eq!(child.dotted_name(), "parent.child");
        assert_eq!(
            child.set_parent(&parent),
            Err(ElementError::ParentAlreadySet {
                name: "child".to_string()
            })
        );
    }

    #[test]
    fn test_resolve_follows_aliases() {
        let target = Element::new(named("flag"), ElementKind::fundamental(Rc::new(BooleanTypeInfo)));
        let alias = Element::new(named("a"), ElementKind::alias());
        let alias2 = Element::new(named("b"), ElementKind::alias());
        alias.bind_reference(&target).unwrap();
        alias2.bind_reference(&alias).unwrap();

        assert!(Rc::ptr_eq(&alias2.resolve(), &target));
        assert!(alias.bind_reference(&target).is_err());
    }

    #[test]
    fn test_fundamental_has_no_reference() {
        let target = Element::new(named("flag"), ElementKind::fundamental(Rc::new(BooleanTypeInfo)));
        assert!(matches!(
            target.bind_reference(&target),
            Err(ElementError::UnsupportedLink { kind: "fundamental", .. })
        ));
    }

    #[test]
    fn test_augmented_metadata_falls_back_to_inherited() {
        let mut info = named("aug");
        info.metadata.insert("description".into(), Value::from("own"));
        let aug = Element::new(info, ElementKind::augmented(None));

        let mut inherited = Metadata::new();
        inherited.insert("description".into(), Value::from("target"));
        inherited.insert("plural".into(), Value::from("things"));
        aug.bind_inherited_metadata(inherited, Metadata::new()).unwrap();

        assert_eq!(aug.metadata_value("description"), Some(&Value::from("own")));
        assert_eq!(aug.metadata_value("plural"), Some(&Value::from("things")));
        let keys: Vec<_> = aug.effective_metadata().keys().cloned().collect();
        assert_eq!(keys, vec!["description", "plural"]);
    }

    #[test]
    fn test_inherited_polymorphism() {
        let derived = Element::new(named("derived"), ElementKind::compound(Vec::new()));
        assert!(!derived.is_polymorphic());
        derived.inherit_polymorphic().unwrap();
        derived.inherit_polymorphic().unwrap();
        assert!(derived.is_polymorphic());
    }
}
