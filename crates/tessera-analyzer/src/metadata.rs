//! Declarative metadata schema.
//!
//! Each kind of declaration accepts a set of metadata keys. A
//! [`MetadataDescriptor`] names a key, the [`TypeInfo`] its value is coerced
//! with, whether it is required, its default, and whether giving it turns a
//! reference into a new type. Descriptors are grouped into [`MetadataSet`]s
//! which metadata resolution merges per item.

use std::{fmt, rc::Rc};

use indexmap::IndexMap;

use tessera_core::{
    arity::Arity,
    element::{POLYMORPHIC, SUPPRESS_POLYMORPHIC},
    typeinfo::{
        self, AnyTypeInfo, BooleanTypeInfo, EnumTypeInfo, FilenameKind, FundamentalKind,
        IntegerTypeInfo, ListTypeInfo, NumberTypeInfo, StringTypeInfo, TypeInfo,
    },
    value::{Metadata, Value},
};

/// Keys starting with this prefix pass through resolution untyped.
pub const PRAGMA_PREFIX: &str = "pragma-";

pub const DESCRIPTION: &str = "description";
pub const PLURAL: &str = "plural";
pub const DEFAULT: &str = "default";

/// Returns `true` for pragma keys.
pub fn is_pragma(key: &str) -> bool {
    key.starts_with(PRAGMA_PREFIX)
}

/// What a computed default can see of the item it is computed for.
#[derive(Debug, Clone, Copy)]
pub struct ItemContext<'a> {
    pub name: Option<&'a str>,
    pub arity: Arity,
}

/// Default value of a descriptor.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    Computed(fn(&ItemContext<'_>) -> Option<Value>),
}

impl DefaultValue {
    pub fn evaluate(&self, context: &ItemContext<'_>) -> Option<Value> {
        match self {
            DefaultValue::Literal(value) => Some(value.clone()),
            DefaultValue::Computed(compute) => compute(context),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Computed(_) => f.write_str("Computed"),
        }
    }
}

/// One accepted metadata key.
#[derive(Debug, Clone)]
pub struct MetadataDescriptor {
    name: &'static str,
    type_info: Rc<dyn TypeInfo>,
    default: Option<DefaultValue>,
    required: bool,
    is_new_type: bool,
}

impl MetadataDescriptor {
    pub fn optional(name: &'static str, type_info: impl TypeInfo + 'static) -> Self {
        Self {
            name,
            type_info: Rc::new(type_info),
            default: None,
            required: false,
            is_new_type: false,
        }
    }

    pub fn required(name: &'static str, type_info: impl TypeInfo + 'static) -> Self {
        Self {
            required: true,
            ..Self::optional(name, type_info)
        }
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Giving this key on a reference declares a new type.
    pub fn new_type(mut self) -> Self {
        self.is_new_type = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_info(&self) -> &dyn TypeInfo {
        self.type_info.as_ref()
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_new_type(&self) -> bool {
        self.is_new_type
    }
}

/// An ordered collection of descriptors, indexed by key.
#[derive(Debug, Clone, Default)]
pub struct MetadataSet {
    descriptors: IndexMap<&'static str, MetadataDescriptor>,
}

impl MetadataSet {
    pub fn new(descriptors: impl IntoIterator<Item = MetadataDescriptor>) -> Self {
        Self {
            descriptors: descriptors.into_iter().map(|d| (d.name, d)).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetadataDescriptor> {
        self.descriptors.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.descriptors.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataDescriptor> {
        self.descriptors.values()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Add the descriptors of `other`. Existing keys keep their descriptor.
    pub fn merge(mut self, other: MetadataSet) -> Self {
        for (name, descriptor) in other.descriptors {
            self.descriptors.entry(name).or_insert(descriptor);
        }
        self
    }

    /// The same keys, none required and without defaults. Used for keys a
    /// reference may override on the type it refers to.
    pub fn relaxed(self) -> Self {
        Self {
            descriptors: self
                .descriptors
                .into_iter()
                .map(|(name, mut descriptor)| {
                    descriptor.required = false;
                    descriptor.default = None;
                    (name, descriptor)
                })
                .collect(),
        }
    }
}

// ============================================================================
// Sets
// ============================================================================

/// Keys accepted by every declaration.
pub fn universal() -> MetadataSet {
    MetadataSet::new([MetadataDescriptor::optional(
        DESCRIPTION,
        StringTypeInfo::unconstrained(),
    )])
}

/// Keys accepted by compound objects.
pub fn compound() -> MetadataSet {
    MetadataSet::new([
        MetadataDescriptor::optional(POLYMORPHIC, BooleanTypeInfo)
            .with_default(DefaultValue::Literal(Value::Bool(false))),
        MetadataDescriptor::optional(SUPPRESS_POLYMORPHIC, BooleanTypeInfo)
            .with_default(DefaultValue::Literal(Value::Bool(false))),
    ])
}

/// Keys accepted by declarations that may hold more than one value.
pub fn collection() -> MetadataSet {
    MetadataSet::new([
        MetadataDescriptor::optional(PLURAL, StringTypeInfo::unconstrained())
            .with_default(DefaultValue::Computed(|context| {
                context.name.map(|name| Value::Str(pluralize(name)))
            })),
    ])
}

/// Keys accepted by optional declarations.
pub fn optional() -> MetadataSet {
    MetadataSet::new([MetadataDescriptor::optional(DEFAULT, AnyTypeInfo)])
}

/// Keys accepted because of an item's arity.
pub fn for_arity(arity: Arity) -> MetadataSet {
    let mut set = MetadataSet::default();
    if arity.is_collection() {
        set = set.merge(collection());
    }
    if arity.is_optional() {
        set = set.merge(optional());
    }
    set
}

/// Keys configuring a fundamental kind. All of them declare a new type when
/// given on a reference.
pub fn fundamental(kind: FundamentalKind) -> MetadataSet {
    let descriptors = match kind {
        FundamentalKind::String => vec![
            MetadataDescriptor::optional(
                typeinfo::VALIDATION_EXPRESSION,
                StringTypeInfo::unconstrained(),
            ),
            MetadataDescriptor::optional(typeinfo::MIN_LENGTH, IntegerTypeInfo::unbounded(true)),
            MetadataDescriptor::optional(typeinfo::MAX_LENGTH, IntegerTypeInfo::unbounded(true)),
        ],
        FundamentalKind::Enum => vec![
            MetadataDescriptor::required(
                typeinfo::VALUES,
                ListTypeInfo::new(StringTypeInfo::unconstrained()),
            ),
            MetadataDescriptor::optional(
                typeinfo::FRIENDLY_VALUES,
                ListTypeInfo::new(StringTypeInfo::unconstrained()),
            ),
        ],
        FundamentalKind::Integer => vec![
            MetadataDescriptor::optional(typeinfo::MIN, IntegerTypeInfo::unbounded(false)),
            MetadataDescriptor::optional(typeinfo::MAX, IntegerTypeInfo::unbounded(false)),
            MetadataDescriptor::optional(typeinfo::BYTES, IntegerTypeInfo::unbounded(true)),
        ],
        FundamentalKind::Number => vec![
            MetadataDescriptor::optional(typeinfo::MIN, NumberTypeInfo::unbounded()),
            MetadataDescriptor::optional(typeinfo::MAX, NumberTypeInfo::unbounded()),
            MetadataDescriptor::optional(typeinfo::BITS, IntegerTypeInfo::unbounded(true)),
        ],
        FundamentalKind::Boolean => Vec::new(),
        FundamentalKind::Filename => vec![
            MetadataDescriptor::optional(
                typeinfo::FILENAME_TYPE,
                EnumTypeInfo::from_values([
                    FilenameKind::File.as_str(),
                    FilenameKind::Directory.as_str(),
                    FilenameKind::Either.as_str(),
                ]),
            )
            .with_default(DefaultValue::Literal(Value::from(FilenameKind::File.as_str()))),
            MetadataDescriptor::optional(typeinfo::MUST_EXIST, BooleanTypeInfo)
                .with_default(DefaultValue::Literal(Value::Bool(false))),
        ],
        FundamentalKind::Custom => vec![MetadataDescriptor::required(
            typeinfo::TYPE_NAME,
            StringTypeInfo::unconstrained(),
        )],
    };
    MetadataSet::new(descriptors.into_iter().map(MetadataDescriptor::new_type))
}

/// Collect the parameters of `kind` from metadata layers ordered from the
/// farthest referenced declaration to the nearest; nearer layers win.
pub fn overlay_parameters<'a>(
    kind: FundamentalKind,
    layers: impl IntoIterator<Item = &'a Metadata>,
) -> Metadata {
    let mut parameters = Metadata::new();
    for layer in layers {
        for key in kind.parameter_names() {
            if let Some(value) = layer.get(*key) {
                parameters.insert((*key).to_string(), value.clone());
            }
        }
    }
    parameters
}

/// English plural of a declaration name.
pub fn pluralize(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if let Some(stem) = name.strip_suffix(['y', 'Y'])
        && !stem.ends_with(['a', 'e', 'i', 'o', 'u', 'A', 'E', 'I', 'O', 'U'])
        && !stem.is_empty()
    {
        return format!("{stem}ies");
    }
    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return format!("{name}es");
    }
    format!("{name}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("item"), "items");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("branch"), "branches");
        assert_eq!(pluralize("address"), "addresses");
    }

    #[test]
    fn test_merge_keeps_existing_descriptors() {
        let set = universal().merge(MetadataSet::new([MetadataDescriptor::required(
            DESCRIPTION,
            AnyTypeInfo,
        )]));
        assert_eq!(set.len(), 1);
        assert!(set.get(DESCRIPTION).is_some_and(|d| !d.is_required()));
    }

    #[test]
    fn test_relaxed_drops_requirements_and_defaults() {
        let set = fundamental(FundamentalKind::Enum).relaxed();
        assert!(set.iter().all(|d| !d.is_required() && d.default_value().is_none()));
        assert!(set.iter().all(MetadataDescriptor::is_new_type));

        let filename = fundamental(FundamentalKind::Filename);
        assert!(filename.get(typeinfo::MUST_EXIST).is_some_and(|d| d.default_value().is_some()));
        assert!(filename.relaxed().get(typeinfo::MUST_EXIST).is_some_and(|d| d.default_value().is_none()));
    }

    #[test]
    fn test_arity_sets() {
        assert!(for_arity(Arity::zero_or_more()).contains(PLURAL));
        assert!(!for_arity(Arity::zero_or_more()).contains(DEFAULT));
        assert!(for_arity(Arity::optional()).contains(DEFAULT));
        assert!(for_arity(Arity::single()).is_empty());
    }

    #[test]
    fn test_plural_default_is_computed_from_name() {
        let set = collection();
        let default = set.get(PLURAL).and_then(MetadataDescriptor::default_value).unwrap();
        let named = ItemContext {
            name: Some("entry"),
            arity: Arity::one_or_more(),
        };
        assert_eq!(default.evaluate(&named), Some(Value::from("entries")));
        let unnamed = ItemContext {
            name: None,
            arity: Arity::one_or_more(),
        };
        assert_eq!(default.evaluate(&unnamed), None);
    }

    #[test]
    fn test_overlay_parameters_prefers_nearest() {
        let mut base = Metadata::new();
        base.insert("min".into(), Value::Int(0));
        base.insert("max".into(), Value::Int(10));
        base.insert("description".into(), Value::from("x"));
        let mut near = Metadata::new();
        near.insert("max".into(), Value::Int(5));

        let params = overlay_parameters(FundamentalKind::Integer, [&base, &near]);
        assert_eq!(params.get("min"), Some(&Value::Int(0)));
        assert_eq!(params.get("max"), Some(&Value::Int(5)));
        assert!(!params.contains_key("description"));
    }

    #[test]
    fn test_pragma_keys() {
        assert!(is_pragma("pragma-cpp-namespace"));
        assert!(!is_pragma("description"));
    }
}
