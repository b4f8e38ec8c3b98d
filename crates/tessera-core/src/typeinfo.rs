//! Typed validation and text conversion for values.
//!
//! A [`TypeInfo`] validates a [`Value`] and converts text into a native value.
//! Metadata resolution uses it to coerce raw metadata; lowered fundamental
//! elements carry one so code generators can validate data against it.
//!
//! Instances for the built-in fundamental kinds are created from metadata
//! key/value pairs with [`FundamentalKind::create_type_info`].

use std::{fmt, path::Path, rc::Rc, str::FromStr};

use log::trace;
use regex::Regex;
use thiserror::Error;

use crate::value::{Metadata, Value};

/// Regex a string value must fully match.
pub const VALIDATION_EXPRESSION: &str = "validation_expression";
/// Minimum number of characters of a string value.
pub const MIN_LENGTH: &str = "min_length";
/// Maximum number of characters of a string value.
pub const MAX_LENGTH: &str = "max_length";
/// Allowed values of an enum.
pub const VALUES: &str = "values";
/// Display names of enum values, matched positionally.
pub const FRIENDLY_VALUES: &str = "friendly_values";
/// Inclusive lower bound of a numeric value.
pub const MIN: &str = "min";
/// Inclusive upper bound of a numeric value.
pub const MAX: &str = "max";
/// Storage width of an integer, in bytes.
pub const BYTES: &str = "bytes";
/// Storage width of a floating point number, in bits.
pub const BITS: &str = "bits";
/// Kind of filesystem entry a filename refers to.
pub const FILENAME_TYPE: &str = "type";
/// Whether a filename must exist when validated.
pub const MUST_EXIST: &str = "must_exist";
/// Name of the externally defined type of a custom value.
pub const TYPE_NAME: &str = "type_name";

const ALLOWED_BYTES: &[i64] = &[1, 2, 4, 8];
const ALLOWED_BITS: &[i64] = &[32, 64];

/// Errors raised while validating or converting values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeInfoError {
    #[error("`{text}` is not a valid {expected}")]
    InvalidText { text: String, expected: &'static str },

    #[error("expected {expected}, found `{found}`")]
    UnexpectedValue { found: String, expected: &'static str },

    #[error("`{value}` has {length} characters, fewer than the minimum of {min}")]
    TooShort {
        value: String,
        length: usize,
        min: usize,
    },

    #[error("`{value}` has {length} characters, more than the maximum of {max}")]
    TooLong {
        value: String,
        length: usize,
        max: usize,
    },

    #[error("`{value}` does not match `{pattern}`")]
    PatternMismatch { value: String, pattern: String },

    #[error("invalid validation expression `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("`{value}` is not one of: {}", values.join(", "))]
    NotAnEnumValue { value: String, values: Vec<String> },

    #[error("{value} is less than the minimum of {min}")]
    BelowMinimum { value: String, min: String },

    #[error("{value} is greater than the maximum of {max}")]
    AboveMaximum { value: String, max: String },

    #[error("`{min_key}` ({min}) is greater than `{max_key}` ({max})")]
    Ordering {
        min_key: &'static str,
        min: String,
        max_key: &'static str,
        max: String,
    },

    #[error("{values} values were provided but {friendly_values} friendly values")]
    CountMismatch {
        values: usize,
        friendly_values: usize,
    },

    #[error("`{key}` must be one of {allowed:?}, found {value}")]
    InvalidWidth {
        key: &'static str,
        value: i64,
        allowed: &'static [i64],
    },

    #[error("`{path}` does not exist")]
    PathNotFound { path: String },

    #[error("`{path}` is not a {expected}")]
    WrongPathKind { path: String, expected: &'static str },

    #[error("missing required parameter `{key}`")]
    MissingParameter { key: &'static str },
}

/// Validation and text conversion for one type.
pub trait TypeInfo: fmt::Debug {
    /// Short human readable description, used in error messages.
    fn desc(&self) -> &'static str;

    /// Check that a native value satisfies this type.
    fn validate(&self, value: &Value) -> Result<(), TypeInfoError>;

    /// Convert text into a native value without validating it.
    fn from_string(&self, text: &str) -> Result<Value, TypeInfoError>;

    /// Convert a raw value into a validated native value.
    ///
    /// Text goes through [`TypeInfo::from_string`]; other values are validated as-is.
    fn coerce(&self, value: Value) -> Result<Value, TypeInfoError> {
        let value = match value {
            Value::Str(text) => self.from_string(&text)?,
            other => other,
        };
        self.validate(&value)?;
        Ok(value)
    }
}

fn unexpected(value: &Value, expected: &'static str) -> TypeInfoError {
    TypeInfoError::UnexpectedValue {
        found: value.to_string(),
        expected,
    }
}

/// String values with optional length bounds and a validation regex.
#[derive(Debug, Clone)]
pub struct StringTypeInfo {
    validation_expression: Option<(String, Regex)>,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl StringTypeInfo {
    pub fn new(
        validation_expression: Option<&str>,
        min_length: Option<usize>,
        max_length: Option<usize>,
    ) -> Result<Self, TypeInfoError> {
        if let (Some(min), Some(max)) = (min_length, max_length)
            && min > max
        {
            return Err(TypeInfoError::Ordering {
                min_key: MIN_LENGTH,
                min: min.to_string(),
                max_key: MAX_LENGTH,
                max: max.to_string(),
            });
        }

        let validation_expression = validation_expression
            .map(|pattern| {
                Regex::new(&format!("^(?:{pattern})$"))
                    .map(|regex| (pattern.to_string(), regex))
                    .map_err(|err| TypeInfoError::InvalidPattern {
                        pattern: pattern.to_string(),
                        reason: err.to_string(),
                    })
            })
            .transpose()?;

        Ok(Self {
            validation_expression,
            min_length,
            max_length,
        })
    }

    /// Any string.
    pub fn unconstrained() -> Self {
        Self {
            validation_expression: None,
            min_length: None,
            max_length: None,
        }
    }

    pub fn validation_expression(&self) -> Option<&str> {
        self.validation_expression
            .as_ref()
            .map(|(pattern, _)| pattern.as_str())
    }

    pub fn min_length(&self) -> Option<usize> {
        self.min_length
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }
}

impl TypeInfo for StringTypeInfo {
    fn desc(&self) -> &'static str {
        "string"
    }

    fn validate(&self, value: &Value) -> Result<(), TypeInfoError> {
        let text = value.as_str().ok_or_else(|| unexpected(value, "a string"))?;
        let length = text.chars().count();

        if let Some(min) = self.min_length
            && length < min
        {
            return Err(TypeInfoError::TooShort {
                value: text.to_string(),
                length,
                min,
            });
        }
        if let Some(max) = self.max_length
            && length > max
        {
            return Err(TypeInfoError::TooLong {
                value: text.to_string(),
                length,
                max,
            });
        }
        if let Some((pattern, regex)) = &self.validation_expression
            && !regex.is_match(text)
        {
            return Err(TypeInfoError::PatternMismatch {
                value: text.to_string(),
                pattern: pattern.clone(),
            });
        }
        Ok(())
    }

    fn from_string(&self, text: &str) -> Result<Value, TypeInfoError> {
        Ok(Value::Str(text.to_string()))
    }
}

/// One value out of a fixed set, optionally with display names.
#[derive(Debug, Clone)]
pub struct EnumTypeInfo {
    values: Vec<String>,
    friendly_values: Option<Vec<String>>,
}

impl EnumTypeInfo {
    pub fn new(
        values: Vec<String>,
        friendly_values: Option<Vec<String>>,
    ) -> Result<Self, TypeInfoError> {
        if let Some(friendly) = &friendly_values
            && friendly.len() != values.len()
        {
            return Err(TypeInfoError::CountMismatch {
                values: values.len(),
                friendly_values: friendly.len(),
            });
        }
        Ok(Self {
            values,
            friendly_values,
        })
    }

    /// An enum without display names.
    pub fn from_values(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            friendly_values: None,
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn friendly_values(&self) -> Option<&[String]> {
        self.friendly_values.as_deref()
    }
}

impl TypeInfo for EnumTypeInfo {
    fn desc(&self) -> &'static str {
        "enum"
    }

    fn validate(&self, value: &Value) -> Result<(), TypeInfoError> {
        let text = value.as_str().ok_or_else(|| unexpected(value, "an enum value"))?;
        if self.values.iter().any(|v| v == text) {
            Ok(())
        } else {
            Err(TypeInfoError::NotAnEnumValue {
                value: text.to_string(),
                values: self.values.clone(),
            })
        }
    }

    fn from_string(&self, text: &str) -> Result<Value, TypeInfoError> {
        if self.values.iter().any(|v| v == text) {
            return Ok(Value::Str(text.to_string()));
        }
        // Friendly values map back to the value at the same position.
        let position = self
            .friendly_values
            .as_ref()
            .and_then(|friendly| friendly.iter().position(|f| f == text));
        match position {
            Some(idx) => Ok(Value::Str(self.values[idx].clone())),
            None => Err(TypeInfoError::NotAnEnumValue {
                value: text.to_string(),
                values: self.values.clone(),
            }),
        }
    }
}

/// Signed or unsigned integers with optional bounds and storage width.
#[derive(Debug, Clone)]
pub struct IntegerTypeInfo {
    min: Option<i64>,
    max: Option<i64>,
    bytes: Option<u8>,
}

impl IntegerTypeInfo {
    pub fn new(min: Option<i64>, max: Option<i64>, bytes: Option<i64>) -> Result<Self, TypeInfoError> {
        if let (Some(min), Some(max)) = (min, max)
            && min > max
        {
            return Err(TypeInfoError::Ordering {
                min_key: MIN,
                min: min.to_string(),
                max_key: MAX,
                max: max.to_string(),
            });
        }
        let bytes = bytes
            .map(|value| {
                if ALLOWED_BYTES.contains(&value) {
                    Ok(value as u8)
                } else {
                    Err(TypeInfoError::InvalidWidth {
                        key: BYTES,
                        value,
                        allowed: ALLOWED_BYTES,
                    })
                }
            })
            .transpose()?;
        Ok(Self { min, max, bytes })
    }

    /// Any integer; `non_negative` restricts it to zero and above.
    pub fn unbounded(non_negative: bool) -> Self {
        Self {
            min: non_negative.then_some(0),
            max: None,
            bytes: None,
        }
    }

    pub fn min(&self) -> Option<i64> {
        self.min
    }

    pub fn max(&self) -> Option<i64> {
        self.max
    }

    pub fn bytes(&self) -> Option<u8> {
        self.bytes
    }

    /// Representable range for the storage width; unsigned when `min` is non-negative.
    fn storage_range(&self) -> Option<(i128, i128)> {
        let bits = u32::from(self.bytes?) * 8;
        if self.min.is_some_and(|min| min >= 0) {
            Some((0, (1i128 << bits) - 1))
        } else {
            Some((-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1))
        }
    }
}

impl TypeInfo for IntegerTypeInfo {
    fn desc(&self) -> &'static str {
        "integer"
    }

    fn validate(&self, value: &Value) -> Result<(), TypeInfoError> {
        let v = value.as_int().ok_or_else(|| unexpected(value, "an integer"))?;

        let (min, max) = match self.storage_range() {
            Some((lo, hi)) => (
                Some(self.min.map_or(lo, |m| i128::from(m).max(lo))),
                Some(self.max.map_or(hi, |m| i128::from(m).min(hi))),
            ),
            None => (self.min.map(i128::from), self.max.map(i128::from)),
        };
        if let Some(min) = min
            && i128::from(v) < min
        {
            return Err(TypeInfoError::BelowMinimum {
                value: v.to_string(),
                min: min.to_string(),
            });
        }
        if let Some(max) = max
            && i128::from(v) > max
        {
            return Err(TypeInfoError::AboveMaximum {
                value: v.to_string(),
                max: max.to_string(),
            });
        }
        Ok(())
    }

    fn from_string(&self, text: &str) -> Result<Value, TypeInfoError> {
        text.trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| TypeInfoError::InvalidText {
                text: text.to_string(),
                expected: "integer",
            })
    }
}

/// Floating point numbers with optional bounds and storage width.
#[derive(Debug, Clone)]
pub struct NumberTypeInfo {
    min: Option<f64>,
    max: Option<f64>,
    bits: Option<u8>,
}

impl NumberTypeInfo {
    pub fn new(min: Option<f64>, max: Option<f64>, bits: Option<i64>) -> Result<Self, TypeInfoError> {
        if let (Some(min), Some(max)) = (min, max)
            && min > max
        {
            return Err(TypeInfoError::Ordering {
                min_key: MIN,
                min: min.to_string(),
                max_key: MAX,
                max: max.to_string(),
            });
        }
        let bits = bits
            .map(|value| {
                if ALLOWED_BITS.contains(&value) {
                    Ok(value as u8)
                } else {
                    Err(TypeInfoError::InvalidWidth {
                        key: BITS,
                        value,
                        allowed: ALLOWED_BITS,
                    })
                }
            })
            .transpose()?;
        Ok(Self { min, max, bits })
    }

    /// Any number.
    pub fn unbounded() -> Self {
        Self {
            min: None,
            max: None,
            bits: None,
        }
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn bits(&self) -> Option<u8> {
        self.bits
    }
}

impl TypeInfo for NumberTypeInfo {
    fn desc(&self) -> &'static str {
        "number"
    }

    fn validate(&self, value: &Value) -> Result<(), TypeInfoError> {
        let v = value.as_float().ok_or_else(|| unexpected(value, "a number"))?;

        if self.bits == Some(32) && v.is_finite() && v.abs() > f64::from(f32::MAX) {
            return Err(TypeInfoError::AboveMaximum {
                value: v.to_string(),
                max: f32::MAX.to_string(),
            });
        }
        if let Some(min) = self.min
            && v < min
        {
            return Err(TypeInfoError::BelowMinimum {
                value: v.to_string(),
                min: min.to_string(),
            });
        }
        if let Some(max) = self.max
            && v > max
        {
            return Err(TypeInfoError::AboveMaximum {
                value: v.to_string(),
                max: max.to_string(),
            });
        }
        Ok(())
    }

    fn from_string(&self, text: &str) -> Result<Value, TypeInfoError> {
        text.trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| TypeInfoError::InvalidText {
                text: text.to_string(),
                expected: "number",
            })
    }

    fn coerce(&self, value: Value) -> Result<Value, TypeInfoError> {
        let value = match value {
            Value::Str(text) => self.from_string(&text)?,
            Value::Int(i) => Value::Float(i as f64),
            other => other,
        };
        self.validate(&value)?;
        Ok(value)
    }
}

/// `true` / `false` flags.
#[derive(Debug, Clone, Default)]
pub struct BooleanTypeInfo;

impl TypeInfo for BooleanTypeInfo {
    fn desc(&self) -> &'static str {
        "boolean"
    }

    fn validate(&self, value: &Value) -> Result<(), TypeInfoError> {
        value
            .as_bool()
            .map(|_| ())
            .ok_or_else(|| unexpected(value, "a boolean"))
    }

    fn from_string(&self, text: &str) -> Result<Value, TypeInfoError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(TypeInfoError::InvalidText {
                text: text.to_string(),
                expected: "boolean",
            }),
        }
    }
}

/// Kind of filesystem entry a filename refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilenameKind {
    #[default]
    File,
    Directory,
    Either,
}

impl FilenameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilenameKind::File => "file",
            FilenameKind::Directory => "directory",
            FilenameKind::Either => "either",
        }
    }
}

impl FromStr for FilenameKind {
    type Err = TypeInfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(FilenameKind::File),
            "directory" => Ok(FilenameKind::Directory),
            "either" => Ok(FilenameKind::Either),
            _ => Err(TypeInfoError::InvalidText {
                text: s.to_string(),
                expected: "filename type (file, directory, either)",
            }),
        }
    }
}

/// Paths to files and/or directories.
#[derive(Debug, Clone)]
pub struct FilenameTypeInfo {
    kind: FilenameKind,
    must_exist: bool,
}

impl FilenameTypeInfo {
    pub fn new(kind: FilenameKind, must_exist: bool) -> Self {
        Self { kind, must_exist }
    }

    pub fn kind(&self) -> FilenameKind {
        self.kind
    }

    pub fn must_exist(&self) -> bool {
        self.must_exist
    }
}

impl TypeInfo for FilenameTypeInfo {
    fn desc(&self) -> &'static str {
        "filename"
    }

    fn validate(&self, value: &Value) -> Result<(), TypeInfoError> {
        let text = value.as_str().ok_or_else(|| unexpected(value, "a filename"))?;
        if !self.must_exist {
            return Ok(());
        }

        let path = Path::new(text);
        trace!(path = text; "Checking filename existence");
        if !path.exists() {
            return Err(TypeInfoError::PathNotFound {
                path: text.to_string(),
            });
        }
        match self.kind {
            FilenameKind::File if !path.is_file() => Err(TypeInfoError::WrongPathKind {
                path: text.to_string(),
                expected: "file",
            }),
            FilenameKind::Directory if !path.is_dir() => Err(TypeInfoError::WrongPathKind {
                path: text.to_string(),
                expected: "directory",
            }),
            _ => Ok(()),
        }
    }

    fn from_string(&self, text: &str) -> Result<Value, TypeInfoError> {
        Ok(Value::Str(text.to_string()))
    }
}

/// Values of a type defined outside the schema; carried through as text.
#[derive(Debug, Clone)]
pub struct CustomTypeInfo {
    type_name: String,
}

impl CustomTypeInfo {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl TypeInfo for CustomTypeInfo {
    fn desc(&self) -> &'static str {
        "custom"
    }

    fn validate(&self, _value: &Value) -> Result<(), TypeInfoError> {
        Ok(())
    }

    fn from_string(&self, text: &str) -> Result<Value, TypeInfoError> {
        Ok(Value::Str(text.to_string()))
    }
}

/// Stand-in for a type referenced by a name that was never resolved.
#[derive(Debug, Clone)]
pub struct PlaceholderTypeInfo {
    name: String,
}

impl PlaceholderTypeInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The unresolved type name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TypeInfo for PlaceholderTypeInfo {
    fn desc(&self) -> &'static str {
        "unresolved type"
    }

    fn validate(&self, _value: &Value) -> Result<(), TypeInfoError> {
        Ok(())
    }

    fn from_string(&self, text: &str) -> Result<Value, TypeInfoError> {
        Ok(Value::Str(text.to_string()))
    }
}

/// Accepts any value unchanged.
#[derive(Debug, Clone, Default)]
pub struct AnyTypeInfo;

impl TypeInfo for AnyTypeInfo {
    fn desc(&self) -> &'static str {
        "any"
    }

    fn validate(&self, _value: &Value) -> Result<(), TypeInfoError> {
        Ok(())
    }

    fn from_string(&self, text: &str) -> Result<Value, TypeInfoError> {
        Ok(Value::Str(text.to_string()))
    }
}

/// A list whose entries all satisfy an inner type. A single value is promoted
/// to a one-entry list.
#[derive(Debug)]
pub struct ListTypeInfo {
    element: Box<dyn TypeInfo>,
}

impl ListTypeInfo {
    pub fn new(element: impl TypeInfo + 'static) -> Self {
        Self {
            element: Box::new(element),
        }
    }
}

impl TypeInfo for ListTypeInfo {
    fn desc(&self) -> &'static str {
        "list"
    }

    fn validate(&self, value: &Value) -> Result<(), TypeInfoError> {
        let items = value.as_list().ok_or_else(|| unexpected(value, "a list"))?;
        items.iter().try_for_each(|item| self.element.validate(item))
    }

    fn from_string(&self, text: &str) -> Result<Value, TypeInfoError> {
        Ok(Value::List(vec![self.element.from_string(text)?]))
    }

    fn coerce(&self, value: Value) -> Result<Value, TypeInfoError> {
        match value {
            Value::List(items) => items
                .into_iter()
                .map(|item| self.element.coerce(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            other => Ok(Value::List(vec![self.element.coerce(other)?])),
        }
    }
}

/// The built-in fundamental types a declaration can name directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FundamentalKind {
    String,
    Enum,
    Integer,
    Number,
    Boolean,
    Filename,
    Custom,
}

impl FundamentalKind {
    pub fn name(&self) -> &'static str {
        match self {
            FundamentalKind::String => "string",
            FundamentalKind::Enum => "enum",
            FundamentalKind::Integer => "int",
            FundamentalKind::Number => "number",
            FundamentalKind::Boolean => "bool",
            FundamentalKind::Filename => "filename",
            FundamentalKind::Custom => "custom",
        }
    }

    /// Metadata keys consumed when building this kind's [`TypeInfo`].
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            FundamentalKind::String => &[VALIDATION_EXPRESSION, MIN_LENGTH, MAX_LENGTH],
            FundamentalKind::Enum => &[VALUES, FRIENDLY_VALUES],
            FundamentalKind::Integer => &[MIN, MAX, BYTES],
            FundamentalKind::Number => &[MIN, MAX, BITS],
            FundamentalKind::Boolean => &[],
            FundamentalKind::Filename => &[FILENAME_TYPE, MUST_EXIST],
            FundamentalKind::Custom => &[TYPE_NAME],
        }
    }

    /// Run the cross-parameter checks (ordering, counts, widths) without
    /// consuming anything.
    pub fn check_parameters(&self, metadata: &Metadata) -> Result<(), TypeInfoError> {
        self.build(metadata).map(drop)
    }

    /// Build a [`TypeInfo`] and remove this kind's parameter keys from `metadata`.
    pub fn create_type_info(
        &self,
        metadata: &mut Metadata,
    ) -> Result<Rc<dyn TypeInfo>, TypeInfoError> {
        let type_info = self.build(metadata)?;
        for key in self.parameter_names() {
            metadata.shift_remove(*key);
        }
        Ok(type_info)
    }

    fn build(&self, metadata: &Metadata) -> Result<Rc<dyn TypeInfo>, TypeInfoError> {
        let type_info: Rc<dyn TypeInfo> = match self {
            FundamentalKind::String => Rc::new(StringTypeInfo::new(
                param_string(metadata, VALIDATION_EXPRESSION)?.as_deref(),
                param_usize(metadata, MIN_LENGTH)?,
                param_usize(metadata, MAX_LENGTH)?,
            )?),
            FundamentalKind::Enum => Rc::new(EnumTypeInfo::new(
                param_strings(metadata, VALUES)?
                    .ok_or(TypeInfoError::MissingParameter { key: VALUES })?,
                param_strings(metadata, FRIENDLY_VALUES)?,
            )?),
            FundamentalKind::Integer => Rc::new(IntegerTypeInfo::new(
                param_int(metadata, MIN)?,
                param_int(metadata, MAX)?,
                param_int(metadata, BYTES)?,
            )?),
            FundamentalKind::Number => Rc::new(NumberTypeInfo::new(
                param_float(metadata, MIN)?,
                param_float(metadata, MAX)?,
                param_int(metadata, BITS)?,
            )?),
            FundamentalKind::Boolean => Rc::new(BooleanTypeInfo),
            FundamentalKind::Filename => Rc::new(FilenameTypeInfo::new(
                param_string(metadata, FILENAME_TYPE)?
                    .map(|kind| kind.parse())
                    .transpose()?
                    .unwrap_or_default(),
                param_bool(metadata, MUST_EXIST)?.unwrap_or(false),
            )),
            FundamentalKind::Custom => Rc::new(CustomTypeInfo::new(
                param_string(metadata, TYPE_NAME)?
                    .ok_or(TypeInfoError::MissingParameter { key: TYPE_NAME })?,
            )),
        };
        Ok(type_info)
    }
}

impl fmt::Display for FundamentalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FundamentalKind {
    type Err = TypeInfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(FundamentalKind::String),
            "enum" => Ok(FundamentalKind::Enum),
            "int" | "integer" => Ok(FundamentalKind::Integer),
            "number" => Ok(FundamentalKind::Number),
            "bool" | "boolean" => Ok(FundamentalKind::Boolean),
            "filename" => Ok(FundamentalKind::Filename),
            "custom" => Ok(FundamentalKind::Custom),
            _ => Err(TypeInfoError::InvalidText {
                text: s.to_string(),
                expected: "fundamental type",
            }),
        }
    }
}

// Parameter accessors accept both coerced values and raw text, so type infos
// can be built before or after metadata coercion.

fn param_string(metadata: &Metadata, key: &'static str) -> Result<Option<String>, TypeInfoError> {
    match metadata.get(key) {
        None => Ok(None),
        Some(Value::Str(s)) => Ok(Some(s.clone())),
        Some(other) => Err(unexpected(other, "a string")),
    }
}

fn param_strings(
    metadata: &Metadata,
    key: &'static str,
) -> Result<Option<Vec<String>>, TypeInfoError> {
    match metadata.get(key) {
        None => Ok(None),
        Some(Value::List(items)) => Ok(Some(
            items
                .iter()
                .map(|item| match item {
                    Value::Str(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        )),
        Some(Value::Str(s)) => Ok(Some(vec![s.clone()])),
        Some(other) => Err(unexpected(other, "a list")),
    }
}

fn param_int(metadata: &Metadata, key: &'static str) -> Result<Option<i64>, TypeInfoError> {
    match metadata.get(key) {
        None => Ok(None),
        Some(Value::Int(i)) => Ok(Some(*i)),
        Some(Value::Str(s)) => IntegerTypeInfo::unbounded(false)
            .from_string(s)
            .map(|v| v.as_int()),
        Some(other) => Err(unexpected(other, "an integer")),
    }
}

fn param_usize(metadata: &Metadata, key: &'static str) -> Result<Option<usize>, TypeInfoError> {
    match param_int(metadata, key)? {
        None => Ok(None),
        Some(v) => usize::try_from(v)
            .map(Some)
            .map_err(|_| TypeInfoError::BelowMinimum {
                value: v.to_string(),
                min: "0".to_string(),
            }),
    }
}

fn param_float(metadata: &Metadata, key: &'static str) -> Result<Option<f64>, TypeInfoError> {
    match metadata.get(key) {
        None => Ok(None),
        Some(Value::Float(f)) => Ok(Some(*f)),
        Some(Value::Int(i)) => Ok(Some(*i as f64)),
        Some(Value::Str(s)) => NumberTypeInfo::unbounded()
            .from_string(s)
            .map(|v| v.as_float()),
        Some(other) => Err(unexpected(other, "a number")),
    }
}

fn param_bool(metadata: &Metadata, key: &'static str) -> Result<Option<bool>, TypeInfoError> {
    match metadata.get(key) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::Str(s)) => BooleanTypeInfo.from_string(s).map(|v| v.as_bool()),
        Some(other) => Err(unexpected(other, "a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(entries: &[(&str, Value)]) -> Metadata {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_string_length_ordering() {
        let err = StringTypeInfo::new(None, Some(5), Some(3)).unwrap_err();
        assert!(matches!(err, TypeInfoError::Ordering { min_key: MIN_LENGTH, .. }));

        let info = StringTypeInfo::new(None, Some(3), Some(3)).unwrap();
        assert!(info.validate(&Value::from("abc")).is_ok());
        assert!(matches!(
            info.validate(&Value::from("ab")),
            Err(TypeInfoError::TooShort { length: 2, min: 3, .. })
        ));
        assert!(matches!(
            info.validate(&Value::from("abcd")),
            Err(TypeInfoError::TooLong { length: 4, max: 3, .. })
        ));
    }

    #[test]
    fn test_string_validation_expression_is_anchored() {
        let info = StringTypeInfo::new(Some("[a-z]+"), None, None).unwrap();
        assert!(info.validate(&Value::from("abc")).is_ok());
        assert!(matches!(
            info.validate(&Value::from("abc1")),
            Err(TypeInfoError::PatternMismatch { .. })
        ));
        assert_eq!(info.validation_expression(), Some("[a-z]+"));
    }

    #[test]
    fn test_invalid_validation_expression() {
        let err = StringTypeInfo::new(Some("("), None, None).unwrap_err();
        assert!(matches!(err, TypeInfoError::InvalidPattern { .. }));
    }

    #[test]
    fn test_enum_count_mismatch() {
        let err = EnumTypeInfo::new(
            vec!["a".into(), "b".into(), "c".into()],
            Some(vec!["x".into(), "y".into()]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TypeInfoError::CountMismatch {
                values: 3,
                friendly_values: 2
            }
        );
    }

    #[test]
    fn test_enum_friendly_values_map_to_values() {
        let info = EnumTypeInfo::new(
            vec!["a".into(), "b".into()],
            Some(vec!["Alpha".into(), "Beta".into()]),
        )
        .unwrap();
        assert_eq!(info.coerce(Value::from("Beta")).unwrap(), Value::from("b"));
        assert_eq!(info.coerce(Value::from("a")).unwrap(), Value::from("a"));
        assert!(info.coerce(Value::from("c")).is_err());
    }

    #[test]
    fn test_integer_bounds_and_width() {
        let info = IntegerTypeInfo::new(Some(0), None, Some(1)).unwrap();
        assert!(info.coerce(Value::from("255")).is_ok());
        assert!(matches!(
            info.coerce(Value::from("256")),
            Err(TypeInfoError::AboveMaximum { .. })
        ));
        assert!(matches!(
            info.coerce(Value::from("-1")),
            Err(TypeInfoError::BelowMinimum { .. })
        ));

        let signed = IntegerTypeInfo::new(None, None, Some(1)).unwrap();
        assert!(signed.validate(&Value::from(-128i64)).is_ok());
        assert!(signed.validate(&Value::from(128i64)).is_err());

        assert!(matches!(
            IntegerTypeInfo::new(None, None, Some(3)),
            Err(TypeInfoError::InvalidWidth { key: BYTES, value: 3, .. })
        ));
        assert!(matches!(
            IntegerTypeInfo::new(Some(10), Some(1), None),
            Err(TypeInfoError::Ordering { min_key: MIN, .. })
        ));
    }

    #[test]
    fn test_integer_rejects_text() {
        let info = IntegerTypeInfo::unbounded(false);
        assert!(matches!(
            info.coerce(Value::from("ten")),
            Err(TypeInfoError::InvalidText { .. })
        ));
    }

    #[test]
    fn test_number_coerces_integers() {
        let info = NumberTypeInfo::new(Some(0.5), Some(10.0), None).unwrap();
        assert_eq!(info.coerce(Value::from(2i64)).unwrap(), Value::Float(2.0));
        assert_eq!(info.coerce(Value::from("2.5")).unwrap(), Value::Float(2.5));
        assert!(info.coerce(Value::from("0.1")).is_err());
    }

    #[test]
    fn test_boolean_from_string() {
        assert_eq!(BooleanTypeInfo.coerce(Value::from("Yes")).unwrap(), Value::Bool(true));
        assert_eq!(BooleanTypeInfo.coerce(Value::from("false")).unwrap(), Value::Bool(false));
        assert!(BooleanTypeInfo.coerce(Value::from("maybe")).is_err());
    }

    #[test]
    fn test_filename_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_string_lossy().to_string();

        let info = FilenameTypeInfo::new(FilenameKind::Directory, true);
        assert!(info.coerce(Value::from(dir_path.as_str())).is_ok());

        let info = FilenameTypeInfo::new(FilenameKind::File, true);
        assert!(matches!(
            info.coerce(Value::from(dir_path.as_str())),
            Err(TypeInfoError::WrongPathKind { .. })
        ));

        let missing = dir.path().join("missing.txt").to_string_lossy().to_string();
        assert!(matches!(
            info.coerce(Value::from(missing.as_str())),
            Err(TypeInfoError::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_list_promotes_single_value() {
        let info = ListTypeInfo::new(StringTypeInfo::unconstrained());
        assert_eq!(
            info.coerce(Value::from("a")).unwrap(),
            Value::from(vec!["a"])
        );
        assert!(info.coerce(Value::from(vec![1i64])).is_err());
    }

    #[test]
    fn test_create_type_info_consumes_parameters() {
        let mut md = metadata(&[
            (MIN_LENGTH, Value::from(1i64)),
            (MAX_LENGTH, Value::from(4i64)),
            ("description", Value::from("a name")),
        ]);
        let info = FundamentalKind::String.create_type_info(&mut md).unwrap();
        assert_eq!(info.desc(), "string");
        assert_eq!(md.len(), 1);
        assert!(md.contains_key("description"));
    }

    #[test]
    fn test_create_type_info_requires_enum_values() {
        let mut md = Metadata::new();
        let err = FundamentalKind::Enum.create_type_info(&mut md).unwrap_err();
        assert_eq!(err, TypeInfoError::MissingParameter { key: VALUES });
    }

    #[test]
    fn test_check_parameters_accepts_raw_text() {
        let md = metadata(&[(MIN, Value::from("5")), (MAX, Value::from("3"))]);
        assert!(matches!(
            FundamentalKind::Integer.check_parameters(&md),
            Err(TypeInfoError::Ordering { .. })
        ));
    }

    #[test]
    fn test_fundamental_kind_from_str() {
        assert_eq!("integer".parse::<FundamentalKind>(), Ok(FundamentalKind::Integer));
        assert_eq!("bool".parse::<FundamentalKind>(), Ok(FundamentalKind::Boolean));
        assert!("widget".parse::<FundamentalKind>().is_err());
    }
}
