//! Typed error kinds with their contextual fields.

use thiserror::Error;

use tessera_core::arity::Arity;

use crate::error::ErrorCode;

/// What went wrong, with the values needed to explain it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    #[error("cannot resolve reference `{reference}` of `{name}`")]
    UnresolvedReference { name: String, reference: String },

    #[error("circular dependency: {}", path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    #[error("`{name}` is declared multiple times")]
    DuplicateName { name: String },

    #[error("`{child}` is not an attribute, but `{name}` is a simple object")]
    InvalidSimpleObjectChild { name: String, child: String },

    #[error("fundamental type `{name}` cannot have {what}")]
    InvalidFundamental { name: String, what: &'static str },

    #[error("`{name}` has invalid arity {arity}")]
    InvalidArity { name: String, arity: Arity },

    #[error("extension `{name}` is not supported")]
    UnknownExtension { name: String },

    #[error("`{name}` is malformed: {reason}")]
    MalformedItem { name: String, reason: String },

    #[error("`{name}` is already committed")]
    AlreadyCommitted { name: String },

    #[error("`{name}` has not been committed")]
    NotCommitted { name: String },

    #[error("invalid value for metadata `{key}` of `{name}`: {reason}")]
    InvalidMetadata {
        name: String,
        key: String,
        reason: String,
    },

    #[error("`{key}` is not a valid metadata key for `{name}`")]
    UnknownMetadata { name: String, key: String },

    #[error("`{name}` requires metadata `{key}`")]
    MissingMetadata { name: String, key: String },

    #[error("metadata `{key}` is given multiple times for `{name}`")]
    DuplicateMetadata { name: String, key: String },

    #[error("`{min_key}` ({min}) is greater than `{max_key}` ({max}) for `{name}`")]
    MinMaxOrdering {
        name: String,
        min_key: String,
        min: String,
        max_key: String,
        max: String,
    },

    #[error(
        "`{name}` has {values} values but {friendly_values} friendly values"
    )]
    EnumValueCountMismatch {
        name: String,
        values: usize,
        friendly_values: usize,
    },

    #[error("`plural` is not valid for `{name}`: {reason}")]
    PluralMisuse { name: String, reason: &'static str },

    #[error("`default` is only valid for optional declarations, but `{name}` is not optional")]
    DefaultMisuse { name: String },

    #[error("`polymorphic` is only valid for compound objects referenced by other objects; `{name}` is not")]
    PolymorphicMisuse { name: String },

    #[error("`suppress_polymorphic` requires a polymorphic base, but `{name}` has none")]
    SuppressPolymorphicMisuse { name: String },

    #[error("{feature} are not supported by `{observer}`")]
    UnsupportedFeature {
        feature: &'static str,
        observer: String,
    },

    #[error("the parent of `{name}` is already assigned")]
    ParentAlreadyAssigned { name: String },

    #[error("cannot bind element `{name}`: {reason}")]
    InvalidLink { name: String, reason: String },
}

impl ErrorKind {
    /// The error code for this kind.
    pub fn code(&self) -> ErrorCode {
        match self {
            ErrorKind::UnresolvedReference { .. } => ErrorCode::E100,
            ErrorKind::CircularDependency { .. } => ErrorCode::E200,
            ErrorKind::DuplicateName { .. } => ErrorCode::E201,
            ErrorKind::InvalidSimpleObjectChild { .. } => ErrorCode::E202,
            ErrorKind::InvalidFundamental { .. } => ErrorCode::E203,
            ErrorKind::InvalidArity { .. } => ErrorCode::E204,
            ErrorKind::UnknownExtension { .. } => ErrorCode::E205,
            ErrorKind::MalformedItem { .. } => ErrorCode::E206,
            ErrorKind::AlreadyCommitted { .. } => ErrorCode::E207,
            ErrorKind::NotCommitted { .. } => ErrorCode::E208,
            ErrorKind::InvalidMetadata { .. } => ErrorCode::E300,
            ErrorKind::UnknownMetadata { .. } => ErrorCode::E301,
            ErrorKind::MissingMetadata { .. } => ErrorCode::E302,
            ErrorKind::DuplicateMetadata { .. } => ErrorCode::E303,
            ErrorKind::MinMaxOrdering { .. } => ErrorCode::E304,
            ErrorKind::EnumValueCountMismatch { .. } => ErrorCode::E305,
            ErrorKind::PluralMisuse { .. } => ErrorCode::E306,
            ErrorKind::DefaultMisuse { .. } => ErrorCode::E307,
            ErrorKind::PolymorphicMisuse { .. } => ErrorCode::E308,
            ErrorKind::SuppressPolymorphicMisuse { .. } => ErrorCode::E309,
            ErrorKind::UnsupportedFeature { .. } => ErrorCode::E400,
            ErrorKind::ParentAlreadyAssigned { .. } => ErrorCode::E500,
            ErrorKind::InvalidLink { .. } => ErrorCode::E501,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let kind = ErrorKind::CircularDependency {
            path: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(kind.to_string(), "circular dependency: A -> B -> A");
        assert_eq!(kind.code(), ErrorCode::E200);
    }

    #[test]
    fn test_invalid_arity_message() {
        let kind = ErrorKind::InvalidArity {
            name: "items".into(),
            arity: Arity::new(3, Some(2)),
        };
        assert_eq!(kind.to_string(), "`items` has invalid arity [3, 2]");
    }
}
