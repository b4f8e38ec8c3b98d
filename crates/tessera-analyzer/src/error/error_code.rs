//! Error codes for the Tessera diagnostic system.
//!
//! Error codes are organized by category:
//! - `E1xx` - Reference resolution errors
//! - `E2xx` - Structural errors
//! - `E3xx` - Metadata errors
//! - `E4xx` - Unsupported feature errors
//! - `E5xx` - Lowering errors

use std::fmt;

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Resolution Errors (E1xx)
    // =========================================================================
    /// Unresolved reference.
    ///
    /// A referenced name was not found in any enclosing scope.
    E100,

    // =========================================================================
    // Structural Errors (E2xx)
    // =========================================================================
    /// Circular dependency.
    ///
    /// Following references from a declaration leads back to it.
    E200,

    /// Duplicate name.
    ///
    /// Two declarations in the same scope, including scope inherited through a
    /// reference chain, share a name.
    E201,

    /// Invalid simple-object child.
    ///
    /// A simple object may only contain attributes.
    E202,

    /// Invalid fundamental declaration.
    ///
    /// A fundamental type cannot have children or a reference.
    E203,

    /// Invalid arity.
    ///
    /// The maximum is zero or smaller than the minimum.
    E204,

    /// Unknown extension.
    ///
    /// The extension name is not provided by the active observer.
    E205,

    /// Malformed declaration.
    ///
    /// The declaration has a shape its classification does not allow.
    E206,

    /// Item already committed.
    ///
    /// A committed item was modified.
    E207,

    /// Item not committed.
    ///
    /// An item was used before it was classified.
    E208,

    // =========================================================================
    // Metadata Errors (E3xx)
    // =========================================================================
    /// Invalid metadata value.
    E300,

    /// Unknown metadata key.
    E301,

    /// Missing required metadata.
    E302,

    /// Duplicate metadata key.
    E303,

    /// Minimum greater than maximum.
    E304,

    /// Enum values and friendly values differ in count.
    E305,

    /// `plural` used on an unnamed or single-valued declaration.
    E306,

    /// `default` used on a declaration that is not optional.
    E307,

    /// `polymorphic` used on a declaration that is not a referenced compound.
    E308,

    /// `suppress_polymorphic` used without a polymorphic base.
    E309,

    // =========================================================================
    // Unsupported Feature Errors (E4xx)
    // =========================================================================
    /// Feature not enabled.
    ///
    /// The declaration uses a feature the active observer does not enable.
    E400,

    // =========================================================================
    // Lowering Errors (E5xx)
    // =========================================================================
    /// Parent already assigned.
    E500,

    /// Element link could not be bound.
    E501,
}

impl ErrorCode {
    /// Returns the code as a string (e.g., "E100").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E100 => "E100",
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            ErrorCode::E205 => "E205",
            ErrorCode::E206 => "E206",
            ErrorCode::E207 => "E207",
            ErrorCode::E208 => "E208",
            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
            ErrorCode::E303 => "E303",
            ErrorCode::E304 => "E304",
            ErrorCode::E305 => "E305",
            ErrorCode::E306 => "E306",
            ErrorCode::E307 => "E307",
            ErrorCode::E308 => "E308",
            ErrorCode::E309 => "E309",
            ErrorCode::E400 => "E400",
            ErrorCode::E500 => "E500",
            ErrorCode::E501 => "E501",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E100 => "unresolved reference",
            ErrorCode::E200 => "circular dependency",
            ErrorCode::E201 => "duplicate name",
            ErrorCode::E202 => "invalid simple-object child",
            ErrorCode::E203 => "invalid fundamental declaration",
            ErrorCode::E204 => "invalid arity",
            ErrorCode::E205 => "unknown extension",
            ErrorCode::E206 => "malformed declaration",
            ErrorCode::E207 => "item already committed",
            ErrorCode::E208 => "item not committed",
            ErrorCode::E300 => "invalid metadata",
            ErrorCode::E301 => "unknown metadata",
            ErrorCode::E302 => "missing metadata",
            ErrorCode::E303 => "duplicate metadata",
            ErrorCode::E304 => "minimum greater than maximum",
            ErrorCode::E305 => "enum value count mismatch",
            ErrorCode::E306 => "invalid use of plural",
            ErrorCode::E307 => "invalid use of default",
            ErrorCode::E308 => "invalid use of polymorphic",
            ErrorCode::E309 => "invalid use of suppress_polymorphic",
            ErrorCode::E400 => "unsupported feature",
            ErrorCode::E500 => "parent already assigned",
            ErrorCode::E501 => "invalid element link",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
