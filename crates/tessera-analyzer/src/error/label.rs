//! Labeled source locations for diagnostic messages.

use tessera_core::location::SourceLocation;

/// A message attached to a location in a schema source.
///
/// - **Primary labels** mark where the error occurred.
/// - **Secondary labels** provide context, such as "first declared here".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    location: SourceLocation,
    message: String,
    is_primary: bool,
}

impl Label {
    /// Create a new primary label.
    pub fn primary(location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
            is_primary: true,
        }
    }

    /// Create a new secondary label.
    pub fn secondary(location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
            is_primary: false,
        }
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn is_secondary(&self) -> bool {
        !self.is_primary
    }
}
