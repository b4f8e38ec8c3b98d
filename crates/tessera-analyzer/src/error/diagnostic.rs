//! The core diagnostic type for the Tessera error system.

use std::fmt;

use tessera_core::location::SourceLocation;

use crate::error::{ErrorCode, ErrorKind, label::Label};

/// An analysis error with source location information.
///
/// # Example
///
/// ```text
/// error[E201]: `id` is declared multiple times
///   --> schema.tsr:10:5 duplicate declaration
///   --> schema.tsr:4:5 first declared here
///    = help: rename one of the declarations
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    kind: ErrorKind,
    labels: Vec<Label>,
    help: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic for an error kind, without labels.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            labels: Vec::new(),
            help: None,
        }
    }

    /// Create a diagnostic with a primary label at `location`.
    pub fn at(kind: ErrorKind, location: &SourceLocation, label: impl Into<String>) -> Self {
        Self::new(kind).with_label(location.clone(), label)
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The error code derived from the kind.
    pub fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    /// The primary message.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Location of the first primary label, if any.
    pub fn location(&self) -> Option<&SourceLocation> {
        self.labels
            .iter()
            .find(|label| label.is_primary())
            .map(Label::location)
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Add a primary label to this diagnostic.
    pub fn with_label(mut self, location: SourceLocation, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(location, message));
        self
    }

    /// Add a secondary label to this diagnostic.
    pub fn with_secondary_label(
        mut self,
        location: SourceLocation,
        message: impl Into<String>,
    ) -> Self {
        self.labels.push(Label::secondary(location, message));
        self
    }

    /// Set the help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: {}", self.code(), self.kind)?;
        if let Some(location) = self.location() {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

impl From<ErrorKind> for Diagnostic {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}
