//! Source locations carried from the front end for diagnostics.

use std::{fmt, rc::Rc};

/// Position of a declaration in its source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    source: Rc<str>,
    line: u32,
    column: u32,
}

impl SourceLocation {
    /// Create a new location. Lines and columns are 1-based.
    pub fn new(source: impl Into<Rc<str>>, line: u32, column: u32) -> Self {
        Self {
            source: source.into(),
            line,
            column,
        }
    }

    /// Name of the source, usually a file path.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = SourceLocation::new("schema.tsr", 4, 9);
        assert_eq!(loc.to_string(), "schema.tsr:4:9");
        assert_eq!(loc.source(), "schema.tsr");
    }
}
