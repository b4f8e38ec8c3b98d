//! Occurrence constraints.

use std::fmt;

/// A `(minimum, maximum)` occurrence constraint.
///
/// An absent maximum means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arity {
    min: u32,
    max: Option<u32>,
}

impl Arity {
    /// Create a new arity. Use [`Arity::is_valid`] to check the bounds.
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Exactly one occurrence.
    pub fn single() -> Self {
        Self::new(1, Some(1))
    }

    /// Zero or one occurrence.
    pub fn optional() -> Self {
        Self::new(0, Some(1))
    }

    /// Zero or more occurrences.
    pub fn zero_or_more() -> Self {
        Self::new(0, None)
    }

    /// One or more occurrences.
    pub fn one_or_more() -> Self {
        Self::new(1, None)
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> Option<u32> {
        self.max
    }

    /// The maximum is at least one and not below the minimum.
    pub fn is_valid(&self) -> bool {
        match self.max {
            Some(max) => max >= 1 && max >= self.min,
            None => true,
        }
    }

    pub fn is_single(&self) -> bool {
        self.min == 1 && self.max == Some(1)
    }

    pub fn is_optional(&self) -> bool {
        self.min == 0 && self.max == Some(1)
    }

    /// More than one value may occur.
    pub fn is_collection(&self) -> bool {
        self.max.is_none_or(|max| max > 1)
    }
}

impl Default for Arity {
    fn default() -> Self {
        Self::single()
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (1, Some(1)) => Ok(()),
            (0, Some(1)) => write!(f, "?"),
            (0, None) => write!(f, "*"),
            (1, None) => write!(f, "+"),
            (min, None) => write!(f, "[{min}, ]"),
            (min, Some(max)) => write!(f, "[{min}, {max}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_predicates() {
        assert!(Arity::single().is_single());
        assert!(Arity::optional().is_optional());
        assert!(!Arity::optional().is_collection());
        assert!(Arity::zero_or_more().is_collection());
        assert!(Arity::new(2, Some(4)).is_collection());
    }

    #[test]
    fn test_arity_validity() {
        assert!(Arity::new(2, Some(2)).is_valid());
        assert!(!Arity::new(3, Some(2)).is_valid());
        assert!(!Arity::new(0, Some(0)).is_valid());
        assert!(Arity::new(5, None).is_valid());
    }

    #[test]
    fn test_arity_display() {
        assert_eq!(Arity::single().to_string(), "");
        assert_eq!(Arity::optional().to_string(), "?");
        assert_eq!(Arity::zero_or_more().to_string(), "*");
        assert_eq!(Arity::one_or_more().to_string(), "+");
        assert_eq!(Arity::new(2, Some(5)).to_string(), "[2, 5]");
    }
}
