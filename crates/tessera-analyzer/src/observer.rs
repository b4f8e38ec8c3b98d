//! The policy object that configures an analysis run.
//!
//! Code generators differ in which schema features they can handle. An
//! [`Observer`] tells the analyzer which features are enabled, which extension
//! invocations exist, and names the configuration namespace used for metadata
//! overrides.

use bitflags::bitflags;

bitflags! {
    /// Feature toggles reported by an [`Observer`].
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct Flags: u32 {
        /// Attribute items (children of simple objects).
        const ATTRIBUTES = 1 << 0;
        /// Declarations coming from included sources.
        const INCLUDE_STATEMENTS = 1 << 1;
        /// Metadata overrides from run configuration.
        const CONFIG_DECLARATIONS = 1 << 2;

        // === Declarations (fundamentals, aliases, augmentations) ===

        const NAMED_DECLARATIONS = 1 << 3;
        const UNNAMED_DECLARATIONS = 1 << 4;
        const ROOT_DECLARATIONS = 1 << 5;
        const CHILD_DECLARATIONS = 1 << 6;

        // === Objects (compound and simple) ===

        const NAMED_OBJECTS = 1 << 7;
        const UNNAMED_OBJECTS = 1 << 8;
        const ROOT_OBJECTS = 1 << 9;
        const CHILD_OBJECTS = 1 << 10;

        // === Reference forms ===

        const ALIASES = 1 << 11;
        const AUGMENTATIONS = 1 << 12;
        /// Objects whose reference chain reaches a fundamental type.
        const SIMPLE_OBJECTS = 1 << 13;
        /// Resolve reference names to declarations. When disabled, references
        /// are lowered as placeholder fundamentals.
        const RESOLVE_REFERENCES = 1 << 14;
    }
}

/// An extension the observer understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionInfo {
    pub name: String,
    /// Repeated invocations at the root scope are allowed and lowered
    /// separately.
    pub allow_duplicates: bool,
}

impl ExtensionInfo {
    pub fn new(name: impl Into<String>, allow_duplicates: bool) -> Self {
        Self {
            name: name.into(),
            allow_duplicates,
        }
    }
}

/// Pluggable policy supplying feature flags and type-system hooks.
pub trait Observer {
    /// Namespace for metadata configuration overrides.
    fn name(&self) -> &str;

    fn flags(&self) -> Flags;

    fn extensions(&self) -> &[ExtensionInfo] {
        &[]
    }

    /// Whether a reference with optional arity declares a new type (for
    /// example a nullable wrapper) rather than an augmentation.
    fn does_optional_reference_represent_new_type(&self, _is_fundamental_reference: bool) -> bool {
        false
    }

    /// Look up an extension by name.
    fn extension(&self, name: &str) -> Option<&ExtensionInfo> {
        self.extensions().iter().find(|ext| ext.name == name)
    }
}

/// An observer enabling every feature, with configurable extensions.
#[derive(Debug, Clone)]
pub struct DefaultObserver {
    name: String,
    flags: Flags,
    extensions: Vec<ExtensionInfo>,
}

impl DefaultObserver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: Flags::all(),
            extensions: Vec::new(),
        }
    }

    pub fn without(mut self, flags: Flags) -> Self {
        self.flags.remove(flags);
        self
    }

    pub fn with_extension(mut self, extension: ExtensionInfo) -> Self {
        self.extensions.push(extension);
        self
    }
}

impl Default for DefaultObserver {
    fn default() -> Self {
        Self::new("default")
    }
}

impl Observer for DefaultObserver {
    fn name(&self) -> &str {
        &self.name
    }

    fn flags(&self) -> Flags {
        self.flags
    }

    fn extensions(&self) -> &[ExtensionInfo] {
        &self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_observer_enables_everything() {
        let observer = DefaultObserver::default();
        assert_eq!(observer.name(), "default");
        assert!(observer.flags().contains(Flags::ALIASES | Flags::RESOLVE_REFERENCES));
        assert!(!observer.does_optional_reference_represent_new_type(true));
    }

    #[test]
    fn test_extension_lookup() {
        let observer = DefaultObserver::new("gen")
            .without(Flags::ATTRIBUTES)
            .with_extension(ExtensionInfo::new("include", true));

        assert!(!observer.flags().contains(Flags::ATTRIBUTES));
        assert_eq!(observer.extension("include").map(|e| e.allow_duplicates), Some(true));
        assert!(observer.extension("import").is_none());
    }
}
