//! Extension entries
//!
//! The four categories of registrable additions to a rendering environment:
//! shared data, decorators, helpers and partials. Each category has its own
//! homogeneous entry type so the environment exposes one registration
//! operation per category.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use handlebars::{DecoratorDef, HelperDef};
use serde::Deserialize;
use thiserror::Error;

/// Extension category, in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionCategory {
    Data,
    Decorators,
    Helpers,
    Partials,
}

impl ExtensionCategory {
    /// All categories in the order they are registered
    pub const ALL: [ExtensionCategory; 4] = [Self::Data, Self::Decorators, Self::Helpers, Self::Partials];

    /// Name used in diagnostics and config keys
    pub fn name(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Decorators => "decorators",
            Self::Helpers => "helpers",
            Self::Partials => "partials",
        }
    }
}

impl fmt::Display for ExtensionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Errors from registering a single extension entry
///
/// These are recoverable: the entry is skipped and registration continues.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Failed to read {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse data file {}: {message}", .path.display())]
    DataParse { path: PathBuf, message: String },

    #[error("Unsupported data file {} (expected .json, .yml or .yaml)", .0.display())]
    UnsupportedData(PathBuf),

    #[error("Data file {} does not contain a mapping or value", .0.display())]
    EmptyData(PathBuf),

    #[error("Failed to compile partial '{name}': {message}")]
    PartialCompile { name: String, message: String },

    #[error("Invalid {category} name '{name}'")]
    InvalidName { category: ExtensionCategory, name: String },
}

/// A source of shared data values
///
/// In config files a bare string is a glob pattern, a mapping is inline data.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DataEntry {
    /// Glob pattern of `.json`/`.yml`/`.yaml` files, each stored under its file stem
    Pattern(String),
    /// Values merged directly into the shared data
    Values(serde_json::Map<String, serde_json::Value>),
}

impl DataEntry {
    /// Falsy entries (an empty pattern) are dropped during normalization
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Pattern(p) if p.trim().is_empty())
    }
}

/// A source of partial templates
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PartialEntry {
    /// Glob pattern; each file is named by its path relative to the pattern base
    Pattern(String),
    /// Partial name to template source
    Inline(BTreeMap<String, String>),
}

impl PartialEntry {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Pattern(p) if p.trim().is_empty())
    }
}

type HelperFactory = Arc<dyn Fn() -> Box<dyn HelperDef + Send + Sync> + Send + Sync>;
type DecoratorFactory = Arc<dyn Fn() -> Box<dyn DecoratorDef + Send + Sync> + Send + Sync>;

/// A named native helper
///
/// The entry keeps a factory rather than an instance so every build
/// registers its own copy into its own environment.
#[derive(Clone)]
pub struct HelperEntry {
    name: String,
    factory: HelperFactory,
}

impl HelperEntry {
    /// Create an entry from any cloneable helper (fn items, closures, `handlebars_helper!` types)
    pub fn new<H>(name: impl Into<String>, helper: H) -> Self
    where
        H: HelperDef + Clone + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(move || Box::new(helper.clone())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instantiate the helper for registration
    pub fn instantiate(&self) -> Box<dyn HelperDef + Send + Sync> {
        (self.factory)()
    }
}

impl fmt::Debug for HelperEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperEntry").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A named native decorator
#[derive(Clone)]
pub struct DecoratorEntry {
    name: String,
    factory: DecoratorFactory,
}

impl DecoratorEntry {
    pub fn new<D>(name: impl Into<String>, decorator: D) -> Self
    where
        D: DecoratorDef + Clone + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(move || Box::new(decorator.clone())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instantiate(&self) -> Box<dyn DecoratorDef + Send + Sync> {
        (self.factory)()
    }
}

impl fmt::Debug for DecoratorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoratorEntry").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Check a helper or decorator name before registration
pub(crate) fn validate_name(category: ExtensionCategory, name: &str) -> Result<(), RegistrationError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(RegistrationError::InvalidName {
            category,
            name: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_order() {
        let names: Vec<_> = ExtensionCategory::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["data", "decorators", "helpers", "partials"]);
    }

    #[test]
    fn test_data_entry_deserialize() {
        let entry: DataEntry = serde_yaml::from_str("data/*.yml").unwrap();
        assert_eq!(entry, DataEntry::Pattern("data/*.yml".to_string()));

        let entry: DataEntry = serde_yaml::from_str("site: Example\nyear: 2024").unwrap();
        match entry {
            DataEntry::Values(map) => {
                assert_eq!(map["site"], "Example");
                assert_eq!(map["year"], 2024);
            }
            other => panic!("expected inline values, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_entry_deserialize() {
        let entry: PartialEntry = serde_yaml::from_str("footer: '<footer/>'").unwrap();
        match entry {
            PartialEntry::Inline(map) => assert_eq!(map["footer"], "<footer/>"),
            other => panic!("expected inline partials, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_pattern_is_falsy() {
        assert!(DataEntry::Pattern(String::new()).is_empty());
        assert!(PartialEntry::Pattern("  ".to_string()).is_empty());
        assert!(!PartialEntry::Inline(BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name(ExtensionCategory::Helpers, "upper").is_ok());
        assert!(validate_name(ExtensionCategory::Helpers, "").is_err());
        let err = validate_name(ExtensionCategory::Decorators, "two words").unwrap_err();
        assert_eq!(err.to_string(), "Invalid decorators name 'two words'");
    }
}
