//! Persister configuration.

use serde::{Deserialize, Serialize};

/// Element name used for array and collection entries when a member does
/// not configure its own.
pub const DEFAULT_ELEMENT_NAME: &str = "element";

/// Behaviour flags for a [`crate::Persister`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersisterConfig {
    /// Skip persistent members whose element/attribute is absent when loading,
    /// leaving the constructed default in place.
    pub ignore_missing: bool,

    /// Emit nothing for null members when saving. Documents written this way
    /// usually need `ignore_missing` to load.
    pub ignore_nulls: bool,

    /// Element name for array and collection entries.
    pub default_element_name: String,
}

impl Default for PersisterConfig {
    fn default() -> Self {
        Self {
            ignore_missing: false,
            ignore_nulls: false,
            default_element_name: DEFAULT_ELEMENT_NAME.to_string(),
        }
    }
}

impl PersisterConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether missing members are skipped on load.
    #[must_use]
    pub fn ignore_missing(mut self, value: bool) -> Self {
        self.ignore_missing = value;
        self
    }

    /// Sets whether null members are omitted on save.
    #[must_use]
    pub fn ignore_nulls(mut self, value: bool) -> Self {
        self.ignore_nulls = value;
        self
    }

    /// Sets the default element name for array and collection entries.
    #[must_use]
    pub fn default_element_name(mut self, name: impl Into<String>) -> Self {
        self.default_element_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PersisterConfig::default();
        assert!(!config.ignore_missing);
        assert!(!config.ignore_nulls);
        assert_eq!(config.default_element_name, "element");
    }

    #[test]
    fn builder_pattern() {
        let config = PersisterConfig::new()
            .ignore_missing(true)
            .ignore_nulls(true)
            .default_element_name("item");

        assert!(config.ignore_missing);
        assert!(config.ignore_nulls);
        assert_eq!(config.default_element_name, "item");
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: PersisterConfig = serde_json::from_str(r#"{"ignore_nulls":true}"#).unwrap();
        assert!(config.ignore_nulls);
        assert!(!config.ignore_missing);
        assert_eq!(config.default_element_name, DEFAULT_ELEMENT_NAME);
    }
}
