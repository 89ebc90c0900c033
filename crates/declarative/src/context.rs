//! Provider traits for configuration and attribute knowledge
//!
//! These traits keep the graph independent of where stack configuration lives
//! and of which cloud provider schema is in use.

use crate::error::{Error, Result};
use crate::types::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Source of stack configuration values and secret key names
///
/// Implementations never hand out secret plaintext. They only answer whether
/// the external secret store holds a given key.
pub trait ConfigSource {
    /// Plain (non-secret) configuration value
    fn value(&self, key: &str) -> Option<String>;

    /// Whether the external secret store holds `key`
    fn has_secret(&self, key: &str) -> bool;

    /// Plain value, or [`Error::MissingConfig`]
    fn require(&self, key: &str) -> Result<String> {
        self.value(key)
            .ok_or_else(|| Error::MissingConfig(key.to_string()))
    }

    /// Secret reference, or [`Error::MissingConfig`] if the key is unknown
    fn require_secret(&self, key: &str) -> Result<Value> {
        if self.has_secret(key) {
            Ok(Value::secret(key))
        } else {
            Err(Error::MissingConfig(key.to_string()))
        }
    }
}

/// Knowledge of which computed attributes each resource kind exposes
pub trait AttributeCatalog {
    /// Check whether `kind` exposes `attribute`
    ///
    /// # Arguments
    /// * `kind` - Provider type token of the referenced resource
    /// * `attribute` - Attribute path, possibly dotted
    fn knows(&self, kind: &str, attribute: &str) -> bool;
}

/// Catalog that accepts every attribute
pub struct AnyAttribute;

impl AttributeCatalog for AnyAttribute {
    fn knows(&self, _kind: &str, _attribute: &str) -> bool {
        true
    }
}

/// In-memory configuration source
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: BTreeMap<String, String>,
    secrets: BTreeSet<String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with_secret(mut self, key: impl Into<String>) -> Self {
        self.secrets.insert(key.into());
        self
    }
}

impl ConfigSource for MapConfig {
    fn value(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn has_secret(&self, key: &str) -> bool {
        self.secrets.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_reports_missing_key() {
        let cfg = MapConfig::new().with_value("region", "us-west1");
        assert_eq!(cfg.require("region").unwrap(), "us-west1");
        assert!(matches!(cfg.require("zone"), Err(Error::MissingConfig(k)) if k == "zone"));
    }

    #[test]
    fn test_require_secret_never_returns_plaintext() {
        let cfg = MapConfig::new().with_secret("db-root-password");
        let v = cfg.require_secret("db-root-password").unwrap();
        assert_eq!(v, Value::secret("db-root-password"));
        assert!(cfg.require_secret("jwt-secret").is_err());
    }
}
