//! Adapter configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for one logical adapter
///
/// `name` is the logical identity call sites share a pool under;
/// `invariant` names the driver implementation that backs it. The
/// parameter map carries driver-specific connection options (host, port,
/// credentials, file path) as opaque strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Logical adapter name (pool key)
    pub name: String,
    /// Driver invariant name (e.g. "sqlite", "postgres", "mysql")
    pub invariant: String,
    /// Driver-specific connection parameters
    pub params: HashMap<String, String>,
}

impl AdapterConfig {
    /// Create a new configuration
    pub fn new(invariant: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            invariant: invariant.to_string(),
            params: HashMap::new(),
        }
    }

    /// Set a connection parameter
    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        let val = value.into();
        let str_val = match val {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        self.params.insert(key.to_string(), str_val);
        self
    }

    /// Get a string parameter
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Get an integer parameter
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.params.get(key).and_then(|v| v.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_coerce_to_strings() {
        let config = AdapterConfig::new("sqlite", "local")
            .with_param("path", "/tmp/test.db")
            .with_param("busy_timeout", 5000);

        assert_eq!(config.get_string("path"), Some("/tmp/test.db"));
        assert_eq!(config.get_i64("busy_timeout"), Some(5000));
        assert_eq!(config.get_string("missing"), None);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = AdapterConfig::new("sqlite", "local").with_param("path", ":memory:");
        let json = serde_json::to_string(&config).expect("serialize");
        let back: AdapterConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.invariant, "sqlite");
        assert_eq!(back.get_string("path"), Some(":memory:"));
    }
}
