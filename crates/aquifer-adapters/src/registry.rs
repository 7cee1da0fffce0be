//! Adapter type registry

use aquifer_core::{AdapterConfig, DataAdapter, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A backend implementation, keyed by its invariant name
///
/// One instance per backend, shared by every configuration that names it;
/// `connect` builds a fresh adapter for one configuration.
#[async_trait]
pub trait AdapterType: Send + Sync {
    /// The invariant name configurations refer to (e.g. "sqlite")
    fn invariant(&self) -> &str;

    /// Build an adapter for the given configuration
    ///
    /// The adapter is constructed but not opened; the pool factory or the
    /// pooled handle opens it.
    async fn connect(&self, config: &AdapterConfig) -> Result<Arc<dyn DataAdapter>>;

    /// Verify that the configuration can produce a working connection
    async fn test_connection(&self, config: &AdapterConfig) -> Result<()> {
        let adapter = self.connect(config).await?;
        adapter.open().await?;
        adapter.close().await
    }
}

/// Registry of available adapter types
pub struct AdapterRegistry {
    types: RwLock<HashMap<String, Arc<dyn AdapterType>>>,
}

impl AdapterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            types: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with every compiled-in backend registered
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        #[cfg(feature = "sqlite")]
        registry.register(Arc::new(crate::sqlite::SqliteAdapterType));
        registry
    }

    /// Register an adapter type, replacing any previous registration of
    /// the same invariant
    pub fn register(&self, adapter_type: Arc<dyn AdapterType>) {
        let invariant = adapter_type.invariant().to_string();
        tracing::debug!(invariant = %invariant, "registering adapter type");
        if self.types.write().insert(invariant.clone(), adapter_type).is_some() {
            tracing::warn!(invariant = %invariant, "replaced existing adapter type");
        }
    }

    /// Look up an adapter type by invariant name
    pub fn get(&self, invariant: &str) -> Option<Arc<dyn AdapterType>> {
        self.types.read().get(invariant).cloned()
    }

    /// Whether an adapter type is registered for the invariant
    pub fn has(&self, invariant: &str) -> bool {
        self.types.read().contains_key(invariant)
    }

    /// Invariant names of every registered adapter type
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("types", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_has_nothing() {
        let registry = AdapterRegistry::new();
        assert!(!registry.has("sqlite"));
        assert!(registry.get("sqlite").is_none());
        assert!(registry.list().is_empty());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn defaults_include_sqlite() {
        let registry = AdapterRegistry::with_defaults();
        assert!(registry.has("sqlite"));
        assert_eq!(registry.list(), vec!["sqlite".to_string()]);
    }
}
