//! Configured pool factory: adapter config + registry lookup

use crate::registry::AdapterRegistry;
use crate::AdapterType;
use aquifer_core::{AdapterConfig, CreationCode, DataAdapter, Error, Result};
use aquifer_pool::AdapterFactory;
use async_trait::async_trait;
use std::sync::Arc;

/// An [`AdapterFactory`] that builds adapters from one configuration
///
/// Resolution failures are creation errors with a distinguishing code:
/// an unregistered invariant is `EMOD`, a missing or invalid connection
/// parameter is `ECONF`, and a connect failure is `ECONN`. None are
/// retried by the pool.
pub struct ConfiguredFactory {
    config: AdapterConfig,
    adapter_type: Arc<dyn AdapterType>,
}

impl ConfiguredFactory {
    /// Resolve a configuration against the registry
    pub fn resolve(registry: &AdapterRegistry, config: AdapterConfig) -> Result<Self> {
        let adapter_type = registry.get(&config.invariant).ok_or_else(|| {
            Error::creation(
                CreationCode::MissingAdapter,
                format!("no adapter type registered for invariant '{}'", config.invariant),
            )
        })?;
        Ok(Self {
            config,
            adapter_type,
        })
    }

    /// The configuration this factory builds adapters from
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }
}

#[async_trait]
impl AdapterFactory for ConfiguredFactory {
    #[tracing::instrument(skip(self), fields(adapter = %self.config.name, invariant = %self.config.invariant))]
    async fn create(&self) -> Result<Arc<dyn DataAdapter>> {
        let adapter = self
            .adapter_type
            .connect(&self.config)
            .await
            .map_err(creation_error)?;
        adapter.open().await.map_err(creation_error)?;
        Ok(adapter)
    }
}

fn creation_error(error: Error) -> Error {
    match error {
        error @ Error::Creation { .. } => error,
        Error::Configuration(message) => Error::creation(CreationCode::MissingConfig, message),
        other => Error::creation(CreationCode::Connect, other.to_string()),
    }
}

impl std::fmt::Debug for ConfiguredFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredFactory")
            .field("name", &self.config.name)
            .field("invariant", &self.config.invariant)
            .finish()
    }
}
