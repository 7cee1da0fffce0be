//! Pool registry: one named pool per adapter configuration

use crate::config::PoolConfig;
use crate::factory::AdapterFactory;
use crate::handle::PooledAdapter;
use crate::pool::ResourcePool;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Registry of named resource pools
///
/// The first registration of a name wins: later calls with the same name
/// return the existing pool and ignore the new configuration, so every
/// caller that shares a name shares the same resources and the same
/// capacity bound.
#[derive(Default)]
pub struct PoolRegistry {
    pools: RwLock<HashMap<String, Arc<ResourcePool>>>,
}

impl PoolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the pool registered under `name`, creating it on first use
    ///
    /// Warms the pool to its reserved size before returning; warming is a
    /// top-up, so repeat calls are cheap.
    pub async fn get_or_create(
        &self,
        name: &str,
        config: PoolConfig,
        factory: Arc<dyn AdapterFactory>,
    ) -> Arc<ResourcePool> {
        let pool = {
            let pools = self.pools.read();
            pools.get(name).cloned()
        };
        let pool = match pool {
            Some(pool) => pool,
            None => {
                let mut pools = self.pools.write();
                pools
                    .entry(name.to_string())
                    .or_insert_with(|| {
                        tracing::info!(
                            pool = name,
                            capacity = config.capacity,
                            reserved = config.reserved,
                            "creating resource pool"
                        );
                        Arc::new(ResourcePool::new(config, factory))
                    })
                    .clone()
            }
        };
        pool.warm().await;
        pool
    }

    /// Get the pool registered under `name`, if any
    pub fn get(&self, name: &str) -> Option<Arc<ResourcePool>> {
        self.pools.read().get(name).cloned()
    }

    /// Create a lazy handle over the pool registered under `name`
    pub fn handle(&self, name: &str) -> aquifer_core::Result<PooledAdapter> {
        match self.get(name) {
            Some(pool) => Ok(PooledAdapter::new(pool)),
            None => Err(aquifer_core::Error::NotFound(format!(
                "no pool registered under '{name}'"
            ))),
        }
    }

    /// Names of every registered pool
    pub fn names(&self) -> Vec<String> {
        self.pools.read().keys().cloned().collect()
    }

    /// Drain every registered pool, logging failures and continuing
    pub async fn drain_all(&self) {
        let pools: Vec<(String, Arc<ResourcePool>)> = {
            let pools = self.pools.read();
            pools
                .iter()
                .map(|(name, pool)| (name.clone(), pool.clone()))
                .collect()
        };
        for (name, pool) in pools {
            if let Err(error) = pool.drain().await {
                tracing::warn!(pool = %name, %error, "drain failed; continuing");
            }
        }
    }

    /// Drain every pool, giving up after `timeout`
    ///
    /// Used at process shutdown where a wedged close must not hang exit.
    pub async fn shutdown(&self, timeout: Duration) {
        if tokio::time::timeout(timeout, self.drain_all()).await.is_err() {
            tracing::warn!("pool drain did not finish before shutdown timeout");
        }
    }
}

impl std::fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.names())
            .finish()
    }
}
