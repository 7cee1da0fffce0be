//! SQLite adapter type registration

use crate::registry::AdapterType;
use aquifer_adapter_sqlite::SqliteAdapter;
use aquifer_core::{AdapterConfig, DataAdapter, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// The SQLite backend, registered under the invariant `sqlite`
#[derive(Debug)]
pub struct SqliteAdapterType;

#[async_trait]
impl AdapterType for SqliteAdapterType {
    fn invariant(&self) -> &str {
        "sqlite"
    }

    async fn connect(&self, config: &AdapterConfig) -> Result<Arc<dyn DataAdapter>> {
        Ok(Arc::new(SqliteAdapter::from_config(config)?))
    }
}
