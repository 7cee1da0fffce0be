//! Resource factory trait

use aquifer_core::{DataAdapter, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Creates and destroys the adapters a pool manages
///
/// `create` is called outside the pool lock, so slow connects never block
/// releases or stats. `destroy` is best-effort: close failures are logged
/// and swallowed because the resource is already out of the pool.
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    /// Create a fresh adapter, connected and ready to lease
    async fn create(&self) -> Result<Arc<dyn DataAdapter>>;

    /// Dispose of an adapter the pool no longer tracks
    async fn destroy(&self, adapter: Arc<dyn DataAdapter>) {
        if let Err(error) = adapter.close().await {
            tracing::warn!(%error, "failed to close discarded adapter");
        }
    }
}

#[async_trait]
impl<T: AdapterFactory + ?Sized> AdapterFactory for Arc<T> {
    async fn create(&self) -> Result<Arc<dyn DataAdapter>> {
        (**self).create().await
    }

    async fn destroy(&self, adapter: Arc<dyn DataAdapter>) {
        (**self).destroy(adapter).await;
    }
}
