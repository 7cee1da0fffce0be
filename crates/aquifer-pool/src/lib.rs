//! Aquifer Pool - bounded resource pooling for data adapters
//!
//! Wraps any [`aquifer_core::DataAdapter`] factory in a pool with a hard
//! capacity bound, strict FIFO fairness for waiting acquirers, per-call
//! cancellation, lease lifetime enforcement, and a drain cycle for
//! shutdown. The [`PoolRegistry`] keys pools by logical adapter name so
//! every caller that shares a name shares the same resources.
//!
//! # Example
//!
//! ```ignore
//! let registry = PoolRegistry::new();
//! let pool = registry
//!     .get_or_create("local", PoolConfig::new(10), factory)
//!     .await;
//!
//! let mut handle = PooledAdapter::new(pool);
//! handle.execute("DELETE FROM sessions WHERE expired = 1", &[]).await?;
//! handle.close();
//! ```

mod config;
mod context;
mod factory;
mod handle;
mod pool;
mod registry;
mod stats;


pub use config::{PoolConfig, DEFAULT_ACQUIRE_TIMEOUT_MS, DEFAULT_CAPACITY};
pub use context::AcquireContext;
pub use factory::AdapterFactory;
pub use handle::PooledAdapter;
pub use pool::{Lease, ResourcePool};
pub use registry::PoolRegistry;
pub use stats::PoolStats;
