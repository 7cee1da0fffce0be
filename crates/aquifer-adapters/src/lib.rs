//! Aquifer Adapters - backend registry and pool wiring
//!
//! Ties the layers together: an [`AdapterRegistry`] maps invariant names
//! to compiled-in backends, and a [`ConfiguredFactory`] turns one
//! [`aquifer_core::AdapterConfig`] plus that registry into the factory a
//! [`aquifer_pool::ResourcePool`] creates its resources with.

mod factory;
mod registry;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use factory::ConfiguredFactory;
pub use registry::{AdapterRegistry, AdapterType};

#[cfg(feature = "sqlite")]
pub use aquifer_adapter_sqlite::SqliteAdapter;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteAdapterType;
