//! Aquifer Core - shared adapter contract and types
//!
//! This crate defines the uniform contract that every database backend
//! implements ([`DataAdapter`] and its optional capabilities), the value
//! and result types those adapters exchange, the migration data model they
//! consume, and the single error type used across the workspace.

mod adapter;
mod config;
mod error;
mod migration;
mod types;

pub use adapter::{BoxFuture, DataAdapter, IdentitySource, TransactionWork, ViewSource};
pub use config::AdapterConfig;
pub use error::{CreationCode, Error, Result};
pub use migration::{FieldSpec, FieldType, Migration, MigrationOutcome};
pub use types::{QueryResult, Row, StatementResult, Value};
