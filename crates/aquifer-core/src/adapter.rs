//! Data adapter traits: the uniform contract every backend implements
//!
//! The pool treats an adapter as an opaque resource; everything dialect
//! specific (SQL formatting, type mapping, DDL generation) lives behind
//! these traits.

use crate::migration::{Migration, MigrationOutcome};
use crate::types::{QueryResult, StatementResult, Value};
use crate::Result;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

/// A boxed future, used for transaction bodies
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Body of a transactional operation
///
/// The closure receives the adapter the transaction is running on and
/// returns the work to perform between BEGIN and COMMIT. Returning an
/// error rolls the transaction back.
pub type TransactionWork =
    Box<dyn for<'a> FnOnce(&'a dyn DataAdapter) -> BoxFuture<'a, Result<()>> + Send>;

/// A database adapter: one live connection to a backend
///
/// Implementations must be `Send + Sync`; once leased from a pool an
/// adapter is used single-threaded by its lessee until release.
#[async_trait]
pub trait DataAdapter: Send + Sync + std::fmt::Debug {
    /// The invariant name of the backing driver (e.g. "sqlite", "postgres")
    fn adapter_name(&self) -> &str;

    /// Open the underlying connection if it is not already open
    async fn open(&self) -> Result<()>;

    /// Close the underlying connection
    async fn close(&self) -> Result<()>;

    /// Check whether the connection is closed
    fn is_closed(&self) -> bool;

    /// Execute a statement that modifies data (INSERT/UPDATE/DELETE/DDL)
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a query that returns rows (SELECT)
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Run `work` inside a transaction, committing on success and rolling
    /// back on error
    async fn execute_in_transaction(&self, work: TransactionWork) -> Result<()>;

    /// Bring the table described by `migration` up to date
    async fn migrate(&self, migration: &Migration) -> Result<MigrationOutcome>;

    /// Get the identity-generation interface if this adapter supports it
    fn as_identity_source(&self) -> Option<&dyn IdentitySource> {
        None
    }

    /// Get the view-creation interface if this adapter supports it
    fn as_view_source(&self) -> Option<&dyn ViewSource> {
        None
    }
}

/// Optional capability: identity value generation
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// The identity value produced by the most recent INSERT on this
    /// connection
    async fn last_identity(&self) -> Result<Value>;

    /// Produce a new identity value for the given entity and attribute,
    /// persisted so concurrent producers never repeat a value
    async fn select_identity(&self, entity: &str, attribute: &str) -> Result<i64>;
}

/// Optional capability: database view management
#[async_trait]
pub trait ViewSource: Send + Sync {
    /// Create or replace a database view backed by the given SELECT
    async fn create_view(&self, name: &str, query: &str) -> Result<()>;
}
