//! Pooled handle: a caller-facing adapter that leases lazily
//!
//! The handle looks like an adapter but owns no connection until the
//! first operation needs one. It then acquires from the pool, opens the
//! leased adapter, and forwards every operation to it until closed or
//! dropped, at which point the lease goes back to the pool.

use crate::context::AcquireContext;
use crate::pool::{Lease, ResourcePool};
use aquifer_core::{
    Error, Migration, MigrationOutcome, QueryResult, Result, StatementResult, TransactionWork,
    Value,
};
use std::sync::Arc;

/// An adapter on loan from a [`ResourcePool`]
///
/// Acquires lazily on first use. After [`close`](Self::close) every
/// operation fails with [`Error::HandleClosed`]; a fresh handle must be
/// taken from the registry. If the pool's lifetime sweep retires the
/// leased resource, operations fail with [`Error::ResourceExpired`].
pub struct PooledAdapter {
    pool: Arc<ResourcePool>,
    ctx: AcquireContext,
    lease: Option<Lease>,
    closed: bool,
}

impl PooledAdapter {
    /// Create a handle over the given pool
    pub fn new(pool: Arc<ResourcePool>) -> Self {
        Self::with_context(pool, AcquireContext::new())
    }

    /// Create a handle whose acquires honor the given context
    pub fn with_context(pool: Arc<ResourcePool>, ctx: AcquireContext) -> Self {
        Self {
            pool,
            ctx,
            lease: None,
            closed: false,
        }
    }

    /// Whether the handle currently holds a lease
    pub fn is_open(&self) -> bool {
        self.lease.is_some() && !self.closed
    }

    /// Acquire and open the underlying adapter if not already held
    ///
    /// Idempotent while open; later calls reuse the held lease.
    pub async fn open(&mut self) -> Result<()> {
        self.ensure_open().await.map(|_| ())
    }

    async fn ensure_open(&mut self) -> Result<&Lease> {
        if self.closed {
            return Err(Error::HandleClosed);
        }
        if self.lease.is_none() {
            let lease = self.pool.acquire_with(&self.ctx).await?;
            if let Err(error) = lease.adapter().open().await {
                self.pool.release(&lease);
                return Err(error);
            }
            self.lease = Some(lease);
        }
        match &self.lease {
            Some(lease) if lease.is_expired() => Err(Error::ResourceExpired),
            Some(lease) => Ok(lease),
            None => Err(Error::HandleClosed),
        }
    }

    /// Execute a statement that modifies data
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let lease = self.ensure_open().await?;
        lease.adapter().execute(sql, params).await
    }

    /// Execute a query that returns rows
    pub async fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let lease = self.ensure_open().await?;
        lease.adapter().query(sql, params).await
    }

    /// Run `work` inside a transaction on the leased adapter
    pub async fn execute_in_transaction(&mut self, work: TransactionWork) -> Result<()> {
        let lease = self.ensure_open().await?;
        lease.adapter().execute_in_transaction(work).await
    }

    /// Bring the table described by `migration` up to date
    pub async fn migrate(&mut self, migration: &Migration) -> Result<MigrationOutcome> {
        let lease = self.ensure_open().await?;
        lease.adapter().migrate(migration).await
    }

    /// The identity value produced by the most recent INSERT
    pub async fn last_identity(&mut self) -> Result<Value> {
        let lease = self.ensure_open().await?;
        match lease.adapter().as_identity_source() {
            Some(source) => source.last_identity().await,
            None => Err(Error::NotSupported(format!(
                "adapter '{}' does not generate identities",
                lease.adapter().adapter_name()
            ))),
        }
    }

    /// Produce a new persistent identity value for `entity.attribute`
    pub async fn select_identity(&mut self, entity: &str, attribute: &str) -> Result<i64> {
        let lease = self.ensure_open().await?;
        match lease.adapter().as_identity_source() {
            Some(source) => source.select_identity(entity, attribute).await,
            None => Err(Error::NotSupported(format!(
                "adapter '{}' does not generate identities",
                lease.adapter().adapter_name()
            ))),
        }
    }

    /// Create or replace a database view backed by the given SELECT
    pub async fn create_view(&mut self, name: &str, query: &str) -> Result<()> {
        let lease = self.ensure_open().await?;
        match lease.adapter().as_view_source() {
            Some(source) => source.create_view(name, query).await,
            None => Err(Error::NotSupported(format!(
                "adapter '{}' does not manage views",
                lease.adapter().adapter_name()
            ))),
        }
    }

    /// Release the lease back to the pool and seal the handle
    ///
    /// Idempotent. The handle cannot be reopened afterwards.
    pub fn close(&mut self) {
        if let Some(lease) = self.lease.take() {
            self.pool.release(&lease);
        }
        self.closed = true;
    }
}

impl Drop for PooledAdapter {
    fn drop(&mut self) {
        if let Some(lease) = self.lease.take() {
            self.pool.release(&lease);
        }
    }
}

impl std::fmt::Debug for PooledAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledAdapter")
            .field("open", &self.is_open())
            .field("closed", &self.closed)
            .finish()
    }
}
