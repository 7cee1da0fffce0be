//! Resource pool: bounded leasing with FIFO waiters
//!
//! The pool tracks three populations under one lock: idle resources keyed
//! by id (lowest id leased first, so reuse is deterministic), leased
//! resources, and a FIFO queue of waiting acquirers. A release hands the
//! resource directly to the oldest live waiter instead of parking it,
//! which is what makes fairness strict rather than best-effort.
//!
//! Adapter creation and close never run under the lock; a slow connect
//! or teardown cannot block releases, stats, or other acquires.

use crate::config::PoolConfig;
use crate::context::AcquireContext;
use crate::factory::AdapterFactory;
use crate::stats::PoolStats;
use aquifer_core::{DataAdapter, Error, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Lifecycle state of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolState {
    /// Accepting acquisitions
    Active,
    /// Draining: acquisitions fail fast with [`Error::PoolUnavailable`]
    Paused,
}

/// A leased resource: the adapter plus the bookkeeping the pool needs to
/// take it back
///
/// Dropping a lease does NOT return the resource; callers go through
/// [`ResourcePool::release`] (the pooled handle does this on drop).
pub struct Lease {
    id: u64,
    adapter: Arc<dyn DataAdapter>,
    revoked: Arc<AtomicBool>,
}

impl Lease {
    /// Pool-internal id of the leased resource
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The leased adapter
    pub fn adapter(&self) -> &Arc<dyn DataAdapter> {
        &self.adapter
    }

    /// Whether the lifetime sweep retired this resource while leased
    ///
    /// An expired lease must not be used; operations through the pooled
    /// handle fail with [`Error::ResourceExpired`] once this is set.
    pub fn is_expired(&self) -> bool {
        self.revoked.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("id", &self.id)
            .field("expired", &self.is_expired())
            .finish()
    }
}

struct IdleEntry {
    adapter: Arc<dyn DataAdapter>,
    created_at: Instant,
}

struct LeaseEntry {
    adapter: Arc<dyn DataAdapter>,
    created_at: Instant,
    leased_at: Instant,
    revoked: Arc<AtomicBool>,
}

struct Waiter {
    id: u64,
    tx: oneshot::Sender<Lease>,
}

struct PoolInner {
    state: PoolState,
    /// Idle resources, keyed by resource id; iteration order (lowest id
    /// first) decides which idle resource an acquire takes
    available: BTreeMap<u64, IdleEntry>,
    /// Leased resources, keyed by resource id
    in_use: HashMap<u64, LeaseEntry>,
    /// Queued acquirers, oldest first
    waiters: VecDeque<Waiter>,
    /// Factory calls in flight; these hold capacity slots so a burst of
    /// acquires cannot overshoot the bound while connects are pending
    creating: usize,
    next_resource_id: u64,
    next_waiter_id: u64,
}

impl PoolInner {
    fn has_capacity(&self, config: &PoolConfig) -> bool {
        !config.is_bounded() || self.in_use.len() + self.creating < config.capacity
    }

    /// Move the idle resource with the lowest id (if any) into `in_use`
    /// and build the caller-facing lease.
    fn lease_idle(&mut self) -> Option<Lease> {
        let (id, entry) = self.available.pop_first()?;
        Some(self.install_lease(id, entry.adapter, entry.created_at))
    }

    fn install_lease(&mut self, id: u64, adapter: Arc<dyn DataAdapter>, created_at: Instant) -> Lease {
        let revoked = Arc::new(AtomicBool::new(false));
        self.in_use.insert(
            id,
            LeaseEntry {
                adapter: adapter.clone(),
                created_at,
                leased_at: Instant::now(),
                revoked: revoked.clone(),
            },
        );
        Lease {
            id,
            adapter,
            revoked,
        }
    }

    /// Retire every lease older than `max_lifetime`. Returns the retired
    /// adapters so the caller can close them outside the lock.
    fn sweep_expired(
        &mut self,
        max_lifetime: Option<Duration>,
        now: Instant,
    ) -> Vec<Arc<dyn DataAdapter>> {
        let Some(max_lifetime) = max_lifetime else {
            return Vec::new();
        };
        let expired: Vec<u64> = self
            .in_use
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.leased_at) > max_lifetime)
            .map(|(&id, _)| id)
            .collect();
        let mut retired = Vec::with_capacity(expired.len());
        for id in expired {
            if let Some(entry) = self.in_use.remove(&id) {
                entry.revoked.store(true, Ordering::SeqCst);
                tracing::warn!(resource_id = id, "retiring adapter leased past max lifetime");
                retired.push(entry.adapter);
            }
        }
        retired
    }
}

/// What an acquire decided to do while it held the lock
enum AcquirePlan {
    Ready(Lease),
    Create,
    Wait(oneshot::Receiver<Lease>, u64),
    Unavailable,
}

/// A bounded pool of [`DataAdapter`] resources
///
/// See the module docs for the concurrency design. All methods take
/// `&self`; the pool is shared behind an [`Arc`].
pub struct ResourcePool {
    config: PoolConfig,
    factory: Arc<dyn AdapterFactory>,
    inner: Mutex<PoolInner>,
}

impl ResourcePool {
    /// Create an empty pool. No resources are created until the first
    /// acquire (or [`warm`](Self::warm)).
    pub fn new(config: PoolConfig, factory: Arc<dyn AdapterFactory>) -> Self {
        Self {
            config,
            factory,
            inner: Mutex::new(PoolInner {
                state: PoolState::Active,
                available: BTreeMap::new(),
                in_use: HashMap::new(),
                waiters: VecDeque::new(),
                creating: 0,
                next_resource_id: 0,
                next_waiter_id: 0,
            }),
        }
    }

    /// The configuration this pool was built with
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Acquire a resource without cancellation support
    pub async fn acquire(&self) -> Result<Lease> {
        self.acquire_with(&AcquireContext::new()).await
    }

    /// Acquire a resource, waiting up to the configured timeout
    ///
    /// Satisfied from the idle set when possible, by creating a new
    /// resource when under capacity, and by queuing FIFO behind earlier
    /// waiters otherwise. Fails fast with [`Error::PoolUnavailable`] while
    /// the pool is draining.
    pub async fn acquire_with(&self, ctx: &AcquireContext) -> Result<Lease> {
        let (plan, retired) = self.plan_acquire();
        self.close_retired(retired).await;
        match plan {
            AcquirePlan::Unavailable => Err(Error::PoolUnavailable),
            AcquirePlan::Ready(lease) => Ok(lease),
            AcquirePlan::Create => self.create_lease().await,
            AcquirePlan::Wait(rx, waiter_id) => self.wait_for_handoff(ctx, rx, waiter_id).await,
        }
    }

    fn plan_acquire(&self) -> (AcquirePlan, Vec<Arc<dyn DataAdapter>>) {
        let mut inner = self.inner.lock();
        if inner.state != PoolState::Active {
            return (AcquirePlan::Unavailable, Vec::new());
        }
        if let Some(lease) = inner.lease_idle() {
            return (AcquirePlan::Ready(lease), Vec::new());
        }
        if inner.has_capacity(&self.config) {
            inner.creating += 1;
            return (AcquirePlan::Create, Vec::new());
        }
        // At capacity with nothing idle. Retire over-held leases first;
        // each retirement frees a slot.
        let retired = inner.sweep_expired(self.config.max_lifetime(), Instant::now());
        if !retired.is_empty() && inner.has_capacity(&self.config) {
            inner.creating += 1;
            return (AcquirePlan::Create, retired);
        }
        let (tx, rx) = oneshot::channel();
        let waiter_id = inner.next_waiter_id;
        inner.next_waiter_id += 1;
        inner.waiters.push_back(Waiter { id: waiter_id, tx });
        tracing::trace!(waiter_id, "queued for a pooled adapter");
        (AcquirePlan::Wait(rx, waiter_id), retired)
    }

    async fn create_lease(&self) -> Result<Lease> {
        match self.factory.create().await {
            Ok(adapter) => {
                let mut inner = self.inner.lock();
                inner.creating -= 1;
                let id = inner.next_resource_id;
                inner.next_resource_id += 1;
                tracing::debug!(resource_id = id, "created pooled adapter");
                Ok(inner.install_lease(id, adapter, Instant::now()))
            }
            Err(error) => {
                // Give the capacity slot back; a failed connect must not
                // shrink the pool.
                self.inner.lock().creating -= 1;
                tracing::warn!(%error, "adapter creation failed");
                Err(error)
            }
        }
    }

    async fn wait_for_handoff(
        &self,
        ctx: &AcquireContext,
        mut rx: oneshot::Receiver<Lease>,
        waiter_id: u64,
    ) -> Result<Lease> {
        let timeout = tokio::time::sleep(self.config.acquire_timeout());
        tokio::pin!(timeout);
        tokio::select! {
            handoff = &mut rx => match handoff {
                Ok(lease) => Ok(lease),
                Err(_) => Err(Error::PoolUnavailable),
            },
            () = &mut timeout => self.abandon_wait(waiter_id, rx, Error::AcquireTimeout(
                format!("no adapter released within {}ms", self.config.acquire_timeout_ms),
            )),
            () = ctx.cancelled() => self.abandon_wait(waiter_id, rx, Error::Cancelled),
        }
    }

    /// Leave the waiter queue after a timeout or cancellation.
    ///
    /// A release may have popped this waiter and sent a lease in the same
    /// instant; the queue check and the handoff both happen under the pool
    /// lock, so either the waiter is still queued (remove it and fail) or
    /// a lease is already sitting in the channel (take it and succeed).
    fn abandon_wait(
        &self,
        waiter_id: u64,
        mut rx: oneshot::Receiver<Lease>,
        error: Error,
    ) -> Result<Lease> {
        let still_queued = {
            let mut inner = self.inner.lock();
            let before = inner.waiters.len();
            inner.waiters.retain(|waiter| waiter.id != waiter_id);
            inner.waiters.len() != before
        };
        if still_queued {
            return Err(error);
        }
        match rx.try_recv() {
            Ok(lease) => Ok(lease),
            Err(_) => Err(error),
        }
    }

    /// Return a leased resource to the pool
    ///
    /// If waiters are queued the resource is handed directly to the oldest
    /// one; otherwise it goes back to the idle set. Releasing a lease the
    /// pool no longer tracks (already released, or retired by the lifetime
    /// sweep) is a no-op apart from a best-effort close of the orphaned
    /// adapter. Releasing into a draining pool closes the resource instead
    /// of repooling it.
    pub fn release(&self, lease: &Lease) {
        let mut inner = self.inner.lock();
        // The tracked entry must belong to THIS lease; after a handoff the
        // same resource id maps to the next holder's lease, and a stale
        // double-release must not evict them.
        let owns_entry = inner
            .in_use
            .get(&lease.id)
            .map(|entry| Arc::ptr_eq(&entry.revoked, &lease.revoked));
        let entry = match owns_entry {
            Some(true) => match inner.in_use.remove(&lease.id) {
                Some(entry) => entry,
                None => return,
            },
            Some(false) => {
                tracing::debug!(resource_id = lease.id, "stale release ignored");
                return;
            }
            None => {
                // A double release finds its resource already repooled;
                // leave it alone. Anything else is truly orphaned (e.g. a
                // lease retired by the sweep) and gets a best-effort close.
                let repooled = inner
                    .available
                    .get(&lease.id)
                    .is_some_and(|idle| Arc::ptr_eq(&idle.adapter, &lease.adapter));
                drop(inner);
                if !repooled {
                    tracing::debug!(resource_id = lease.id, "release of untracked adapter");
                    self.spawn_close(lease.adapter.clone());
                }
                return;
            }
        };

        if inner.state == PoolState::Paused {
            drop(inner);
            self.spawn_close(entry.adapter);
            return;
        }

        // Direct handoff: skip waiters whose futures are already gone
        // (timed out or cancelled between queue checks).
        let mut resource = Some((entry.adapter, entry.created_at));
        while let Some((adapter, created_at)) = resource.take() {
            let Some(waiter) = inner.waiters.pop_front() else {
                inner.available.insert(lease.id, IdleEntry { adapter, created_at });
                break;
            };
            let handoff = inner.install_lease(lease.id, adapter, created_at);
            if let Err(returned) = waiter.tx.send(handoff) {
                inner.in_use.remove(&lease.id);
                resource = Some((returned.adapter, created_at));
            } else {
                tracing::trace!(resource_id = lease.id, waiter_id = waiter.id, "handed off adapter");
            }
        }
    }

    /// Retire every lease held longer than the configured maximum
    /// lifetime, closing the retired adapters
    ///
    /// Holders of retired leases observe [`Error::ResourceExpired`] on
    /// their next operation. No-op when lifetime enforcement is disabled.
    pub async fn sweep(&self) {
        let retired = {
            let mut inner = self.inner.lock();
            inner.sweep_expired(self.config.max_lifetime(), Instant::now())
        };
        self.close_retired(retired).await;
    }

    /// Drain the pool: pause acquisitions, close every idle resource, then
    /// resume
    ///
    /// Leased resources are untouched; they are closed when released
    /// (release during the pause closes instead of repooling). Returns the
    /// first close error after attempting every close.
    pub async fn drain(&self) -> Result<()> {
        let idle: Vec<IdleEntry> = {
            let mut inner = self.inner.lock();
            inner.state = PoolState::Paused;
            std::mem::take(&mut inner.available).into_values().collect()
        };
        tracing::debug!(count = idle.len(), "draining idle adapters");
        let mut first_error = None;
        for entry in idle {
            if let Err(error) = entry.adapter.close().await {
                tracing::warn!(%error, "failed to close idle adapter during drain");
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        self.inner.lock().state = PoolState::Active;
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Pre-create idle resources until the pool holds `reserved` of them
    ///
    /// Creation failures end the warm-up early; the pool still works, it
    /// just starts colder than asked.
    pub async fn warm(&self) {
        loop {
            {
                let mut inner = self.inner.lock();
                if inner.state != PoolState::Active {
                    return;
                }
                let owned = inner.available.len() + inner.in_use.len() + inner.creating;
                if owned >= self.config.reserved {
                    return;
                }
                inner.creating += 1;
            }
            match self.factory.create().await {
                Ok(adapter) => {
                    let mut inner = self.inner.lock();
                    inner.creating -= 1;
                    let id = inner.next_resource_id;
                    inner.next_resource_id += 1;
                    inner.available.insert(
                        id,
                        IdleEntry {
                            adapter,
                            created_at: Instant::now(),
                        },
                    );
                }
                Err(error) => {
                    self.inner.lock().creating -= 1;
                    tracing::warn!(%error, "warm-up creation failed");
                    return;
                }
            }
        }
    }

    /// A snapshot of current pool occupancy
    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.lock();
        PoolStats {
            total: inner.available.len() + inner.in_use.len(),
            available: inner.available.len(),
            in_use: inner.in_use.len(),
            waiting: inner.waiters.len(),
            capacity: self.config.capacity,
        }
    }

    async fn close_retired(&self, retired: Vec<Arc<dyn DataAdapter>>) {
        for adapter in retired {
            self.factory.destroy(adapter).await;
        }
    }

    /// Close an adapter from a sync context. Falls back to dropping it
    /// without a close when no runtime is running.
    fn spawn_close(&self, adapter: Arc<dyn DataAdapter>) {
        let factory = self.factory.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    factory.destroy(adapter).await;
                });
            }
            Err(_) => {
                tracing::warn!("no runtime available; dropping adapter without close");
            }
        }
    }
}

impl std::fmt::Debug for ResourcePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("ResourcePool")
            .field("capacity", &self.config.capacity)
            .field("available", &stats.available)
            .field("in_use", &stats.in_use)
            .field("waiting", &stats.waiting)
            .finish()
    }
}
