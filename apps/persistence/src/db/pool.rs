//! One named connection pool plus its lease accounting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::{debug, info, warn};

use crate::config::db::DbKind;
use crate::error::AppError;

/// Point-in-time view of a pool's lease counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub borrowed: u64,
    pub released: u64,
    pub in_use: u64,
    pub peak_in_use: u64,
}

#[derive(Debug, Default)]
struct LeaseCounters {
    borrowed: AtomicU64,
    released: AtomicU64,
    in_use: AtomicU64,
    peak_in_use: AtomicU64,
}

impl LeaseCounters {
    fn snapshot(&self) -> PoolStats {
        PoolStats {
            borrowed: self.borrowed.load(Ordering::Acquire),
            released: self.released.load(Ordering::Acquire),
            in_use: self.in_use.load(Ordering::Acquire),
            peak_in_use: self.peak_in_use.load(Ordering::Acquire),
        }
    }
}

/// Accounting record for one borrowed connection. Dropping it is the release.
#[derive(Debug)]
pub(crate) struct PoolLease {
    counters: Arc<LeaseCounters>,
}

impl PoolLease {
    fn acquire(counters: Arc<LeaseCounters>) -> Self {
        counters.borrowed.fetch_add(1, Ordering::AcqRel);
        let now = counters.in_use.fetch_add(1, Ordering::AcqRel) + 1;
        counters.peak_in_use.fetch_max(now, Ordering::AcqRel);
        Self { counters }
    }
}

impl Drop for PoolLease {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::AcqRel);
        self.counters.in_use.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A bounded pool of connections to one backing store.
///
/// Cloning is cheap; clones share the underlying sqlx pool and counters.
#[derive(Clone)]
pub struct ConnectionPool {
    name: String,
    kind: DbKind,
    id: String,
    conn: DatabaseConnection,
    counters: Arc<LeaseCounters>,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("pool_id", &self.id)
            .finish_non_exhaustive()
    }
}

impl ConnectionPool {
    pub fn new(
        name: impl Into<String>,
        kind: DbKind,
        id: impl Into<String>,
        conn: DatabaseConnection,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            id: id.into(),
            conn,
            counters: Arc::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DbKind {
        self.kind
    }

    pub fn pool_id(&self) -> &str {
        &self.id
    }

    /// The sea-orm handle; used by migrations and diagnostics, never by gateways.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot()
    }

    /// Borrow one physical connection and open a store transaction on it.
    ///
    /// Blocks while the pool is exhausted, up to the configured acquire
    /// timeout. Any failure here is an acquisition error; nothing is leased.
    pub(crate) async fn checkout(&self) -> Result<(DatabaseTransaction, PoolLease), AppError> {
        let conn = self.conn.begin().await.map_err(|e| {
            warn!(pool = %self.name, pool_id = %self.id, error = %e, "pool=checkout_failed");
            AppError::acquisition(&self.name, e)
        })?;
        let lease = PoolLease::acquire(Arc::clone(&self.counters));
        debug!(pool = %self.name, in_use = self.counters.in_use.load(Ordering::Relaxed), "pool=checkout");
        Ok((conn, lease))
    }

    /// Close every idle connection and refuse new checkouts.
    pub async fn close(&self) -> Result<(), AppError> {
        let stats = self.stats();
        self.conn.clone().close().await.map_err(AppError::from)?;
        info!(
            pool = %self.name,
            pool_id = %self.id,
            borrowed = stats.borrowed,
            released = stats.released,
            "pool=closed"
        );
        Ok(())
    }
}
