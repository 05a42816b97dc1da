use futures::future::BoxFuture;
use tracing::{debug, warn};

use super::pool::ConnectionPool;
use super::registry::{self, PoolRegistry};
use super::txn::Transaction;
use super::txn_policy::{self, TxnPolicy};
use crate::config::db::MAIN_POOL;
use crate::error::AppError;

/// Hands out units of work on the main pool.
///
/// Cheap to clone; every clone borrows from the same pool.
#[derive(Debug, Clone)]
pub struct TransactionManager {
    pool: ConnectionPool,
}

impl TransactionManager {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Resolve the main pool once from a registry.
    pub fn from_registry(registry: &PoolRegistry) -> Result<Self, AppError> {
        registry.get_connection_pool(MAIN_POOL).cloned().map(Self::new)
    }

    /// Resolve the main pool from the installed process registry.
    pub fn global() -> Result<Self, AppError> {
        let registry = registry::global()?;
        Self::from_registry(&registry)
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Borrow a connection and wrap it in a new, Open transaction.
    ///
    /// Waits while the pool is exhausted, up to its acquire timeout; fails with
    /// an acquisition error and no transaction otherwise.
    pub async fn begin(&self) -> Result<Transaction, AppError> {
        let (conn, lease) = self.pool.checkout().await?;
        let txn = Transaction::new(self.pool.name(), conn, lease);
        debug!(txn = %txn.id(), pool = %self.pool.name(), "txn=begin");
        Ok(txn)
    }

    /// Run `f` inside a unit of work.
    ///
    /// On `Ok` the process [`TxnPolicy`] decides between commit and rollback,
    /// unless `f` already finished the transaction itself. On `Err` the
    /// transaction is rolled back and the closure's error is returned as-is.
    ///
    /// ```ignore
    /// let user = manager
    ///     .with_txn(|txn| Box::pin(async move {
    ///         txn.new_user_gateway().create_confirmed(new_user).await
    ///     }))
    ///     .await?;
    /// ```
    pub async fn with_txn<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: for<'t> FnOnce(&'t Transaction) -> BoxFuture<'t, Result<R, E>>,
        E: From<AppError>,
    {
        let txn = self.begin().await?;
        let out = f(&txn).await;

        match out {
            Ok(val) => {
                if txn.is_open() {
                    match txn_policy::current() {
                        TxnPolicy::CommitOnOk => txn.commit().await?,
                        TxnPolicy::RollbackOnOk => txn.rollback().await?,
                    }
                }
                Ok(val)
            }
            Err(err) => {
                // Best-effort; the closure's error wins.
                if let Err(rollback_err) = txn.close().await {
                    warn!(
                        code = rollback_err.code(),
                        error = %rollback_err,
                        "txn=rollback_failed after closure error"
                    );
                }
                Err(err)
            }
        }
    }
}
