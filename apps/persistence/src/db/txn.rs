//! The unit of work.
//!
//! A [`Transaction`] owns exactly one borrowed connection (with a store
//! transaction already open on it) from `begin` until it is closed. Every exit
//! path (`commit`, `rollback`/`close`, and `Drop`) takes the checked-out
//! connection out of the same slot, so it is released exactly once.
//!
//! Gateways reach the connection through a [`TxnHandle`], which locks that slot
//! for the duration of one call. Calls therefore run one at a time, in call
//! order, and a call that arrives after the slot was emptied fails with
//! [`AppError::TerminatedTransaction`] without touching any connection.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use sea_orm::DatabaseTransaction;
use tokio::sync::{MappedMutexGuard, Mutex as AsyncMutex, MutexGuard};
use tracing::{debug, warn};
use ulid::Ulid;

use super::pool::PoolLease;
use crate::error::AppError;
use crate::gateways::{
    ConfigurationGateway, Gateway, OrganizationGateway, TokenGateway, UserGateway,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxnState {
    Open,
    Committed,
    Aborted,
    Closed,
}

/// How a finished unit of work ended. Survives the move to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxnOutcome {
    Committed,
    Aborted,
}

impl From<TxnOutcome> for TxnState {
    fn from(outcome: TxnOutcome) -> Self {
        match outcome {
            TxnOutcome::Committed => TxnState::Committed,
            TxnOutcome::Aborted => TxnState::Aborted,
        }
    }
}

struct Checkout {
    conn: DatabaseTransaction,
    lease: PoolLease,
}

#[derive(Debug)]
struct Lifecycle {
    state: TxnState,
    outcome: Option<TxnOutcome>,
}

pub(crate) struct TxnShared {
    id: Ulid,
    pool: String,
    lifecycle: Mutex<Lifecycle>,
    checkout: AsyncMutex<Option<Checkout>>,
}

impl TxnShared {
    fn state(&self) -> TxnState {
        self.lifecycle.lock().state
    }

    /// Open -> Committed | Aborted. The first recorded outcome is final.
    fn finish(&self, outcome: TxnOutcome) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.outcome.is_none() {
            lifecycle.outcome = Some(outcome);
            lifecycle.state = outcome.into();
        }
    }

    fn close(&self) {
        self.lifecycle.lock().state = TxnState::Closed;
    }

    /// Release the connection: outcome first, then the pool lease, then Closed.
    fn release(&self, outcome: TxnOutcome, lease: PoolLease) {
        self.finish(outcome);
        drop(lease);
        self.close();
    }
}

/// A lease taken out of the slot but not yet released.
///
/// If the owning future is dropped before [`PendingRelease::complete`] (a
/// commit abandoned at its await, say) the lease is still released, as
/// `Aborted`.
struct PendingRelease<'a> {
    shared: &'a TxnShared,
    lease: Option<PoolLease>,
}

impl<'a> PendingRelease<'a> {
    fn new(shared: &'a TxnShared, lease: PoolLease) -> Self {
        Self {
            shared,
            lease: Some(lease),
        }
    }

    fn complete(mut self, outcome: TxnOutcome) {
        if let Some(lease) = self.lease.take() {
            self.shared.release(outcome, lease);
        }
    }
}

impl Drop for PendingRelease<'_> {
    fn drop(&mut self) {
        if let Some(lease) = self.lease.take() {
            self.shared.release(TxnOutcome::Aborted, lease);
            warn!(
                txn = %self.shared.id,
                pool = %self.shared.pool,
                "txn=release_abandoned marked aborted"
            );
        }
    }
}

/// Connection handle a gateway is bound to.
#[derive(Clone)]
pub(crate) struct TxnHandle(Arc<TxnShared>);

impl TxnHandle {
    /// Lock the transaction's connection for one gateway call.
    ///
    /// `op` names the call for the terminated-transaction error.
    pub(crate) async fn conn(
        &self,
        op: &'static str,
    ) -> Result<MappedMutexGuard<'_, DatabaseTransaction>, AppError> {
        let slot = self.0.checkout.lock().await;
        let state = self.0.state();
        if state != TxnState::Open {
            return Err(AppError::terminated(op, state));
        }
        MutexGuard::try_map(slot, |slot| slot.as_mut().map(|c| &mut c.conn)).map_err(|_| {
            // Slot emptied while still Open: a release is mid-flight.
            AppError::terminated(op, self.0.state())
        })
    }

    pub(crate) fn txn_id(&self) -> Ulid {
        self.0.id
    }
}

impl fmt::Debug for TxnHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TxnHandle").field(&self.0.id).finish()
    }
}

/// One unit of work bound to one borrowed connection.
pub struct Transaction {
    shared: Arc<TxnShared>,
    users: OnceCell<UserGateway>,
    tokens: OnceCell<TokenGateway>,
    configuration: OnceCell<ConfigurationGateway>,
    organization: OnceCell<OrganizationGateway>,
}

impl Transaction {
    pub(crate) fn new(pool: &str, conn: DatabaseTransaction, lease: PoolLease) -> Self {
        let shared = TxnShared {
            id: Ulid::new(),
            pool: pool.to_string(),
            lifecycle: Mutex::new(Lifecycle {
                state: TxnState::Open,
                outcome: None,
            }),
            checkout: AsyncMutex::new(Some(Checkout { conn, lease })),
        };
        Self {
            shared: Arc::new(shared),
            users: OnceCell::new(),
            tokens: OnceCell::new(),
            configuration: OnceCell::new(),
            organization: OnceCell::new(),
        }
    }

    pub fn id(&self) -> Ulid {
        self.shared.id
    }

    pub fn pool_name(&self) -> &str {
        &self.shared.pool
    }

    pub fn state(&self) -> TxnState {
        self.shared.state()
    }

    /// `None` while Open.
    pub fn outcome(&self) -> Option<TxnOutcome> {
        self.shared.lifecycle.lock().outcome
    }

    pub fn is_open(&self) -> bool {
        self.state() == TxnState::Open
    }

    pub fn new_user_gateway(&self) -> &UserGateway {
        self.gateway(&self.users)
    }

    pub fn new_token_gateway(&self) -> &TokenGateway {
        self.gateway(&self.tokens)
    }

    pub fn new_configuration_gateway(&self) -> &ConfigurationGateway {
        self.gateway(&self.configuration)
    }

    pub fn new_organization_gateway(&self) -> &OrganizationGateway {
        self.gateway(&self.organization)
    }

    fn gateway<'a, G: Gateway>(&'a self, cell: &'a OnceCell<G>) -> &'a G {
        cell.get_or_init(|| {
            debug!(txn = %self.shared.id, gateway = %G::KIND, "txn=bind_gateway");
            G::bind(TxnHandle(Arc::clone(&self.shared)))
        })
    }

    /// Flush all writes atomically.
    ///
    /// On success the outcome is `Committed`; if the store rejects the flush
    /// the outcome is `Aborted` and nothing was applied. The connection goes
    /// back to the pool and the state is `Closed` in both cases.
    pub async fn commit(&self) -> Result<(), AppError> {
        let Checkout { conn, lease } = self.take_checkout("commit").await?;
        let pending = PendingRelease::new(&self.shared, lease);
        let result = conn.commit().await;
        match result {
            Ok(()) => {
                pending.complete(TxnOutcome::Committed);
                debug!(txn = %self.shared.id, pool = %self.shared.pool, "txn=commit");
                Ok(())
            }
            Err(e) => {
                // The failed store transaction is rolled back when `conn` is dropped.
                pending.complete(TxnOutcome::Aborted);
                let err = AppError::commit(e);
                warn!(
                    txn = %self.shared.id,
                    pool = %self.shared.pool,
                    code = err.code(),
                    error = %err,
                    "txn=commit_failed"
                );
                Err(err)
            }
        }
    }

    /// Discard all writes and release the connection.
    pub async fn rollback(&self) -> Result<(), AppError> {
        let Checkout { conn, lease } = self.take_checkout("rollback").await?;
        let pending = PendingRelease::new(&self.shared, lease);
        let result = conn.rollback().await;
        pending.complete(TxnOutcome::Aborted);
        debug!(txn = %self.shared.id, pool = %self.shared.pool, "txn=rollback");
        result.map_err(AppError::from)
    }

    /// Scoped exit: rolls back if still Open, otherwise does nothing.
    pub async fn close(self) -> Result<(), AppError> {
        if self.is_open() {
            self.rollback().await
        } else {
            Ok(())
        }
    }

    async fn take_checkout(&self, op: &'static str) -> Result<Checkout, AppError> {
        let mut slot = self.shared.checkout.lock().await;
        let state = self.shared.state();
        match slot.take() {
            Some(checkout) if state == TxnState::Open => Ok(checkout),
            other => {
                *slot = other;
                Err(AppError::terminated(op, state))
            }
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.shared.id)
            .field("pool", &self.shared.pool)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.shared.state() != TxnState::Open {
            return;
        }
        match self.shared.checkout.try_lock() {
            Ok(mut slot) => {
                if let Some(Checkout { conn, lease }) = slot.take() {
                    // sea-orm queues the store rollback when the handle drops.
                    drop(conn);
                    self.shared.release(TxnOutcome::Aborted, lease);
                    warn!(
                        txn = %self.shared.id,
                        pool = %self.shared.pool,
                        "txn=dropped_open rolled back"
                    );
                }
            }
            Err(_) => {
                // A cloned gateway is mid-call; the connection is released with
                // the last handle, and no further call may use it.
                self.shared.finish(TxnOutcome::Aborted);
                self.shared.close();
                warn!(
                    txn = %self.shared.id,
                    pool = %self.shared.pool,
                    "txn=dropped_busy release deferred"
                );
            }
        }
    }
}
