//! Background sweep of expired tokens and stale registrations.
//!
//! Each run is one unit of work: begin, sweep both tables, commit. A failed
//! run is logged and abandoned; the next tick is the retry.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::maintenance::MaintenanceSettings;
use crate::db::manager::TransactionManager;
use crate::db::txn::Transaction;
use crate::error::AppError;

/// What one run removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub tokens_deleted: u64,
    pub registrations_deleted: u64,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.tokens_deleted == 0 && self.registrations_deleted == 0
    }
}

pub struct PeriodicCleaner {
    manager: TransactionManager,
    settings: MaintenanceSettings,
    clock: Arc<dyn Clock>,
}

impl PeriodicCleaner {
    pub fn new(manager: TransactionManager, settings: MaintenanceSettings) -> Self {
        Self {
            manager,
            settings,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &MaintenanceSettings {
        &self.settings
    }

    /// One maintenance run against the clock's current instant.
    pub async fn run_once(&self) -> Result<SweepReport, AppError> {
        let now = self.clock.now();
        let txn = self.manager.begin().await?;
        match self.sweep(&txn, now).await {
            Ok(report) => {
                txn.commit().await?;
                Ok(report)
            }
            Err(e) => {
                if let Err(close_err) = txn.close().await {
                    warn!(error = %close_err, "cleaner=rollback_failed");
                }
                Err(e)
            }
        }
    }

    async fn sweep(
        &self,
        txn: &Transaction,
        now: time::OffsetDateTime,
    ) -> Result<SweepReport, AppError> {
        let tokens_deleted = txn
            .new_token_gateway()
            .delete_expired(now, self.settings.token_max_age)
            .await?;
        let registrations_deleted = txn
            .new_user_gateway()
            .delete_stale_registrations(now)
            .await?;
        Ok(SweepReport {
            tokens_deleted,
            registrations_deleted,
        })
    }

    async fn tick(&self) {
        match self.run_once().await {
            Ok(report) if report.is_empty() => debug!("cleaner=run nothing_expired"),
            Ok(report) => info!(
                tokens_deleted = report.tokens_deleted,
                registrations_deleted = report.registrations_deleted,
                "cleaner=run"
            ),
            Err(e) => warn!(code = e.code(), error = %e, "cleaner=run_failed"),
        }
    }

    /// Run on the configured interval until `cancel` fires.
    ///
    /// The first run happens immediately. Runs never overlap; a run that
    /// outlasts the interval delays the next one instead of bursting.
    /// Cancellation is observed between runs, never inside one.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.settings.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                interval_secs = self.settings.interval.as_secs(),
                token_max_age_secs = self.settings.token_max_age.as_secs(),
                "cleaner=started"
            );
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => self.tick().await,
                }
            }
            info!("cleaner=stopped");
        })
    }
}
