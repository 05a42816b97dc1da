//! In-memory snapshot of the site settings.
//!
//! Loaded once at startup through a single unit of work; reads never touch
//! the store. An update is validated, persisted and committed in its own unit
//! of work, and only then swapped in, so a reader never sees a value older
//! than the last successful local write. Other processes are not notified.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use super::model::{Configuration, Organization};
use crate::db::manager::TransactionManager;
use crate::db::txn::Transaction;
use crate::error::AppError;

pub struct SettingsCache {
    manager: TransactionManager,
    configuration: RwLock<Arc<Configuration>>,
    organization: RwLock<Arc<Organization>>,
    // Serializes persist+swap; readers only ever take the RwLocks.
    write_lock: AsyncMutex<()>,
}

impl SettingsCache {
    /// Read both rows in one unit of work.
    ///
    /// A missing row falls back to its default (not written back). A stored
    /// row that fails validation is a configuration error.
    pub async fn load(manager: TransactionManager) -> Result<Self, AppError> {
        let txn = manager.begin().await?;
        let loaded = read_both(&txn).await;
        let closed = txn.close().await;
        let (configuration, organization) = loaded?;
        closed?;

        let configuration = match configuration {
            Some(c) => {
                c.validate()
                    .map_err(|e| AppError::config_from("stored configuration is invalid", e))?;
                c
            }
            None => {
                warn!("settings=configuration_missing using defaults");
                Configuration::default()
            }
        };
        let organization = match organization {
            Some(o) => {
                o.validate()
                    .map_err(|e| AppError::config_from("stored organization is invalid", e))?;
                o
            }
            None => {
                warn!("settings=organization_missing using defaults");
                Organization::default()
            }
        };

        info!(
            registration_open = configuration.registration_open,
            locale = %configuration.default_locale,
            "settings=loaded"
        );
        Ok(Self {
            manager,
            configuration: RwLock::new(Arc::new(configuration)),
            organization: RwLock::new(Arc::new(organization)),
            write_lock: AsyncMutex::new(()),
        })
    }

    pub fn configuration(&self) -> Arc<Configuration> {
        self.configuration.read().clone()
    }

    pub fn organization(&self) -> Arc<Organization> {
        self.organization.read().clone()
    }

    /// Validate, persist, commit, then publish. On any failure the cached
    /// value is unchanged.
    pub async fn update_configuration(
        &self,
        new: Configuration,
    ) -> Result<Arc<Configuration>, AppError> {
        new.validate()?;
        let _write = self.write_lock.lock().await;

        let txn = self.manager.begin().await?;
        let stored = match txn.new_configuration_gateway().store(&new).await {
            Ok(stored) => stored,
            Err(e) => {
                discard(txn).await;
                return Err(e);
            }
        };
        txn.commit().await?;

        let published = Arc::new(stored);
        *self.configuration.write() = Arc::clone(&published);
        info!(
            registration_open = published.registration_open,
            "settings=configuration_updated"
        );
        Ok(published)
    }

    pub async fn update_organization(
        &self,
        new: Organization,
    ) -> Result<Arc<Organization>, AppError> {
        new.validate()?;
        let _write = self.write_lock.lock().await;

        let txn = self.manager.begin().await?;
        let stored = match txn.new_organization_gateway().store(&new).await {
            Ok(stored) => stored,
            Err(e) => {
                discard(txn).await;
                return Err(e);
            }
        };
        txn.commit().await?;

        let published = Arc::new(stored);
        *self.organization.write() = Arc::clone(&published);
        info!("settings=organization_updated");
        Ok(published)
    }
}

async fn read_both(
    txn: &Transaction,
) -> Result<(Option<Configuration>, Option<Organization>), AppError> {
    let configuration = txn.new_configuration_gateway().load().await?;
    let organization = txn.new_organization_gateway().load().await?;
    Ok((configuration, organization))
}

async fn discard(txn: Transaction) {
    if let Err(e) = txn.close().await {
        warn!(code = e.code(), error = %e, "settings=rollback_failed");
    }
}

impl std::fmt::Debug for SettingsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsCache")
            .field("configuration", &*self.configuration.read())
            .field("organization", &*self.organization.read())
            .finish_non_exhaustive()
    }
}
