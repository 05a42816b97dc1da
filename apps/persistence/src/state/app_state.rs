use std::sync::Arc;

use crate::db::manager::TransactionManager;
use crate::db::registry::PoolRegistry;
use crate::settings::cache::SettingsCache;

/// Shared resources handed to request handlers and background tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    pub manager: TransactionManager,
    pub settings: Arc<SettingsCache>,
    /// Kept so the owner can shut the pools down.
    pub registry: Arc<PoolRegistry>,
}

impl AppState {
    pub fn new(
        registry: Arc<PoolRegistry>,
        manager: TransactionManager,
        settings: Arc<SettingsCache>,
    ) -> Self {
        Self {
            manager,
            settings,
            registry,
        }
    }
}
