use std::sync::Arc;

use crate::config::db::RegistryConfig;
use crate::db::manager::TransactionManager;
use crate::db::registry::PoolRegistry;
use crate::error::AppError;
use crate::settings::cache::SettingsCache;
use crate::state::app_state::AppState;

enum RegistrySource {
    Config(RegistryConfig),
    Built(Arc<PoolRegistry>),
}

/// Builder for `AppState` (used in both tests and main).
#[derive(Default)]
pub struct StateBuilder {
    source: Option<RegistrySource>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the pools from `config` during `build`.
    pub fn with_db(mut self, config: RegistryConfig) -> Self {
        self.source = Some(RegistrySource::Config(config));
        self
    }

    /// Use an already-built registry (for example the installed global one).
    pub fn with_registry(mut self, registry: Arc<PoolRegistry>) -> Self {
        self.source = Some(RegistrySource::Built(registry));
        self
    }

    /// Resolve the main pool and load the settings snapshot.
    pub async fn build(self) -> Result<AppState, AppError> {
        let registry = match self.source {
            Some(RegistrySource::Config(config)) => Arc::new(PoolRegistry::init(config).await?),
            Some(RegistrySource::Built(registry)) => registry,
            None => return Err(AppError::config("no database configured for app state")),
        };
        let manager = TransactionManager::from_registry(&registry)?;
        let settings = Arc::new(SettingsCache::load(manager.clone()).await?);
        Ok(AppState::new(registry, manager, settings))
    }
}

pub fn build_state() -> StateBuilder {
    StateBuilder::new()
}
