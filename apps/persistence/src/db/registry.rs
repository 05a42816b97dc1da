//! Process-wide mapping from pool name to pool.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use super::pool::ConnectionPool;
use crate::config::db::RegistryConfig;
use crate::error::AppError;
use crate::infra::db::{build_pool, pool_id};

/// Every configured pool, built once at startup. Read-only afterwards.
#[derive(Debug)]
pub struct PoolRegistry {
    pools: HashMap<String, ConnectionPool>,
}

impl PoolRegistry {
    /// Build every configured pool. A malformed config or an unreachable
    /// store is a configuration error; pools built before the failure are
    /// closed again.
    pub async fn init(config: RegistryConfig) -> Result<Self, AppError> {
        config.validate()?;
        let mut pools = HashMap::with_capacity(config.pools.len());
        for cfg in &config.pools {
            match build_pool(cfg).await {
                Ok(conn) => {
                    let pool = ConnectionPool::new(&cfg.name, cfg.kind, pool_id(&cfg.url), conn);
                    pools.insert(cfg.name.clone(), pool);
                }
                Err(e) => {
                    let partial = Self { pools };
                    if let Err(close_err) = partial.shutdown().await {
                        warn!(error = %close_err, "registry=init_cleanup_failed");
                    }
                    return Err(e);
                }
            }
        }
        info!(pools = pools.len(), "registry=init");
        Ok(Self { pools })
    }

    pub fn get_connection_pool(&self, name: &str) -> Result<&ConnectionPool, AppError> {
        self.pools
            .get(name)
            .ok_or_else(|| AppError::config(format!("no connection pool named '{name}'")))
    }

    pub fn pool_names(&self) -> impl Iterator<Item = &str> {
        self.pools.keys().map(String::as_str)
    }

    /// Close every pool. Returns the first close error, after trying all.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut first_err = None;
        for pool in self.pools.values() {
            if let Err(e) = pool.close().await {
                warn!(pool = %pool.name(), error = %e, "registry=close_failed");
                first_err.get_or_insert(e);
            }
        }
        info!(pools = self.pools.len(), "registry=shutdown");
        first_err.map_or(Ok(()), Err)
    }
}

static GLOBAL: RwLock<Option<Arc<PoolRegistry>>> = parking_lot::const_rwlock(None);

/// Install the process registry. Fails if one is already installed.
pub fn install(registry: Arc<PoolRegistry>) -> Result<(), AppError> {
    let mut slot = GLOBAL.write();
    if slot.is_some() {
        return Err(AppError::config("connection pool registry already installed"));
    }
    *slot = Some(registry);
    Ok(())
}

pub fn global() -> Result<Arc<PoolRegistry>, AppError> {
    GLOBAL
        .read()
        .clone()
        .ok_or_else(|| AppError::config("connection pool registry is not initialized"))
}

/// Uninstall the process registry and close its pools. No-op if none is installed.
pub async fn shutdown_global() -> Result<(), AppError> {
    let taken = GLOBAL.write().take();
    match taken {
        Some(registry) => registry.shutdown().await,
        None => Ok(()),
    }
}
