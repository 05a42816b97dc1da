#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod clock;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod gateways;
pub mod infra;
pub mod logging;
pub mod maintenance;
pub mod settings;
pub mod state;

#[cfg(test)]
pub mod test_bootstrap;

// Re-exports for public API
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::db::{DbKind, PoolConfig, RegistryConfig, RuntimeEnv};
pub use db::manager::TransactionManager;
pub use db::pool::{ConnectionPool, PoolStats};
pub use db::registry::PoolRegistry;
pub use db::txn::{Transaction, TxnOutcome, TxnState};
pub use error::AppError;
pub use gateways::{
    ConfigurationGateway, GatewayKind, OrganizationGateway, Require, TokenGateway, UserGateway,
};
pub use maintenance::cleaner::{PeriodicCleaner, SweepReport};
pub use settings::cache::SettingsCache;
pub use state::app_state::AppState;

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    test_bootstrap::logging::init();
}
