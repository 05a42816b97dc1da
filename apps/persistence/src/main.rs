use std::process::ExitCode;
use std::sync::Arc;

use persistence::config::db::RuntimeEnv;
use persistence::config::maintenance::MaintenanceSettings;
use persistence::db::registry;
use persistence::infra::state::build_state;
use persistence::{AppError, PeriodicCleaner, PoolRegistry, RegistryConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init_tracing();

    // Environment variables must be provided by the runtime (env file, compose, systemd).
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.code(), error = %e, "persistence=fatal");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    let registry_config = RegistryConfig::from_env(RuntimeEnv::Prod)?;
    let maintenance = MaintenanceSettings::from_env()?;

    let registry = Arc::new(PoolRegistry::init(registry_config).await?);
    registry::install(Arc::clone(&registry))?;

    let state = build_state().with_registry(registry).build().await?;
    info!(
        organization = %state.settings.organization().name,
        "persistence=ready"
    );

    let cancel = CancellationToken::new();
    let cleaner = PeriodicCleaner::new(state.manager.clone(), maintenance).spawn(cancel.clone());

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "persistence=signal_handler_failed");
    }
    info!("persistence=shutdown_requested");

    cancel.cancel();
    if let Err(e) = cleaner.await {
        error!(error = %e, "persistence=cleaner_join_failed");
    }
    drop(state);
    registry::shutdown_global().await
}
