use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use migration::{migrate, MigrationCommand};
use persistence::config::db::{db_url, ConnectionSettings, DbKind, PoolConfig, RuntimeEnv};
use persistence::infra::db::{build_pool, sanitize_db_url};
use persistence::AppError;
use tracing::{error, info};

#[derive(Clone, Copy, ValueEnum)]
enum Command {
    Up,
    Down,
    Fresh,
    Reset,
    Refresh,
    Status,
}

impl From<Command> for MigrationCommand {
    fn from(c: Command) -> Self {
        match c {
            Command::Up => MigrationCommand::Up,
            Command::Down => MigrationCommand::Down,
            Command::Fresh => MigrationCommand::Fresh,
            Command::Reset => MigrationCommand::Reset,
            Command::Refresh => MigrationCommand::Refresh,
            Command::Status => MigrationCommand::Status,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Env {
    Prod,
    Test,
}

/// In-memory SQLite is not offered: the schema would vanish with the process.
#[derive(Clone, Copy, ValueEnum)]
enum Db {
    Postgres,
    SqliteFile,
}

#[derive(Parser)]
#[command(name = "migration")]
#[command(about = "Apply the account store schema")]
struct Args {
    #[arg(value_enum)]
    command: Command,

    /// Runtime environment; selects PROD_DB or TEST_DB
    #[arg(short, long, value_enum, default_value = "test")]
    env: Env,

    /// Backing store
    #[arg(short, long, value_enum, default_value = "postgres")]
    db: Db,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .without_time()
        .with_target(false)
        .with_env_filter("migration=info,persistence=info,sqlx=warn")
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.code(), error = %e, "migration=failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let env = match args.env {
        Env::Prod => RuntimeEnv::Prod,
        Env::Test => RuntimeEnv::Test,
    };
    let kind = match args.db {
        Db::Postgres => DbKind::Postgres,
        Db::SqliteFile => DbKind::SqliteFile,
    };

    let url = db_url(env, kind)?;
    info!(url = %sanitize_db_url(&url), "migration=connecting");
    let cfg = PoolConfig::new(
        "migration",
        kind,
        url,
        ConnectionSettings::defaults(env, kind).with_bounds(1, 1),
    );
    let db = build_pool(&cfg).await?;

    let outcome = migrate(&db, args.command.into())
        .await
        .map_err(|e| AppError::config_from("migration command failed", e));
    if let Err(e) = db.close().await {
        error!(error = %e, "migration=close_failed");
    }
    outcome
}
