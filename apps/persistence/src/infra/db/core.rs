use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use sea_orm::{DatabaseConnection, SqlxPostgresConnector, SqlxSqliteConnector};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{info, trace, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::config::db::{build_session_statements, DbKind, DbSettings, PoolConfig};
use crate::error::AppError;
use crate::logging::pii::Redacted;

/// Get database engine name for logging
fn get_db_engine(db_kind: DbKind) -> &'static str {
    match db_kind {
        DbKind::Postgres => "postgresql",
        DbKind::SqliteFile | DbKind::SqliteMemory => "sqlite",
    }
}

/// Stable, credential-free identifier for a pool, derived from its URL.
pub fn pool_id(url: &str) -> String {
    format!("{:016x}", xxh3_64(url.as_bytes()))
}

/// Sanitize database URL by masking password in connection strings.
pub fn sanitize_db_url(url: &str) -> String {
    if let Some((auth_part, host_part)) = url.rsplit_once('@') {
        if let Some((scheme_user, _password)) = auth_part.rsplit_once(':') {
            // "postgresql://user" still contains the scheme colon; keep it intact.
            if scheme_user.contains("://") {
                return format!("{scheme_user}:***@{host_part}");
            }
        }
    }
    url.to_string()
}

/// Retry a connection attempt with fixed interval delays
/// Returns the result of the last attempt after all retries are exhausted
async fn retry_connection<T, F, Fut>(
    mut connect_fn: F,
    max_attempts: u32,
    interval_ms: u64,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut last_error = None;

    for attempt in 1..=max_attempts.max(1) {
        match connect_fn().await {
            Ok(result) => {
                if attempt > 1 {
                    info!(
                        "connection_retry=success attempts={} interval_ms={}",
                        attempt, interval_ms
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                last_error = Some(e);
                if attempt < max_attempts {
                    warn!(
                        "connection_retry=failed attempt={} max_attempts={} interval_ms={}",
                        attempt, max_attempts, interval_ms
                    );
                    tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        AppError::config("connection retry failed: no error recorded after max attempts")
    }))
}

/// Build one connection pool from its config and hand it to SeaORM.
///
/// Session settings are applied per physical connection in `after_connect`,
/// so every connection a Transaction borrows is configured the same way.
pub async fn build_pool(cfg: &PoolConfig) -> Result<DatabaseConnection, AppError> {
    cfg.validate()?;
    let settings = &cfg.settings;
    let statements = build_session_statements(&settings.db_settings);
    let id = pool_id(&cfg.url);

    let db = match cfg.kind {
        // ---------- SQLite (file and in-memory) ----------
        DbKind::SqliteFile | DbKind::SqliteMemory => {
            if !matches!(settings.db_settings, DbSettings::Sqlite { .. }) {
                return Err(AppError::config(format!(
                    "pool '{}': sqlite store configured with non-sqlite session settings",
                    cfg.name
                )));
            }
            let mut connect_opts = SqliteConnectOptions::from_str(&cfg.url)
                .map_err(|e| AppError::config_from("invalid SQLite connection options", e))?
                .create_if_missing(true)
                .foreign_keys(true);
            if cfg.kind == DbKind::SqliteFile {
                connect_opts = connect_opts.journal_mode(SqliteJournalMode::Wal);
            }

            let pool: SqlitePool = SqlitePoolOptions::new()
                .min_connections(settings.pool_min)
                .max_connections(settings.pool_max)
                .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms))
                .after_connect(move |conn, _meta| {
                    let statements = statements.clone();
                    Box::pin(async move {
                        for stmt in &statements {
                            sqlx::query(stmt).execute(&mut *conn).await?;
                        }
                        trace!("db=sqlite hook=after_connect ok");
                        Ok::<_, sqlx::Error>(())
                    })
                })
                .connect_with(connect_opts)
                .await
                .map_err(|e| AppError::config_from("failed to create SQLite connection pool", e))?;

            // warm-up to ensure the hook ran on the initial connection(s)
            if settings.pool_min > 0 {
                sqlx::query("SELECT 1;")
                    .execute(&pool)
                    .await
                    .map_err(|e| AppError::config_from("warmup query failed", e))?;
            }

            SqlxSqliteConnector::from_sqlx_sqlite_pool(pool)
        }

        // ---------- Postgres ----------
        DbKind::Postgres => {
            info!(
                pool = %cfg.name,
                pool_id = %id,
                url = %Redacted(&sanitize_db_url(&cfg.url)),
                "pool=connecting engine=postgres"
            );
            let url = cfg.url.clone();
            let pool = retry_connection(
                || {
                    let statements = statements.clone();
                    let url = url.clone();
                    async move {
                        PgPoolOptions::new()
                            .min_connections(settings.pool_min)
                            .max_connections(settings.pool_max)
                            .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms))
                            .idle_timeout(Duration::from_secs(30))
                            .after_connect(move |conn, _meta| {
                                let statements = statements.clone();
                                Box::pin(async move {
                                    for stmt in &statements {
                                        sqlx::query(stmt).execute(&mut *conn).await?;
                                    }
                                    Ok::<_, sqlx::Error>(())
                                })
                            })
                            .connect(&url)
                            .await
                            .map_err(|e| AppError::config_from("failed to connect to Postgres", e))
                    }
                },
                settings.connect_attempts,
                settings.connect_interval_ms,
            )
            .await?;

            SqlxPostgresConnector::from_sqlx_postgres_pool(pool)
        }
    };

    if cfg.migrate_on_init {
        Migrator::up(&db, None)
            .await
            .map_err(|e| AppError::config_from("schema migration failed", e))?;
        info!(pool = %cfg.name, pool_id = %id, "migrate=done");
    }

    info!(
        pool = %cfg.name,
        pool_id = %id,
        engine = get_db_engine(cfg.kind),
        min = settings.pool_min,
        max = settings.pool_max,
        acquire_timeout_ms = settings.acquire_timeout_ms,
        "pool=create"
    );
    Ok(db)
}
