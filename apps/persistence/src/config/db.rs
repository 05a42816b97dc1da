use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Name of the pool every unit of work borrows from.
pub const MAIN_POOL: &str = "main";

/// Runtime environment; selects the database name and pool defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeEnv {
    Prod,
    /// Enforces safety rules on the database name
    Test,
}

/// Backing store flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbKind {
    Postgres,
    SqliteFile,
    /// Each connection is its own database, so the pool is pinned to one connection.
    SqliteMemory,
}

impl FromStr for DbKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DbKind::Postgres),
            "sqlite-file" | "sqlite_file" | "sqlite" => Ok(DbKind::SqliteFile),
            "sqlite-memory" | "sqlite_memory" | "memory" => Ok(DbKind::SqliteMemory),
            other => Err(AppError::config(format!(
                "unsupported DB_KIND '{other}' (expected postgres | sqlite-file | sqlite-memory)"
            ))),
        }
    }
}

impl fmt::Display for DbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DbKind::Postgres => "postgres",
            DbKind::SqliteFile => "sqlite-file",
            DbKind::SqliteMemory => "sqlite-memory",
        };
        f.write_str(s)
    }
}

/// Per-connection session settings applied in the pool's `after_connect` hook.
#[derive(Debug, Clone, PartialEq)]
pub enum DbSettings {
    Sqlite {
        busy_timeout_ms: u64,
    },
    Postgres {
        app_name: String,
        statement_timeout: String,
        idle_in_transaction_timeout: String,
        lock_timeout: Option<String>,
    },
}

/// Pool sizing and connection behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSettings {
    pub pool_min: u32,
    pub pool_max: u32,
    pub acquire_timeout_ms: u64,
    pub connect_attempts: u32,
    pub connect_interval_ms: u64,
    pub db_settings: DbSettings,
}

impl ConnectionSettings {
    pub fn defaults(env: RuntimeEnv, db_kind: DbKind) -> Self {
        let (pool_min, pool_max, acquire_timeout_ms) = match env {
            RuntimeEnv::Prod => (2, 10, 5000),
            RuntimeEnv::Test => (1, 5, 2000),
        };
        let db_settings = match db_kind {
            DbKind::Postgres => DbSettings::Postgres {
                app_name: "persistence".to_string(),
                statement_timeout: "15s".to_string(),
                idle_in_transaction_timeout: "60s".to_string(),
                lock_timeout: None,
            },
            DbKind::SqliteFile | DbKind::SqliteMemory => DbSettings::Sqlite {
                busy_timeout_ms: 5000,
            },
        };
        let (pool_min, pool_max) = match db_kind {
            DbKind::SqliteMemory => (1, 1),
            _ => (pool_min, pool_max),
        };
        Self {
            pool_min,
            pool_max,
            acquire_timeout_ms,
            connect_attempts: 5,
            connect_interval_ms: 500,
            db_settings,
        }
    }

    pub fn with_bounds(mut self, pool_min: u32, pool_max: u32) -> Self {
        self.pool_min = pool_min;
        self.pool_max = pool_max;
        self
    }

    pub fn with_acquire_timeout_ms(mut self, acquire_timeout_ms: u64) -> Self {
        self.acquire_timeout_ms = acquire_timeout_ms;
        self
    }
}

/// Everything needed to build one named pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub name: String,
    pub kind: DbKind,
    pub url: String,
    pub settings: ConnectionSettings,
    pub migrate_on_init: bool,
}

impl PoolConfig {
    pub fn new(
        name: impl Into<String>,
        kind: DbKind,
        url: impl Into<String>,
        settings: ConnectionSettings,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            url: url.into(),
            settings,
            migrate_on_init: false,
        }
    }

    /// SQLite file store at `path`, created if missing.
    pub fn sqlite_file(name: impl Into<String>, path: &std::path::Path, env: RuntimeEnv) -> Self {
        let url = format!("sqlite://{}?mode=rwc", path.display());
        Self::new(
            name,
            DbKind::SqliteFile,
            url,
            ConnectionSettings::defaults(env, DbKind::SqliteFile),
        )
    }

    pub fn with_settings(mut self, settings: ConnectionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_migrations(mut self, migrate_on_init: bool) -> Self {
        self.migrate_on_init = migrate_on_init;
        self
    }

    /// Build the main pool config from environment variables.
    pub fn from_env(env: RuntimeEnv) -> Result<Self, AppError> {
        let kind = match env::var("DB_KIND") {
            Ok(v) => v.parse::<DbKind>()?,
            Err(_) => DbKind::Postgres,
        };
        let url = db_url(env, kind)?;

        let defaults = ConnectionSettings::defaults(env, kind);
        let pool_min = parse_var("DB_POOL_MIN", defaults.pool_min)?;
        let pool_max = parse_var("DB_POOL_MAX", defaults.pool_max)?;
        let acquire_timeout_ms = parse_var("DB_ACQUIRE_TIMEOUT_MS", defaults.acquire_timeout_ms)?;
        let migrate_on_init = parse_var("DB_MIGRATE_ON_INIT", false)?;

        let config = Self::new(
            MAIN_POOL,
            kind,
            url,
            defaults
                .with_bounds(pool_min, pool_max)
                .with_acquire_timeout_ms(acquire_timeout_ms),
        )
        .with_migrations(migrate_on_init);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::config("pool name must not be empty"));
        }
        if self.settings.pool_max == 0 {
            return Err(AppError::config(format!(
                "pool '{}': max connections must be at least 1",
                self.name
            )));
        }
        if self.settings.pool_min > self.settings.pool_max {
            return Err(AppError::config(format!(
                "pool '{}': min connections ({}) exceeds max ({})",
                self.name, self.settings.pool_min, self.settings.pool_max
            )));
        }
        if self.kind == DbKind::SqliteMemory && self.settings.pool_max != 1 {
            return Err(AppError::config(format!(
                "pool '{}': sqlite-memory requires exactly one connection",
                self.name
            )));
        }
        if self.settings.acquire_timeout_ms == 0 {
            return Err(AppError::config(format!(
                "pool '{}': acquire timeout must be positive",
                self.name
            )));
        }
        Ok(())
    }
}

/// Set of pools the registry builds at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryConfig {
    pub pools: Vec<PoolConfig>,
}

impl RegistryConfig {
    pub fn new(pools: Vec<PoolConfig>) -> Self {
        Self { pools }
    }

    pub fn single(pool: PoolConfig) -> Self {
        Self { pools: vec![pool] }
    }

    pub fn from_env(env: RuntimeEnv) -> Result<Self, AppError> {
        Ok(Self::single(PoolConfig::from_env(env)?))
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.pools.is_empty() {
            return Err(AppError::config("no connection pools configured"));
        }
        let mut seen = std::collections::HashSet::new();
        for pool in &self.pools {
            pool.validate()?;
            if !seen.insert(pool.name.as_str()) {
                return Err(AppError::config(format!(
                    "pool '{}' configured more than once",
                    pool.name
                )));
            }
        }
        Ok(())
    }
}

/// Build the connection URL for the given environment and store.
pub fn db_url(env: RuntimeEnv, kind: DbKind) -> Result<String, AppError> {
    match kind {
        DbKind::Postgres => {
            let host = host();
            let port = port();
            let db_name = db_name(env)?;
            let username = must_var("APP_DB_USER")?;
            let password = must_var("APP_DB_PASSWORD")?;
            Ok(format!(
                "postgresql://{username}:{password}@{host}:{port}/{db_name}"
            ))
        }
        DbKind::SqliteFile => {
            let path = must_var("SQLITE_DB_PATH")?;
            Ok(format!("sqlite://{path}?mode=rwc"))
        }
        DbKind::SqliteMemory => Ok("sqlite::memory:".to_string()),
    }
}

/// Ordered session-level statements run on every new physical connection.
pub fn build_session_statements(settings: &DbSettings) -> Vec<String> {
    match settings {
        DbSettings::Sqlite { busy_timeout_ms } => vec![
            "PRAGMA foreign_keys = ON;".to_string(),
            format!("PRAGMA busy_timeout = {busy_timeout_ms};"),
        ],
        DbSettings::Postgres {
            app_name,
            statement_timeout,
            idle_in_transaction_timeout,
            lock_timeout,
        } => {
            let mut stmts = vec![
                // application_name is safe to single-quote; minimal escaping
                format!("SET application_name = '{}';", app_name.replace('\'', "''")),
                "SET timezone = 'UTC';".to_string(),
                format!("SET statement_timeout = '{statement_timeout}';"),
                format!("SET idle_in_transaction_session_timeout = '{idle_in_transaction_timeout}';"),
            ];
            if let Some(lock_timeout) = lock_timeout {
                stmts.push(format!("SET lock_timeout = '{lock_timeout}';"));
            }
            stmts
        }
    }
}

fn host() -> String {
    env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string())
}

fn port() -> String {
    env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".to_string())
}

fn db_name(env: RuntimeEnv) -> Result<String, AppError> {
    match env {
        RuntimeEnv::Prod => must_var("PROD_DB"),
        RuntimeEnv::Test => {
            let db_name = must_var("TEST_DB")?;
            if !db_name.ends_with("_test") {
                return Err(AppError::config(format!(
                    "Test profile requires database name to end with '_test', but got: '{db_name}'"
                )));
            }
            Ok(db_name)
        }
    }
}

/// Get required environment variable or return error
pub(crate) fn must_var(name: &str) -> Result<String, AppError> {
    env::var(name)
        .map_err(|_| AppError::config(format!("Required environment variable '{name}' is not set")))
}

/// Parse an optional environment variable, falling back to `default` when unset.
pub(crate) fn parse_var<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| {
            AppError::config(format!("environment variable '{name}' is malformed: {e}"))
        }),
        Err(_) => Ok(default),
    }
}
