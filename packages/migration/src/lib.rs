//! Schema migrations for the account store.
//!
//! One migrator serves both backends; backend-specific DDL is branched inside
//! the migration itself.

pub use sea_orm::{ConnectionTrait, DatabaseConnection};
pub use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

mod m20250901_000001_accounts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250901_000001_accounts::Migration)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationCommand {
    Up,
    Down,
    Fresh,
    Reset,
    Refresh,
    Status,
}

/// Run one migrator command against an already-built connection.
pub async fn migrate(db: &DatabaseConnection, command: MigrationCommand) -> Result<(), DbErr> {
    let before = snapshot(db).await?;
    tracing::info!(
        cmd = ?command,
        backend = %before.backend,
        database = %before.database,
        defined = before.defined,
        applied = before.applied,
        "migrate=start"
    );

    let result = match command {
        MigrationCommand::Up => Migrator::up(db, None).await,
        MigrationCommand::Down => Migrator::down(db, None).await,
        MigrationCommand::Fresh => Migrator::fresh(db).await,
        MigrationCommand::Reset => Migrator::reset(db).await,
        MigrationCommand::Refresh => Migrator::refresh(db).await,
        MigrationCommand::Status => Migrator::status(db).await,
    };

    match result {
        Ok(()) => {
            if command != MigrationCommand::Status {
                let after = snapshot(db).await?;
                tracing::info!(cmd = ?command, applied = after.applied, "migrate=done");
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(cmd = ?command, backend = %before.backend, error = %e, "migrate=failed");
            Err(e)
        }
    }
}

#[derive(Debug)]
struct Snapshot {
    backend: String,
    database: String,
    applied: usize,
    defined: usize,
}

async fn snapshot(db: &DatabaseConnection) -> Result<Snapshot, DbErr> {
    let backend = db.get_database_backend();
    let query = match backend {
        sea_orm::DatabaseBackend::Postgres => Some("SELECT current_database() AS name"),
        sea_orm::DatabaseBackend::Sqlite => {
            Some("SELECT file AS name FROM pragma_database_list WHERE name = 'main'")
        }
        _ => None,
    };

    let database = match query {
        Some(sql) => {
            let row = db
                .query_one(Statement::from_string(backend, sql.to_string()))
                .await?;
            match row.and_then(|r| r.try_get::<String>("", "name").ok()) {
                Some(name) if name.is_empty() => ":memory:".to_string(),
                Some(name) => name,
                None => "<unknown>".to_string(),
            }
        }
        None => "<unsupported>".to_string(),
    };

    Ok(Snapshot {
        backend: format!("{backend:?}"),
        database,
        applied: count_applied_migrations(db).await.unwrap_or(0),
        defined: Migrator::migrations().len(),
    })
}

/// Number of applied migrations; 0 when the bookkeeping table does not exist yet.
pub async fn count_applied_migrations(db: &DatabaseConnection) -> Result<usize, DbErr> {
    match Migrator::get_applied_migrations(db).await {
        Ok(migrations) => Ok(migrations.len()),
        Err(DbErr::Exec(_)) => Ok(0),
        Err(e) => Err(e),
    }
}

/// Name of the newest applied migration, if any.
pub async fn latest_migration(db: &DatabaseConnection) -> Result<Option<String>, DbErr> {
    match Migrator::get_applied_migrations(db).await {
        Ok(migrations) => Ok(migrations.last().map(|m| m.name().to_string())),
        Err(DbErr::Exec(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
