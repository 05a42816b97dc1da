use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;
use sea_orm_migration::sea_query::{ColumnDef, Index, Table};

#[derive(DeriveMigrationName)]
pub struct Migration;

// ----- Iden enums for tables & columns -----
#[derive(Iden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    Confirmed,
    RegistrationExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Tokens {
    Table,
    UserId,
    CreatedAt,
}

#[derive(Iden)]
enum Configuration {
    Table,
    Id,
    RegistrationOpen,
    RegistrationWindowSecs,
    SessionTtlSecs,
    DefaultLocale,
    UpdatedAt,
}

#[derive(Iden)]
enum Organization {
    Table,
    Id,
    Name,
    ContactEmail,
    Website,
    Address,
    UpdatedAt,
}

// sea-query cannot express DEFERRABLE, so the tokens table is plain DDL per backend.
// The owner check runs at COMMIT: a unit of work may write a token before its user.
const TOKENS_POSTGRES: &str = r#"
CREATE TABLE IF NOT EXISTS tokens (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL,
    kind TEXT NOT NULL,
    value TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT tokens_value_key UNIQUE (value),
    CONSTRAINT tokens_user_id_fkey FOREIGN KEY (user_id) REFERENCES users (id)
        ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
)
"#;

const TOKENS_SQLITE: &str = r#"
CREATE TABLE IF NOT EXISTS tokens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    value TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users (id)
        ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
)
"#;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // users
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(Users::Username).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::PasswordHash).string().null())
                    .col(
                        ColumnDef::new(Users::Confirmed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::RegistrationExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_username_unique")
                    .table(Users::Table)
                    .col(Users::Username)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_email_unique")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // stale-registration sweep
        manager
            .create_index(
                Index::create()
                    .name("idx_users_pending_expiry")
                    .table(Users::Table)
                    .col(Users::Confirmed)
                    .col(Users::RegistrationExpiresAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // tokens
        let tokens_ddl = match manager.get_database_backend() {
            DatabaseBackend::Postgres => TOKENS_POSTGRES,
            DatabaseBackend::Sqlite => TOKENS_SQLITE,
            DatabaseBackend::MySql => {
                return Err(DbErr::Migration(
                    "MySQL is not a supported backing store".to_string(),
                ))
            }
        };
        manager
            .get_connection()
            .execute_unprepared(tokens_ddl)
            .await?;

        // expiry sweep
        manager
            .create_index(
                Index::create()
                    .name("idx_tokens_created_at")
                    .table(Tokens::Table)
                    .col(Tokens::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tokens_user_id")
                    .table(Tokens::Table)
                    .col(Tokens::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // configuration (single row, id = 1)
        manager
            .create_table(
                Table::create()
                    .table(Configuration::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Configuration::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Configuration::RegistrationOpen)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Configuration::RegistrationWindowSecs)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Configuration::SessionTtlSecs)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Configuration::DefaultLocale)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Configuration::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // organization (single row, id = 1)
        manager
            .create_table(
                Table::create()
                    .table(Organization::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Organization::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Organization::Name).string().not_null())
                    .col(
                        ColumnDef::new(Organization::ContactEmail)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Organization::Website).string().null())
                    .col(ColumnDef::new(Organization::Address).string().null())
                    .col(
                        ColumnDef::new(Organization::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Organization::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Configuration::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tokens::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
