//! `sea_orm::DbErr` -> `AppError` classification.
//!
//! Raw driver messages can carry user data (emails, token values), so they
//! are logged only through `Redacted` and never copied into error details.

use sea_orm::{DbErr, SqlErr};
use tracing::{error, warn};

use crate::error::AppError;
use crate::logging::pii::Redacted;

fn mentions_sqlstate(msg: &str, code: &str) -> bool {
    msg.contains(code) || msg.contains(&format!("SQLSTATE({code})"))
}

/// `table.column` from SQLite's "UNIQUE constraint failed: table.column".
fn sqlite_unique_target(msg: &str) -> Option<&str> {
    const PREFIX: &str = "UNIQUE constraint failed: ";
    let start = msg.find(PREFIX)? + PREFIX.len();
    msg[start..].split_whitespace().next()
}

fn conflict_for(msg: &str) -> Option<(&'static str, &'static str)> {
    let target = sqlite_unique_target(msg);
    let is = |sqlite: &str, postgres: &str| target == Some(sqlite) || msg.contains(postgres);

    if is("users.username", "idx_users_username_unique") {
        Some(("USERNAME_TAKEN", "Username already taken"))
    } else if is("users.email", "idx_users_email_unique") {
        Some(("EMAIL_TAKEN", "Email already registered"))
    } else if is("tokens.value", "tokens_value_key") {
        Some(("TOKEN_COLLISION", "Token value collision"))
    } else {
        None
    }
}

/// Translate a `DbErr` into an `AppError` with PII-safe detail.
pub fn map_db_err(e: DbErr) -> AppError {
    let msg = e.to_string();

    match &e {
        DbErr::RecordNotFound(_) => return AppError::not_found("RECORD_NOT_FOUND", "Record not found"),
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => {
            warn!(raw_error = %Redacted(&msg), "db=unavailable");
            return AppError::db("Database unavailable");
        }
        _ => {}
    }

    let unique = matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        || mentions_sqlstate(&msg, "23505")
        || msg.contains("duplicate key value violates unique constraint")
        || msg.contains("UNIQUE constraint failed");
    if unique {
        warn!(raw_error = %Redacted(&msg), "db=unique_violation");
        return match conflict_for(&msg) {
            Some((code, detail)) => AppError::conflict(code, detail),
            None => AppError::conflict("UNIQUE_VIOLATION", "Unique constraint violation"),
        };
    }

    if matches!(e.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
        || mentions_sqlstate(&msg, "23503")
        || msg.contains("FOREIGN KEY constraint failed")
    {
        warn!(raw_error = %Redacted(&msg), "db=foreign_key_violation");
        return AppError::invalid("FOREIGN_KEY_VIOLATION", "Referenced record does not exist");
    }

    if msg.contains("timeout") || msg.contains("database is locked") {
        warn!(raw_error = %Redacted(&msg), "db=timeout");
        return AppError::db("Database timeout");
    }

    error!(raw_error = %Redacted(&msg), "db=unhandled_error");
    AppError::db("Database operation failed")
}
