use std::fmt::Display;

use thiserror::Error;

use crate::db::txn::TxnState;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Connection acquisition failed on pool '{pool}': {detail}")]
    Acquisition { pool: String, detail: String },
    #[error("Commit failed: {detail}")]
    Commit { detail: String },
    #[error("Transaction terminated: {op} called in state {state:?}")]
    TerminatedTransaction { op: &'static str, state: TxnState },
    #[error("Not found: {detail}")]
    NotFound { code: &'static str, detail: String },
    #[error("Conflict: {detail}")]
    Conflict { code: &'static str, detail: String },
    #[error("Validation error: {detail}")]
    Validation { code: &'static str, detail: String },
    #[error("Database error: {detail}")]
    Db { detail: String },
    #[error("Configuration error: {detail}")]
    Config { detail: String },
}

impl AppError {
    /// Stable machine-readable code, used as a structured log field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Acquisition { .. } => "ACQUISITION_FAILED",
            AppError::Commit { .. } => "COMMIT_FAILED",
            AppError::TerminatedTransaction { .. } => "TRANSACTION_TERMINATED",
            AppError::NotFound { code, .. } => code,
            AppError::Conflict { code, .. } => code,
            AppError::Validation { code, .. } => code,
            AppError::Db { .. } => "DB_ERROR",
            AppError::Config { .. } => "CONFIG_ERROR",
        }
    }

    pub fn acquisition(pool: impl Into<String>, source: impl Display) -> Self {
        Self::Acquisition {
            pool: pool.into(),
            detail: source.to_string(),
        }
    }

    pub fn commit(source: impl Display) -> Self {
        Self::Commit {
            detail: source.to_string(),
        }
    }

    pub fn terminated(op: &'static str, state: TxnState) -> Self {
        Self::TerminatedTransaction { op, state }
    }

    pub fn not_found(code: &'static str, detail: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            detail: detail.into(),
        }
    }

    pub fn conflict(code: &'static str, detail: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            detail: detail.into(),
        }
    }

    pub fn invalid(code: &'static str, detail: impl Into<String>) -> Self {
        Self::Validation {
            code,
            detail: detail.into(),
        }
    }

    pub fn db(detail: impl Into<String>) -> Self {
        Self::Db {
            detail: detail.into(),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    /// Configuration error carrying the underlying cause.
    pub fn config_from(context: &str, source: impl Display) -> Self {
        Self::Config {
            detail: format!("{context}: {source}"),
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, AppError::TerminatedTransaction { .. })
    }
}

impl From<std::env::VarError> for AppError {
    fn from(e: std::env::VarError) -> Self {
        AppError::config(format!("env var error: {e}"))
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(e: sea_orm::DbErr) -> Self {
        crate::infra::db_errors::map_db_err(e)
    }
}
