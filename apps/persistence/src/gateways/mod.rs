//! Data-access gateways.
//!
//! A gateway is the only path through which its entity family is read or
//! written. Each one is bound to a single [`Transaction`](crate::Transaction)
//! and holds nothing but that binding: it never begins, commits or rolls back.
//! Lookups that find nothing return `Ok(None)`; use [`Require`] when absence
//! is an error for the caller.

use std::fmt;

use crate::db::txn::TxnHandle;
use crate::error::AppError;

pub mod configuration;
pub mod organization;
pub mod tokens;
pub mod users;

pub use configuration::ConfigurationGateway;
pub use organization::OrganizationGateway;
pub use tokens::dto::{NewToken, Token, TokenKind};
pub use tokens::TokenGateway;
pub use users::dto::{NewRegistration, NewUser, User};
pub use users::UserGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayKind {
    Users,
    Tokens,
    Configuration,
    Organization,
}

impl fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GatewayKind::Users => "users",
            GatewayKind::Tokens => "tokens",
            GatewayKind::Configuration => "configuration",
            GatewayKind::Organization => "organization",
        })
    }
}

/// Construction seam used by the transaction's lazy gateway slots.
pub(crate) trait Gateway: Sized {
    const KIND: GatewayKind;

    fn bind(txn: TxnHandle) -> Self;
}

/// Escalate an explicit not-found (`None`) into an error.
pub trait Require<T> {
    fn require(self, code: &'static str, detail: impl Into<String>) -> Result<T, AppError>;
}

impl<T> Require<T> for Option<T> {
    fn require(self, code: &'static str, detail: impl Into<String>) -> Result<T, AppError> {
        self.ok_or_else(|| AppError::not_found(code, detail))
    }
}
