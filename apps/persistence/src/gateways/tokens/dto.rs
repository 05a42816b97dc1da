use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::clock::{truncate_to_seconds, Clock, SystemClock};
use crate::entities::tokens;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Session,
    Confirmation,
    PasswordReset,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Session => "session",
            TokenKind::Confirmation => "confirmation",
            TokenKind::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(TokenKind::Session),
            "confirmation" => Ok(TokenKind::Confirmation),
            "password_reset" => Ok(TokenKind::PasswordReset),
            other => Err(AppError::db(format!("unknown token kind '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: i64,
    pub user_id: i64,
    pub kind: TokenKind,
    pub value: String,
    pub created_at: OffsetDateTime,
}

impl TryFrom<tokens::Model> for Token {
    type Error = AppError;

    fn try_from(m: tokens::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: m.id,
            user_id: m.user_id,
            kind: m.kind.parse()?,
            value: m.value,
            created_at: m.created_at,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NewToken {
    pub user_id: i64,
    pub kind: TokenKind,
    pub issued_at: OffsetDateTime,
}

impl NewToken {
    pub fn new(user_id: i64, kind: TokenKind) -> Self {
        Self {
            user_id,
            kind,
            issued_at: SystemClock.now(),
        }
    }

    pub fn issued_at(mut self, at: OffsetDateTime) -> Self {
        self.issued_at = truncate_to_seconds(at);
        self
    }
}
