use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::clock::{truncate_to_seconds, Clock, SystemClock};
use crate::entities::users;

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub confirmed: bool,
    /// Set while the registration is pending confirmation.
    pub registration_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<users::Model> for User {
    fn from(m: users::Model) -> Self {
        Self {
            id: m.id,
            username: m.username,
            email: m.email,
            password_hash: m.password_hash,
            confirmed: m.confirmed,
            registration_expires_at: m.registration_expires_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Self-service sign-up awaiting confirmation before `expires_at`.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub registered_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl NewRegistration {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        registered_at: OffsetDateTime,
        window: time::Duration,
    ) -> Self {
        let registered_at = truncate_to_seconds(registered_at);
        Self {
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            registered_at,
            expires_at: registered_at + window,
        }
    }
}

/// An account created already confirmed (admin-created, imports).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub created_at: OffsetDateTime,
}

impl NewUser {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password_hash: None,
            created_at: SystemClock.now(),
        }
    }

    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    pub fn created_at(mut self, at: OffsetDateTime) -> Self {
        self.created_at = truncate_to_seconds(at);
        self
    }
}
