//! Site-wide settings value objects.

use serde::{Deserialize, Serialize};

use crate::entities::{configuration, organization};
use crate::error::AppError;

/// Application behaviour knobs an administrator can change at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub registration_open: bool,
    /// How long a pending registration may wait for confirmation.
    pub registration_window_secs: i64,
    pub session_ttl_secs: i64,
    pub default_locale: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            registration_open: true,
            registration_window_secs: 24 * 60 * 60,
            session_ttl_secs: 60 * 60,
            default_locale: "en".to_string(),
        }
    }
}

impl Configuration {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.registration_window_secs <= 0 {
            return Err(AppError::invalid(
                "INVALID_REGISTRATION_WINDOW",
                "registration window must be positive",
            ));
        }
        if self.session_ttl_secs <= 0 {
            return Err(AppError::invalid(
                "INVALID_SESSION_TTL",
                "session ttl must be positive",
            ));
        }
        if self.default_locale.trim().is_empty() {
            return Err(AppError::invalid(
                "INVALID_LOCALE",
                "default locale must not be empty",
            ));
        }
        Ok(())
    }
}

impl From<configuration::Model> for Configuration {
    fn from(m: configuration::Model) -> Self {
        Self {
            registration_open: m.registration_open,
            registration_window_secs: m.registration_window_secs,
            session_ttl_secs: m.session_ttl_secs,
            default_locale: m.default_locale,
        }
    }
}

/// Who runs this installation; shown in footers and outgoing mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    pub contact_email: String,
    pub website: Option<String>,
    pub address: Option<String>,
}

impl Default for Organization {
    fn default() -> Self {
        Self {
            name: "Unnamed organization".to_string(),
            contact_email: "admin@localhost".to_string(),
            website: None,
            address: None,
        }
    }
}

impl Organization {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::invalid(
                "INVALID_ORGANIZATION_NAME",
                "organization name must not be empty",
            ));
        }
        if !self.contact_email.contains('@') {
            return Err(AppError::invalid(
                "INVALID_CONTACT_EMAIL",
                "contact email must be an email address",
            ));
        }
        Ok(())
    }
}

impl From<organization::Model> for Organization {
    fn from(m: organization::Model) -> Self {
        Self {
            name: m.name,
            contact_email: m.contact_email,
            website: m.website,
            address: m.address,
        }
    }
}
