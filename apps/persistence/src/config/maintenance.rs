use std::time::Duration;

use super::db::parse_var;
use crate::error::AppError;

/// Default period between cleaner runs.
pub const DEFAULT_INTERVAL_SECS: u64 = 300;
/// Tokens older than this are swept.
pub const DEFAULT_TOKEN_MAX_AGE_SECS: u64 = 3600;

/// Schedule and expiration policy for the periodic cleaner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceSettings {
    pub interval: Duration,
    pub token_max_age: Duration,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            token_max_age: Duration::from_secs(DEFAULT_TOKEN_MAX_AGE_SECS),
        }
    }
}

impl MaintenanceSettings {
    pub fn from_env() -> Result<Self, AppError> {
        let interval_secs = parse_var("MAINTENANCE_INTERVAL_SECS", DEFAULT_INTERVAL_SECS)?;
        let max_age_secs = parse_var("TOKEN_MAX_AGE_SECS", DEFAULT_TOKEN_MAX_AGE_SECS)?;
        if interval_secs == 0 {
            return Err(AppError::config(
                "MAINTENANCE_INTERVAL_SECS must be greater than zero",
            ));
        }
        Ok(Self {
            interval: Duration::from_secs(interval_secs),
            token_max_age: Duration::from_secs(max_age_secs),
        })
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_token_max_age(mut self, token_max_age: Duration) -> Self {
        self.token_max_age = token_max_age;
        self
    }
}
