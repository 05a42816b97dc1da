//! ULID-suffixed identifiers so tests never collide on unique columns.

use ulid::Ulid;

/// `{prefix}_{ulid}`, lowercase.
pub fn unique_username(prefix: &str) -> String {
    format!("{prefix}_{}", Ulid::new()).to_lowercase()
}

/// `{prefix}-{ulid}@example.test`
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.test", Ulid::new()).to_lowercase()
}
