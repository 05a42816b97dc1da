//! Database infrastructure - pool construction and schema bootstrap.

pub mod core;

pub use core::{build_pool, pool_id, sanitize_db_url};
