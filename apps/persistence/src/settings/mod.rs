pub mod cache;
pub mod model;

pub use model::{Configuration, Organization};
