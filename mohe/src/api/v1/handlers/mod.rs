pub mod admin;
pub mod contextual;
pub(crate) mod health;
pub mod recommendations;
pub mod similarities;
pub mod vectors;

pub use health::health_check;

/// Requests may ask for at most this many items.
pub(crate) const MAX_LIMIT: usize = 100;
