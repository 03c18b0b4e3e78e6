//! v1 API Data Transfer Objects.
//!
//! Request and query types plus the few response shapes that are specific to
//! the HTTP surface. Domain responses are serialized straight from `models`.

pub mod admin;
pub mod recommendations;
pub mod similarities;

pub use admin::*;
pub use recommendations::*;
pub use similarities::*;
