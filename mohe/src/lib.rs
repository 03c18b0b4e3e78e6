//! Mohe: place recommendations from bookmark co-occurrence, keyword vectors,
//! and contextual re-ranking.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod keywords;
pub mod llm;
pub mod models;
pub mod services;
pub mod weather;

pub use error::{MoheError, Result};
