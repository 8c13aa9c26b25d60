//! Clinova Shared Types and Utilities
//!
//! This crate contains the plan catalog, domain types, the TTL cache, and
//! database utilities shared across the Clinova platform.

pub mod cache;
pub mod db;
pub mod types;

pub use cache::{CacheStats, TtlCache};
pub use db::*;
pub use types::*;
