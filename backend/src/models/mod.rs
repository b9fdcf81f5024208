//! Database models for the Stock Management Platform
//!
//! Re-exports domain models from the shared crate

pub use shared::models::*;
