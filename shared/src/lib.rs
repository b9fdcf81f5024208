//! Shared types and models for the Stock Management Platform
//!
//! This crate holds the pure domain core used across the backend: movement
//! types, stock-delta planning, and validation rules. It has no database
//! or HTTP dependencies, so the reconciliation rules stay testable in
//! isolation.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
