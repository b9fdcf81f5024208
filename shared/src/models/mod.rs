//! Domain models for the Stock Management Platform

mod movement;

pub use movement::*;
