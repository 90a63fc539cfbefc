//! Core types and utilities for the Anchorage layout engine.
//!
//! This crate provides the foundational types shared by the layout crates:
//! - Node and operator identifiers
//! - Margin values with pixel or ratio units
//! - Numeric precision helpers used for change detection
//! - Error types

pub mod errors;
pub mod precision;
pub mod types;

pub use errors::*;
pub use precision::*;
pub use types::*;

pub use glam::Vec3;
