//! Overlay Core Types
//!
//! This crate provides the foundational types used throughout the overlay:
//! - Value types (the Value enum with scalar and nested types)
//! - Ordered field maps (Fields, Record, SharedRecord)
//! - Lifecycle operation names (Operation)
//! - Common error types

mod error;
mod fields;
mod operation;
mod value;

pub use error::*;
pub use fields::*;
pub use operation::*;
pub use value::*;
