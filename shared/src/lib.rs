//! Shared types and rules for the dengue forecast service
//!
//! Region resolution, seasonal weather synthesis, feature construction and
//! risk classification. Nothing here performs I/O.

pub mod models;
pub mod seasonal;
pub mod types;
pub mod validation;

pub use models::*;
pub use seasonal::*;
pub use types::*;
pub use validation::*;
