//! lp-core: shared types, IDs, errors, and configuration.
//!
//! This crate is the foundational dependency for all other lp-* crates,
//! providing the location identifier, the unified error type, the image
//! family / asset types passed between pipeline stages, and application
//! configuration.

pub mod config;
pub mod error;
pub mod ids;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::LocationId;
pub use media::*;
