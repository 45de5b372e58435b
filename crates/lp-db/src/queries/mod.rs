//! Database query modules.
//!
//! - locations: location record CRUD
//! - location_images: the encoded image columns (write, read, backfill selection)

pub mod location_images;
pub mod locations;
