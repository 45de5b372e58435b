//! Rust structs mapping to database tables.

use lp_core::LocationId;

/// A location record as seen by this crate.
///
/// Image payload columns are not loaded here; they go through
/// [`crate::queries::location_images`], which copes with their optional
/// presence and mixed encodings.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Legacy on-disk image reference, possibly stale.
    pub image_path: Option<String>,
    pub created_at: String,
}

impl Location {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: LocationId::new(row.get(0)?),
            name: row.get(1)?,
            latitude: row.get(2)?,
            longitude: row.get(3)?,
            image_path: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

/// A location selected for backfill because it has no stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingImage {
    pub id: LocationId,
    /// Legacy path, when the column exists and is non-empty.
    pub legacy_path: Option<String>,
}
