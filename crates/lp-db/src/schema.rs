//! Live-schema probing for the optional image columns.
//!
//! Environments drift: some databases predate the image columns, some have
//! the payload but no thumbnail. Writers and readers ask the live table
//! which columns exist instead of assuming the latest migration ran.

use std::collections::HashSet;

use rusqlite::Connection;
use lp_core::{Error, Result};

/// Table holding location records.
pub const LOCATIONS_TABLE: &str = "locations";

/// Image payload column (BLOB, or base64 TEXT from older writers).
pub const COL_IMAGE_DATA: &str = "image_data";
/// MIME type of the payload.
pub const COL_IMAGE_TYPE: &str = "image_type";
/// Thumbnail payload.
pub const COL_THUMBNAIL: &str = "thumbnail";
/// Legacy file-path reference.
pub const COL_IMAGE_PATH: &str = "image_path";

/// Which image-related columns the live `locations` table has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageColumns {
    pub image_data: bool,
    pub image_type: bool,
    pub thumbnail: bool,
    pub image_path: bool,
}

impl ImageColumns {
    /// Inspect the live table. A missing table reports no columns.
    pub fn probe(conn: &Connection) -> Result<Self> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({LOCATIONS_TABLE})"))
            .map_err(|e| Error::database(e.to_string()))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(|e| Error::database(e.to_string()))?
            .collect::<std::result::Result<HashSet<_>, _>>()
            .map_err(|e| Error::database(e.to_string()))?;

        Ok(Self {
            image_data: names.contains(COL_IMAGE_DATA),
            image_type: names.contains(COL_IMAGE_TYPE),
            thumbnail: names.contains(COL_THUMBNAIL),
            image_path: names.contains(COL_IMAGE_PATH),
        })
    }

    /// Fail unless the payload column exists.
    pub fn require_payload(&self) -> Result<()> {
        if self.image_data {
            Ok(())
        } else {
            Err(Error::SchemaUnsupported(format!(
                "{LOCATIONS_TABLE}.{COL_IMAGE_DATA} column is missing"
            )))
        }
    }
}
