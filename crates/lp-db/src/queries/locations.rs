//! Location record operations.

use rusqlite::Connection;
use lp_core::{Error, LocationId, Result};

use crate::models::Location;

const COLS: &str = "id, name, latitude, longitude, image_path, created_at";

/// Create a new location record.
pub fn create_location(
    conn: &Connection,
    name: &str,
    latitude: Option<f64>,
    longitude: Option<f64>,
    image_path: Option<&str>,
) -> Result<Location> {
    conn.execute(
        "INSERT INTO locations (name, latitude, longitude, image_path) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![name, latitude, longitude, image_path],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    let id = LocationId::new(conn.last_insert_rowid());
    get_location(conn, id)?.ok_or_else(|| Error::not_found("location", id))
}

/// Get a location by ID.
pub fn get_location(conn: &Connection, id: LocationId) -> Result<Option<Location>> {
    let q = format!("SELECT {COLS} FROM locations WHERE id = ?1");
    match conn.query_row(&q, [id.get()], Location::from_row) {
        Ok(location) => Ok(Some(location)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Whether a location with this ID exists.
pub fn location_exists(conn: &Connection, id: LocationId) -> Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM locations WHERE id = ?1",
        [id.get()],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}
