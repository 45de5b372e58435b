//! Read path: what to serve for a location.
//!
//! The gateway never fails a read for a known location. Missing images,
//! undecodable stored values and an unreachable store all degrade to the
//! [`FallbackAsset`]; only an unknown location yields [`Served::NotFound`].

use std::sync::atomic::{AtomicU64, Ordering};

use lp_core::{Error, LocationId, MIME_JPEG};
use lp_db::pool::{get_conn, DbPool};
use lp_db::queries::location_images;
use lp_media::{mime_for_family, sniff};

use crate::fallback::FallbackAsset;

/// Outcome of a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Served {
    /// The location's stored image.
    Stored { bytes: Vec<u8>, mime_type: String },
    /// The placeholder, because nothing usable is stored.
    Fallback { bytes: Vec<u8>, mime_type: String },
    /// No such location.
    NotFound,
}

impl Served {
    fn fallback(asset: &FallbackAsset) -> Self {
        Self::Fallback {
            bytes: asset.bytes().to_vec(),
            mime_type: asset.mime_type().to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Body and content type, `None` for [`Served::NotFound`].
    pub fn into_parts(self) -> Option<(Vec<u8>, String)> {
        match self {
            Self::Stored { bytes, mime_type } | Self::Fallback { bytes, mime_type } => {
                Some((bytes, mime_type))
            }
            Self::NotFound => None,
        }
    }
}

/// Serve the full-size image of a location.
pub fn serve(pool: &DbPool, id: LocationId, fallback: &FallbackAsset) -> Served {
    let conn = match get_conn(pool) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(location_id = %id, "Store unreachable, serving fallback: {e}");
            return Served::fallback(fallback);
        }
    };

    match location_images::read_image(&conn, id) {
        Ok(Some(asset)) => Served::Stored {
            bytes: asset.bytes,
            mime_type: asset.mime_type,
        },
        Ok(None) => {
            tracing::debug!(location_id = %id, "No stored image, serving fallback");
            Served::fallback(fallback)
        }
        Err(e) if e.is_not_found() => Served::NotFound,
        Err(e) => {
            log_read_failure(id, &e);
            Served::fallback(fallback)
        }
    }
}

/// Serve the thumbnail of a location, falling back to the full image and
/// then to the placeholder.
pub fn serve_thumbnail(pool: &DbPool, id: LocationId, fallback: &FallbackAsset) -> Served {
    let thumbnail = match get_conn(pool) {
        Ok(conn) => location_images::read_thumbnail(&conn, id),
        Err(e) => Err(e),
    };

    match thumbnail {
        Ok(Some(bytes)) => {
            let mime_type = sniff(&bytes)
                .and_then(mime_for_family)
                .unwrap_or(MIME_JPEG)
                .to_string();
            Served::Stored { bytes, mime_type }
        }
        Err(e) if e.is_not_found() => Served::NotFound,
        Err(e) => {
            log_read_failure(id, &e);
            serve(pool, id, fallback)
        }
        Ok(None) => serve(pool, id, fallback),
    }
}

fn log_read_failure(id: LocationId, e: &Error) {
    match e {
        Error::Decode(_) => {
            tracing::warn!(location_id = %id, "Stored image undecodable, serving fallback: {e}")
        }
        _ => tracing::error!(location_id = %id, "Image read failed, serving fallback: {e}"),
    }
}

/// Hands out cache-busting tokens for image URLs.
///
/// Values increase monotonically within the process and are seeded from
/// wall-clock milliseconds, so URLs issued after a restart differ from
/// earlier ones.
#[derive(Debug)]
pub struct CacheBuster {
    next: AtomicU64,
}

impl CacheBuster {
    pub fn new() -> Self {
        Self::starting_at(chrono::Utc::now().timestamp_millis().max(0) as u64)
    }

    pub fn starting_at(seed: u64) -> Self {
        Self {
            next: AtomicU64::new(seed),
        }
    }

    /// The next token; every call returns a larger value.
    pub fn token(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Cache-busted URL for the image of `id`.
    pub fn image_url(&self, id: LocationId) -> String {
        format!("/api/locations/{id}/image?v={}", self.token())
    }
}

impl Default for CacheBuster {
    fn default() -> Self {
        Self::new()
    }
}
