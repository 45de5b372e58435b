//! Image-domain types shared by the detector, compressor, store and gateway.
//!
//! Enums serialize in lowercase (via `serde(rename_all = "lowercase")`) and
//! implement `Display` manually for consistent string representation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// MIME type for JPEG payloads.
pub const MIME_JPEG: &str = "image/jpeg";
/// MIME type for PNG payloads.
pub const MIME_PNG: &str = "image/png";
/// MIME type for WebP payloads.
pub const MIME_WEBP: &str = "image/webp";

/// MIME types the store writes on the success path.
pub const STORED_MIME_TYPES: &[&str] = &[MIME_JPEG, MIME_PNG, MIME_WEBP];

// ---------------------------------------------------------------------------
// ImageFamily
// ---------------------------------------------------------------------------

/// Canonical image bucket used to select a compression policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFamily {
    Jpeg,
    Png,
    Webp,
    Heic,
    /// Some other `image/*` type (gif, bmp, tiff, ...).
    Other,
    /// Empty buffer or clearly non-image input.
    Unknown,
}

impl ImageFamily {
    /// The MIME type a compressed buffer of this family is stored under.
    ///
    /// `None` for [`ImageFamily::Unknown`], which is passed through with its
    /// declared type.
    pub fn output_mime(&self) -> Option<&'static str> {
        match self {
            Self::Jpeg | Self::Heic | Self::Other => Some(MIME_JPEG),
            Self::Png => Some(MIME_PNG),
            Self::Webp => Some(MIME_WEBP),
            Self::Unknown => None,
        }
    }

    /// Whether browsers can render this family without conversion.
    pub fn is_browser_native(&self) -> bool {
        matches!(self, Self::Jpeg | Self::Png | Self::Webp)
    }
}

impl fmt::Display for ImageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => write!(f, "jpeg"),
            Self::Png => write!(f, "png"),
            Self::Webp => write!(f, "webp"),
            Self::Heic => write!(f, "heic"),
            Self::Other => write!(f, "other"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ---------------------------------------------------------------------------
// ImageAsset
// ---------------------------------------------------------------------------

/// The canonical stored image for one location.
///
/// Built once per upload or backfill record and written wholesale; the store
/// is its only durable owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// MIME type of `bytes`.
    pub mime_type: String,
    /// Compressed payload, the column of record.
    pub bytes: Vec<u8>,
    /// Optional small rendition for list/sidebar rendering.
    pub thumbnail: Option<Vec<u8>>,
}

impl ImageAsset {
    /// Build an asset without a thumbnail.
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
            thumbnail: None,
        }
    }

    /// Attach a thumbnail, dropping it if it is larger than the payload.
    #[must_use]
    pub fn with_thumbnail(mut self, thumbnail: Option<Vec<u8>>) -> Self {
        self.thumbnail = thumbnail.filter(|t| t.len() <= self.bytes.len());
        self
    }
}
