//! lp-media: image format detection and compression.
//!
//! - [`detect`] classifies an upload into a canonical [`ImageFamily`] from
//!   its declared MIME type, with magic-byte sniffing helpers for callers
//!   that have no declared type.
//! - [`compress`] turns a classified buffer into a size/quality-bounded
//!   payload plus an optional square thumbnail, falling back to the
//!   original bytes whenever a codec step fails.
//!
//! The `heif` feature adds HEIC/HEIF decoding through libheif. Without it
//! HEIC uploads take the codec-failure path and are stored as uploaded.
//!
//! [`ImageFamily`]: lp_core::ImageFamily

pub mod compress;
pub mod detect;
#[cfg(feature = "heif")]
mod heif;

pub use compress::{CompressionOutcome, CompressionSettings, Compressed, Compressor, Variant};
pub use detect::{detect, mime_for_family, mime_from_path, sniff};
