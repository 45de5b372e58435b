//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! server and image-pipeline sub-configs. Every section defaults sensibly so
//! a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub images: ImageConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file, failing on read or parse errors.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        let images = &self.images;
        if !(1..=100).contains(&images.quality) {
            warnings.push(format!(
                "images.quality {} is outside 1..=100 and will be clamped",
                images.quality
            ));
        }
        if !(1..=100).contains(&images.thumbnail_quality) {
            warnings.push(format!(
                "images.thumbnail_quality {} is outside 1..=100 and will be clamped",
                images.thumbnail_quality
            ));
        }
        if images.max_dimension == 0 {
            warnings.push("images.max_dimension is 0; display images will not be resized".into());
        }
        if images.thumbnail_size == 0 {
            warnings.push("images.thumbnail_size is 0; thumbnails are disabled".into());
        }
        if images.max_upload_bytes == 0 {
            warnings.push("images.max_upload_bytes is 0; every upload will be rejected".into());
        }
        if let Some(ref path) = images.fallback_path {
            if !path.exists() {
                warnings.push(format!(
                    "images.fallback_path {} does not exist; the bundled placeholder will be used",
                    path.display()
                ));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            db_path: PathBuf::from("data/locpix.db"),
        }
    }
}

/// Image pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Re-encode quality for display images (1-100).
    pub quality: u8,
    /// Longest side of display images in pixels; 0 disables resizing.
    pub max_dimension: u32,
    /// Edge length of the square thumbnail in pixels; 0 disables thumbnails.
    pub thumbnail_size: u32,
    /// JPEG quality for thumbnails (1-100).
    pub thumbnail_quality: u8,
    /// Largest accepted upload body in bytes.
    pub max_upload_bytes: usize,
    /// Replacement for the bundled placeholder image.
    pub fallback_path: Option<PathBuf>,
    /// Directory legacy `image_path` references are resolved against.
    pub legacy_root: PathBuf,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            quality: 60,
            max_dimension: 800,
            thumbnail_size: 100,
            thumbnail_quality: 70,
            max_upload_bytes: 10 * 1024 * 1024,
            fallback_path: None,
            legacy_root: PathBuf::from("uploads"),
        }
    }
}
