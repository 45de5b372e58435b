//! Placeholder image for locations without a stored image.

use std::path::Path;

use lp_core::config::ImageConfig;
use lp_core::{Error, ImageAsset, Result, MIME_PNG};
use lp_media::{mime_for_family, mime_from_path, sniff};

const BUNDLED: &[u8] = include_bytes!("../assets/fallback-location.png");

/// The fixed image served (and written by the backfill job) when a location
/// has nothing usable stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackAsset {
    bytes: Vec<u8>,
    mime_type: String,
}

impl FallbackAsset {
    /// The placeholder compiled into the binary.
    pub fn bundled() -> Self {
        Self {
            bytes: BUNDLED.to_vec(),
            mime_type: MIME_PNG.to_string(),
        }
    }

    /// Read a replacement placeholder from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        if bytes.is_empty() {
            return Err(Error::Validation(format!(
                "fallback image {} is empty",
                path.display()
            )));
        }

        let mime_type = sniff(&bytes)
            .and_then(mime_for_family)
            .or_else(|| mime_from_path(path))
            .ok_or_else(|| {
                Error::Validation(format!(
                    "fallback image {} is not a recognised image",
                    path.display()
                ))
            })?;

        Ok(Self {
            bytes,
            mime_type: mime_type.to_string(),
        })
    }

    /// The configured override, or the bundled placeholder if there is none
    /// or it cannot be read.
    pub fn load(config: &ImageConfig) -> Self {
        let Some(path) = config.fallback_path.as_deref() else {
            return Self::bundled();
        };

        match Self::from_file(path) {
            Ok(asset) => {
                tracing::info!(
                    "Using fallback image {} ({})",
                    path.display(),
                    asset.mime_type
                );
                asset
            }
            Err(e) => {
                tracing::warn!(
                    "Cannot use fallback image {}: {e}; using bundled placeholder",
                    path.display()
                );
                Self::bundled()
            }
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The placeholder as a storable asset (no thumbnail).
    pub fn to_asset(&self) -> ImageAsset {
        ImageAsset::new(self.mime_type.clone(), self.bytes.clone())
    }
}

impl Default for FallbackAsset {
    fn default() -> Self {
        Self::bundled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lp_core::MIME_JPEG;
    use std::path::PathBuf;

    #[test]
    fn bundled_is_a_png() {
        let asset = FallbackAsset::bundled();
        assert_eq!(asset.mime_type(), MIME_PNG);
        assert!(asset.bytes().starts_with(b"\x89PNG\r\n\x1a\n"));
        assert!(image::load_from_memory(asset.bytes()).is_ok());
    }

    #[test]
    fn load_without_override_is_bundled() {
        let asset = FallbackAsset::load(&ImageConfig::default());
        assert_eq!(asset, FallbackAsset::bundled());
    }

    #[test]
    fn load_with_missing_override_is_bundled() {
        let config = ImageConfig {
            fallback_path: Some(PathBuf::from("/no/such/placeholder.png")),
            ..ImageConfig::default()
        };
        assert_eq!(FallbackAsset::load(&config), FallbackAsset::bundled());
    }

    #[test]
    fn load_override_sniffs_type() {
        let dir = tempfile::tempdir().unwrap();
        // Deliberately misleading extension.
        let path = dir.path().join("placeholder.png");
        image::RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10]))
            .save_with_format(&path, image::ImageFormat::Jpeg)
            .unwrap();

        let config = ImageConfig {
            fallback_path: Some(path.clone()),
            ..ImageConfig::default()
        };
        let asset = FallbackAsset::load(&config);
        assert_eq!(asset.mime_type(), MIME_JPEG);
        assert_eq!(asset.bytes(), std::fs::read(&path).unwrap().as_slice());
    }

    #[test]
    fn from_file_rejects_empty_and_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.png");
        std::fs::write(&empty, b"").unwrap();
        assert!(matches!(
            FallbackAsset::from_file(&empty),
            Err(Error::Validation(_))
        ));

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, b"hello").unwrap();
        assert!(matches!(
            FallbackAsset::from_file(&text),
            Err(Error::Validation(_))
        ));
    }
}
