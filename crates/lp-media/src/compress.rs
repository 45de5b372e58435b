//! Family-driven image compression with display and thumbnail renditions.
//!
//! One [`Compressor`] serves both the plain re-encode path
//! ([`Variant::Standard`]) and the display path ([`Variant::Display`]), which
//! additionally bounds the image to a maximum edge and produces a square JPEG
//! thumbnail.
//!
//! Codec failures never escape: the caller always gets a usable buffer, in
//! the worst case the untouched original with its declared MIME type.
//!
//! A browser-native original is kept when its re-encode comes out larger, but
//! only if no resize happened: display output never exceeds the maximum edge.

use std::borrow::Cow;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageResult};
use lp_core::config::ImageConfig;
use lp_core::{ImageAsset, ImageFamily, MIME_JPEG, MIME_PNG, MIME_WEBP};

use crate::detect::{mime_for_family, sniff};

/// Tunables for the compressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionSettings {
    /// Quality for JPEG output (1-100).
    pub quality: u8,
    /// Longest side of display images; 0 disables resizing.
    pub max_dimension: u32,
    /// Thumbnail edge length; 0 disables thumbnails.
    pub thumbnail_size: u32,
    /// Thumbnail JPEG quality (1-100).
    pub thumbnail_quality: u8,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            quality: 60,
            max_dimension: 800,
            thumbnail_size: 100,
            thumbnail_quality: 70,
        }
    }
}

impl From<&ImageConfig> for CompressionSettings {
    fn from(cfg: &ImageConfig) -> Self {
        Self {
            quality: cfg.quality.clamp(1, 100),
            max_dimension: cfg.max_dimension,
            thumbnail_size: cfg.thumbnail_size,
            thumbnail_quality: cfg.thumbnail_quality.clamp(1, 100),
        }
    }
}

/// Which rendition the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Re-encode per family policy at the original dimensions, no thumbnail.
    Standard,
    /// Bound to `max_dimension`, re-encode, and emit a square thumbnail.
    Display,
}

/// How the output buffer came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionOutcome {
    /// The buffer was decoded and re-encoded.
    Compressed,
    /// The re-encode was larger than a browser-native original, so the
    /// original bytes were kept.
    KeptOriginal,
    /// Unknown family; bytes passed through untouched.
    PassedThrough,
    /// A codec step failed; the original bytes and declared type are returned.
    Failed,
}

/// Output of [`Compressor::compress`].
#[derive(Debug, Clone)]
pub struct Compressed {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub thumbnail: Option<Vec<u8>>,
    pub outcome: CompressionOutcome,
}

impl Compressed {
    fn original(buffer: &[u8], declared_mime: &str, outcome: CompressionOutcome) -> Self {
        Self {
            bytes: buffer.to_vec(),
            mime_type: declared_mime.to_string(),
            thumbnail: None,
            outcome,
        }
    }

    /// Convert into the asset written to the store.
    pub fn into_asset(self) -> ImageAsset {
        ImageAsset::new(self.mime_type, self.bytes).with_thumbnail(self.thumbnail)
    }
}

/// Family-driven image compressor.
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    settings: CompressionSettings,
}

impl Compressor {
    /// Create a compressor with explicit settings.
    pub fn new(settings: CompressionSettings) -> Self {
        Self { settings }
    }

    /// Compress `buffer` according to its family and the requested variant.
    ///
    /// Infallible by contract: on any codec error the original buffer and
    /// `declared_mime` come back with [`CompressionOutcome::Failed`].
    pub fn compress(
        &self,
        buffer: &[u8],
        declared_mime: &str,
        family: ImageFamily,
        variant: Variant,
    ) -> Compressed {
        if family == ImageFamily::Unknown {
            tracing::debug!(
                declared_mime,
                size = buffer.len(),
                "Unknown image family, passing through"
            );
            return Compressed::original(buffer, declared_mime, CompressionOutcome::PassedThrough);
        }

        let result = match self.transform(buffer, family, variant) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    %family,
                    declared_mime,
                    size = buffer.len(),
                    "Compression failed, keeping original: {e}"
                );
                return Compressed::original(buffer, declared_mime, CompressionOutcome::Failed);
            }
        };

        let (bytes, mime_type, outcome) = if family.is_browser_native()
            && !result.resized
            && result.bytes.len() > buffer.len()
        {
            // Label by content so a mislabelled upload is served correctly.
            let mime = sniff(buffer)
                .and_then(mime_for_family)
                .unwrap_or(result.mime_type);
            (buffer.to_vec(), mime, CompressionOutcome::KeptOriginal)
        } else {
            (result.bytes, result.mime_type, CompressionOutcome::Compressed)
        };

        let thumbnail = result.thumbnail.filter(|t| t.len() <= bytes.len());

        log_savings(family, buffer.len(), bytes.len(), outcome);

        Compressed {
            bytes,
            mime_type: mime_type.to_string(),
            thumbnail,
            outcome,
        }
    }

    fn transform(
        &self,
        buffer: &[u8],
        family: ImageFamily,
        variant: Variant,
    ) -> ImageResult<Transformed> {
        let mut img = decode(buffer, family)?;
        let (width, height) = (img.width(), img.height());

        if variant == Variant::Display {
            img = bound_to(img, self.settings.max_dimension);
        }
        let resized = (img.width(), img.height()) != (width, height);

        let mime_type = family.output_mime().unwrap_or(MIME_JPEG);
        let bytes = match mime_type {
            MIME_PNG => encode_png(&img)?,
            MIME_WEBP => encode_webp(&img)?,
            _ => encode_jpeg(&img, self.settings.quality)?,
        };

        let thumbnail = match variant {
            Variant::Display if self.settings.thumbnail_size > 0 => Some(self.thumbnail(&img)?),
            _ => None,
        };

        Ok(Transformed {
            bytes,
            mime_type,
            thumbnail,
            resized,
        })
    }

    /// Square center-cropped JPEG thumbnail.
    fn thumbnail(&self, img: &DynamicImage) -> ImageResult<Vec<u8>> {
        let edge = self.settings.thumbnail_size;
        let thumb = img.resize_to_fill(edge, edge, FilterType::Lanczos3);
        encode_jpeg(&thumb, self.settings.thumbnail_quality)
    }
}

struct Transformed {
    bytes: Vec<u8>,
    mime_type: &'static str,
    thumbnail: Option<Vec<u8>>,
    resized: bool,
}

#[cfg_attr(not(feature = "heif"), allow(unused_variables))]
fn decode(buffer: &[u8], family: ImageFamily) -> ImageResult<DynamicImage> {
    #[cfg(feature = "heif")]
    if family == ImageFamily::Heic && sniff(buffer) == Some(ImageFamily::Heic) {
        return crate::heif::decode(buffer);
    }
    image::load_from_memory(buffer)
}

/// Fit inside a `max` x `max` box, never upscaling.
fn bound_to(img: DynamicImage, max: u32) -> DynamicImage {
    if max == 0 || (img.width() <= max && img.height() <= max) {
        return img;
    }
    img.resize(max, max, FilterType::Lanczos3)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
    // The JPEG encoder has no alpha or high bit-depth support.
    let rgb = match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => Cow::Borrowed(img),
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    };

    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)))?;
    Ok(buf)
}

fn encode_png(img: &DynamicImage) -> ImageResult<Vec<u8>> {
    let img = match img {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            Cow::Owned(DynamicImage::ImageRgba8(img.to_rgba8()))
        }
        other => Cow::Borrowed(other),
    };

    let mut buf = Vec::new();
    img.write_with_encoder(PngEncoder::new_with_quality(
        &mut buf,
        CompressionType::Best,
        PngFilterType::Adaptive,
    ))?;
    Ok(buf)
}

fn encode_webp(img: &DynamicImage) -> ImageResult<Vec<u8>> {
    let img = match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => Cow::Borrowed(img),
        other if other.color().has_alpha() => Cow::Owned(DynamicImage::ImageRgba8(other.to_rgba8())),
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    };

    let mut buf = Vec::new();
    img.write_with_encoder(WebPEncoder::new_lossless(&mut buf))?;
    Ok(buf)
}

fn log_savings(family: ImageFamily, original: usize, compressed: usize, outcome: CompressionOutcome) {
    let saved_pct = if original == 0 {
        0.0
    } else {
        (original as f64 - compressed as f64) / original as f64 * 100.0
    };
    tracing::info!(
        %family,
        original_size = original,
        compressed_size = compressed,
        outcome = ?outcome,
        "Image compressed: {original} -> {compressed} bytes ({saved_pct:.1}% saved)"
    );
}
