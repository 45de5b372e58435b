//! HEIC/HEIF decoding through libheif, behind the `heif` feature.

use image::error::{DecodingError, ImageFormatHint};
use image::{DynamicImage, ImageError, ImageResult, RgbImage};
use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

/// Decode the primary image of a HEIF container to 8-bit RGB.
pub(crate) fn decode(buffer: &[u8]) -> ImageResult<DynamicImage> {
    let lib = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(buffer).map_err(decoding)?;
    let handle = ctx.primary_image_handle().map_err(decoding)?;
    let image = lib
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(decoding)?;

    let planes = image.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| decoding("no interleaved RGB plane"))?;

    let row_len = plane.width as usize * 3;
    let mut pixels = Vec::with_capacity(row_len * plane.height as usize);
    for row in plane.data.chunks(plane.stride).take(plane.height as usize) {
        let row = row.get(..row_len).ok_or_else(|| decoding("short HEIF row"))?;
        pixels.extend_from_slice(row);
    }

    RgbImage::from_raw(plane.width, plane.height, pixels)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| decoding("HEIF plane size mismatch"))
}

fn decoding(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> ImageError {
    ImageError::Decoding(DecodingError::new(ImageFormatHint::Name("heif".into()), e))
}
