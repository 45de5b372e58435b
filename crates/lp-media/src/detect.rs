//! Declarative-first image family detection.
//!
//! [`detect`] trusts the declared MIME type; the byte-level [`sniff`] is only
//! consulted when the declaration carries no information (generic binary
//! types), and is exposed for the store's type inference.

use std::path::Path;

use image::ImageFormat;
use lp_core::{ImageFamily, MIME_JPEG, MIME_PNG, MIME_WEBP};

/// Classify a buffer by its declared MIME type.
///
/// - empty buffer: [`ImageFamily::Unknown`]
/// - absent or blank declaration: [`ImageFamily::Other`]
/// - `jpeg`/`jpg`, `png`, `webp`, `heic`/`heif` substrings map to their family
/// - any other `image/*`: [`ImageFamily::Other`]
/// - generic binary types: whatever [`sniff`] finds, else `Other`
/// - anything else (text, video, pdf...): [`ImageFamily::Unknown`]
pub fn detect(buffer: &[u8], declared_mime: Option<&str>) -> ImageFamily {
    if buffer.is_empty() {
        return ImageFamily::Unknown;
    }

    let declared = declared_mime.unwrap_or_default().trim().to_ascii_lowercase();
    if declared.is_empty() {
        return ImageFamily::Other;
    }

    if declared.contains("jpeg") || declared.contains("jpg") {
        ImageFamily::Jpeg
    } else if declared.contains("png") {
        ImageFamily::Png
    } else if declared.contains("webp") {
        ImageFamily::Webp
    } else if declared.contains("heic") || declared.contains("heif") {
        ImageFamily::Heic
    } else if declared.starts_with("image/") {
        ImageFamily::Other
    } else if is_generic_binary(&declared) {
        sniff(buffer).unwrap_or(ImageFamily::Other)
    } else {
        ImageFamily::Unknown
    }
}

fn is_generic_binary(declared: &str) -> bool {
    matches!(
        declared,
        "application/octet-stream" | "binary/octet-stream" | "application/binary"
    )
}

/// Identify an image family from magic bytes.
///
/// Returns `None` when the buffer does not start with a recognised image
/// signature.
pub fn sniff(buffer: &[u8]) -> Option<ImageFamily> {
    if is_heif(buffer) {
        return Some(ImageFamily::Heic);
    }

    match image::guess_format(buffer).ok()? {
        ImageFormat::Jpeg => Some(ImageFamily::Jpeg),
        ImageFormat::Png => Some(ImageFamily::Png),
        ImageFormat::WebP => Some(ImageFamily::Webp),
        _ => Some(ImageFamily::Other),
    }
}

/// ISO-BMFF `ftyp` box with a HEIF brand.
fn is_heif(buffer: &[u8]) -> bool {
    if buffer.len() < 12 || &buffer[4..8] != b"ftyp" {
        return false;
    }
    matches!(
        &buffer[8..12],
        b"heic" | b"heix" | b"hevc" | b"hevx" | b"heim" | b"heis" | b"mif1" | b"msf1"
    )
}

/// MIME type of a browser-native family, `None` for the rest.
pub fn mime_for_family(family: ImageFamily) -> Option<&'static str> {
    match family {
        ImageFamily::Jpeg => Some(MIME_JPEG),
        ImageFamily::Png => Some(MIME_PNG),
        ImageFamily::Webp => Some(MIME_WEBP),
        _ => None,
    }
}

/// Declared MIME type for a legacy file, by extension.
pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" | "jfif" => Some(MIME_JPEG),
        "png" => Some(MIME_PNG),
        "webp" => Some(MIME_WEBP),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "avif" => Some("image/avif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\x0dIHDR";

    #[test]
    fn declared_types_map_to_families() {
        let buf = b"anything";
        assert_eq!(detect(buf, Some("image/jpeg")), ImageFamily::Jpeg);
        assert_eq!(detect(buf, Some("image/jpg")), ImageFamily::Jpeg);
        assert_eq!(detect(buf, Some("IMAGE/JPEG")), ImageFamily::Jpeg);
        assert_eq!(detect(buf, Some("image/png")), ImageFamily::Png);
        assert_eq!(detect(buf, Some("image/webp")), ImageFamily::Webp);
        assert_eq!(detect(buf, Some("image/heic")), ImageFamily::Heic);
        assert_eq!(detect(buf, Some("image/heif")), ImageFamily::Heic);
        assert_eq!(detect(buf, Some("image/gif")), ImageFamily::Other);
        assert_eq!(detect(buf, Some("image/bmp")), ImageFamily::Other);
    }

    #[test]
    fn declaration_wins_over_bytes() {
        assert_eq!(detect(JPEG_MAGIC, Some("image/png")), ImageFamily::Png);
    }

    #[test]
    fn empty_buffer_is_unknown() {
        assert_eq!(detect(b"", Some("image/jpeg")), ImageFamily::Unknown);
        assert_eq!(detect(b"", None), ImageFamily::Unknown);
    }

    #[test]
    fn missing_declaration_is_other_image() {
        assert_eq!(detect(b"data", None), ImageFamily::Other);
        assert_eq!(detect(b"data", Some("  ")), ImageFamily::Other);
    }

    #[test]
    fn non_image_declarations_are_unknown() {
        assert_eq!(detect(b"hello", Some("text/plain")), ImageFamily::Unknown);
        assert_eq!(detect(b"%PDF", Some("application/pdf")), ImageFamily::Unknown);
        assert_eq!(detect(b"...", Some("video/mp4")), ImageFamily::Unknown);
    }

    #[test]
    fn octet_stream_is_sniffed() {
        assert_eq!(
            detect(PNG_MAGIC, Some("application/octet-stream")),
            ImageFamily::Png
        );
        assert_eq!(
            detect(b"no signature", Some("application/octet-stream")),
            ImageFamily::Other
        );
    }

    #[test]
    fn sniff_signatures() {
        assert_eq!(sniff(JPEG_MAGIC), Some(ImageFamily::Jpeg));
        assert_eq!(sniff(PNG_MAGIC), Some(ImageFamily::Png));
        assert_eq!(sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageFamily::Webp));
        assert_eq!(sniff(b"\0\0\0\x18ftypheic\0\0\0\0"), Some(ImageFamily::Heic));
        assert_eq!(sniff(b"GIF89a\x01\0\x01\0"), Some(ImageFamily::Other));
        assert_eq!(sniff(b"plain text"), None);
        assert_eq!(sniff(b""), None);
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_from_path(Path::new("a/b.JPG")), Some(MIME_JPEG));
        assert_eq!(mime_from_path(Path::new("x.png")), Some(MIME_PNG));
        assert_eq!(mime_from_path(Path::new("x.heic")), Some("image/heic"));
        assert_eq!(mime_from_path(Path::new("x.txt")), None);
        assert_eq!(mime_from_path(Path::new("noext")), None);
    }
}
