//! Encoded image columns on location records.
//!
//! Writes always store native BLOBs in one `UPDATE` scoped to a single row,
//! touching only the columns the live schema has. Reads accept both BLOB and
//! base64 TEXT payloads, since rows in one table may come from different
//! historical writers.
//!
//! "No image" (NULL, empty string, zero-length blob) is `Ok(None)`; an unknown
//! location is [`Error::NotFound`]; a payload that cannot be turned back into
//! bytes is [`Error::Decode`].

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use rusqlite::types::{ToSql, Value};
use rusqlite::Connection;

use lp_core::{Error, ImageAsset, LocationId, Result, MIME_JPEG};
use lp_media::{mime_for_family, sniff};

use crate::models::MissingImage;
use crate::schema::{
    ImageColumns, COL_IMAGE_DATA, COL_IMAGE_PATH, COL_IMAGE_TYPE, COL_THUMBNAIL, LOCATIONS_TABLE,
};

/// Standard alphabet, padding optional: older writers were not consistent.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Columns touched by a [`write_image`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Columns included in the `UPDATE`.
    pub written: Vec<&'static str>,
    /// Optional columns absent from the live schema.
    pub skipped: Vec<&'static str>,
}

/// Persist `asset` for one location, replacing whatever was stored.
///
/// Missing `image_type` / `thumbnail` columns are skipped and reported; a
/// missing payload column is [`Error::SchemaUnsupported`].
pub fn write_image(conn: &Connection, id: LocationId, asset: &ImageAsset) -> Result<WriteReport> {
    let columns = ImageColumns::probe(conn)?;
    columns.require_payload()?;

    let raw_id = id.get();
    let mime = asset.mime_type.as_str();
    let thumbnail = asset.thumbnail.as_deref();

    let mut report = WriteReport::default();
    let mut sets = vec![format!("{COL_IMAGE_DATA} = :data")];
    let mut params: Vec<(&str, &dyn ToSql)> = vec![(":id", &raw_id), (":data", &asset.bytes)];
    report.written.push(COL_IMAGE_DATA);

    if columns.image_type {
        sets.push(format!("{COL_IMAGE_TYPE} = :mime"));
        params.push((":mime", &mime));
        report.written.push(COL_IMAGE_TYPE);
    } else {
        report.skipped.push(COL_IMAGE_TYPE);
    }

    if columns.thumbnail {
        sets.push(format!("{COL_THUMBNAIL} = :thumb"));
        params.push((":thumb", &thumbnail));
        report.written.push(COL_THUMBNAIL);
    } else {
        report.skipped.push(COL_THUMBNAIL);
    }

    let sql = format!(
        "UPDATE {LOCATIONS_TABLE} SET {} WHERE id = :id",
        sets.join(", ")
    );
    let updated = conn
        .execute(&sql, params.as_slice())
        .map_err(|e| Error::database(e.to_string()))?;

    if updated == 0 {
        return Err(Error::not_found("location", id));
    }

    if !report.skipped.is_empty() {
        tracing::warn!(
            location_id = %id,
            skipped = ?report.skipped,
            "Schema lacks optional image columns, wrote payload only"
        );
    }
    tracing::debug!(
        location_id = %id,
        size = asset.bytes.len(),
        mime_type = mime,
        has_thumbnail = thumbnail.is_some(),
        "Stored image"
    );

    Ok(report)
}

/// Read the stored image of one location.
pub fn read_image(conn: &Connection, id: LocationId) -> Result<Option<ImageAsset>> {
    let columns = ImageColumns::probe(conn)?;
    if !columns.image_data {
        return absent_or_not_found(conn, id);
    }

    let type_idx = columns.image_type.then_some(1);
    let thumb_idx = columns.thumbnail.then_some(1 + usize::from(columns.image_type));

    let select = [
        Some(COL_IMAGE_DATA),
        columns.image_type.then_some(COL_IMAGE_TYPE),
        columns.thumbnail.then_some(COL_THUMBNAIL),
    ];
    let select: Vec<&str> = select.into_iter().flatten().collect();
    let sql = format!(
        "SELECT {} FROM {LOCATIONS_TABLE} WHERE id = ?1",
        select.join(", ")
    );

    let row = conn.query_row(&sql, [id.get()], |row| {
        let data: Value = row.get(0)?;
        let mime: Value = match type_idx {
            Some(i) => row.get(i)?,
            None => Value::Null,
        };
        let thumb: Value = match thumb_idx {
            Some(i) => row.get(i)?,
            None => Value::Null,
        };
        Ok((data, mime, thumb))
    });

    let (data, mime, thumb) = match row {
        Ok(values) => values,
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            return Err(Error::not_found("location", id))
        }
        Err(e) => return Err(Error::database(e.to_string())),
    };

    let Some(payload) = decode_payload(data)? else {
        return Ok(None);
    };

    let mime_type = text_value(mime)
        .or(payload.data_url_mime)
        .or_else(|| sniff(&payload.bytes).and_then(mime_for_family).map(String::from))
        .unwrap_or_else(|| MIME_JPEG.to_string());

    // A broken thumbnail must not hide a good image.
    let thumbnail = match decode_payload(thumb) {
        Ok(t) => t.map(|p| p.bytes),
        Err(e) => {
            tracing::warn!(location_id = %id, "Ignoring undecodable thumbnail: {e}");
            None
        }
    };

    Ok(Some(
        ImageAsset::new(mime_type, payload.bytes).with_thumbnail(thumbnail),
    ))
}

/// Read only the thumbnail of one location.
pub fn read_thumbnail(conn: &Connection, id: LocationId) -> Result<Option<Vec<u8>>> {
    let columns = ImageColumns::probe(conn)?;
    if !columns.thumbnail {
        return absent_or_not_found(conn, id);
    }

    let sql = format!("SELECT {COL_THUMBNAIL} FROM {LOCATIONS_TABLE} WHERE id = ?1");
    match conn.query_row(&sql, [id.get()], |row| row.get::<_, Value>(0)) {
        Ok(value) => Ok(decode_payload(value)?.map(|p| p.bytes)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(Error::not_found("location", id)),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Remove the stored image (payload, type and thumbnail) of one location.
///
/// Returns `false` when the location does not exist.
pub fn clear_image(conn: &Connection, id: LocationId) -> Result<bool> {
    let columns = ImageColumns::probe(conn)?;
    columns.require_payload()?;

    let mut sets = vec![format!("{COL_IMAGE_DATA} = NULL")];
    if columns.image_type {
        sets.push(format!("{COL_IMAGE_TYPE} = NULL"));
    }
    if columns.thumbnail {
        sets.push(format!("{COL_THUMBNAIL} = NULL"));
    }

    let sql = format!(
        "UPDATE {LOCATIONS_TABLE} SET {} WHERE id = ?1",
        sets.join(", ")
    );
    let n = conn
        .execute(&sql, [id.get()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Locations whose payload is NULL or empty, ordered by ID.
///
/// Re-evaluated on every call, so rows repaired by an earlier run drop out.
pub fn select_missing(conn: &Connection) -> Result<Vec<MissingImage>> {
    let columns = ImageColumns::probe(conn)?;
    columns.require_payload()?;

    let path_col = if columns.image_path {
        COL_IMAGE_PATH
    } else {
        "NULL"
    };
    let sql = format!(
        "SELECT id, {path_col} FROM {LOCATIONS_TABLE}
         WHERE {COL_IMAGE_DATA} IS NULL
            OR length({COL_IMAGE_DATA}) = 0
            OR (typeof({COL_IMAGE_DATA}) = 'text'
                AND trim({COL_IMAGE_DATA}, ' ' || char(9) || char(10) || char(13)) = '')
         ORDER BY id"
    );

    let mut stmt = conn.prepare(&sql).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            let path: Option<String> = row.get(1)?;
            Ok(MissingImage {
                id: LocationId::new(row.get(0)?),
                legacy_path: path.filter(|p| !p.trim().is_empty()),
            })
        })
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

struct Payload {
    bytes: Vec<u8>,
    /// MIME type carried by a `data:` URL prefix.
    data_url_mime: Option<String>,
}

/// Turn a stored column value into bytes.
///
/// The storage class tells the two historical formats apart: BLOBs are the
/// raw bytes as written, TEXT is base64, optionally behind a `data:` URL.
fn decode_payload(value: Value) -> Result<Option<Payload>> {
    match value {
        Value::Null => Ok(None),
        Value::Blob(bytes) if bytes.is_empty() => Ok(None),
        Value::Blob(bytes) => Ok(Some(Payload {
            bytes,
            data_url_mime: None,
        })),
        Value::Text(text) => decode_text(&text),
        Value::Integer(_) | Value::Real(_) => {
            Err(Error::decode("numeric value in image column"))
        }
    }
}

fn decode_text(text: &str) -> Result<Option<Payload>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let (data_url_mime, encoded) = match text.strip_prefix("data:") {
        Some(rest) => {
            let (header, body) = rest
                .split_once(',')
                .ok_or_else(|| Error::decode("data URL without payload"))?;
            let mime = header
                .split(';')
                .next()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from);
            (mime, body)
        }
        None => (None, text),
    };

    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Ok(None);
    }

    let bytes = LENIENT_BASE64
        .decode(compact.as_bytes())
        .map_err(|e| Error::decode(format!("invalid base64 image payload: {e}")))?;

    Ok(Some(Payload {
        bytes,
        data_url_mime,
    }))
}

fn text_value(value: Value) -> Option<String> {
    match value {
        Value::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// `Ok(None)` for an existing location, `NotFound` otherwise.
fn absent_or_not_found<T>(conn: &Connection, id: LocationId) -> Result<Option<T>> {
    if crate::queries::locations::location_exists(conn, id)? {
        Ok(None)
    } else {
        Err(Error::not_found("location", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use crate::migrations::run_migrations_to;
    use crate::pool::init_memory_pool;
    use crate::queries::locations::create_location;
    use lp_core::{ImageFamily, MIME_PNG, MIME_WEBP};
    use lp_media::{CompressionOutcome, Compressor, Variant};

    const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0 compressed payload";
    const THUMB: &[u8] = b"\xFF\xD8\xFF\xE0 thumb";
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\x0dIHDR png payload";

    fn setup() -> (crate::pool::PooledConnection, LocationId) {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let loc = create_location(&conn, "Harbor", None, None, None).unwrap();
        (conn, loc.id)
    }

    fn set_raw(conn: &Connection, id: LocationId, value: &dyn ToSql, mime: Option<&str>) {
        conn.execute(
            "UPDATE locations SET image_data = ?1, image_type = ?2 WHERE id = ?3",
            rusqlite::params![value, mime, id.get()],
        )
        .unwrap();
    }

    #[test]
    fn round_trip_is_byte_identical() {
        let (conn, id) = setup();
        let asset = ImageAsset::new(MIME_JPEG, JPEG.to_vec()).with_thumbnail(Some(THUMB.to_vec()));

        let report = write_image(&conn, id, &asset).unwrap();
        assert_eq!(report.written, vec![COL_IMAGE_DATA, COL_IMAGE_TYPE, COL_THUMBNAIL]);
        assert!(report.skipped.is_empty());

        let read = read_image(&conn, id).unwrap().unwrap();
        assert_eq!(read, asset);
        assert_eq!(read_thumbnail(&conn, id).unwrap().as_deref(), Some(THUMB));
    }

    #[test]
    fn forward_writes_are_blobs() {
        let (conn, id) = setup();
        write_image(&conn, id, &ImageAsset::new(MIME_PNG, PNG.to_vec())).unwrap();
        let kind: String = conn
            .query_row("SELECT typeof(image_data) FROM locations WHERE id = ?1", [id.get()], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(kind, "blob");
    }

    #[test]
    fn rewrite_replaces_thumbnail() {
        let (conn, id) = setup();
        let first = ImageAsset::new(MIME_JPEG, JPEG.to_vec()).with_thumbnail(Some(THUMB.to_vec()));
        write_image(&conn, id, &first).unwrap();

        write_image(&conn, id, &ImageAsset::new(MIME_PNG, PNG.to_vec())).unwrap();
        let read = read_image(&conn, id).unwrap().unwrap();
        assert_eq!(read.mime_type, MIME_PNG);
        assert!(read.thumbnail.is_none());
    }

    #[test]
    fn unknown_location_is_not_found() {
        let (conn, _) = setup();
        let missing = LocationId::new(9999);
        assert!(read_image(&conn, missing).unwrap_err().is_not_found());
        assert!(read_thumbnail(&conn, missing).unwrap_err().is_not_found());
        let asset = ImageAsset::new(MIME_JPEG, JPEG.to_vec());
        assert!(write_image(&conn, missing, &asset).unwrap_err().is_not_found());
    }

    #[test]
    fn null_and_empty_values_read_as_absent() {
        let (conn, id) = setup();
        assert!(read_image(&conn, id).unwrap().is_none());

        set_raw(&conn, id, &"", Some(MIME_JPEG));
        assert!(read_image(&conn, id).unwrap().is_none());

        set_raw(&conn, id, &"   ", Some(MIME_JPEG));
        assert!(read_image(&conn, id).unwrap().is_none());

        set_raw(&conn, id, &Vec::<u8>::new(), Some(MIME_JPEG));
        assert!(read_image(&conn, id).unwrap().is_none());
    }

    #[test]
    fn base64_text_rows_decode_transparently() {
        let (conn, id) = setup();
        let encoded = base64::engine::general_purpose::STANDARD.encode(JPEG);
        set_raw(&conn, id, &encoded, Some(MIME_JPEG));

        let read = read_image(&conn, id).unwrap().unwrap();
        assert_eq!(read.bytes, JPEG);
        assert_eq!(read.mime_type, MIME_JPEG);
    }

    #[test]
    fn unpadded_and_wrapped_base64_decodes() {
        let (conn, id) = setup();
        let encoded = base64::engine::general_purpose::STANDARD_NO_PAD.encode(PNG);
        let wrapped = format!("{}\n{}", &encoded[..10], &encoded[10..]);
        set_raw(&conn, id, &wrapped, Some(MIME_PNG));
        assert_eq!(read_image(&conn, id).unwrap().unwrap().bytes, PNG);
    }

    #[test]
    fn data_url_rows_use_embedded_mime() {
        let (conn, id) = setup();
        let encoded = base64::engine::general_purpose::STANDARD.encode(PNG);
        set_raw(&conn, id, &format!("data:image/png;base64,{encoded}"), None);

        let read = read_image(&conn, id).unwrap().unwrap();
        assert_eq!(read.bytes, PNG);
        assert_eq!(read.mime_type, MIME_PNG);
    }

    #[test]
    fn base64_looking_blob_is_kept_verbatim() {
        let (conn, id) = setup();
        let asset = ImageAsset::new(MIME_JPEG, b"QUJDRA==".to_vec());
        write_image(&conn, id, &asset).unwrap();

        let read = read_image(&conn, id).unwrap().unwrap();
        assert_eq!(read.bytes, asset.bytes);
        assert_eq!(read.mime_type, MIME_JPEG);
    }

    #[test]
    fn base64_looking_thumbnail_is_kept_verbatim() {
        let (conn, id) = setup();
        let asset = ImageAsset::new(MIME_JPEG, JPEG.to_vec()).with_thumbnail(Some(b"dGh1bWI=".to_vec()));
        write_image(&conn, id, &asset).unwrap();

        assert_eq!(read_thumbnail(&conn, id).unwrap().as_deref(), Some(&b"dGh1bWI="[..]));
        assert_eq!(read_image(&conn, id).unwrap().unwrap(), asset);
    }

    #[test]
    fn compression_fallback_output_round_trips() {
        let (conn, id) = setup();
        let compressor = Compressor::default();

        // Kept verbatim by the compressor's failure policy.
        let corrupt = b"\xFF\xD8\xFF\xE0 truncated".to_vec();
        let failed = compressor.compress(&corrupt, MIME_JPEG, ImageFamily::Jpeg, Variant::Display);
        assert_eq!(failed.outcome, CompressionOutcome::Failed);

        // Unknown family, ASCII that is also valid base64.
        let text = b"QUJDRA==".to_vec();
        let passed = compressor.compress(&text, "text/plain", ImageFamily::Unknown, Variant::Display);
        assert_eq!(passed.outcome, CompressionOutcome::PassedThrough);

        for (original, compressed) in [(corrupt, failed), (text, passed)] {
            let asset = compressed.into_asset();
            write_image(&conn, id, &asset).unwrap();
            let read = read_image(&conn, id).unwrap().unwrap();
            assert_eq!(read.bytes, original);
            assert_eq!(read, asset);
        }
    }

    #[test]
    fn unsignatured_blob_is_raw() {
        let (conn, id) = setup();
        let raw: &[u8] = &[0x00, 0xFF, 0x10, 0x80];
        set_raw(&conn, id, &raw, Some(MIME_WEBP));
        let read = read_image(&conn, id).unwrap().unwrap();
        assert_eq!(read.bytes, raw);
        assert_eq!(read.mime_type, MIME_WEBP);
    }

    #[test]
    fn invalid_base64_is_decode_error() {
        let (conn, id) = setup();
        set_raw(&conn, id, &"not*base64*at*all", Some(MIME_JPEG));
        assert!(matches!(read_image(&conn, id), Err(Error::Decode(_))));
    }

    #[test]
    fn missing_type_is_sniffed() {
        let (conn, id) = setup();
        set_raw(&conn, id, &PNG, None);
        assert_eq!(read_image(&conn, id).unwrap().unwrap().mime_type, MIME_PNG);

        set_raw(&conn, id, &[0x01u8, 0x02, 0x03].as_slice(), Some(""));
        assert_eq!(read_image(&conn, id).unwrap().unwrap().mime_type, MIME_JPEG);
    }

    #[test]
    fn pre_thumbnail_schema_skips_thumbnail() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations_to(&conn, 2).unwrap();
        let loc = create_location(&conn, "Old", None, None, None).unwrap();

        let asset = ImageAsset::new(MIME_JPEG, JPEG.to_vec()).with_thumbnail(Some(THUMB.to_vec()));
        let report = write_image(&conn, loc.id, &asset).unwrap();
        assert_eq!(report.skipped, vec![COL_THUMBNAIL]);

        let read = read_image(&conn, loc.id).unwrap().unwrap();
        assert_eq!(read.bytes, JPEG);
        assert!(read.thumbnail.is_none());
        assert!(read_thumbnail(&conn, loc.id).unwrap().is_none());
    }

    #[test]
    fn payload_only_schema_infers_type() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE locations (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                latitude REAL,
                longitude REAL,
                image_path TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                image_data TEXT
            )",
        )
        .unwrap();
        let loc = create_location(&conn, "Drifted", None, None, None).unwrap();

        let report = write_image(&conn, loc.id, &ImageAsset::new(MIME_PNG, PNG.to_vec())).unwrap();
        assert_eq!(report.written, vec![COL_IMAGE_DATA]);
        assert_eq!(report.skipped, vec![COL_IMAGE_TYPE, COL_THUMBNAIL]);

        let read = read_image(&conn, loc.id).unwrap().unwrap();
        assert_eq!(read.bytes, PNG);
        assert_eq!(read.mime_type, MIME_PNG);
    }

    #[test]
    fn pre_image_schema() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations_to(&conn, 1).unwrap();
        let loc = create_location(&conn, "Ancient", None, None, None).unwrap();

        let asset = ImageAsset::new(MIME_JPEG, JPEG.to_vec());
        assert!(matches!(
            write_image(&conn, loc.id, &asset),
            Err(Error::SchemaUnsupported(_))
        ));
        assert!(read_image(&conn, loc.id).unwrap().is_none());
        assert!(read_image(&conn, LocationId::new(9999)).unwrap_err().is_not_found());
        assert!(select_missing(&conn).is_err());
    }

    #[test]
    fn select_missing_finds_null_and_empty() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let null = create_location(&conn, "null", None, None, Some("uploads/a.jpg")).unwrap();
        let empty = create_location(&conn, "empty", None, None, Some("  ")).unwrap();
        let blank = create_location(&conn, "blank", None, None, None).unwrap();
        let zero = create_location(&conn, "zero", None, None, None).unwrap();
        let present = create_location(&conn, "present", None, None, Some("uploads/b.jpg")).unwrap();

        set_raw(&conn, empty.id, &"", None);
        set_raw(&conn, blank.id, &" \n", None);
        set_raw(&conn, zero.id, &Vec::<u8>::new(), None);
        write_image(&conn, present.id, &ImageAsset::new(MIME_JPEG, JPEG.to_vec())).unwrap();

        let missing = select_missing(&conn).unwrap();
        let ids: Vec<_> = missing.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![null.id, empty.id, blank.id, zero.id]);
        assert_eq!(missing[0].legacy_path.as_deref(), Some("uploads/a.jpg"));
        assert_eq!(missing[1].legacy_path, None);
    }

    #[test]
    fn clear_image_makes_record_missing() {
        let (conn, id) = setup();
        let asset = ImageAsset::new(MIME_JPEG, JPEG.to_vec()).with_thumbnail(Some(THUMB.to_vec()));
        write_image(&conn, id, &asset).unwrap();

        assert!(clear_image(&conn, id).unwrap());
        assert!(read_image(&conn, id).unwrap().is_none());
        assert!(read_thumbnail(&conn, id).unwrap().is_none());
        assert!(!clear_image(&conn, LocationId::new(9999)).unwrap());
    }
}
