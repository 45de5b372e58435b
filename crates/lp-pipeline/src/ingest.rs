//! Upload ingestion: validate, classify, compress, store.

use lp_core::{Error, ImageAsset, ImageFamily, LocationId, Result};
use lp_db::pool::{get_conn, DbPool};
use lp_db::queries::{location_images, locations};
use lp_media::{detect, mime_for_family, sniff, CompressionOutcome, Compressor, Variant};

/// Declared type used when an upload carries none and its bytes are not
/// recognisable.
const OCTET_STREAM: &str = "application/octet-stream";

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub location_id: LocationId,
    pub family: ImageFamily,
    /// Size of the uploaded body in bytes.
    pub original_size: usize,
    pub outcome: CompressionOutcome,
    /// What was written to the store.
    pub asset: ImageAsset,
}

impl IngestOutcome {
    pub fn stored_size(&self) -> usize {
        self.asset.bytes.len()
    }

    pub fn has_thumbnail(&self) -> bool {
        self.asset.thumbnail.is_some()
    }
}

/// Runs uploads through the detector, compressor and store.
#[derive(Clone)]
pub struct Ingestor {
    db: DbPool,
    compressor: Compressor,
    max_upload_bytes: usize,
}

impl Ingestor {
    pub fn new(db: DbPool, compressor: Compressor, max_upload_bytes: usize) -> Self {
        Self {
            db,
            compressor,
            max_upload_bytes,
        }
    }

    /// Store `body` as the image of location `id`, replacing any previous one.
    ///
    /// Fails with `Validation` for an empty body, `PayloadTooLarge` above the
    /// configured limit, and `NotFound` for an unknown location. Compression
    /// problems never fail the upload; the original bytes are stored instead.
    pub async fn ingest(
        &self,
        id: LocationId,
        body: Vec<u8>,
        declared_mime: Option<&str>,
    ) -> Result<IngestOutcome> {
        if body.is_empty() {
            return Err(Error::Validation("image body is empty".into()));
        }
        if body.len() > self.max_upload_bytes {
            return Err(Error::PayloadTooLarge {
                size: body.len(),
                limit: self.max_upload_bytes,
            });
        }

        {
            let conn = get_conn(&self.db)?;
            if !locations::location_exists(&conn, id)? {
                return Err(Error::not_found("location", id));
            }
        }

        let declared = declared_mime
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from);
        let family = detect(&body, declared.as_deref());
        let declared = declared
            .or_else(|| sniff(&body).and_then(mime_for_family).map(String::from))
            .unwrap_or_else(|| OCTET_STREAM.to_string());

        let original_size = body.len();
        let compressor = self.compressor.clone();
        let compressed = tokio::task::spawn_blocking(move || {
            compressor.compress(&body, &declared, family, Variant::Display)
        })
        .await
        .map_err(|e| Error::Internal(format!("compression task failed: {e}")))?;

        let outcome = compressed.outcome;
        let asset = compressed.into_asset();

        let conn = get_conn(&self.db)?;
        location_images::write_image(&conn, id, &asset)?;

        tracing::info!(
            location_id = %id,
            %family,
            original_size,
            stored_size = asset.bytes.len(),
            mime_type = %asset.mime_type,
            ?outcome,
            "Stored uploaded image"
        );

        Ok(IngestOutcome {
            location_id: id,
            family,
            original_size,
            outcome,
            asset,
        })
    }
}
