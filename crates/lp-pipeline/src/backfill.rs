//! Repair job: populate missing images from legacy file references.
//!
//! Records are processed strictly one after another. A record whose legacy
//! file is gone gets the fallback asset so it stops being selected; a record
//! whose write fails is logged and left for the next run.

use std::fmt;
use std::path::Path;

use lp_core::{ImageAsset, Result, STORED_MIME_TYPES};
use lp_db::models::MissingImage;
use lp_db::pool::{get_conn, DbPool};
use lp_db::queries::location_images;
use lp_media::{detect, mime_for_family, mime_from_path, sniff, Compressor, Variant};

use crate::fallback::FallbackAsset;
use crate::resolver::LegacyResolver;

/// Knobs for a backfill run.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackfillOptions {
    /// Select and resolve, but write nothing.
    pub dry_run: bool,
}

/// Tally of a backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub attempted: usize,
    /// Records repaired from their legacy file.
    pub succeeded: usize,
    /// Records given the fallback asset because the legacy file was stale.
    pub fallback_applied: usize,
    /// Records whose write failed.
    pub failed: usize,
}

impl fmt::Display for BackfillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded of {} attempted",
            self.succeeded, self.attempted
        )
    }
}

enum Repair {
    Legacy(ImageAsset),
    Fallback,
}

/// Run one backfill pass over every location without a stored image.
///
/// Only the initial selection can fail the job; per-record problems are
/// counted in the report.
pub fn run_backfill(
    pool: &DbPool,
    compressor: &Compressor,
    resolver: &dyn LegacyResolver,
    fallback: &FallbackAsset,
    options: BackfillOptions,
) -> Result<BackfillReport> {
    let missing = {
        let conn = get_conn(pool)?;
        location_images::select_missing(&conn)?
    };

    tracing::info!(
        count = missing.len(),
        dry_run = options.dry_run,
        "Backfill selected records without images"
    );

    let mut report = BackfillReport::default();
    for record in &missing {
        report.attempted += 1;

        let repair = repair_for(record, compressor, resolver);
        let asset = match &repair {
            Repair::Legacy(asset) => asset.clone(),
            Repair::Fallback => fallback.to_asset(),
        };

        if options.dry_run {
            tracing::info!(
                location_id = %record.id,
                mime_type = %asset.mime_type,
                size = asset.bytes.len(),
                fallback = matches!(repair, Repair::Fallback),
                "Dry run, not writing"
            );
        } else if let Err(e) = write(pool, record, &asset) {
            tracing::error!(location_id = %record.id, "Backfill write failed: {e}");
            report.failed += 1;
            continue;
        }

        match repair {
            Repair::Legacy(_) => report.succeeded += 1,
            Repair::Fallback => report.fallback_applied += 1,
        }
    }

    tracing::info!(
        attempted = report.attempted,
        succeeded = report.succeeded,
        fallback_applied = report.fallback_applied,
        failed = report.failed,
        "Backfill finished: {report}"
    );

    Ok(report)
}

/// Work out what to store for one record.
fn repair_for(
    record: &MissingImage,
    compressor: &Compressor,
    resolver: &dyn LegacyResolver,
) -> Repair {
    let Some(path) = record.legacy_path.as_deref() else {
        tracing::debug!(location_id = %record.id, "No legacy path, applying fallback");
        return Repair::Fallback;
    };

    let Some(bytes) = resolver.resolve(path) else {
        tracing::warn!(
            location_id = %record.id,
            legacy_path = path,
            "Legacy image is stale, applying fallback"
        );
        return Repair::Fallback;
    };

    let declared = mime_from_path(Path::new(path))
        .or_else(|| sniff(&bytes).and_then(mime_for_family))
        .unwrap_or("application/octet-stream");
    let family = detect(&bytes, Some(declared));
    let compressed = compressor.compress(&bytes, declared, family, Variant::Display);

    // A file that never becomes a browser-renderable image is as good as gone.
    if !STORED_MIME_TYPES.contains(&compressed.mime_type.as_str()) {
        tracing::warn!(
            location_id = %record.id,
            legacy_path = path,
            mime_type = %compressed.mime_type,
            "Legacy file is not a usable image, applying fallback"
        );
        return Repair::Fallback;
    }

    Repair::Legacy(compressed.into_asset())
}

fn write(pool: &DbPool, record: &MissingImage, asset: &ImageAsset) -> Result<()> {
    let conn = get_conn(pool)?;
    location_images::write_image(&conn, record.id, asset)?;
    Ok(())
}
