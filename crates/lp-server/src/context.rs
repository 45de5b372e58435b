//! Shared application state for route handlers.

use std::sync::Arc;

use lp_core::config::Config;
use lp_db::pool::DbPool;
use lp_media::{CompressionSettings, Compressor};
use lp_pipeline::{CacheBuster, FallbackAsset, Ingestor};

/// Central state handed to every handler via Axum state.
///
/// Everything is either cheap to clone or behind an `Arc`.
#[derive(Clone)]
pub struct AppContext {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub ingestor: Ingestor,
    pub fallback: Arc<FallbackAsset>,
    pub cache_buster: Arc<CacheBuster>,
}

impl AppContext {
    /// Wire up the pipeline services from configuration.
    pub fn new(db: DbPool, config: Config) -> Self {
        let compressor = Compressor::new(CompressionSettings::from(&config.images));
        let ingestor = Ingestor::new(db.clone(), compressor, config.images.max_upload_bytes);
        let fallback = FallbackAsset::load(&config.images);

        Self {
            db,
            config: Arc::new(config),
            ingestor,
            fallback: Arc::new(fallback),
            cache_buster: Arc::new(CacheBuster::new()),
        }
    }
}
