//! # lp-pipeline
//!
//! The ingestion → compression → persistence → serving flow for location
//! images.
//!
//! - **[`Ingestor`]** -- validates an upload, classifies and compresses it off
//!   the async runtime, and writes it to the store.
//! - **[`gateway`]** -- resolves what to serve for a location: the stored
//!   image, the [`FallbackAsset`], or nothing.
//! - **[`run_backfill`]** -- repairs records with no stored image from their
//!   legacy file references, via a [`LegacyResolver`].

pub mod backfill;
pub mod fallback;
pub mod gateway;
pub mod ingest;
pub mod resolver;

pub use backfill::{run_backfill, BackfillOptions, BackfillReport};
pub use fallback::FallbackAsset;
pub use gateway::{serve, serve_thumbnail, CacheBuster, Served};
pub use ingest::{IngestOutcome, Ingestor};
pub use resolver::{FsResolver, LegacyResolver};
