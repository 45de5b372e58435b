//! lp-db: database access and persistence layer.
//!
//! SQLite-backed storage with r2d2 connection pooling, embedded migrations,
//! live-schema column probing, and the query modules for location records
//! and their encoded image columns.
//!
//! Every query takes a plain `&rusqlite::Connection`, so callers decide how
//! long a pooled connection is held.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
pub mod schema;
