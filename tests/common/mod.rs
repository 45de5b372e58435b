//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, a configuration
//! and the full [`AppContext`], plus helpers to drive the router in-process
//! and to produce real encoded images.

#![allow(dead_code)]

use std::io::Cursor;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use lp_core::config::Config;
use lp_core::LocationId;
use lp_db::pool::{init_memory_pool, DbPool};
use lp_server::context::AppContext;
use lp_server::router::build_router;

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
}

impl TestHarness {
    /// Create a new harness with default configuration and in-memory DB.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration and in-memory DB.
    pub fn with_config(config: Config) -> Self {
        let db = init_memory_pool().expect("failed to create in-memory pool");
        let ctx = AppContext::new(db.clone(), config);
        Self { ctx, db }
    }

    pub fn router(&self) -> Router {
        build_router(self.ctx.clone())
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> lp_db::pool::PooledConnection {
        lp_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    /// Insert a location and return its ID.
    pub fn create_location(&self, name: &str, image_path: Option<&str>) -> LocationId {
        lp_db::queries::locations::create_location(&self.conn(), name, None, None, image_path)
            .expect("failed to create location")
            .id
    }

    /// Insert a location with an explicit ID.
    pub fn create_location_with_id(&self, id: i64, name: &str) -> LocationId {
        let name = name.replace('\'', "''");
        self.conn()
            .execute(
                &format!("INSERT INTO locations (id, name) VALUES ({id}, '{name}')"),
                [],
            )
            .expect("failed to insert location");
        LocationId::new(id)
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.send(Request::delete(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn upload(&self, uri: &str, content_type: &str, body: Vec<u8>) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header("content-type", content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }
}

/// Collect a response body.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes()
        .to_vec()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("body is not JSON")
}

/// Encode a gradient test image.
pub fn encoded_image(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), format)
        .expect("failed to encode test image");
    buf
}
