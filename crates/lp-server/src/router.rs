//! Axum router construction.

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::routes;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Uploads above the configured limit are refused while buffering.
    let body_limit = DefaultBodyLimit::max(ctx.config.images.max_upload_bytes);

    let api = Router::new()
        .route(
            "/locations/{id}/image",
            get(routes::images::get_image)
                .post(routes::images::upload_image)
                .delete(routes::images::delete_image),
        )
        .route(
            "/locations/{id}/image/data",
            get(routes::images::get_image_data),
        )
        .route(
            "/locations/{id}/thumbnail",
            get(routes::images::get_thumbnail),
        );

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api)
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
