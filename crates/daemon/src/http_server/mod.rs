//! HTTP surface of the daemon.
//!
//! - `/api/*`: JSON API (upload, list, delete, downloads, short links, reconcile)
//! - `/d/:code`: short-link redirect
//! - `/blobs/*pathname`: stored files
//! - `/_status/*`: health probes

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::ServiceState;

pub mod api;
pub mod blobs;
pub mod health;
pub mod redirect;

/// The complete application router.
pub fn router(state: ServiceState) -> Router {
    Router::new()
        .nest("/api", api::router(state.clone()))
        .nest("/_status", health::router(state.clone()))
        .route("/d/:code", get(redirect::handler))
        .route("/blobs/*pathname", get(blobs::handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
