//! JSON API under `/api`.

use axum::extract::DefaultBodyLimit;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use http::StatusCode;

use crate::ServiceState;

pub mod client;
pub mod delete_file;
pub mod download;
pub mod list;
pub mod reconcile;
pub mod short_link;
pub mod upload;

// Re-export request/response types for use by the CLI
pub use delete_file::{DeleteRequest, DeleteResponse};
pub use download::{
    DownloadStatsRequest, DownloadStatsResponse, TrackDownloadRequest, TrackDownloadResponse,
};
pub use list::{ListRequest, ListResponse};
pub use reconcile::ReconcileRequest;
pub use short_link::{ShortLinkRequest, ShortLinkResponse};
pub use upload::UploadRequest;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    let body_limit = usize::try_from(state.shelf().config().max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route(
            "/upload",
            post(upload::handler).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/list", get(list::handler))
        .route("/delete", delete(delete_file::handler))
        .route(
            "/download",
            post(download::track_handler).get(download::stats_handler),
        )
        .route("/short-link", post(short_link::handler))
        .route("/reconcile", post(reconcile::handler))
        .with_state(state)
}

/// `{"error": message}` with the given status.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}
