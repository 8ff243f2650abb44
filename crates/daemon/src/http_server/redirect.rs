//! `GET /d/:code`: short-link redirect.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use http::{header, StatusCode};

use crate::ServiceState;

/// Redirect to the file behind `code` and count the download in the
/// background. Unknown codes are a plain-text 404.
pub async fn handler(State(state): State<ServiceState>, Path(code): Path<String>) -> Response {
    let Some(entry) = state.shelf().index().short_links().resolve(&code).await else {
        tracing::debug!(code = %code, "unknown short code");
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    };

    state.jobs().record_download(entry.url.clone());
    tracing::debug!(code = %code, url = %entry.url, "redirecting");

    (StatusCode::FOUND, [(header::LOCATION, entry.url)]).into_response()
}
