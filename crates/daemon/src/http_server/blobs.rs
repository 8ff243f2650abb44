//! `GET /blobs/*pathname`: serve stored objects for backends without a
//! public endpoint of their own.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use http::{header, StatusCode};

use crate::ServiceState;

pub async fn handler(State(state): State<ServiceState>, Path(pathname): Path<String>) -> Response {
    let pathname = pathname.trim_start_matches('/');
    let object = match state.shelf().store().get(pathname).await {
        Ok(Some(object)) => object,
        Ok(None) => return (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) if e.is_not_found() => return (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(object_store::BlobStoreError::InvalidPath(_)) => {
            return (StatusCode::NOT_FOUND, "Not found").into_response()
        }
        Err(e) => {
            tracing::error!(pathname = %pathname, error = %e, "failed to read blob");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file").into_response();
        }
    };

    let content_type = object.content_type.clone().unwrap_or_else(|| {
        mime_guess::from_path(pathname)
            .first_or_octet_stream()
            .to_string()
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, object.data.len())
        .header(
            header::LAST_MODIFIED,
            object
                .last_modified()
                .format("%a, %d %b %Y %H:%M:%S GMT")
                .to_string(),
        )
        .body(Body::from(object.data))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
