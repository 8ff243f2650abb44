//! Multipart APK upload.
//!
//! The `file` part is streamed into memory chunk by chunk so an oversized
//! upload is rejected before anything reaches the blob store.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::BytesMut;
use reqwest::{Client, RequestBuilder, Url};

use common::shelf::{validate, FileView, UploadError as ShelfUploadError};

use super::error_response;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

/// Client-side upload request. Sent as `multipart/form-data`.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub data: Vec<u8>,
}

pub type UploadResponse = FileView;

pub async fn handler(
    State(state): State<ServiceState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, UploadError> {
    let max_bytes = state.shelf().config().max_upload_bytes;

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_owned)
            .ok_or(UploadError::NoFile)?;

        // Reject by name before reading the body.
        validate(&filename, 0, max_bytes)?;

        let mut data = BytesMut::new();
        while let Some(chunk) = field.chunk().await? {
            let size = (data.len() + chunk.len()) as u64;
            if size > max_bytes {
                return Err(ShelfUploadError::TooLarge {
                    size,
                    max: max_bytes,
                }
                .into());
            }
            data.extend_from_slice(&chunk);
        }

        let view = state.shelf().upload(&filename, data.freeze()).await?;
        return Ok((http::StatusCode::OK, Json(view)).into_response());
    }

    Err(UploadError::NoFile)
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file provided")]
    NoFile,
    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Shelf(#[from] ShelfUploadError),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match self {
            UploadError::NoFile => {
                error_response(http::StatusCode::BAD_REQUEST, "No file provided")
            }
            UploadError::Multipart(ref e) if e.status() == http::StatusCode::PAYLOAD_TOO_LARGE => {
                error_response(http::StatusCode::PAYLOAD_TOO_LARGE, "File too large")
            }
            UploadError::Multipart(e) => {
                error_response(http::StatusCode::BAD_REQUEST, e.body_text())
            }
            UploadError::Shelf(ShelfUploadError::NotApk) => {
                error_response(http::StatusCode::BAD_REQUEST, ShelfUploadError::NotApk.to_string())
            }
            UploadError::Shelf(e @ ShelfUploadError::TooLarge { .. }) => {
                error_response(http::StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
            }
            UploadError::Shelf(ShelfUploadError::Storage(e)) => {
                tracing::error!(error = %e, "upload failed");
                error_response(http::StatusCode::INTERNAL_SERVER_ERROR, "Upload failed")
            }
        }
    }
}

impl ApiRequest for UploadRequest {
    type Response = UploadResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/api/upload").unwrap();
        let part = reqwest::multipart::Part::bytes(self.data).file_name(self.filename);
        let form = reqwest::multipart::Form::new().part("file", part);
        client.post(full_url).multipart(form)
    }
}
