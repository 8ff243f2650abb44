//! Download counters: explicit tracking and the stats dump.

use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::index::{DownloadCounts, IndexError};

use super::error_response;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDownloadRequest {
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackDownloadResponse {
    pub downloads: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadStatsRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadStatsResponse {
    pub stats: DownloadCounts,
}

/// Count one download of `fileUrl` and return the new total.
pub async fn track_handler(
    State(state): State<ServiceState>,
    Json(req): Json<TrackDownloadRequest>,
) -> Result<impl IntoResponse, TrackDownloadError> {
    let file_url = req
        .file_url
        .filter(|url| !url.is_empty())
        .ok_or(TrackDownloadError::MissingFileUrl)?;

    let downloads = state.shelf().index().downloads().increment(&file_url).await?;

    Ok((http::StatusCode::OK, Json(TrackDownloadResponse { downloads })).into_response())
}

/// All counters. Never fails; unreadable stats are empty.
pub async fn stats_handler(State(state): State<ServiceState>) -> Response {
    let stats = state.shelf().index().downloads().get_all().await;
    (http::StatusCode::OK, Json(DownloadStatsResponse { stats })).into_response()
}

#[derive(Debug, thiserror::Error)]
pub enum TrackDownloadError {
    #[error("No fileUrl provided")]
    MissingFileUrl,
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

impl IntoResponse for TrackDownloadError {
    fn into_response(self) -> Response {
        match self {
            TrackDownloadError::MissingFileUrl => {
                error_response(http::StatusCode::BAD_REQUEST, "No fileUrl provided")
            }
            TrackDownloadError::Index(e) => {
                tracing::error!(error = %e, "failed to track download");
                error_response(
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to track download",
                )
            }
        }
    }
}

impl ApiRequest for TrackDownloadRequest {
    type Response = TrackDownloadResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/api/download").unwrap();
        client.post(full_url).json(&self)
    }
}

impl ApiRequest for DownloadStatsRequest {
    type Response = DownloadStatsResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/api/download").unwrap();
        client.get(full_url)
    }
}
