use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::index::IndexError;

use super::error_response;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShortLinkRequest {
    pub url: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortLinkResponse {
    pub short_code: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<ShortLinkRequest>,
) -> Result<impl IntoResponse, ShortLinkError> {
    let (url, filename) = match (req.url, req.filename) {
        (Some(url), Some(filename)) if !url.is_empty() && !filename.is_empty() => (url, filename),
        _ => return Err(ShortLinkError::MissingFields),
    };

    let short_code = state
        .shelf()
        .index()
        .short_links()
        .create(&url, &filename)
        .await?;

    Ok((http::StatusCode::OK, Json(ShortLinkResponse { short_code })).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum ShortLinkError {
    #[error("Missing url or filename")]
    MissingFields,
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

impl IntoResponse for ShortLinkError {
    fn into_response(self) -> Response {
        match self {
            ShortLinkError::MissingFields => {
                error_response(http::StatusCode::BAD_REQUEST, "Missing url or filename")
            }
            ShortLinkError::Index(e) => {
                tracing::error!(error = %e, "failed to create short link");
                error_response(
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to create short link",
                )
            }
        }
    }
}

impl ApiRequest for ShortLinkRequest {
    type Response = ShortLinkResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/api/short-link").unwrap();
        client.post(full_url).json(&self)
    }
}
