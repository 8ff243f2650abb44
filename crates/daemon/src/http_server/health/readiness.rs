use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

/// Prefix listed to prove the blob store answers.
const PROBE_PREFIX: &str = "apk-meta";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyzRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyzResponse {
    pub status: String,
}

impl ApiRequest for ReadyzRequest {
    type Response = ReadyzResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/_status/readyz").unwrap();
        client.get(full_url)
    }
}

/// Ready when the blob store can be listed; 503 otherwise.
pub async fn handler(State(state): State<ServiceState>) -> Response {
    match state.shelf().store().list(PROBE_PREFIX).await {
        Ok(_) => (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"status": "unavailable"})),
            )
                .into_response()
        }
    }
}
