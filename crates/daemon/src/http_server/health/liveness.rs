use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use crate::http_server::api::client::ApiRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivezRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivezResponse {
    pub status: String,
}

impl ApiRequest for LivezRequest {
    type Response = LivezResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/_status/livez").unwrap();
        client.get(full_url)
    }
}

/// Always answers `{"status":"ok"}` while the process can serve requests.
/// Storage problems are reported by [`super::readiness::handler`] instead.
#[tracing::instrument]
pub async fn handler() -> Response {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
}
