use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::version::BuildInfo;

use crate::build_info;
use crate::http_server::api::client::ApiRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRequest {}

impl ApiRequest for VersionRequest {
    type Response = BuildInfo;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/_status/version").unwrap();
        client.get(full_url)
    }
}

#[tracing::instrument]
pub async fn handler() -> Response {
    (StatusCode::OK, Json(build_info())).into_response()
}
