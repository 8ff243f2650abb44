use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::shelf::FileView;

use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub files: Vec<FileView>,
}

/// List every uploaded file. A storage failure yields an empty list.
pub async fn handler(State(state): State<ServiceState>) -> Response {
    let files = match state.shelf().list_files().await {
        Ok(files) => files,
        Err(e) => {
            tracing::error!(error = %e, "failed to list files");
            Vec::new()
        }
    };

    (http::StatusCode::OK, Json(ListResponse { files })).into_response()
}

impl ApiRequest for ListRequest {
    type Response = ListResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/api/list").unwrap();
        client.get(full_url)
    }
}
