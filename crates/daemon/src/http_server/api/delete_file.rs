use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::shelf::DeleteError as ShelfDeleteError;

use super::error_response;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Public URL of the file to delete
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<DeleteRequest>,
) -> Result<impl IntoResponse, DeleteError> {
    let raw = req
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or(DeleteError::MissingUrl)?;
    let url = Url::parse(raw.trim()).map_err(|_| DeleteError::InvalidUrl(raw.clone()))?;

    state.shelf().delete(&url).await?;

    Ok((http::StatusCode::OK, Json(DeleteResponse { success: true })).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error("No URL provided")]
    MissingUrl,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Shelf(#[from] ShelfDeleteError),
}

impl IntoResponse for DeleteError {
    fn into_response(self) -> Response {
        match self {
            DeleteError::MissingUrl | DeleteError::InvalidUrl(_) => {
                error_response(http::StatusCode::BAD_REQUEST, self.to_string())
            }
            DeleteError::Shelf(ShelfDeleteError::ForeignUrl(url)) => error_response(
                http::StatusCode::BAD_REQUEST,
                format!("Not a file of this server: {url}"),
            ),
            DeleteError::Shelf(ShelfDeleteError::Failed) => {
                error_response(http::StatusCode::INTERNAL_SERVER_ERROR, "Delete failed")
            }
        }
    }
}

impl ApiRequest for DeleteRequest {
    type Response = DeleteResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/api/delete").unwrap();
        client.delete(full_url).json(&self)
    }
}
