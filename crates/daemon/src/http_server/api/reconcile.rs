//! Metadata maintenance: find (and optionally repair) drift between stored
//! files and the short-link and download-count tables.

use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::shelf::{ReconcileError as ShelfReconcileError, ReconcileOptions, ReconcileReport};

use super::error_response;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReconcileRequest(pub ReconcileOptions);

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<ReconcileRequest>,
) -> Result<impl IntoResponse, ReconcileError> {
    let report: ReconcileReport = state.shelf().reconcile(req.0).await?;
    Ok((http::StatusCode::OK, Json(report)).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Reconcile failed: {0}")]
    Shelf(#[from] ShelfReconcileError),
}

impl IntoResponse for ReconcileError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "reconcile failed");
        error_response(http::StatusCode::INTERNAL_SERVER_ERROR, "Reconcile failed")
    }
}

impl ApiRequest for ReconcileRequest {
    type Response = ReconcileReport;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/api/reconcile").unwrap();
        client.post(full_url).json(&self)
    }
}
