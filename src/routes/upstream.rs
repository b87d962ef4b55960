//! `GET /api/upstream-status`: is the upstream API reachable right now?
//!
//! Lets the dashboard show whether it is looking at live or synthetic data
//! before it asks for stations.

use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use super::AppState;
use crate::models::RawMeta;
use crate::Transport;

// ---

pub fn router<T>() -> Router<AppState<T>>
where
    T: Transport + 'static,
{
    Router::new().route("/api/upstream-status", get(handler::<T>))
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<RawMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<&'static str>,
}

async fn handler<T>(State((service, _config)): State<AppState<T>>) -> Response
where
    T: Transport + 'static,
{
    // ---
    match service.probe_upstream().await {
        Ok(probe) => {
            let body = StatusResponse {
                status: "success",
                message: "Upstream API is accessible".to_string(),
                result_count: Some(probe.result_count),
                meta: probe.meta,
                fallback: None,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            warn!("Upstream probe failed: {}", e);
            let body = StatusResponse {
                status: "error",
                message: e.to_string(),
                result_count: None,
                meta: None,
                fallback: Some("Using synthetic data"),
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}
