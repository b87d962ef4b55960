//! `GET /api/air-quality`: stations near a point for the dashboard map.
//!
//! Query: `lat`, `lon` (required), `radius_km`, `max_stations` (optional,
//! defaulting from config). Validation failures answer 400; upstream
//! failures never surface here because the service falls back to synthetic
//! stations and reports that through the `source` field.

use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, response::Response,
    routing::get, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::AppState;
use crate::{AirQualityQuery, Station, Transport};

// ---

pub fn router<T>() -> Router<AppState<T>>
where
    T: Transport + 'static,
{
    // ---
    Router::new().route("/api/air-quality", get(handler::<T>))
}

/// Query parameters for a station search.
#[derive(Debug, Deserialize)]
pub struct AirQualityParams {
    lat: f64,
    lon: f64,
    radius_km: Option<f64>,
    max_stations: Option<usize>,
}

#[derive(Serialize)]
struct AirQualityResponse {
    /// `"openaq"` or `"synthetic"`.
    source: &'static str,
    count: usize,
    stations: Vec<Station>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

async fn handler<T>(
    Query(params): Query<AirQualityParams>,
    State((service, config)): State<AppState<T>>,
) -> Response
where
    T: Transport + 'static,
{
    // ---
    info!("GET /api/air-quality - {:?}", params);

    let query = match AirQualityQuery::new(
        params.lat,
        params.lon,
        params.radius_km.unwrap_or(config.default_radius_km),
        params.max_stations.unwrap_or(config.default_max_stations),
    ) {
        Ok(query) => query,
        Err(e) => {
            warn!("Rejected air-quality query: {}", e);
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: e.to_string() })).into_response();
        }
    };

    let set = service.resolve(&query).await;
    let body = AirQualityResponse {
        source: set.source_label(),
        count: set.stations().len(),
        stations: set.into_stations(),
    };

    (StatusCode::OK, Json(body)).into_response()
}
