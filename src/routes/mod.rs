//! Route gateway for the `aqi-dashboard` HTTP surface.
//!
//! Follows the Explicit Module Boundary Pattern (EMBP): each sibling module
//! owns its handlers and exports a subrouter; this gateway merges them and
//! attaches the shared state, so `main.rs` only ever calls [`router`].

use std::sync::Arc;

use axum::Router;

use crate::{AirQualityService, Config, Transport};

mod air_quality;
mod health;
mod upstream;

/// State shared by every route: the orchestrator and the loaded configuration.
pub type AppState<T> = (Arc<AirQualityService<T>>, Config);

// ---

pub fn router<T>(service: Arc<AirQualityService<T>>, config: Config) -> Router
where
    T: Transport + 'static,
{
    // ---
    Router::new()
        .merge(air_quality::router())
        .merge(upstream::router())
        .merge(health::router())
        .with_state((service, config))
}
