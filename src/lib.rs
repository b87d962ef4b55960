//! Air-quality station core for the AQI dashboard.
//!
//! Finds monitoring stations near a point through the OpenAQ API, derives an
//! Air Quality Index from raw pollutant concentrations, and substitutes
//! synthetic Jakarta-area stations when the upstream API is unavailable.
//!
//! # Modules
//!
//! - `geo`: Haversine distance
//! - `aqi`: breakpoint tables, concentration → AQI, category bands
//! - `models`: station model and upstream wire types
//! - `aggregate`: grouping of measurement rows into stations, AQI selection
//! - `remote`: transport seam and the upstream station source
//! - `fallback`: synthetic station generator
//! - `retry`: retry-with-backoff helper
//! - `service`: the orchestrator the dashboard calls
//! - `config`, `routes`: runtime configuration and the HTTP surface

pub mod aggregate;
pub mod aqi;
pub mod config;
pub mod error;
pub mod fallback;
pub mod geo;
pub mod models;
pub mod remote;
pub mod retry;
pub mod routes;
pub mod service;

pub use aggregate::StationAggregator;
pub use aqi::{aqi_color, category_for, concentration_to_aqi, AqiEngine, BreakpointTable, Segment};
pub use config::Config;
pub use error::{UpstreamError, ValidationError};
pub use fallback::FallbackSource;
pub use geo::distance_km;
pub use models::{AqiCategory, Coordinates, Pollutant, PollutantReading, Station};
pub use remote::{HttpTransport, RemoteStationSource, Transport};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use service::{AirQualityQuery, AirQualityService, FallbackCause, StationSet};
