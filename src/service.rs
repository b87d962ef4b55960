//! Orchestration: validate, ask upstream, fall back to synthetic stations.
//!
//! The pipeline has two stages. [`AirQualityQuery::new`] validates the
//! arguments and fails fast without touching the network.
//! [`AirQualityService::resolve`] then returns a [`StationSet`] that is either
//! entirely upstream data or entirely synthetic, never a mix.

use tracing::{info, warn};

use crate::error::{UpstreamError, ValidationError};
use crate::fallback::FallbackSource;
use crate::models::{Coordinates, Pollutant, Station};
use crate::remote::{RemoteStationSource, Transport, UpstreamProbe};
use crate::retry::{retry_with_backoff, RetryPolicy};

// ---

pub const DEFAULT_RADIUS_KM: f64 = 25.0;
pub const DEFAULT_MAX_STATIONS: usize = 10;
pub const MAX_RADIUS_KM: f64 = 1000.0;

/// A validated station search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirQualityQuery {
    // ---
    pub center: Coordinates,
    pub radius_km: f64,
    pub max_stations: usize,
}

impl AirQualityQuery {
    // ---
    pub fn new(latitude: f64, longitude: f64, radius_km: f64, max_stations: usize) -> Result<Self, ValidationError> {
        // ---
        let center = Coordinates::validated(latitude, longitude)?;

        if !(radius_km > 0.0 && radius_km <= MAX_RADIUS_KM) {
            return Err(ValidationError::Radius(radius_km));
        }
        if max_stations == 0 {
            return Err(ValidationError::MaxStations(max_stations));
        }

        Ok(Self {
            center,
            radius_km,
            max_stations,
        })
    }
}

/// Why synthetic stations were served.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackCause {
    Upstream(UpstreamError),
    Empty,
}

/// Outcome of a resolved query, tagged with where the stations came from.
#[derive(Debug, Clone, PartialEq)]
pub enum StationSet {
    Remote(Vec<Station>),
    Fallback {
        stations: Vec<Station>,
        cause: FallbackCause,
    },
}

impl StationSet {
    // ---
    pub fn stations(&self) -> &[Station] {
        match self {
            Self::Remote(stations) | Self::Fallback { stations, .. } => stations,
        }
    }

    pub fn into_stations(self) -> Vec<Station> {
        match self {
            Self::Remote(stations) | Self::Fallback { stations, .. } => stations,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Short provenance tag for logs and API responses.
    pub fn source_label(&self) -> &'static str {
        if self.is_synthetic() {
            "synthetic"
        } else {
            "openaq"
        }
    }
}

/// Entry point used by the dashboard.
#[derive(Debug)]
pub struct AirQualityService<T> {
    remote: RemoteStationSource<T>,
    fallback: FallbackSource,
    retry: RetryPolicy,
    pollutants: Vec<Pollutant>,
}

impl<T: Transport> AirQualityService<T> {
    // ---
    pub fn new(transport: T) -> Self {
        Self {
            remote: RemoteStationSource::new(transport),
            fallback: FallbackSource::default(),
            retry: RetryPolicy::no_retry(),
            pollutants: Pollutant::DEFAULT_SET.to_vec(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: FallbackSource) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn remote(&self) -> &RemoteStationSource<T> {
        &self.remote
    }

    /// Stations near a point, from upstream when possible, synthetic otherwise.
    ///
    /// `None` arguments take the defaults (25 km, 10 stations). Only invalid
    /// arguments produce an error; upstream trouble is absorbed.
    pub async fn get_air_quality_data(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: Option<f64>,
        max_stations: Option<usize>,
    ) -> Result<Vec<Station>, ValidationError> {
        // ---
        let query = AirQualityQuery::new(
            latitude,
            longitude,
            radius_km.unwrap_or(DEFAULT_RADIUS_KM),
            max_stations.unwrap_or(DEFAULT_MAX_STATIONS),
        )?;

        Ok(self.resolve(&query).await.into_stations())
    }

    /// Run a validated query through upstream, substituting synthetic data on failure.
    #[tracing::instrument(skip(self), fields(source))]
    pub async fn resolve(&self, query: &AirQualityQuery) -> StationSet {
        // ---
        info!(
            "Searching for air quality stations near ({}, {}), radius {} km, max {}",
            query.center.latitude, query.center.longitude, query.radius_km, query.max_stations
        );

        let remote = retry_with_backoff(&self.retry, || {
            self.remote.fetch_stations_with_measurements(
                query.center,
                query.radius_km,
                query.max_stations,
                &self.pollutants,
            )
        })
        .await;

        let set = Self::choose(remote, || self.fallback.synthesize(query.center, query.max_stations));
        tracing::Span::current().record("source", set.source_label());

        log_summary(&set);
        set
    }

    /// The single fallback decision: keep a non-empty upstream result, otherwise synthesize.
    pub fn choose<F>(remote: Result<Vec<Station>, UpstreamError>, synthesize: F) -> StationSet
    where
        F: FnOnce() -> Vec<Station>,
    {
        // ---
        let cause = match remote {
            Ok(stations) if !stations.is_empty() => return StationSet::Remote(stations),
            Ok(_) => {
                warn!("Upstream returned no stations, falling back to synthetic data");
                FallbackCause::Empty
            }
            Err(err) => {
                warn!("Upstream unavailable, falling back to synthetic data: {}", err);
                FallbackCause::Upstream(err)
            }
        };

        StationSet::Fallback {
            stations: synthesize(),
            cause,
        }
    }

    /// Reachability of the upstream API, without fallback.
    pub async fn probe_upstream(&self) -> Result<UpstreamProbe, UpstreamError> {
        self.remote.probe().await
    }
}

fn log_summary(set: &StationSet) {
    // ---
    info!("Returning {} {} stations", set.stations().len(), set.source_label());

    for (i, station) in set.stations().iter().enumerate() {
        let aqi = match (station.aqi, station.aqi_category) {
            (Some(aqi), Some(category)) => format!("AQI: {} ({})", aqi, category.label),
            _ => "AQI: not available".to_string(),
        };
        tracing::debug!(
            "{}. {} - {} - {:.1} km away",
            i + 1,
            station.name,
            aqi,
            station.distance_km.unwrap_or_default()
        );
    }
}
