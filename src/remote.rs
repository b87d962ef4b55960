//! Upstream air-quality API access.
//!
//! [`Transport`] is the seam to the HTTP layer: it issues one GET against a
//! named endpoint and yields parsed JSON or an [`UpstreamError`].
//! [`HttpTransport`] is the reqwest-backed implementation used in production.
//! [`RemoteStationSource`] builds the queries, maps the upstream schema into
//! stations, and hands measurement rows to the aggregator. It never retries
//! and never swallows errors; both are the orchestrator's call.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::aggregate::StationAggregator;
use crate::error::UpstreamError;
use crate::geo::{distance_km, round2};
use crate::models::{Coordinates, Pollutant, RawLocation, RawMeasurement, RawMeta, RawResponse, Station};

// ---

pub const DEFAULT_BASE_URL: &str = "https://api.openaq.org/v2";

/// Measurement rows requested per wanted station; several pollutants share one station.
pub const OVER_FETCH_FACTOR: usize = 3;

/// Rows requested when loading a single station's history.
pub const STATION_HISTORY_LIMIT: usize = 20;

pub const LOCATIONS: &str = "locations";
pub const MEASUREMENTS: &str = "measurements";

/// Query string as ordered key/value pairs.
pub type QueryParams = Vec<(&'static str, String)>;

/// One-shot JSON GET against the upstream API.
pub trait Transport: Send + Sync {
    // ---
    fn get_json(
        &self,
        endpoint: &str,
        query: &[(&'static str, String)],
    ) -> impl Future<Output = Result<Value, UpstreamError>> + Send;
}

/// Transport over `reqwest`, with an optional API key header.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    // ---
    /// The timeout bounds each request; a timed-out request surfaces as
    /// [`UpstreamError::Transport`]. Fails when the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        // ---
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    // ---
    async fn get_json(&self, endpoint: &str, query: &[(&'static str, String)]) -> Result<Value, UpstreamError> {
        // ---
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("Requesting {} with {:?}", url, query);

        let mut request = self
            .client
            .get(&url)
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = status.canonical_reason().unwrap_or("unknown status");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message: format!("{} {}", reason, body.chars().take(200).collect::<String>())
                    .trim_end()
                    .to_string(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| UpstreamError::malformed(endpoint, e))
    }
}

/// Result of a connectivity probe against the locations endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamProbe {
    // ---
    pub result_count: usize,
    pub meta: Option<RawMeta>,
}

/// Builds station lists from the upstream API.
#[derive(Debug, Clone)]
pub struct RemoteStationSource<T> {
    transport: T,
    aggregator: StationAggregator,
}

impl<T: Transport> RemoteStationSource<T> {
    // ---
    pub fn new(transport: T) -> Self {
        Self::with_aggregator(transport, StationAggregator::default())
    }

    pub fn with_aggregator(transport: T, aggregator: StationAggregator) -> Self {
        Self {
            transport,
            aggregator,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Bare stations (no readings, no AQI) from the locations endpoint, in upstream order.
    pub async fn fetch_stations(
        &self,
        center: Coordinates,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<Station>, UpstreamError> {
        // ---
        let query = vec![
            ("coordinates", coordinates_param(center)),
            ("radius", radius_km.to_string()),
            ("limit", limit.to_string()),
            ("sort", "asc".to_string()),
            ("order_by", "lastUpdated".to_string()),
        ];

        let locations = self.fetch_rows::<RawLocation>(LOCATIONS, &query).await?;

        let stations: Vec<Station> = locations
            .iter()
            .map(|location| {
                let mut station = location.to_station();
                station.distance_km = Some(round2(distance_km(center, station.location)));
                station
            })
            .collect();

        info!("Fetched {} stations from {}", stations.len(), LOCATIONS);
        Ok(stations)
    }

    /// Stations with readings and AQI, nearest first, at most `limit` of them.
    pub async fn fetch_stations_with_measurements(
        &self,
        center: Coordinates,
        radius_km: f64,
        limit: usize,
        pollutants: &[Pollutant],
    ) -> Result<Vec<Station>, UpstreamError> {
        // ---
        let mut query = vec![
            ("coordinates", coordinates_param(center)),
            ("radius", radius_km.to_string()),
            ("limit", (limit.saturating_mul(OVER_FETCH_FACTOR)).to_string()),
            ("sort", "desc".to_string()),
            ("order_by", "datetime".to_string()),
        ];
        if !pollutants.is_empty() {
            query.push(("parameter", Pollutant::join_codes(pollutants)));
        }

        let rows = self.fetch_rows::<RawMeasurement>(MEASUREMENTS, &query).await?;
        let row_count = rows.len();

        let stations = self
            .aggregator
            .aggregate(rows.iter().filter_map(RawMeasurement::to_record), center, limit);

        info!(
            "Aggregated {} measurement rows into {} stations",
            row_count,
            stations.len()
        );
        Ok(stations)
    }

    /// Latest readings of one station, or `None` when upstream has none.
    ///
    /// The returned station carries no distance.
    pub async fn fetch_station_measurements(
        &self,
        station_id: i64,
        pollutants: &[Pollutant],
    ) -> Result<Option<Station>, UpstreamError> {
        // ---
        let mut query = vec![
            ("location_id", station_id.to_string()),
            ("limit", STATION_HISTORY_LIMIT.to_string()),
            ("sort", "desc".to_string()),
            ("order_by", "datetime".to_string()),
        ];
        if !pollutants.is_empty() {
            query.push(("parameter", Pollutant::join_codes(pollutants)));
        }

        let rows = self.fetch_rows::<RawMeasurement>(MEASUREMENTS, &query).await?;

        let station = self
            .aggregator
            .group(rows.iter().filter_map(RawMeasurement::to_record))
            .into_iter()
            .find(|s| s.id == station_id);

        Ok(station)
    }

    /// Cheap reachability check: one Indonesian location.
    pub async fn probe(&self) -> Result<UpstreamProbe, UpstreamError> {
        // ---
        let query = vec![("limit", "1".to_string()), ("country", "ID".to_string())];
        let value = self.transport.get_json(LOCATIONS, &query).await?;
        let envelope: RawResponse<Value> =
            serde_json::from_value(value).map_err(|e| UpstreamError::malformed(LOCATIONS, e))?;

        Ok(UpstreamProbe {
            result_count: envelope.results.len(),
            meta: envelope.meta,
        })
    }

    /// GET an endpoint and decode its `results`, skipping rows that do not parse.
    ///
    /// A missing or mistyped envelope is an error; individual bad rows are not.
    async fn fetch_rows<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&'static str, String)],
    ) -> Result<Vec<R>, UpstreamError> {
        // ---
        let value = self.transport.get_json(endpoint, query).await?;
        let envelope: RawResponse<Value> =
            serde_json::from_value(value).map_err(|e| UpstreamError::malformed(endpoint, e))?;

        debug!(
            "{} returned {} rows (found: {:?})",
            endpoint,
            envelope.results.len(),
            envelope.meta.as_ref().and_then(|m| m.found)
        );

        let mut rows = Vec::with_capacity(envelope.results.len());
        for (i, item) in envelope.results.into_iter().enumerate() {
            match serde_json::from_value::<R>(item) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    debug!("Skipping {} row {}: {}", endpoint, i, e);
                }
            }
        }

        Ok(rows)
    }
}

fn coordinates_param(center: Coordinates) -> String {
    format!("{},{}", center.latitude, center.longitude)
}

/// In-memory transport for tests: canned responses per endpoint and a call log.
#[cfg(test)]
pub(crate) mod fake {
    // ---
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::Value;

    use super::{QueryParams, Transport};
    use crate::error::UpstreamError;

    #[derive(Debug, Default)]
    pub struct FakeTransport {
        responses: HashMap<String, Result<Value, UpstreamError>>,
        calls: Mutex<Vec<(String, QueryParams)>>,
    }

    impl FakeTransport {
        // ---
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(mut self, endpoint: &str, value: Value) -> Self {
            self.responses.insert(endpoint.to_string(), Ok(value));
            self
        }

        pub fn fail(mut self, endpoint: &str, err: UpstreamError) -> Self {
            self.responses.insert(endpoint.to_string(), Err(err));
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn last_query(&self) -> Option<QueryParams> {
            self.calls.lock().unwrap().last().map(|(_, q)| q.clone())
        }

        pub fn last_param(&self, key: &str) -> Option<String> {
            self.last_query()?
                .into_iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v)
        }
    }

    impl Transport for FakeTransport {
        async fn get_json(&self, endpoint: &str, query: &[(&'static str, String)]) -> Result<Value, UpstreamError> {
            // ---
            self.calls
                .lock()
                .unwrap()
                .push((endpoint.to_string(), query.to_vec()));

            self.responses
                .get(endpoint)
                .cloned()
                .unwrap_or_else(|| Err(UpstreamError::Transport(format!("no canned response for {endpoint}"))))
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::fake::FakeTransport;
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok, block_on};

    const SURAKARTA: Coordinates = Coordinates::new(-7.5617, 110.8318);

    fn measurement(location_id: i64, parameter: &str, value: f64, utc: &str, lat: f64, lon: f64) -> Value {
        // ---
        json!({
            "locationId": location_id,
            "location": format!("Station {location_id}"),
            "parameter": parameter,
            "value": value,
            "date": { "utc": utc, "local": utc },
            "unit": "µg/m³",
            "coordinates": { "latitude": lat, "longitude": lon },
            "country": "ID",
            "city": "Surakarta",
            "isMobile": false,
            "isAnalysis": false,
            "entity": "Governmental Organization",
            "sensorType": "reference grade"
        })
    }

    fn measurements_payload() -> Value {
        // ---
        json!({
            "meta": { "name": "openaq-api", "page": 1, "limit": 15, "found": ">100" },
            "results": [
                measurement(1, "pm25", 30.0, "2025-03-26T10:00:00Z", -7.60, 110.85),
                measurement(1, "o3", 80.0, "2025-03-26T10:00:00Z", -7.60, 110.85),
                measurement(2, "pm10", 154.0, "2025-03-26T09:00:00Z", -7.57, 110.83),
                measurement(2, "o3", 300.0, "2025-03-26T09:00:00Z", -7.57, 110.83),
                measurement(3, "no2", 40.0, "2025-03-26T09:00:00Z", -7.80, 110.90),
                { "locationId": "broken" }
            ]
        })
    }

    #[test]
    fn test_measurement_query_parameters() {
        // ---
        let source = RemoteStationSource::new(FakeTransport::new().respond(MEASUREMENTS, measurements_payload()));

        assert_ok!(block_on(source.fetch_stations_with_measurements(
            SURAKARTA,
            50.0,
            5,
            &Pollutant::DEFAULT_SET
        )));

        let transport = source.transport();
        assert_eq!(transport.call_count(), 1);
        assert_eq!(transport.last_param("limit").as_deref(), Some("15"));
        assert_eq!(transport.last_param("coordinates").as_deref(), Some("-7.5617,110.8318"));
        assert_eq!(transport.last_param("radius").as_deref(), Some("50"));
        assert_eq!(transport.last_param("sort").as_deref(), Some("desc"));
        assert_eq!(transport.last_param("order_by").as_deref(), Some("datetime"));
        assert_eq!(
            transport.last_param("parameter").as_deref(),
            Some("pm25,pm10,o3,no2,so2,co")
        );
    }

    #[test]
    fn test_measurements_aggregate_into_stations() {
        // ---
        let source = RemoteStationSource::new(FakeTransport::new().respond(MEASUREMENTS, measurements_payload()));

        let stations = block_on(source.fetch_stations_with_measurements(SURAKARTA, 50.0, 10, &[])).unwrap();

        // The malformed row is skipped, three stations remain, nearest first.
        let ids: Vec<i64> = stations.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);

        // Station 2 has PM10 and O3 but no PM2.5: PM10 drives the AQI.
        assert_eq!(stations[0].aqi, Some(100));
        assert_eq!(stations[1].aqi, Some(89));
        assert_eq!(stations[2].aqi, None);
        assert!(stations.iter().all(|s| s.distance_km.is_some()));
    }

    #[test]
    fn test_limit_truncates_after_sorting() {
        // ---
        let source = RemoteStationSource::new(FakeTransport::new().respond(MEASUREMENTS, measurements_payload()));

        let stations = block_on(source.fetch_stations_with_measurements(SURAKARTA, 50.0, 1, &[])).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].id, 2);
    }

    #[test]
    fn test_status_error_propagates() {
        // ---
        let err = UpstreamError::Status {
            status: 429,
            message: "Too Many Requests".to_string(),
        };
        let source = RemoteStationSource::new(FakeTransport::new().fail(MEASUREMENTS, err.clone()));

        let result = block_on(source.fetch_stations_with_measurements(SURAKARTA, 25.0, 10, &[]));
        assert_eq!(result, Err(err));
    }

    #[test]
    fn test_missing_results_is_malformed() {
        // ---
        let source = RemoteStationSource::new(FakeTransport::new().respond(MEASUREMENTS, json!({ "error": "boom" })));

        let result = block_on(source.fetch_stations_with_measurements(SURAKARTA, 25.0, 10, &[]));
        let err = assert_err!(result);
        assert!(matches!(err, UpstreamError::Malformed(_)), "{err}");
    }

    #[test]
    fn test_fetch_stations_maps_locations() {
        // ---
        let payload = json!({
            "meta": { "page": 1, "limit": 10, "found": 2 },
            "results": [
                {
                    "id": 8,
                    "name": "Manahan",
                    "coordinates": { "latitude": -7.555, "longitude": 110.806 },
                    "city": "Surakarta",
                    "country": "ID",
                    "isMobile": false,
                    "lastUpdated": "2025-03-26T10:00:00Z",
                    "firstUpdated": "2020-01-01T00:00:00Z",
                    "parameters": [ { "id": 2, "parameter": "pm25" } ]
                },
                {
                    "id": 9,
                    "name": "Kartasura",
                    "coordinates": { "latitude": -7.552, "longitude": 110.741 },
                    "lastUpdated": "2025-03-25T10:00:00Z",
                    "firstUpdated": "2021-01-01T00:00:00Z"
                }
            ]
        });
        let source = RemoteStationSource::new(FakeTransport::new().respond(LOCATIONS, payload));

        let stations = block_on(source.fetch_stations(SURAKARTA, 25.0, 10)).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].name, "Manahan");
        assert_eq!(stations[0].parameters, vec![Pollutant::Pm25]);
        assert!(stations[0].readings.is_empty());
        assert_eq!(stations[0].aqi, None);
        assert_eq!(
            stations[1].distance_km,
            Some(round2(distance_km(SURAKARTA, Coordinates::new(-7.552, 110.741))))
        );

        let transport = source.transport();
        assert_eq!(transport.last_param("order_by").as_deref(), Some("lastUpdated"));
        assert_eq!(transport.last_param("sort").as_deref(), Some("asc"));
        assert_eq!(transport.last_param("limit").as_deref(), Some("10"));
    }

    #[test]
    fn test_fetch_station_measurements() {
        // ---
        let payload = json!({
            "results": [
                measurement(1, "pm10", 60.0, "2025-03-26T11:00:00Z", -7.60, 110.85),
                measurement(1, "pm25", 12.0, "2025-03-26T10:00:00Z", -7.60, 110.85),
                measurement(1, "pm25", 40.0, "2025-03-26T09:00:00Z", -7.60, 110.85)
            ]
        });
        let source = RemoteStationSource::new(FakeTransport::new().respond(MEASUREMENTS, payload));

        let station = block_on(source.fetch_station_measurements(1, &[Pollutant::Pm25, Pollutant::Pm10]))
            .unwrap()
            .unwrap();
        assert_eq!(station.readings.len(), 3);
        // Latest PM2.5 sample wins over the newer PM10 one.
        assert_eq!(station.aqi, Some(50));
        assert_eq!(station.distance_km, None);

        let transport = source.transport();
        assert_eq!(transport.last_param("location_id").as_deref(), Some("1"));
        assert_eq!(transport.last_param("limit").as_deref(), Some("20"));
        assert_eq!(transport.last_param("parameter").as_deref(), Some("pm25,pm10"));
    }

    #[test]
    fn test_fetch_station_measurements_empty() {
        // ---
        let source = RemoteStationSource::new(FakeTransport::new().respond(MEASUREMENTS, json!({ "results": [] })));

        assert_eq!(block_on(source.fetch_station_measurements(77, &[])), Ok(None));
    }

    #[test]
    fn test_probe() {
        // ---
        let payload = json!({ "meta": { "page": 1, "limit": 1, "found": 412 }, "results": [ { "id": 1 } ] });
        let source = RemoteStationSource::new(FakeTransport::new().respond(LOCATIONS, payload));

        let probe = block_on(source.probe()).unwrap();
        assert_eq!(probe.result_count, 1);
        assert_eq!(probe.meta.and_then(|m| m.found), Some(412));
        assert_eq!(source.transport().last_param("country").as_deref(), Some("ID"));
    }
}
