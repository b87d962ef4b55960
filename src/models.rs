//! Data models for the air-quality core.
//!
//! Two layers live here: the internal station model handed to the dashboard
//! (`Station`, `PollutantReading`, ...) and the raw upstream wire types the
//! remote source deserializes before converting them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ---

/// A point on the Earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    // ---
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    // ---
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build coordinates after checking both components are in range.
    ///
    /// NaN fails the range check.
    pub fn validated(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        // ---
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::Longitude(longitude));
        }
        Ok(Self::new(latitude, longitude))
    }
}

/// A regulated airborne pollutant, identified by its upstream code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Pollutant {
    Pm25,
    Pm10,
    O3,
    No2,
    So2,
    Co,
    /// Any code not modelled above, kept lowercase as received.
    Other(String),
}

impl Pollutant {
    // ---
    /// Pollutants requested from the measurements endpoint by default.
    pub const DEFAULT_SET: [Pollutant; 6] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::O3,
        Pollutant::No2,
        Pollutant::So2,
        Pollutant::Co,
    ];

    /// Upstream parameter code.
    pub fn code(&self) -> &str {
        match self {
            Self::Pm25 => "pm25",
            Self::Pm10 => "pm10",
            Self::O3 => "o3",
            Self::No2 => "no2",
            Self::So2 => "so2",
            Self::Co => "co",
            Self::Other(code) => code,
        }
    }

    /// Comma-joined codes, as the `parameter` query argument expects.
    pub fn join_codes(pollutants: &[Pollutant]) -> String {
        pollutants
            .iter()
            .map(Pollutant::code)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl From<&str> for Pollutant {
    fn from(code: &str) -> Self {
        // ---
        match code.trim().to_lowercase().as_str() {
            "pm25" | "pm2.5" => Self::Pm25,
            "pm10" => Self::Pm10,
            "o3" | "ozone" => Self::O3,
            "no2" => Self::No2,
            "so2" => Self::So2,
            "co" => Self::Co,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for Pollutant {
    fn from(code: String) -> Self {
        Self::from(code.as_str())
    }
}

impl From<Pollutant> for String {
    fn from(pollutant: Pollutant) -> Self {
        pollutant.code().to_string()
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One concentration sample for one pollutant at one station and instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutantReading {
    // ---
    pub parameter: Pollutant,
    /// Concentration, never negative.
    pub value: f64,
    pub unit: String,
    pub observed_at: DateTime<Utc>,
    /// Reporting entity upstream, or `"Synthetic"` for generated data.
    pub source_name: String,
}

/// Health category derived from an AQI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AqiCategory {
    // ---
    pub level: u8,
    pub label: &'static str,
    pub color_token: &'static str,
    pub description: &'static str,
}

/// A geolocated monitoring station, fully populated before it leaves the core.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    // ---
    pub id: i64,
    pub name: String,
    pub location: Coordinates,
    pub city: String,
    pub country: String,
    pub country_code: String,
    pub is_active: bool,
    pub is_mobile: bool,
    pub last_updated: DateTime<Utc>,
    pub first_updated: DateTime<Utc>,
    /// Pollutants the station reports, when the upstream lists them.
    pub parameters: Vec<Pollutant>,
    /// Most recent first.
    pub readings: Vec<PollutantReading>,
    pub aqi: Option<i32>,
    pub aqi_category: Option<AqiCategory>,
    pub distance_km: Option<f64>,
}

impl Station {
    // ---
    /// True when the station was produced by the synthetic generator.
    pub fn is_synthetic(&self) -> bool {
        self.id >= crate::fallback::SYNTHETIC_ID_BASE
    }
}

/// Station-level metadata carried by every raw measurement record.
#[derive(Debug, Clone, PartialEq)]
pub struct StationMeta {
    // ---
    pub name: String,
    pub location: Coordinates,
    pub city: String,
    pub country: String,
    pub country_code: String,
    pub is_mobile: bool,
}

/// A single reading tagged with the station it belongs to, ready for aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    // ---
    pub station_id: i64,
    pub meta: StationMeta,
    pub reading: PollutantReading,
}

// --- Upstream wire types ---

/// Envelope shared by every upstream list endpoint.
#[derive(Debug, Deserialize)]
pub struct RawResponse<T> {
    // ---
    #[serde(default)]
    pub meta: Option<RawMeta>,
    pub results: Vec<T>,
}

/// Paging metadata of an upstream response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMeta {
    // ---
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    /// Exact count, or `None` when upstream reports a bound such as `">1000"`.
    #[serde(default, deserialize_with = "deserialize_found")]
    pub found: Option<u64>,
}

fn deserialize_found<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    // ---
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawCoordinates {
    // ---
    pub latitude: f64,
    pub longitude: f64,
}

impl From<RawCoordinates> for Coordinates {
    fn from(raw: RawCoordinates) -> Self {
        Coordinates::new(raw.latitude, raw.longitude)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDate {
    // ---
    pub utc: DateTime<Utc>,
    #[serde(default)]
    pub local: Option<String>,
}

/// Raw row from the upstream "measurements" endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMeasurement {
    // ---
    pub location_id: i64,
    pub location: String,
    pub parameter: String,
    pub value: f64,
    pub date: RawDate,
    pub unit: String,
    pub coordinates: RawCoordinates,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub is_mobile: Option<bool>,
    #[serde(default)]
    pub entity: Option<String>,
}

impl RawMeasurement {
    // ---
    /// Convert into an aggregation record.
    ///
    /// Returns `None` for sentinel or non-finite concentrations (upstream
    /// reports missing samples as negative values).
    pub fn to_record(&self) -> Option<MeasurementRecord> {
        // ---
        if !self.value.is_finite() || self.value < 0.0 {
            return None;
        }

        Some(MeasurementRecord {
            station_id: self.location_id,
            meta: StationMeta {
                name: self.location.clone(),
                location: self.coordinates.into(),
                city: self.city.clone().unwrap_or_default(),
                country: self.country.clone().unwrap_or_default(),
                // Not reported by the measurements endpoint.
                country_code: String::new(),
                is_mobile: self.is_mobile.unwrap_or(false),
            },
            reading: PollutantReading {
                parameter: Pollutant::from(self.parameter.as_str()),
                value: self.value,
                unit: self.unit.clone(),
                observed_at: self.date.utc,
                source_name: self.entity.clone().unwrap_or_default(),
            },
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawParameter {
    // ---
    #[serde(alias = "parameter")]
    pub name: String,
}

/// Raw row from the upstream "locations" endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLocation {
    // ---
    pub id: i64,
    pub name: String,
    pub coordinates: RawCoordinates,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub is_mobile: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
    pub last_updated: DateTime<Utc>,
    pub first_updated: DateTime<Utc>,
    #[serde(default)]
    pub parameters: Vec<RawParameter>,
}

impl RawLocation {
    // ---
    /// Bare station with no readings and no AQI; distance is left to the caller.
    pub fn to_station(&self) -> Station {
        // ---
        let country = self.country.clone().unwrap_or_default();
        Station {
            id: self.id,
            name: self.name.clone(),
            location: self.coordinates.into(),
            city: self.city.clone().unwrap_or_default(),
            country_code: self.country_code.clone().unwrap_or_else(|| country.clone()),
            country,
            is_active: self.is_active.unwrap_or(true),
            is_mobile: self.is_mobile.unwrap_or(false),
            last_updated: self.last_updated,
            first_updated: self.first_updated,
            parameters: self
                .parameters
                .iter()
                .map(|p| Pollutant::from(p.name.as_str()))
                .collect(),
            readings: Vec::new(),
            aqi: None,
            aqi_category: None,
            distance_km: None,
        }
    }
}
