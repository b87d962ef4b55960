//! Synthetic station generator used when the upstream API is unavailable.
//!
//! The catalogue of named locations and the per-index baseline AQI list are
//! fixed data; only a small jitter on the derived concentrations is random.
//! Generated readings go through the same AQI derivation as real ones.

use std::borrow::Cow;

use chrono::{Duration, Utc};
use rand::Rng;

use crate::aggregate::{sort_by_distance, StationAggregator};
use crate::geo::{distance_km, round2};
use crate::models::{Coordinates, Pollutant, PollutantReading, Station};

// ---

/// Synthetic stations are numbered from here, marking their provenance.
pub const SYNTHETIC_ID_BASE: i64 = 1000;

const SYNTHETIC_SOURCE: &str = "Synthetic";
const UNIT: &str = "µg/m³";

/// A named location the generator may place a station at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogueEntry {
    // ---
    pub name: &'static str,
    pub location: Coordinates,
}

const fn entry(name: &'static str, latitude: f64, longitude: f64) -> CatalogueEntry {
    CatalogueEntry {
        name,
        location: Coordinates::new(latitude, longitude),
    }
}

/// Jakarta-area reference sites.
pub const JAKARTA_CATALOGUE: [CatalogueEntry; 8] = [
    entry("Monas Jakarta Pusat", -6.1754, 106.8272),
    entry("Balai Kota DKI Jakarta", -6.1612, 106.8246),
    entry("UI Depok", -6.3621, 106.8270),
    entry("RSUPN Cipto Mangunkusumo", -6.1867, 106.8312),
    entry("Grand Indonesia", -6.1944, 106.8231),
    entry("Taman Mini Indonesia", -6.3025, 106.8951),
    entry("Mall Taman Anggrek", -6.1785, 106.7925),
    entry("Bandara Soekarno-Hatta", -6.1275, 106.6537),
];

/// Plausible baseline AQI per catalogue index (moderate to unhealthy).
pub const BASELINE_AQI: [u32; 8] = [45, 65, 85, 110, 125, 95, 75, 135];

/// Generates stand-in stations from a fixed catalogue.
#[derive(Debug, Clone)]
pub struct FallbackSource {
    catalogue: Cow<'static, [CatalogueEntry]>,
    baselines: Cow<'static, [u32]>,
    aggregator: StationAggregator,
}

impl Default for FallbackSource {
    fn default() -> Self {
        Self {
            catalogue: Cow::Borrowed(&JAKARTA_CATALOGUE),
            baselines: Cow::Borrowed(&BASELINE_AQI),
            aggregator: StationAggregator::default(),
        }
    }
}

impl FallbackSource {
    // ---
    pub fn new(catalogue: Vec<CatalogueEntry>, baselines: Vec<u32>) -> Self {
        Self {
            catalogue: Cow::Owned(catalogue),
            baselines: Cow::Owned(baselines),
            aggregator: StationAggregator::default(),
        }
    }

    pub fn catalogue_len(&self) -> usize {
        self.catalogue.len()
    }

    /// Up to `count` synthetic stations, nearest to `center` first.
    pub fn synthesize(&self, center: Coordinates, count: usize) -> Vec<Station> {
        self.synthesize_with_rng(center, count, &mut rand::thread_rng())
    }

    /// Same as [`synthesize`](Self::synthesize) with a caller-supplied RNG.
    pub fn synthesize_with_rng<R: Rng>(&self, center: Coordinates, count: usize, rng: &mut R) -> Vec<Station> {
        // ---
        let now = Utc::now();
        let first_updated = now - Duration::days(365);

        let mut stations: Vec<Station> = self
            .catalogue
            .iter()
            .take(count)
            .enumerate()
            .map(|(index, site)| {
                let baseline = self
                    .baselines
                    .get(index)
                    .copied()
                    .unwrap_or_else(|| rng.gen_range(30..130));

                let readings = synthetic_readings(f64::from(baseline), now, rng);

                let mut station = Station {
                    id: SYNTHETIC_ID_BASE + index as i64,
                    name: site.name.to_string(),
                    location: site.location,
                    city: "Jakarta".to_string(),
                    country: "Indonesia".to_string(),
                    country_code: "ID".to_string(),
                    is_active: true,
                    is_mobile: false,
                    last_updated: now,
                    first_updated,
                    parameters: readings.iter().map(|r| r.parameter.clone()).collect(),
                    readings,
                    aqi: None,
                    aqi_category: None,
                    distance_km: Some(round2(distance_km(center, site.location))),
                };
                self.aggregator.apply_aqi(&mut station);
                station
            })
            .collect();

        sort_by_distance(&mut stations);
        stations
    }
}

fn synthetic_readings<R: Rng>(
    baseline: f64,
    observed_at: chrono::DateTime<Utc>,
    rng: &mut R,
) -> Vec<PollutantReading> {
    // ---
    let pm25 = (baseline * 0.4 + rng.gen_range(0.0..10.0)).max(5.0);
    let pm10 = (pm25 * 1.5 + rng.gen_range(0.0..15.0)).max(10.0);
    let o3 = (baseline * 0.6 + rng.gen_range(0.0..20.0)).max(20.0);

    [(Pollutant::Pm25, pm25), (Pollutant::Pm10, pm10), (Pollutant::O3, o3)]
        .into_iter()
        .map(|(parameter, value)| PollutantReading {
            parameter,
            value: (value * 10.0).round() / 10.0,
            unit: UNIT.to_string(),
            observed_at,
            source_name: SYNTHETIC_SOURCE.to_string(),
        })
        .collect()
}
