//! Grouping of raw measurement rows into stations.
//!
//! The upstream "measurements" endpoint returns one row per pollutant sample,
//! so a station with three pollutants shows up three times. This module folds
//! those rows back into [`Station`] values, picks the reading that represents
//! the station's headline AQI, and orders stations by distance.
//!
//! Repeated `(parameter, observed_at)` pairs for the same station keep the
//! first row seen; later duplicates are dropped.

use std::collections::HashMap;

use crate::aqi::{category_for, AqiEngine};
use crate::geo::{distance_km, round2};
use crate::models::{Coordinates, MeasurementRecord, Pollutant, PollutantReading, Station};

// ---

/// Readings kept per station, newest first.
pub const MAX_READINGS_PER_STATION: usize = 20;

/// Pollutants eligible to drive the headline AQI, most preferred first.
/// NO2, SO2 and CO never do, even when present.
pub const AQI_PRIORITY: [Pollutant; 3] = [Pollutant::Pm25, Pollutant::Pm10, Pollutant::O3];

/// Folds measurement records into stations and derives their AQI.
#[derive(Debug, Clone)]
pub struct StationAggregator {
    engine: AqiEngine,
    reading_cap: usize,
}

impl Default for StationAggregator {
    fn default() -> Self {
        Self::new(AqiEngine::STANDARD)
    }
}

impl StationAggregator {
    // ---
    pub fn new(engine: AqiEngine) -> Self {
        Self {
            engine,
            reading_cap: MAX_READINGS_PER_STATION,
        }
    }

    #[must_use]
    pub fn with_reading_cap(mut self, reading_cap: usize) -> Self {
        self.reading_cap = reading_cap;
        self
    }

    /// Group, score, and order records around `center`, keeping at most `limit` stations.
    pub fn aggregate<I>(&self, records: I, center: Coordinates, limit: usize) -> Vec<Station>
    where
        I: IntoIterator<Item = MeasurementRecord>,
    {
        // ---
        let mut stations = self.group(records);
        for station in stations.iter_mut() {
            station.distance_km = Some(round2(distance_km(center, station.location)));
        }

        sort_by_distance(&mut stations);
        stations.truncate(limit);
        stations
    }

    /// Group records by station in discovery order, without distances.
    pub fn group<I>(&self, records: I) -> Vec<Station>
    where
        I: IntoIterator<Item = MeasurementRecord>,
    {
        // ---
        let mut index: HashMap<i64, usize> = HashMap::new();
        let mut stations: Vec<Station> = Vec::new();

        for record in records {
            let slot = *index.entry(record.station_id).or_insert_with(|| {
                stations.push(seed_station(&record));
                stations.len() - 1
            });
            let station = &mut stations[slot];

            let duplicate = station.readings.iter().any(|r| {
                r.parameter == record.reading.parameter && r.observed_at == record.reading.observed_at
            });
            if duplicate {
                tracing::debug!(
                    "Dropping duplicate {} reading at {} for station {}",
                    record.reading.parameter,
                    record.reading.observed_at,
                    record.station_id
                );
                continue;
            }

            if record.reading.observed_at > station.last_updated {
                station.last_updated = record.reading.observed_at;
            }
            if record.reading.observed_at < station.first_updated {
                station.first_updated = record.reading.observed_at;
            }
            if !station.parameters.contains(&record.reading.parameter) {
                station.parameters.push(record.reading.parameter.clone());
            }
            station.readings.push(record.reading);
        }

        for station in stations.iter_mut() {
            // Stable, so equal timestamps keep upstream order.
            station.readings.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
            // AQI is chosen from every row received, before the cap evicts older ones.
            self.apply_aqi(station);
            station.readings.truncate(self.reading_cap);
        }

        stations
    }

    /// Set `aqi` and `aqi_category` from the station's representative reading.
    ///
    /// Leaves both unset when no PM2.5, PM10 or O3 reading exists.
    pub fn apply_aqi(&self, station: &mut Station) {
        // ---
        match representative_reading(&station.readings) {
            Some(reading) => {
                let aqi = self.engine.concentration_to_aqi(reading.value, &reading.parameter);
                station.aqi = Some(aqi);
                station.aqi_category = Some(category_for(aqi));
            }
            None => {
                station.aqi = None;
                station.aqi_category = None;
            }
        }
    }
}

/// First reading of the highest-priority pollutant present.
///
/// Readings are expected newest first, so this is the latest sample of that
/// pollutant.
pub fn representative_reading(readings: &[PollutantReading]) -> Option<&PollutantReading> {
    AQI_PRIORITY
        .iter()
        .find_map(|wanted| readings.iter().find(|r| &r.parameter == wanted))
}

/// Ascending by distance; stations without one sort as 0. Ties keep their order.
pub fn sort_by_distance(stations: &mut [Station]) {
    stations.sort_by(|a, b| {
        a.distance_km
            .unwrap_or(0.0)
            .total_cmp(&b.distance_km.unwrap_or(0.0))
    });
}

fn seed_station(record: &MeasurementRecord) -> Station {
    // ---
    let meta = &record.meta;
    Station {
        id: record.station_id,
        name: meta.name.clone(),
        location: meta.location,
        city: meta.city.clone(),
        country: meta.country.clone(),
        country_code: meta.country_code.clone(),
        // A station reporting measurements is considered active.
        is_active: true,
        is_mobile: meta.is_mobile,
        last_updated: record.reading.observed_at,
        first_updated: record.reading.observed_at,
        parameters: Vec::new(),
        readings: Vec::with_capacity(4),
        aqi: None,
        aqi_category: None,
        distance_km: None,
    }
}
