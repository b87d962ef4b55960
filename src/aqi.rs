//! Air Quality Index calculation.
//!
//! Concentrations are converted through per-pollutant piecewise-linear
//! breakpoint tables. The tables are a simplified single-table variant of the
//! US EPA scheme (no 8-hour/1-hour ozone split, no multi-pollutant maximum).
//! Pollutants without a table use `concentration / 10`, which is an
//! approximation and not a published standard.
//!
//! [`AqiEngine::STANDARD`] carries the built-in tables; tests and callers
//! that need different breakpoints build their own engine with
//! [`AqiEngine::with_table`].

use std::borrow::Cow;

use crate::models::{AqiCategory, Pollutant};

// ---

/// One interpolation segment: `[c_low, c_high]` maps onto `[aqi_low, aqi_high]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    // ---
    pub c_low: f64,
    pub c_high: f64,
    pub aqi_low: f64,
    pub aqi_high: f64,
}

impl Segment {
    // ---
    pub const fn new(c_low: f64, c_high: f64, aqi_low: f64, aqi_high: f64) -> Self {
        Self {
            c_low,
            c_high,
            aqi_low,
            aqi_high,
        }
    }

    fn interpolate(&self, c: f64) -> f64 {
        self.aqi_low + (self.aqi_high - self.aqi_low) / (self.c_high - self.c_low) * (c - self.c_low)
    }
}

/// PM2.5, µg/m³.
pub const PM25_SEGMENTS: [Segment; 6] = [
    Segment::new(0.0, 12.0, 0.0, 50.0),
    Segment::new(12.1, 35.4, 51.0, 100.0),
    Segment::new(35.5, 55.4, 101.0, 150.0),
    Segment::new(55.5, 150.4, 151.0, 200.0),
    Segment::new(150.5, 250.4, 201.0, 300.0),
    Segment::new(250.5, 500.4, 301.0, 500.0),
];

/// PM10, µg/m³.
pub const PM10_SEGMENTS: [Segment; 6] = [
    Segment::new(0.0, 54.0, 0.0, 50.0),
    Segment::new(55.0, 154.0, 51.0, 100.0),
    Segment::new(155.0, 254.0, 101.0, 150.0),
    Segment::new(255.0, 354.0, 151.0, 200.0),
    Segment::new(355.0, 424.0, 201.0, 300.0),
    Segment::new(425.0, 605.0, 301.0, 500.0),
];

/// O3, µg/m³, single table.
pub const O3_SEGMENTS: [Segment; 6] = [
    Segment::new(0.0, 108.0, 0.0, 50.0),
    Segment::new(109.0, 140.0, 51.0, 100.0),
    Segment::new(141.0, 180.0, 101.0, 150.0),
    Segment::new(181.0, 240.0, 151.0, 200.0),
    Segment::new(241.0, 700.0, 201.0, 300.0),
    Segment::new(701.0, 1001.0, 301.0, 500.0),
];

/// Ordered breakpoint segments; the last one is open-ended.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointTable {
    segments: Cow<'static, [Segment]>,
}

impl BreakpointTable {
    // ---
    pub const fn from_static(segments: &'static [Segment]) -> Self {
        Self {
            segments: Cow::Borrowed(segments),
        }
    }

    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments: Cow::Owned(segments),
        }
    }

    /// Interpolated (unrounded) AQI for a concentration.
    ///
    /// Values in the gap between two segments (e.g. 12.05 for PM2.5) snap to
    /// the start of the following segment. Values above the last segment
    /// extrapolate along its slope.
    pub fn aqi(&self, concentration: f64) -> f64 {
        // ---
        let Some(last) = self.segments.last() else {
            return 0.0;
        };

        let segment = self
            .segments
            .iter()
            .find(|s| concentration <= s.c_high)
            .unwrap_or(last);

        segment.interpolate(concentration.max(segment.c_low))
    }
}

/// Breakpoint tables for the pollutants with a proper AQI mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct AqiEngine {
    pm25: BreakpointTable,
    pm10: BreakpointTable,
    o3: BreakpointTable,
}

impl Default for AqiEngine {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl AqiEngine {
    // ---
    pub const STANDARD: AqiEngine = AqiEngine {
        pm25: BreakpointTable::from_static(&PM25_SEGMENTS),
        pm10: BreakpointTable::from_static(&PM10_SEGMENTS),
        o3: BreakpointTable::from_static(&O3_SEGMENTS),
    };

    /// Replace the table used for one of PM2.5, PM10 or O3.
    ///
    /// Other pollutants have no table; passing one leaves the engine unchanged.
    #[must_use]
    pub fn with_table(mut self, pollutant: &Pollutant, table: BreakpointTable) -> Self {
        // ---
        match pollutant {
            Pollutant::Pm25 => self.pm25 = table,
            Pollutant::Pm10 => self.pm10 = table,
            Pollutant::O3 => self.o3 = table,
            _ => tracing::warn!("No breakpoint table slot for {}, ignoring", pollutant),
        }
        self
    }

    fn table(&self, pollutant: &Pollutant) -> Option<&BreakpointTable> {
        match pollutant {
            Pollutant::Pm25 => Some(&self.pm25),
            Pollutant::Pm10 => Some(&self.pm10),
            Pollutant::O3 => Some(&self.o3),
            _ => None,
        }
    }

    /// AQI for a concentration of the given pollutant.
    ///
    /// Negative and NaN concentrations are treated as zero.
    pub fn concentration_to_aqi(&self, concentration: f64, pollutant: &Pollutant) -> i32 {
        // ---
        let c = concentration.max(0.0);
        let aqi = match self.table(pollutant) {
            Some(table) => table.aqi(c),
            None => c / 10.0,
        };
        aqi.round() as i32
    }
}

/// AQI for a concentration using the built-in tables.
pub fn concentration_to_aqi(concentration: f64, pollutant: &Pollutant) -> i32 {
    AqiEngine::STANDARD.concentration_to_aqi(concentration, pollutant)
}

const CATEGORIES: [AqiCategory; 6] = [
    AqiCategory {
        level: 1,
        label: "Baik",
        color_token: "#00E400",
        description: "Kualitas udara baik dan tidak berbahaya",
    },
    AqiCategory {
        level: 2,
        label: "Sedang",
        color_token: "#FFFF00",
        description: "Kualitas udara dapat diterima untuk sebagian besar orang",
    },
    AqiCategory {
        level: 3,
        label: "Tidak Sehat untuk Kelompok Sensitif",
        color_token: "#FF7E00",
        description: "Anggota kelompok sensitif mungkin mengalami masalah kesehatan",
    },
    AqiCategory {
        level: 4,
        label: "Tidak Sehat",
        color_token: "#FF0000",
        description: "Setiap orang mungkin mulai mengalami masalah kesehatan",
    },
    AqiCategory {
        level: 5,
        label: "Sangat Tidak Sehat",
        color_token: "#8F3F97",
        description: "Peringatan kesehatan kondisi darurat",
    },
    AqiCategory {
        level: 6,
        label: "Berbahaya",
        color_token: "#7E0023",
        description: "Peringatan kesehatan: setiap orang mungkin mengalami efek kesehatan serius",
    },
];

/// Category band for an AQI value; upper bounds are inclusive.
pub fn category_for(aqi: i32) -> AqiCategory {
    // ---
    let index = match aqi {
        i32::MIN..=50 => 0,
        51..=100 => 1,
        101..=150 => 2,
        151..=200 => 3,
        201..=300 => 4,
        _ => 5,
    };
    CATEGORIES[index]
}

/// Marker colour for an AQI value.
pub fn aqi_color(aqi: i32) -> &'static str {
    category_for(aqi).color_token
}
