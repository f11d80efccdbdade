use std::fmt;

use serde::{Serialize, Serializer};
use tracing::info;

use crate::constants::AQI_MAX;

/// One segment of the EPA PM2.5 scale: `(c_low, c_high, i_low, i_high)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Breakpoint {
    pub c_low: f64,
    pub c_high: f64,
    pub i_low: i32,
    pub i_high: i32,
}

impl Breakpoint {
    const fn new(c_low: f64, c_high: f64, i_low: i32, i_high: i32) -> Self {
        Self {
            c_low,
            c_high,
            i_low,
            i_high,
        }
    }

    fn contains(&self, value: f64) -> bool {
        self.c_low <= value && value <= self.c_high
    }

    fn interpolate(&self, value: f64) -> i32 {
        let slope = f64::from(self.i_high - self.i_low) / (self.c_high - self.c_low);
        (slope * (value - self.c_low) + f64::from(self.i_low)).round() as i32
    }
}

pub const PM25_BREAKPOINTS: [Breakpoint; 6] = [
    Breakpoint::new(0.0, 12.0, 0, 50),
    Breakpoint::new(12.1, 35.4, 51, 100),
    Breakpoint::new(35.5, 55.4, 101, 150),
    Breakpoint::new(55.5, 150.4, 151, 200),
    Breakpoint::new(150.5, 250.4, 201, 300),
    Breakpoint::new(250.5, 500.4, 301, 500),
];

/// Converts a PM2.5 concentration (µg/m³) to an AQI in `[0, 500]`.
///
/// Segment bounds are inclusive. The table has one-decimal resolution, so a value that lands
/// between two segments (12.05 say) is truncated to one decimal and looked up again; it then
/// belongs to the lower segment. Anything above 500.4 is capped at 500.
pub fn compute_aqi_pm25(value: f64) -> i32 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    if let Some(aqi) = lookup(value) {
        return aqi;
    }
    let truncated = (value * 10.0).floor() / 10.0;
    lookup(truncated).unwrap_or(AQI_MAX)
}

fn lookup(value: f64) -> Option<i32> {
    PM25_BREAKPOINTS
        .iter()
        .find(|segment| segment.contains(value))
        .map(|segment| segment.interpolate(value))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Classification {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl Classification {
    pub const ALL: [Classification; 6] = [
        Classification::Good,
        Classification::Moderate,
        Classification::UnhealthyForSensitiveGroups,
        Classification::Unhealthy,
        Classification::VeryUnhealthy,
        Classification::Hazardous,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Classification::Good => "Good",
            Classification::Moderate => "Moderate",
            Classification::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            Classification::Unhealthy => "Unhealthy",
            Classification::VeryUnhealthy => "Very Unhealthy",
            Classification::Hazardous => "Hazardous",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.label() == label)
    }

    pub fn advisory(self) -> &'static str {
        match self {
            Classification::Good => "Air quality is satisfactory. Enjoy outdoor activities.",
            Classification::Moderate => {
                "Air quality is acceptable, but unusually sensitive individuals may feel effects."
            }
            Classification::UnhealthyForSensitiveGroups => {
                "Limit outdoor exertion if you have respiratory issues."
            }
            Classification::Unhealthy => {
                "Everyone may begin to feel effects. Reduce outdoor activity."
            }
            Classification::VeryUnhealthy => {
                "Health alert: everyone may experience serious effects. Stay indoors."
            }
            Classification::Hazardous => "Emergency conditions. Avoid all outdoor exposure.",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Classification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

pub const NO_ADVISORY: &str = "No advisory available.";

pub fn classify_aqi(aqi: i32) -> Classification {
    match aqi {
        i32::MIN..=50 => Classification::Good,
        51..=100 => Classification::Moderate,
        101..=150 => Classification::UnhealthyForSensitiveGroups,
        151..=200 => Classification::Unhealthy,
        201..=300 => Classification::VeryUnhealthy,
        _ => Classification::Hazardous,
    }
}

pub fn health_advisory(label: &str) -> &'static str {
    Classification::from_label(label)
        .map(Classification::advisory)
        .unwrap_or(NO_ADVISORY)
}

pub fn blend_no2(base_aqi: i32, no2: f64) -> i32 {
    let (adjustment, bracket) = if no2 > 50.0 {
        (20, "high")
    } else if no2 > 35.0 {
        (12, "elevated")
    } else if no2 > 25.0 {
        (5, "moderate")
    } else {
        (0, "good")
    };
    info!(no2, adjustment, bracket, "TEMPO NO2 adjustment");
    base_aqi.saturating_add(adjustment).min(AQI_MAX)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AqiResult {
    pub aqi: i32,
    pub classification: Classification,
}

impl AqiResult {
    pub fn from_readings(pm25: f64, no2: f64) -> Self {
        let aqi = blend_no2(compute_aqi_pm25(pm25), no2);
        Self {
            aqi,
            classification: classify_aqi(aqi),
        }
    }

    pub fn advisory(&self) -> &'static str {
        self.classification.advisory()
    }
}
