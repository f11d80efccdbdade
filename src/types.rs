use std::sync::Arc;

use serde::Serialize;

use crate::aqi::Classification;
use crate::chat::{ChatCompletion, ResponseFormatter};
use crate::config::Config;
use crate::constants::{TEMPO_ESTIMATED_SOURCE, TEMPO_LIVE_SOURCE};
use crate::sources::Sources;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub sources: Arc<Sources>,
    pub chat: Arc<dyn ChatCompletion>,
    pub formatter: Arc<ResponseFormatter>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Site {
    pub lat: f64,
    pub lon: f64,
    pub city: String,
}

impl Site {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            city: String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroundReading {
    pub pm25: f64,
    pub station: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum No2Provenance {
    Satellite,
    Estimated,
}

impl No2Provenance {
    pub fn label(self) -> &'static str {
        match self {
            No2Provenance::Satellite => TEMPO_LIVE_SOURCE,
            No2Provenance::Estimated => TEMPO_ESTIMATED_SOURCE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct No2Reading {
    pub no2: f64,
    pub provenance: No2Provenance,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WeatherChart {
    pub temp: Vec<f64>,
    pub humidity: Vec<f64>,
    pub wind: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeatherReading {
    pub temp: f64,
    pub humidity: f64,
    pub wind: f64,
    pub weather_code: i32,
    pub chart: WeatherChart,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TempoPayload {
    pub no2: f64,
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeatherPayload {
    pub temp: f64,
    pub humidity: f64,
    pub wind: f64,
    pub rainfall: f64,
    pub icon: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastDay {
    pub day: String,
    pub aqi: i32,
    pub status: Classification,
    #[serde(rename = "colorClass")]
    pub color_class: String,
}

/// Everything the dashboard page renders. Field names are part of the public contract.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DashboardPayload {
    pub lat: f64,
    pub lon: f64,
    pub city: String,
    pub aqi: i32,
    pub classification: Classification,
    pub advisory: String,
    pub tempo: TempoPayload,
    pub tempo_chart: Vec<f64>,
    pub ground: GroundReading,
    pub ground_chart: Vec<f64>,
    pub weather: WeatherPayload,
    pub weather_chart: WeatherChart,
    pub forecast: Vec<ForecastDay>,
    pub alerts: String,
    pub summary: String,
}
