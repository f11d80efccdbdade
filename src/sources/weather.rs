use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;

use super::{DataSource, Synthetic};
use crate::config::Config;
use crate::constants::SERIES_LEN;
use crate::http_client::fetch_json;
use crate::types::{Site, WeatherChart, WeatherReading};
use crate::utils::{round_to, uniform_rounded};

const DEFAULT_TEMP_C: f64 = 25.0;
const DEFAULT_HUMIDITY_PCT: f64 = 60.0;
const DEFAULT_WIND_KMH: f64 = 5.0;

#[derive(Debug, Default, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current: CurrentBlock,
    hourly: Option<HourlyBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentBlock {
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
    weather_code: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct HourlyBlock {
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
}

pub struct OpenMeteo {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl OpenMeteo {
    pub fn new(http: Client, cfg: &Config) -> Self {
        Self {
            http,
            base_url: cfg.open_meteo_base_url.clone(),
            timeout: cfg.weather_timeout,
        }
    }
}

#[async_trait]
impl DataSource<WeatherReading> for OpenMeteo {
    fn name(&self) -> &'static str {
        "open-meteo"
    }

    async fn fetch(&self, site: &Site) -> Result<WeatherReading> {
        let url = format!(
            "{}/forecast?latitude={}&longitude={}\
             &current=temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code\
             &hourly=temperature_2m,relative_humidity_2m,wind_speed_10m\
             &timezone=auto&forecast_days=1",
            self.base_url, site.lat, site.lon
        );
        let response: ForecastResponse = fetch_json(&self.http, &url, self.timeout, None).await?;
        Ok(reading_from_forecast(response))
    }
}

fn reading_from_forecast(response: ForecastResponse) -> WeatherReading {
    let current = response.current;
    let temp = round_to(current.temperature_2m.unwrap_or(DEFAULT_TEMP_C), 1);
    let humidity = round_to(
        current.relative_humidity_2m.unwrap_or(DEFAULT_HUMIDITY_PCT),
        1,
    );
    let wind = round_to(current.wind_speed_10m.unwrap_or(DEFAULT_WIND_KMH), 2);

    let chart = match response.hourly {
        Some(hourly) => WeatherChart {
            temp: recent_hours(&hourly.temperature_2m, temp),
            humidity: recent_hours(&hourly.relative_humidity_2m, humidity),
            wind: recent_hours(&hourly.wind_speed_10m, wind),
        },
        None => WeatherChart {
            temp: vec![temp; SERIES_LEN],
            humidity: vec![humidity; SERIES_LEN],
            wind: vec![wind; SERIES_LEN],
        },
    };

    WeatherReading {
        temp,
        humidity,
        wind,
        weather_code: current.weather_code.unwrap_or(0),
        chart,
    }
}

/// Last `SERIES_LEN` hourly values, front-padded with `current` when the series is short.
fn recent_hours(series: &[Option<f64>], current: f64) -> Vec<f64> {
    let values: Vec<f64> = series
        .iter()
        .flatten()
        .copied()
        .filter(|value| value.is_finite())
        .collect();
    let tail = &values[values.len().saturating_sub(SERIES_LEN)..];
    let mut points = vec![current; SERIES_LEN - tail.len()];
    points.extend(tail.iter().map(|value| round_to(*value, 1)));
    points
}

pub struct ClimatologyWeather;

impl Synthetic<WeatherReading> for ClimatologyWeather {
    fn synthesize(&self, site: &Site, rng: &mut StdRng) -> WeatherReading {
        let (low, high) = temperature_band(site.lat);
        let temp = uniform_rounded(rng, low, high, 1);
        let humidity = uniform_rounded(rng, 40.0, 80.0, 1);
        let wind = uniform_rounded(rng, 3.0, 15.0, 1);
        let weather_code = rng.gen_range(0..=3);

        let mut chart = WeatherChart::default();
        for _ in 0..SERIES_LEN {
            chart.temp.push(round_to(temp + rng.gen_range(-3.0..=3.0), 1));
        }
        for _ in 0..SERIES_LEN {
            chart
                .humidity
                .push(round_to(humidity + rng.gen_range(-15.0..=15.0), 1));
        }
        for _ in 0..SERIES_LEN {
            chart.wind.push(round_to(wind + rng.gen_range(-3.0..=5.0), 1));
        }

        WeatherReading {
            temp,
            humidity,
            wind,
            weather_code,
            chart,
        }
    }
}

fn temperature_band(lat: f64) -> (f64, f64) {
    if lat > 40.0 {
        (8.0, 18.0)
    } else if lat > 23.0 {
        (15.0, 25.0)
    } else if lat > 0.0 {
        (24.0, 35.0)
    } else {
        (10.0, 22.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn forecast_uses_last_five_hours() {
        let response: ForecastResponse = serde_json::from_str(
            r#"{
                "current": {"temperature_2m": 29.46, "relative_humidity_2m": 78, "wind_speed_10m": 11.234, "weather_code": 2},
                "hourly": {
                    "temperature_2m": [24.0, 25.0, 26.0, 27.0, 28.0, 29.04, 30.0],
                    "relative_humidity_2m": [70, 71, 72, 73, 74, 75, 76],
                    "wind_speed_10m": [5.0, 6.0, null, 8.0, 9.0, 10.0, 11.0]
                }
            }"#,
        )
        .unwrap();
        let reading = reading_from_forecast(response);
        assert_eq!(reading.temp, 29.5);
        assert_eq!(reading.humidity, 78.0);
        assert_eq!(reading.wind, 11.23);
        assert_eq!(reading.weather_code, 2);
        assert_eq!(reading.chart.temp, vec![26.0, 27.0, 28.0, 29.0, 30.0]);
        assert_eq!(reading.chart.humidity, vec![72.0, 73.0, 74.0, 75.0, 76.0]);
        assert_eq!(reading.chart.wind, vec![6.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn missing_blocks_fall_back_to_defaults() {
        let response: ForecastResponse = serde_json::from_str("{}").unwrap();
        let reading = reading_from_forecast(response);
        assert_eq!(reading.temp, 25.0);
        assert_eq!(reading.humidity, 60.0);
        assert_eq!(reading.wind, 5.0);
        assert_eq!(reading.weather_code, 0);
        assert_eq!(reading.chart.temp, vec![25.0; 5]);
        assert_eq!(reading.chart.wind, vec![5.0; 5]);
    }

    #[test]
    fn short_hourly_series_is_padded_with_current_value() {
        assert_eq!(
            recent_hours(&[Some(10.0), Some(11.0)], 12.0),
            vec![12.0, 12.0, 12.0, 10.0, 11.0]
        );
        assert_eq!(recent_hours(&[], 3.0), vec![3.0; 5]);
    }

    #[test]
    fn climatology_respects_latitude_bands() {
        let mut rng = StdRng::seed_from_u64(21);
        let cases = [(55.0, 8.0, 18.0), (30.0, 15.0, 25.0), (6.5, 24.0, 35.0), (-33.9, 10.0, 22.0)];
        for (lat, low, high) in cases {
            let reading = ClimatologyWeather.synthesize(&Site::new(lat, 0.0), &mut rng);
            assert!((low..=high).contains(&reading.temp), "{lat}: {}", reading.temp);
            assert!((40.0..=80.0).contains(&reading.humidity));
            assert!((3.0..=15.0).contains(&reading.wind));
            assert!((0..=3).contains(&reading.weather_code));
            assert_eq!(reading.chart.temp.len(), 5);
            assert_eq!(reading.chart.humidity.len(), 5);
            assert_eq!(reading.chart.wind.len(), 5);
        }
    }
}
