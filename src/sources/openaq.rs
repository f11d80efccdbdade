use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use reqwest::Client;
use serde::Deserialize;

use super::{DataSource, Synthetic};
use crate::config::Config;
use crate::constants::{FALLBACK_STATION, OPENAQ_RADIUS_METERS, OPENAQ_RESULT_LIMIT};
use crate::http_client::fetch_json;
use crate::types::{GroundReading, Site};
use crate::utils::{round_to, uniform_rounded};

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    results: Vec<LatestResult>,
}

#[derive(Debug, Deserialize)]
struct LatestResult {
    location: Option<String>,
    #[serde(default)]
    measurements: Vec<Measurement>,
}

#[derive(Debug, Deserialize)]
struct Measurement {
    value: f64,
}

pub struct OpenAqStations {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl OpenAqStations {
    pub fn new(http: Client, cfg: &Config) -> Self {
        Self {
            http,
            base_url: cfg.openaq_base_url.clone(),
            timeout: cfg.request_timeout,
        }
    }
}

#[async_trait]
impl DataSource<GroundReading> for OpenAqStations {
    fn name(&self) -> &'static str {
        "openaq"
    }

    async fn fetch(&self, site: &Site) -> Result<GroundReading> {
        let url = format!(
            "{}/latest?coordinates={},{}&radius={OPENAQ_RADIUS_METERS}&parameter=pm25&limit={OPENAQ_RESULT_LIMIT}&order_by=distance",
            self.base_url, site.lat, site.lon
        );
        let response: LatestResponse = fetch_json(&self.http, &url, self.timeout, None).await?;
        nearest_reading(response)
    }
}

fn nearest_reading(response: LatestResponse) -> Result<GroundReading> {
    let nearest = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No PM2.5 stations within {OPENAQ_RADIUS_METERS} m"))?;
    let value = nearest
        .measurements
        .first()
        .map(|measurement| measurement.value)
        .ok_or_else(|| anyhow!("Nearest station has no measurements"))?;
    if !value.is_finite() || value < 0.0 {
        bail!("Station reported an invalid PM2.5 value {value}");
    }

    Ok(GroundReading {
        pm25: round_to(value, 2),
        station: nearest.location.unwrap_or_default(),
    })
}

pub struct RandomStation;

impl Synthetic<GroundReading> for RandomStation {
    fn synthesize(&self, _site: &Site, rng: &mut StdRng) -> GroundReading {
        GroundReading {
            pm25: uniform_rounded(rng, 5.0, 50.0, 2),
            station: FALLBACK_STATION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::build_client;
    use crate::sources::testing::stub_upstream;
    use crate::sources::Resilient;
    use axum::http::StatusCode;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn parse(json: &str) -> LatestResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn nearest_reading_uses_first_station() {
        let response = parse(
            r#"{"results": [
                {"location": "Ikeja", "measurements": [{"parameter": "pm25", "value": 23.456}]},
                {"location": "Yaba", "measurements": [{"parameter": "pm25", "value": 9.0}]}
            ]}"#,
        );
        let reading = nearest_reading(response).unwrap();
        assert_eq!(reading.station, "Ikeja");
        assert_eq!(reading.pm25, 23.46);
    }

    #[test]
    fn nearest_reading_rejects_empty_and_invalid_payloads() {
        assert!(nearest_reading(parse(r#"{"results": []}"#)).is_err());
        assert!(nearest_reading(parse(r#"{"results": [{"location": "X", "measurements": []}]}"#)).is_err());
        assert!(nearest_reading(parse(
            r#"{"results": [{"location": "X", "measurements": [{"value": -999}]}]}"#
        ))
        .is_err());
    }

    fn stations(base_url: String) -> OpenAqStations {
        let cfg = Config {
            openaq_base_url: base_url,
            ..Config::default()
        };
        OpenAqStations::new(build_client().unwrap(), &cfg)
    }

    #[tokio::test]
    async fn live_fetch_queries_nearest_pm25_stations() {
        let (base_url, seen) = stub_upstream(
            StatusCode::OK,
            r#"{"results": [{"location": "Ikeja", "measurements": [{"value": 18.2}]}]}"#,
        )
        .await;
        let reading = stations(base_url).fetch(&Site::new(6.5, 3.4)).await.unwrap();
        assert_eq!(reading.station, "Ikeja");
        assert_eq!(reading.pm25, 18.2);

        let seen = seen.lock().unwrap();
        assert!(seen[0].uri.starts_with("/latest?coordinates=6.5,3.4&radius=50000"));
        assert!(seen[0].uri.contains("parameter=pm25"));
        assert_eq!(seen[0].authorization, None);
    }

    #[tokio::test]
    async fn server_errors_resolve_to_the_fallback_station() {
        let (base_url, seen) = stub_upstream(StatusCode::INTERNAL_SERVER_ERROR, "oops").await;
        let ground = Resilient::new(Arc::new(stations(base_url)), Arc::new(RandomStation));
        let mut rng = StdRng::seed_from_u64(8);
        let reading = ground.resolve(&Site::new(6.5, 3.4), &mut rng).await;
        assert_eq!(reading.station, FALLBACK_STATION);
        assert!((5.0..=50.0).contains(&reading.pm25));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
