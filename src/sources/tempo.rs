use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;
use reqwest::Client;
use serde_json::Value;

use super::{DataSource, Synthetic};
use crate::config::Config;
use crate::constants::{
    CLEAN_CITY_FACTOR, CLEAN_CITY_MARKERS, POLLUTED_CITY_FACTOR, POLLUTED_CITY_MARKERS,
};
use crate::http_client::fetch_json;
use crate::types::{No2Provenance, No2Reading, Site};
use crate::utils::round_to;

pub struct TempoNo2 {
    http: Client,
    base_url: String,
    timeout: Duration,
    token: Option<String>,
}

impl TempoNo2 {
    pub fn new(http: Client, cfg: &Config) -> Self {
        Self {
            http,
            base_url: cfg.tempo_base_url.clone(),
            timeout: cfg.request_timeout,
            token: cfg.earthdata_token.clone(),
        }
    }
}

#[async_trait]
impl DataSource<No2Reading> for TempoNo2 {
    fn name(&self) -> &'static str {
        "tempo"
    }

    async fn fetch(&self, site: &Site) -> Result<No2Reading> {
        let Some(token) = self.token.as_deref() else {
            bail!("EARTHDATA_TOKEN is not set");
        };
        let url = format!("{}/{}/{}", self.base_url, site.lat, site.lon);
        let body: Value = fetch_json(&self.http, &url, self.timeout, Some(token)).await?;
        no2_from_body(&body)
    }
}

fn no2_from_body(body: &Value) -> Result<No2Reading> {
    let no2 = body
        .get("NO2_column")
        .and_then(Value::as_f64)
        .ok_or_else(|| anyhow!("TEMPO payload has no numeric NO2_column"))?;
    if !no2.is_finite() || no2 <= 0.0 {
        bail!("TEMPO payload has unusable NO2_column {no2}");
    }
    Ok(No2Reading {
        no2: round_to(no2, 2),
        provenance: No2Provenance::Satellite,
    })
}

pub struct EstimatedNo2;

impl Synthetic<No2Reading> for EstimatedNo2 {
    fn synthesize(&self, site: &Site, rng: &mut StdRng) -> No2Reading {
        let (low, high) = latitude_band(site.lat);
        let no2 = rng.gen_range(low..=high) * city_factor(&site.city);
        No2Reading {
            no2: round_to(no2, 2),
            provenance: No2Provenance::Estimated,
        }
    }
}

/// Northern industrial belt, temperate urban band, then tropics and the south.
fn latitude_band(lat: f64) -> (f64, f64) {
    if lat > 50.0 {
        (20.0, 45.0)
    } else if lat > 30.0 {
        (25.0, 50.0)
    } else {
        (15.0, 35.0)
    }
}

fn city_factor(city: &str) -> f64 {
    let city = city.to_lowercase();
    if POLLUTED_CITY_MARKERS
        .iter()
        .any(|marker| city.contains(marker))
    {
        POLLUTED_CITY_FACTOR
    } else if CLEAN_CITY_MARKERS.iter().any(|marker| city.contains(marker)) {
        CLEAN_CITY_FACTOR
    } else {
        1.0
    }
}
