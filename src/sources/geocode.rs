use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use reqwest::Client;
use serde::Deserialize;

use super::{DataSource, Synthetic};
use crate::config::Config;
use crate::constants::UNKNOWN_LOCATION;
use crate::http_client::fetch_json;
use crate::types::Site;

#[derive(Debug, Default, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Address,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    county: Option<String>,
    country: Option<String>,
}

pub struct Nominatim {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl Nominatim {
    pub fn new(http: Client, cfg: &Config) -> Self {
        Self {
            http,
            base_url: cfg.nominatim_base_url.clone(),
            timeout: cfg.request_timeout,
        }
    }
}

#[async_trait]
impl DataSource<String> for Nominatim {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    async fn fetch(&self, site: &Site) -> Result<String> {
        let url = format!(
            "{}/reverse?format=json&lat={}&lon={}",
            self.base_url, site.lat, site.lon
        );
        let response: ReverseResponse = fetch_json(&self.http, &url, self.timeout, None).await?;
        Ok(place_name(&response.address))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn place_name(address: &Address) -> String {
    let city = non_empty(&address.city)
        .or_else(|| non_empty(&address.town))
        .or_else(|| non_empty(&address.village))
        .or_else(|| non_empty(&address.county));
    let country = non_empty(&address.country);

    match (city, country) {
        (Some(city), Some(country)) => format!("{city}, {country}"),
        (Some(city), None) => city.to_string(),
        (None, Some(country)) => country.to_string(),
        (None, None) => "Unknown".to_string(),
    }
}

pub struct UnknownLocation;

impl Synthetic<String> for UnknownLocation {
    fn synthesize(&self, _site: &Site, _rng: &mut StdRng) -> String {
        UNKNOWN_LOCATION.to_string()
    }
}
