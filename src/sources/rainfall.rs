use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use rand::rngs::StdRng;
use reqwest::Client;
use tracing::debug;

use super::{DataSource, Synthetic};
use crate::config::Config;
use crate::http_client::fetch_bytes;
use crate::netcdf::read_first_value;
use crate::types::Site;
use crate::utils::round_to;

pub struct GpcpRainfall {
    http: Client,
    base_url: String,
    timeout: Duration,
    token: Option<String>,
}

impl GpcpRainfall {
    pub fn new(http: Client, cfg: &Config) -> Self {
        Self {
            http,
            base_url: cfg.gpcp_base_url.clone(),
            timeout: cfg.request_timeout,
            token: cfg.earthdata_token.clone(),
        }
    }
}

#[async_trait]
impl DataSource<Option<f64>> for GpcpRainfall {
    fn name(&self) -> &'static str {
        "gpcp"
    }

    async fn fetch(&self, site: &Site) -> Result<Option<f64>> {
        let Some(token) = self.token.as_deref() else {
            bail!("EARTHDATA_TOKEN is not set");
        };
        let url = subset_url(&self.base_url, Utc::now().date_naive(), site, token);
        let body = fetch_bytes(&self.http, &url, self.timeout).await?;
        let precip = read_first_value(&body, "precip")?;
        if precip < 0.0 {
            bail!("GPCP returned negative precipitation {precip}");
        }
        debug!(precip, "GPCP rainfall decoded");
        Ok(Some(round_to(precip, 2)))
    }
}

fn subset_url(base_url: &str, date: NaiveDate, site: &Site, token: &str) -> String {
    let year = date.year();
    let month = date.month();
    let day = date.day();
    format!(
        "{base_url}?FILENAME=/data/GPCP/GPCPDAY/3.3/{year}/gpcp_v03r03_y{year}m{month:02}d{day:02}.nc4\
         &SERVICE=SUBSET_GPCP&VERSION=1.02&SHORTNAME=GPCPDAY&VARIABLES=precip\
         &FORMAT=bmMv&LAT={}&LON={}&token={}&LABEL=gpcp_subset.nc",
        site.lat,
        site.lon,
        urlencoding::encode(token)
    )
}

/// Rainfall is optional on the dashboard; without a reading it is simply absent.
pub struct NoRainfall;

impl Synthetic<Option<f64>> for NoRainfall {
    fn synthesize(&self, _site: &Site, _rng: &mut StdRng) -> Option<f64> {
        None
    }
}
