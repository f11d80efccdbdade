mod geocode;
mod openaq;
mod rainfall;
mod tempo;
mod weather;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use reqwest::Client;
use tracing::warn;

use crate::config::Config;
use crate::types::{GroundReading, No2Reading, Site, WeatherReading};

pub use geocode::{Nominatim, UnknownLocation};
pub use openaq::{OpenAqStations, RandomStation};
pub use rainfall::{GpcpRainfall, NoRainfall};
pub use tempo::{EstimatedNo2, TempoNo2};
pub use weather::{ClimatologyWeather, OpenMeteo};

#[async_trait]
pub trait DataSource<T: Send + 'static>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, site: &Site) -> Result<T>;
}

pub trait Synthetic<T>: Send + Sync {
    fn synthesize(&self, site: &Site, rng: &mut StdRng) -> T;
}

pub struct Resilient<T: Send + 'static> {
    live: Arc<dyn DataSource<T>>,
    fallback: Arc<dyn Synthetic<T>>,
}

impl<T: Send + 'static> Resilient<T> {
    pub fn new(live: Arc<dyn DataSource<T>>, fallback: Arc<dyn Synthetic<T>>) -> Self {
        Self { live, fallback }
    }

    pub async fn attempt(&self, site: &Site) -> Result<T> {
        self.live.fetch(site).await
    }

    pub fn recover(&self, outcome: Result<T>, site: &Site, rng: &mut StdRng) -> T {
        match outcome {
            Ok(value) => value,
            Err(error) => {
                warn!(
                    source = self.live.name(),
                    "Upstream unavailable, using fallback: {error:#}"
                );
                self.fallback.synthesize(site, rng)
            }
        }
    }

    pub async fn resolve(&self, site: &Site, rng: &mut StdRng) -> T {
        let outcome = self.attempt(site).await;
        self.recover(outcome, site, rng)
    }
}

pub struct Sources {
    pub geocoder: Resilient<String>,
    pub ground: Resilient<GroundReading>,
    pub no2: Resilient<No2Reading>,
    pub weather: Resilient<WeatherReading>,
    pub rainfall: Resilient<Option<f64>>,
}

impl Sources {
    pub fn live(cfg: &Config, http: Client) -> Self {
        Self {
            geocoder: Resilient::new(
                Arc::new(Nominatim::new(http.clone(), cfg)),
                Arc::new(UnknownLocation),
            ),
            ground: Resilient::new(
                Arc::new(OpenAqStations::new(http.clone(), cfg)),
                Arc::new(RandomStation),
            ),
            no2: Resilient::new(
                Arc::new(TempoNo2::new(http.clone(), cfg)),
                Arc::new(EstimatedNo2),
            ),
            weather: Resilient::new(
                Arc::new(OpenMeteo::new(http.clone(), cfg)),
                Arc::new(ClimatologyWeather),
            ),
            rainfall: Resilient::new(Arc::new(GpcpRainfall::new(http, cfg)), Arc::new(NoRainfall)),
        }
    }
}
