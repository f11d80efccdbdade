use std::time::Duration;

use anyhow::{Context, Result};

use crate::constants::{
    DEFAULT_HOST, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SECONDS, DEFAULT_WEATHER_TIMEOUT_SECONDS,
    GPCP_BASE_URL, GROQ_BASE_URL, GROQ_MODEL, NOMINATIM_BASE_URL, OPENAQ_BASE_URL,
    OPEN_METEO_BASE_URL, TEMPO_BASE_URL,
};

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub weather_timeout: Duration,
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub groq_base_url: String,
    pub earthdata_token: Option<String>,
    pub rng_seed: Option<u64>,
    pub nominatim_base_url: String,
    pub openaq_base_url: String,
    pub open_meteo_base_url: String,
    pub tempo_base_url: String,
    pub gpcp_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = env_string("AIRWATCH_HOST", DEFAULT_HOST);
        let port = env_u16("PORT", DEFAULT_PORT)?;
        let request_timeout = Duration::from_secs(env_u64(
            "AIRWATCH_REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        )?);
        let weather_timeout = Duration::from_secs(env_u64(
            "AIRWATCH_WEATHER_TIMEOUT_SECONDS",
            DEFAULT_WEATHER_TIMEOUT_SECONDS,
        )?);
        let rng_seed = env_optional("AIRWATCH_RNG_SEED")
            .map(|value| {
                value
                    .parse::<u64>()
                    .with_context(|| format!("Failed to parse AIRWATCH_RNG_SEED={value} as u64"))
            })
            .transpose()?;

        Ok(Self {
            host,
            port,
            request_timeout,
            weather_timeout,
            groq_api_key: env_optional("GROQ_API_KEY"),
            groq_model: env_string("GROQ_MODEL", GROQ_MODEL),
            groq_base_url: trim_base_url(&env_string("GROQ_BASE_URL", GROQ_BASE_URL)),
            earthdata_token: env_optional("EARTHDATA_TOKEN"),
            rng_seed,
            nominatim_base_url: trim_base_url(&env_string(
                "NOMINATIM_BASE_URL",
                NOMINATIM_BASE_URL,
            )),
            openaq_base_url: trim_base_url(&env_string("OPENAQ_BASE_URL", OPENAQ_BASE_URL)),
            open_meteo_base_url: trim_base_url(&env_string(
                "OPEN_METEO_BASE_URL",
                OPEN_METEO_BASE_URL,
            )),
            tempo_base_url: trim_base_url(&env_string("TEMPO_BASE_URL", TEMPO_BASE_URL)),
            gpcp_base_url: trim_base_url(&env_string("GPCP_BASE_URL", GPCP_BASE_URL)),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
            weather_timeout: Duration::from_secs(DEFAULT_WEATHER_TIMEOUT_SECONDS),
            groq_api_key: None,
            groq_model: GROQ_MODEL.to_string(),
            groq_base_url: GROQ_BASE_URL.to_string(),
            earthdata_token: None,
            rng_seed: None,
            nominatim_base_url: NOMINATIM_BASE_URL.to_string(),
            openaq_base_url: OPENAQ_BASE_URL.to_string(),
            open_meteo_base_url: OPEN_METEO_BASE_URL.to_string(),
            tempo_base_url: TEMPO_BASE_URL.to_string(),
            gpcp_base_url: GPCP_BASE_URL.to_string(),
        }
    }
}

fn trim_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_string(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match env_optional(name) {
        Some(value) => value
            .parse::<u64>()
            .with_context(|| format!("Failed to parse {}={} as u64", name, value)),
        None => Ok(default),
    }
}

fn env_u16(name: &str, default: u16) -> Result<u16> {
    match env_optional(name) {
        Some(value) => value
            .parse::<u16>()
            .with_context(|| format!("Failed to parse {}={} as u16", name, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_base_url_drops_trailing_slashes_and_whitespace() {
        assert_eq!(
            trim_base_url("  https://api.open-meteo.com/v1// "),
            "https://api.open-meteo.com/v1"
        );
    }

    #[test]
    fn default_config_listens_on_8080() {
        let cfg = Config::default();
        assert_eq!(cfg.listen_addr(), "0.0.0.0:8080");
        assert!(cfg.groq_api_key.is_none());
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
        assert_eq!(cfg.weather_timeout, Duration::from_secs(15));
    }
}
