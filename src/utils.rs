use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .without_time()
        .init();
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

pub fn uniform_rounded(rng: &mut impl Rng, low: f64, high: f64, decimals: i32) -> f64 {
    round_to(rng.gen_range(low..=high), decimals)
}

/// Each request owns its generator; a configured seed only makes it reproducible.
pub fn request_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub fn to_finite_number(value: Option<&str>) -> Option<f64> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = trimmed.parse::<f64>().ok()?;
    if parsed.is_finite() {
        Some(parsed)
    } else {
        None
    }
}

pub fn normalize_lat(raw: Option<&str>) -> Option<f64> {
    to_finite_number(raw).filter(|value| (-90.0..=90.0).contains(value))
}

pub fn normalize_lon(raw: Option<&str>) -> Option<f64> {
    to_finite_number(raw).filter(|value| (-180.0..=180.0).contains(value))
}
