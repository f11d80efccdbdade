use rand::Rng;

use crate::constants::{
    GROUND_FLOOR, GROUND_HOUR_FACTORS, GROUND_SPREAD, SERIES_LEN, TEMPO_FLOOR,
    TEMPO_HOUR_FACTORS, TEMPO_SPREAD,
};
use crate::utils::round_to;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeriesProfile {
    pub hour_factors: [f64; SERIES_LEN],
    pub spread: f64,
    pub floor: f64,
}

pub const TEMPO_PROFILE: SeriesProfile = SeriesProfile {
    hour_factors: TEMPO_HOUR_FACTORS,
    spread: TEMPO_SPREAD,
    floor: TEMPO_FLOOR,
};

pub const GROUND_PROFILE: SeriesProfile = SeriesProfile {
    hour_factors: GROUND_HOUR_FACTORS,
    spread: GROUND_SPREAD,
    floor: GROUND_FLOOR,
};

impl SeriesProfile {
    pub fn generate(&self, base: f64, rng: &mut impl Rng) -> [f64; SERIES_LEN] {
        self.hour_factors.map(|factor| {
            let variation = rng.gen_range(-self.spread..=self.spread);
            round_to(base * factor * (1.0 + variation), 2).max(self.floor)
        })
    }
}
