use rand::Rng;

use super::types::{BirthQuery, ChartResult, PlanetPosition, Provenance, PLANETS, ZODIAC_SIGNS};

const RETROGRADE_PROBABILITY: f64 = 0.2;

/// Synthesizes a plausible chart when the astrology service is unavailable.
///
/// Sign placement depends only on the birth date, so two charts for the same
/// day agree on signs. Degrees and retrograde flags carry random jitter and
/// are cosmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackGenerator;

impl FallbackGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, query: &BirthQuery) -> ChartResult {
        self.generate_with(query, &mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng>(&self, query: &BirthQuery, rng: &mut R) -> ChartResult {
        log::debug!(
            "Generating simulated chart for {}",
            query.date().format("%Y-%m-%d")
        );

        let seed = date_seed(query);
        let planets = PLANETS
            .iter()
            .enumerate()
            .map(|(index, planet)| {
                let index = index as i64;
                let sign = ZODIAC_SIGNS[(seed + index).rem_euclid(12) as usize];
                let base = (seed + index * 7).rem_euclid(30) as f64;

                PlanetPosition {
                    planet: planet.to_string(),
                    sign: sign.to_string(),
                    degree: base + rng.gen_range(0.0..30.0),
                    retrograde: rng.gen_bool(RETROGRADE_PROBABILITY),
                }
            })
            .collect();

        ChartResult {
            planets,
            source: Provenance::Simulated,
            warning: None,
        }
    }
}

fn date_seed(query: &BirthQuery) -> i64 {
    i64::from(query.year()) + i64::from(query.month()) + i64::from(query.day())
}
