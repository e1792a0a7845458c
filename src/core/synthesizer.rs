//! Synthesizer - fills in sensor fields a submission did not measure
//!
//! Only TDS is mandatory. Missing pH / hardness / nitrate are derived either
//! from deterministic TDS curves or from a seeded uniform generator, so test
//! runs stay reproducible. Supplied values are never overwritten.

use chrono::Utc;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Mutex;
use tracing::debug;

use crate::models::config::SynthesisStrategy;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{Reading, SensorField};
use crate::utils::constants::*;

/// Partially measured sample as received from a sensor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialReading {
    pub location: Option<String>,
    pub ph: Option<f64>,
    pub tds: Option<f64>,
    pub hardness: Option<f64>,
    pub nitrate: Option<f64>,
}

pub struct Synthesizer {
    strategy: SynthesisStrategy,
    /// Present only for `SynthesisStrategy::Random`
    rng: Option<Mutex<ChaCha8Rng>>,
}

impl Synthesizer {
    pub fn new(strategy: SynthesisStrategy) -> Self {
        let rng = match strategy {
            SynthesisStrategy::Heuristic => None,
            SynthesisStrategy::Random { seed } => Some(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        };
        Self { strategy, rng }
    }

    pub fn strategy(&self) -> SynthesisStrategy {
        self.strategy
    }

    /// Build a complete reading, synthesizing whatever is missing
    pub fn fill(&self, partial: PartialReading) -> AppResult<Reading> {
        let tds = partial.tds.ok_or_else(|| AppError::missing_field("tds"))?;
        if !tds.is_finite() {
            return Err(AppError::invalid_reading("tds", tds));
        }

        let location = partial
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());

        let mut synthesized = Vec::new();
        let mut take = |field: SensorField, given: Option<f64>| -> f64 {
            match given {
                Some(value) => value,
                None => {
                    synthesized.push(field);
                    self.synthesize(field, tds)
                }
            }
        };

        let ph = take(SensorField::Ph, partial.ph);
        let hardness = take(SensorField::Hardness, partial.hardness);
        let nitrate = take(SensorField::Nitrate, partial.nitrate);

        if !synthesized.is_empty() {
            debug!(
                location = %location,
                strategy = self.strategy.name(),
                fields = ?synthesized,
                "Synthesized missing sensor fields"
            );
        }

        Ok(Reading {
            location,
            ph,
            tds,
            hardness,
            nitrate,
            timestamp: Utc::now(),
            synthesized,
        })
    }

    fn synthesize(&self, field: SensorField, tds: f64) -> f64 {
        match &self.rng {
            None => heuristic(field, tds),
            Some(rng) => {
                let (low, high) = match field {
                    SensorField::Ph => RANDOM_PH_RANGE,
                    SensorField::Hardness => RANDOM_HARDNESS_RANGE,
                    SensorField::Nitrate => RANDOM_NITRATE_RANGE,
                };
                let mut rng = rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                rng.gen_range(low..high)
            }
        }
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(SynthesisStrategy::Heuristic)
    }
}

/// Deterministic TDS curves
pub fn heuristic(field: SensorField, tds: f64) -> f64 {
    match field {
        SensorField::Ph => (PH_CURVE_START - tds / PH_CURVE_DIVISOR).clamp(PH_CURVE_MIN, PH_CURVE_MAX),
        SensorField::Hardness => (tds * HARDNESS_TDS_RATIO).clamp(HARDNESS_CURVE_MIN, HARDNESS_CURVE_MAX),
        SensorField::Nitrate => (tds * NITRATE_TDS_RATIO).clamp(NITRATE_CURVE_MIN, NITRATE_CURVE_MAX),
    }
}
