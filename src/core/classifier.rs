//! Risk Classifier Module
//! Turns four sensor readings into a 0-100 risk score, a status and element predictions
//!
//! Score = weighted sum of per-parameter deviation points, clamped to [0, 100]:
//! - 0-29: Safe
//! - 30-59: Moderate
//! - 60-100: High
//!
//! Pure and deterministic: identical inputs always give identical output.

use crate::core::elements;
use crate::models::config::{ClassifierConfig, ParameterBand, StatusThresholds};
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{Assessment, ParameterDeviation, Reading, RiskStatus};
use crate::utils::constants::MAX_RISK_SCORE;

impl RiskStatus {
    /// Map a score onto a status
    pub fn from_score(score: f64, thresholds: &StatusThresholds) -> Self {
        if score >= thresholds.high {
            RiskStatus::High
        } else if score >= thresholds.moderate {
            RiskStatus::Moderate
        } else {
            RiskStatus::Safe
        }
    }
}

/// Stateless classifier over a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    config: ClassifierConfig,
}

impl RiskClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify raw readings
    ///
    /// Out-of-band values (negative concentrations, pH > 14) are accepted and
    /// scored; only NaN and infinities are rejected.
    pub fn classify(&self, ph: f64, tds: f64, hardness: f64, nitrate: f64) -> AppResult<Assessment> {
        ensure_finite("ph", ph)?;
        ensure_finite("tds", tds)?;
        ensure_finite("hardness", hardness)?;
        ensure_finite("nitrate", nitrate)?;

        let components = vec![
            score_parameter("ph", ph, &self.config.ph),
            score_parameter("tds", tds, &self.config.tds),
            score_parameter("hardness", hardness, &self.config.hardness),
            score_parameter("nitrate", nitrate, &self.config.nitrate),
        ];

        let total: f64 = components.iter().map(|c| c.contribution).sum();
        let risk_score = total.clamp(0.0, MAX_RISK_SCORE);
        let status = RiskStatus::from_score(risk_score, &self.config.thresholds);

        let elements = elements::predict(&self.config.rules, ph, tds, hardness, nitrate);
        let treatments = elements::treatments(&elements);

        Ok(Assessment {
            risk_score,
            status,
            elements,
            treatments,
            components,
        })
    }

    /// Classify a stored or submitted reading
    pub fn assess(&self, reading: &Reading) -> AppResult<Assessment> {
        self.classify(reading.ph, reading.tds, reading.hardness, reading.nitrate)
    }
}

/// Classify with the default WHO-style configuration
pub fn classify(ph: f64, tds: f64, hardness: f64, nitrate: f64) -> AppResult<Assessment> {
    RiskClassifier::default().classify(ph, tds, hardness, nitrate)
}

fn ensure_finite(field: &str, value: f64) -> AppResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AppError::invalid_reading(field, value))
    }
}

fn score_parameter(name: &str, value: f64, band: &ParameterBand) -> ParameterDeviation {
    let deviation = band.deviation(value);
    ParameterDeviation {
        name: name.to_string(),
        value,
        deviation,
        weight: band.weight,
        contribution: deviation * band.weight,
    }
}
