//! Configuration module for Water Sentry
//!
//! Classifier bounds and weights come from utils/constants.rs.
//! Service settings are read from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::utils::constants::*;

/// Safe band and scoring parameters for one sensor value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterBand {
    /// Inclusive lower bound; `None` when only an upper bound applies
    pub min: Option<f64>,
    /// Inclusive upper bound
    pub max: f64,
    /// Distance outside the band that scores 100 deviation points
    pub full_scale: f64,
    /// Weight in the overall score
    pub weight: f64,
}

impl ParameterBand {
    pub const fn upper(max: f64, full_scale: f64, weight: f64) -> Self {
        Self {
            min: None,
            max,
            full_scale,
            weight,
        }
    }

    pub const fn range(min: f64, max: f64, full_scale: f64, weight: f64) -> Self {
        Self {
            min: Some(min),
            max,
            full_scale,
            weight,
        }
    }

    /// Distance from the nearest band edge (0 inside, bounds inclusive)
    pub fn excess(&self, value: f64) -> f64 {
        if value > self.max {
            value - self.max
        } else {
            match self.min {
                Some(min) if value < min => min - value,
                _ => 0.0,
            }
        }
    }

    /// Deviation points for a value
    pub fn deviation(&self, value: f64) -> f64 {
        self.excess(value) / self.full_scale * 100.0
    }
}

/// Score cut-offs for status levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusThresholds {
    pub moderate: f64,
    pub high: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            moderate: MODERATE_THRESHOLD,
            high: HIGH_THRESHOLD,
        }
    }
}

/// Thresholds of the element prediction rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementRules {
    pub uranium_ph_below: f64,
    pub uranium_hardness_above: f64,
    pub cesium_nitrate_above: f64,
    pub cesium_tds_above: f64,
    pub radium_ph_above: f64,
    pub radium_hardness_below: f64,
}

impl Default for ElementRules {
    fn default() -> Self {
        Self {
            uranium_ph_below: URANIUM_PH_BELOW,
            uranium_hardness_above: URANIUM_HARDNESS_ABOVE,
            cesium_nitrate_above: CESIUM_NITRATE_ABOVE,
            cesium_tds_above: CESIUM_TDS_ABOVE,
            radium_ph_above: RADIUM_PH_ABOVE,
            radium_hardness_below: RADIUM_HARDNESS_BELOW,
        }
    }
}

/// Everything the risk classifier needs, enumerated once
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    pub ph: ParameterBand,
    pub tds: ParameterBand,
    pub hardness: ParameterBand,
    pub nitrate: ParameterBand,
    pub thresholds: StatusThresholds,
    pub rules: ElementRules,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            ph: ParameterBand::range(PH_SAFE_MIN, PH_SAFE_MAX, PH_FULL_SCALE, WEIGHT_PH),
            tds: ParameterBand::upper(TDS_SAFE_MAX, TDS_FULL_SCALE, WEIGHT_TDS),
            hardness: ParameterBand::upper(HARDNESS_SAFE_MAX, HARDNESS_FULL_SCALE, WEIGHT_HARDNESS),
            nitrate: ParameterBand::upper(NITRATE_SAFE_MAX, NITRATE_FULL_SCALE, WEIGHT_NITRATE),
            thresholds: StatusThresholds::default(),
            rules: ElementRules::default(),
        }
    }
}

/// How missing pH / hardness / nitrate values are filled in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthesisStrategy {
    /// Deterministic curves derived from TDS
    #[default]
    Heuristic,
    /// Uniform sampling from fixed bands with a seeded generator
    Random { seed: u64 },
}

impl SynthesisStrategy {
    /// Parse `heuristic` or `random` (case-insensitive)
    pub fn parse(name: &str, seed: Option<u64>) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "heuristic" | "" => Some(Self::Heuristic),
            "random" => Some(Self::Random {
                seed: seed.unwrap_or(DEFAULT_SYNTHESIS_SEED),
            }),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Heuristic => "heuristic",
            Self::Random { .. } => "random",
        }
    }
}

/// Mail relay settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    /// HTTP endpoint accepting JSON messages; `None` logs reports instead
    pub relay_url: Option<String>,
    /// Bearer token for the relay
    pub relay_token: Option<String>,
    pub from: String,
    /// Default recipient when a report request names none
    pub default_recipient: Option<String>,
    pub timeout: Duration,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            relay_token: None,
            from: DEFAULT_REPORT_FROM.to_string(),
            default_recipient: None,
            timeout: Duration::from_secs(MAIL_RELAY_TIMEOUT_SECS),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub history_capacity: usize,
    pub synthesis: SynthesisStrategy,
    pub rate_limit_per_minute: u32,
    pub telemetry_dir: PathBuf,
    pub mail: MailConfig,
    pub classifier: ClassifierConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            synthesis: SynthesisStrategy::default(),
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            telemetry_dir: PathBuf::from(DEFAULT_TELEMETRY_DIR),
            mail: MailConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // PORT is set by most hosting platforms, WATER_PORT for local dev
        let port = get("PORT")
            .or_else(|| get("WATER_PORT"))
            .map(|v| parse_or("PORT", &v, defaults.port))
            .unwrap_or(defaults.port);

        let history_capacity = get("WATER_HISTORY_CAPACITY")
            .map(|v| parse_or("WATER_HISTORY_CAPACITY", &v, defaults.history_capacity))
            .unwrap_or(defaults.history_capacity)
            .max(1);

        let seed = get("WATER_SYNTHESIS_SEED")
            .and_then(|v| v.trim().parse::<u64>().ok());
        let synthesis = match get("WATER_SYNTHESIS") {
            Some(name) => SynthesisStrategy::parse(&name, seed).unwrap_or_else(|| {
                warn!("Unknown WATER_SYNTHESIS {:?}, using heuristic", name);
                SynthesisStrategy::Heuristic
            }),
            None => defaults.synthesis,
        };

        let rate_limit_per_minute = get("WATER_RATE_LIMIT")
            .map(|v| parse_or("WATER_RATE_LIMIT", &v, defaults.rate_limit_per_minute))
            .unwrap_or(defaults.rate_limit_per_minute);

        let relay_token = get("MAIL_RELAY_TOKEN");
        if relay_token.is_some() {
            info!("🔑 MAIL_RELAY_TOKEN configured (token hidden)");
        }

        let mail = MailConfig {
            relay_url: get("MAIL_RELAY_URL"),
            relay_token,
            from: get("REPORT_FROM").unwrap_or(defaults.mail.from),
            default_recipient: get("REPORT_TO"),
            timeout: defaults.mail.timeout,
        };

        Self {
            host: get("WATER_HOST").unwrap_or(defaults.host),
            port,
            history_capacity,
            synthesis,
            rate_limit_per_minute,
            telemetry_dir: get("WATER_TELEMETRY_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.telemetry_dir),
            mail,
            classifier: defaults.classifier,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr + std::fmt::Display>(key: &str, value: &str, default: T) -> T {
    value.trim().parse().unwrap_or_else(|_| {
        warn!("Invalid {} {:?}, using default {}", key, value, default);
        default
    })
}
