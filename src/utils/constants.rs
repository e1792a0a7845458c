//! Constants Module - Single Source of Truth
//!
//! Every safe-range bound, weight, threshold and default used by the
//! classifier and the service lives here. Other modules reference these
//! through `ClassifierConfig` / `ServiceConfig` instead of hardcoding values.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "WaterSentry";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for outgoing HTTP requests (mail relay)
pub const USER_AGENT: &str = concat!("WaterSentry/", env!("CARGO_PKG_VERSION"));

// ============================================
// SAFE BANDS (WHO-style drinking water guidance)
// ============================================

/// pH lower bound (inclusive)
pub const PH_SAFE_MIN: f64 = 6.5;
/// pH upper bound (inclusive)
pub const PH_SAFE_MAX: f64 = 8.5;
/// pH distance outside the band that alone scores 100 deviation points
pub const PH_FULL_SCALE: f64 = 0.5;

/// Total dissolved solids upper bound (mg/L)
pub const TDS_SAFE_MAX: f64 = 500.0;
/// TDS excess (mg/L) that alone scores 100 deviation points
pub const TDS_FULL_SCALE: f64 = 500.0;

/// Hardness upper bound (mg/L as CaCO3)
pub const HARDNESS_SAFE_MAX: f64 = 200.0;
/// Hardness excess (mg/L) that alone scores 100 deviation points
pub const HARDNESS_FULL_SCALE: f64 = 100.0;

/// Nitrate upper bound (mg/L as NO3)
pub const NITRATE_SAFE_MAX: f64 = 45.0;
/// Nitrate excess (mg/L) that alone scores 100 deviation points
pub const NITRATE_FULL_SCALE: f64 = 45.0;

// ============================================
// SCORE WEIGHTS (sum to 1.0)
// ============================================

pub const WEIGHT_PH: f64 = 0.30;
pub const WEIGHT_TDS: f64 = 0.25;
pub const WEIGHT_HARDNESS: f64 = 0.20;
pub const WEIGHT_NITRATE: f64 = 0.25;

/// Maximum risk score
pub const MAX_RISK_SCORE: f64 = 100.0;

// ============================================
// STATUS THRESHOLDS
// ============================================

/// Scores at or above this are Moderate
pub const MODERATE_THRESHOLD: f64 = 30.0;
/// Scores at or above this are High
pub const HIGH_THRESHOLD: f64 = 60.0;

// ============================================
// ELEMENT RULE THRESHOLDS
// ============================================

/// Uranium: pH below this ...
pub const URANIUM_PH_BELOW: f64 = 6.5;
/// ... or hardness above this
pub const URANIUM_HARDNESS_ABOVE: f64 = 200.0;

/// Cesium: nitrate above this ...
pub const CESIUM_NITRATE_ABOVE: f64 = 45.0;
/// ... and TDS above this
pub const CESIUM_TDS_ABOVE: f64 = 500.0;

/// Radium: pH above this ...
pub const RADIUM_PH_ABOVE: f64 = 7.5;
/// ... and hardness below this
pub const RADIUM_HARDNESS_BELOW: f64 = 150.0;

// ============================================
// SYNTHESIS
// ============================================

/// Heuristic pH curve: ph = clamp(PH_CURVE_START - tds / PH_CURVE_DIVISOR)
pub const PH_CURVE_START: f64 = 8.5;
pub const PH_CURVE_DIVISOR: f64 = 1000.0;
pub const PH_CURVE_MIN: f64 = 6.0;
pub const PH_CURVE_MAX: f64 = 8.5;

/// Heuristic hardness as a fraction of TDS
pub const HARDNESS_TDS_RATIO: f64 = 0.4;
pub const HARDNESS_CURVE_MIN: f64 = 50.0;
pub const HARDNESS_CURVE_MAX: f64 = 400.0;

/// Heuristic nitrate as a fraction of TDS
pub const NITRATE_TDS_RATIO: f64 = 0.05;
pub const NITRATE_CURVE_MIN: f64 = 1.0;
pub const NITRATE_CURVE_MAX: f64 = 100.0;

/// Uniform sampling bands for random synthesis (half-open)
pub const RANDOM_PH_RANGE: (f64, f64) = (6.0, 8.5);
pub const RANDOM_HARDNESS_RANGE: (f64, f64) = (50.0, 300.0);
pub const RANDOM_NITRATE_RANGE: (f64, f64) = (5.0, 60.0);

/// Seed used when random synthesis is enabled without an explicit seed
pub const DEFAULT_SYNTHESIS_SEED: u64 = 42;

// ============================================
// SERVICE DEFAULTS
// ============================================

/// Location used when a submission omits it
pub const DEFAULT_LOCATION: &str = "unspecified";

/// Default server port
pub const DEFAULT_PORT: u16 = 8080;

/// Default bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default number of records kept in history
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Default page size for history queries
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Maximum readings per batch classification request
pub const MAX_BATCH_SIZE: usize = 100;

/// Default requests per minute per client
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 120;

/// Timeout for mail relay requests (seconds)
pub const MAIL_RELAY_TIMEOUT_SECS: u64 = 10;

/// Default sender for reports
pub const DEFAULT_REPORT_FROM: &str = "water-sentry@localhost";

/// Default telemetry export directory
pub const DEFAULT_TELEMETRY_DIR: &str = "./telemetry";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let sum = WEIGHT_PH + WEIGHT_TDS + WEIGHT_HARDNESS + WEIGHT_NITRATE;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_status_thresholds_ordered() {
        assert!(MODERATE_THRESHOLD < HIGH_THRESHOLD);
        assert!(HIGH_THRESHOLD <= MAX_RISK_SCORE);
    }

    #[test]
    fn test_ph_band_ordered() {
        assert!(PH_SAFE_MIN < PH_SAFE_MAX);
        assert!(PH_CURVE_MIN <= PH_CURVE_MAX);
    }
}
