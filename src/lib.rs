//! Water Sentry Library
//!
//! Water-quality risk classifier for pH, TDS, hardness and nitrate readings:
//! - Weighted deviation scoring against safe bands (0-100)
//! - SAFE / MODERATE / HIGH status bands
//! - Trace element prediction (Uranium, Cesium, Radium) with treatments
//! - Synthesis of missing sensor fields from TDS
//! - Plain-text reports delivered through a pluggable mailer

pub mod api;
pub mod core;
pub mod models;
pub mod utils;

pub use crate::core::classifier::{classify, RiskClassifier};
pub use crate::core::reporter::{
    mailer_from_config, render_report, report_subject, EmailMessage, LogMailer, Mailer,
    RelayMailer, Reporter,
};
pub use crate::core::synthesizer::{PartialReading, Synthesizer};
pub use models::config::{ClassifierConfig, MailConfig, ServiceConfig, SynthesisStrategy};
pub use models::errors::{AppError, AppResult, ErrorCode};
pub use models::types::{
    Assessment, Element, ParameterDeviation, Reading, ReadingRecord, RiskStatus, SensorField,
};
pub use utils::store::{ReadingStore, StoreStats};
pub use utils::telemetry::{TelemetryCollector, TelemetryEvent, TelemetryStats};
