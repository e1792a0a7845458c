//! API Request/Response Types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::synthesizer::PartialReading;
use crate::models::errors::{AppError, ErrorCode};
use crate::models::types::{Assessment, ParameterDeviation, Reading, ReadingRecord};
use crate::utils::store::StoreStats;
use crate::utils::telemetry::TelemetryStats;

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            code: ErrorCode::ApiRateLimited.as_str().to_string(),
            message: format!("Rate limit exceeded. Retry after {} seconds", retry_after),
            details: Some(format!("retry_after: {}", retry_after)),
        }
    }
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            details: None,
        }
    }
}

// ============================================
// Assessment
// ============================================

#[derive(Debug, Serialize)]
pub struct AssessmentResponse {
    pub risk_score: f64,
    pub status: String,
    pub color: String,
    pub summary: String,
    pub elements: Vec<String>,
    pub treatments: Vec<String>,
    pub components: Vec<ParameterDeviation>,
}

impl From<Assessment> for AssessmentResponse {
    fn from(assessment: Assessment) -> Self {
        Self {
            risk_score: assessment.risk_score,
            status: assessment.status.as_str().to_string(),
            color: assessment.status.color_code().to_string(),
            summary: assessment.summary(),
            elements: assessment
                .elements
                .iter()
                .map(|e| e.name().to_string())
                .collect(),
            treatments: assessment.treatments,
            components: assessment.components,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub id: Uuid,
    pub reading: Reading,
    pub assessment: AssessmentResponse,
}

impl From<ReadingRecord> for RecordResponse {
    fn from(record: ReadingRecord) -> Self {
        Self {
            id: record.id,
            reading: record.reading,
            assessment: record.assessment.into(),
        }
    }
}

// ============================================
// Submit
// ============================================

/// Only `tds` is mandatory; other sensor fields are synthesized when absent
#[derive(Debug, Default, Deserialize)]
pub struct SubmitReadingRequest {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub ph: Option<f64>,
    #[serde(default)]
    pub tds: Option<f64>,
    #[serde(default)]
    pub hardness: Option<f64>,
    #[serde(default)]
    pub nitrate: Option<f64>,
}

impl From<SubmitReadingRequest> for PartialReading {
    fn from(req: SubmitReadingRequest) -> Self {
        Self {
            location: req.location,
            ph: req.ph,
            tds: req.tds,
            hardness: req.hardness,
            nitrate: req.nitrate,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitData {
    pub status: String,
    pub record: RecordResponse,
}

// ============================================
// Classify (stateless)
// ============================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassifyRequest {
    #[serde(default)]
    pub ph: Option<f64>,
    #[serde(default)]
    pub tds: Option<f64>,
    #[serde(default)]
    pub hardness: Option<f64>,
    #[serde(default)]
    pub nitrate: Option<f64>,
}

impl ClassifyRequest {
    /// All four readings, or the first missing field
    pub fn values(&self) -> Result<(f64, f64, f64, f64), AppError> {
        Ok((
            self.ph.ok_or_else(|| AppError::missing_field("ph"))?,
            self.tds.ok_or_else(|| AppError::missing_field("tds"))?,
            self.hardness.ok_or_else(|| AppError::missing_field("hardness"))?,
            self.nitrate.ok_or_else(|| AppError::missing_field("nitrate"))?,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchClassifyRequest {
    pub readings: Vec<ClassifyRequest>,
}

#[derive(Debug, Serialize)]
pub struct BatchClassifyData {
    pub total_requested: usize,
    pub total_processed: usize,
    pub total_safe: usize,
    pub total_moderate: usize,
    pub total_high: usize,
    pub results: Vec<BatchItemResult>,
    pub processing_time_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct BatchItemResult {
    pub index: usize,
    pub status: String, // "success" | "error"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<AssessmentResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

// ============================================
// Latest / History
// ============================================

#[derive(Debug, Default, Deserialize)]
pub struct LatestQuery {
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryData {
    pub count: usize,
    pub capacity: usize,
    pub records: Vec<RecordResponse>,
}

// ============================================
// Report
// ============================================

#[derive(Debug, Default, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub recipient: Option<String>,
    /// Report the latest reading of this location instead of the overall latest
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportData {
    pub status: String,
    pub transport: String,
    pub to: String,
    pub subject: String,
    pub record_id: Uuid,
    pub report: String,
}

// ============================================
// Stats / Telemetry
// ============================================

#[derive(Debug, Serialize)]
pub struct StatsData {
    pub telemetry: TelemetryStats,
    pub store: StoreStats,
    pub synthesis: String,
    pub mail_transport: String,
    pub uptime_seconds: u64,
    pub api_version: String,
}

// ============================================
// Health Check
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}
