//! API Request Handlers

use axum::{
    body::Bytes,
    extract::{Json, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::middleware::{RateLimitConfig, RateLimiter};
use super::types::*;
use crate::core::classifier::RiskClassifier;
use crate::core::reporter::Reporter;
use crate::core::synthesizer::Synthesizer;
use crate::models::config::ServiceConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{ReadingRecord, RiskStatus};
use crate::utils::constants::{DEFAULT_HISTORY_LIMIT, MAX_BATCH_SIZE};
use crate::utils::store::ReadingStore;
use crate::utils::telemetry::TelemetryCollector;

type ErrorReply = (StatusCode, Json<ApiResponse<()>>);
type ApiResult<T> = Result<Json<ApiResponse<T>>, ErrorReply>;

/// Shared application state
pub struct AppState {
    pub classifier: RiskClassifier,
    pub synthesizer: Synthesizer,
    pub store: ReadingStore,
    pub reporter: Reporter,
    pub telemetry: Arc<TelemetryCollector>,
    pub rate_limiter: Arc<RateLimiter>,
    pub start_time: Instant,
}

impl AppState {
    /// Build state from configuration
    pub fn new(config: &ServiceConfig, telemetry: Arc<TelemetryCollector>) -> AppResult<Self> {
        let reporter = Reporter::from_config(&config.mail)?;
        Ok(Self::from_parts(
            RiskClassifier::new(config.classifier),
            Synthesizer::new(config.synthesis),
            ReadingStore::with_capacity(config.history_capacity),
            reporter,
            telemetry,
            RateLimiter::new(RateLimitConfig::per_minute(config.rate_limit_per_minute)),
        ))
    }

    /// Assemble state from explicit collaborators
    pub fn from_parts(
        classifier: RiskClassifier,
        synthesizer: Synthesizer,
        store: ReadingStore,
        reporter: Reporter,
        telemetry: Arc<TelemetryCollector>,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            classifier,
            synthesizer,
            store,
            reporter,
            telemetry,
            rate_limiter: Arc::new(rate_limiter),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Map an AppError onto an HTTP error reply
fn reject(err: AppError, start: Instant) -> ErrorReply {
    let status =
        StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(code = err.code_str(), "{}", err.message);
    } else {
        warn!(code = err.code_str(), "{}", err.message);
    }
    (
        status,
        Json(ApiResponse::error(ApiError::from(&err), elapsed_ms(start))),
    )
}

/// Latest record for a location, or the overall latest when none is given
fn find_record(store: &ReadingStore, location: Option<&str>) -> AppResult<ReadingRecord> {
    match location.map(str::trim).filter(|l| !l.is_empty()) {
        Some(location) => store
            .latest_for(location)
            .ok_or_else(|| AppError::not_found(format!("No data for location {:?}", location))),
        None => store.latest().ok_or_else(AppError::no_data),
    }
}

/// Empty (or whitespace-only) body means defaults; anything else must parse
fn parse_report_request(body: &[u8]) -> AppResult<ReportRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ReportRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        AppError::with_source(
            ErrorCode::ApiBadRequest,
            format!("Invalid report request: {}", e),
            e,
        )
    })
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Submit
// ============================================

pub async fn submit_reading(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitReadingRequest>,
) -> ApiResult<SubmitData> {
    let start = Instant::now();

    let reading = state.synthesizer.fill(req.into()).map_err(|e| reject(e, start))?;
    let assessment = state.classifier.assess(&reading).map_err(|e| reject(e, start))?;

    let latency_us = start.elapsed().as_micros() as u64;
    state
        .telemetry
        .record_assessment(&reading.location, &assessment, latency_us);

    info!(
        location = %reading.location,
        score = assessment.risk_score,
        "📥 Reading submitted: {}",
        assessment.summary()
    );

    let record = ReadingRecord::new(reading, assessment);
    state.store.record(record.clone());

    let data = SubmitData {
        status: "Data submitted".to_string(),
        record: record.into(),
    };

    Ok(Json(ApiResponse::success(data, elapsed_ms(start))))
}

// ============================================
// Classify (stateless)
// ============================================

pub async fn classify_reading(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClassifyRequest>,
) -> ApiResult<AssessmentResponse> {
    let start = Instant::now();

    let (ph, tds, hardness, nitrate) = req.values().map_err(|e| reject(e, start))?;
    let assessment = state
        .classifier
        .classify(ph, tds, hardness, nitrate)
        .map_err(|e| reject(e, start))?;

    state
        .telemetry
        .record_assessment("adhoc", &assessment, start.elapsed().as_micros() as u64);

    Ok(Json(ApiResponse::success(assessment.into(), elapsed_ms(start))))
}

pub async fn batch_classify(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchClassifyRequest>,
) -> ApiResult<BatchClassifyData> {
    let start = Instant::now();

    if req.readings.is_empty() {
        return Err(reject(AppError::bad_request("readings array cannot be empty"), start));
    }

    if req.readings.len() > MAX_BATCH_SIZE {
        return Err(reject(
            AppError::bad_request(format!("Maximum {} readings per batch request", MAX_BATCH_SIZE)),
            start,
        ));
    }

    let mut results = Vec::with_capacity(req.readings.len());
    let (mut total_safe, mut total_moderate, mut total_high) = (0, 0, 0);

    for (index, item) in req.readings.iter().enumerate() {
        let item_start = Instant::now();
        let outcome = item
            .values()
            .and_then(|(ph, tds, hardness, nitrate)| {
                state.classifier.classify(ph, tds, hardness, nitrate)
            });

        match outcome {
            Ok(assessment) => {
                match assessment.status {
                    RiskStatus::Safe => total_safe += 1,
                    RiskStatus::Moderate => total_moderate += 1,
                    RiskStatus::High => total_high += 1,
                }
                state.telemetry.record_assessment(
                    "batch",
                    &assessment,
                    item_start.elapsed().as_micros() as u64,
                );
                results.push(BatchItemResult {
                    index,
                    status: "success".to_string(),
                    assessment: Some(assessment.into()),
                    error: None,
                });
            }
            Err(e) => results.push(BatchItemResult {
                index,
                status: "error".to_string(),
                assessment: None,
                error: Some(ApiError::from(&e)),
            }),
        }
    }

    let data = BatchClassifyData {
        total_requested: req.readings.len(),
        total_processed: total_safe + total_moderate + total_high,
        total_safe,
        total_moderate,
        total_high,
        results,
        processing_time_ms: elapsed_ms(start),
    };

    Ok(Json(ApiResponse::success(data, elapsed_ms(start))))
}

// ============================================
// Latest / History
// ============================================

pub async fn get_latest(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LatestQuery>,
) -> ApiResult<RecordResponse> {
    let start = Instant::now();

    let record = find_record(&state.store, query.location.as_deref()).map_err(|e| reject(e, start))?;

    Ok(Json(ApiResponse::success(record.into(), elapsed_ms(start))))
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<ApiResponse<HistoryData>> {
    let start = Instant::now();

    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, state.store.capacity());
    let records: Vec<RecordResponse> = state
        .store
        .recent(limit)
        .into_iter()
        .map(RecordResponse::from)
        .collect();

    let data = HistoryData {
        count: records.len(),
        capacity: state.store.capacity(),
        records,
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Report
// ============================================

pub async fn send_report(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<ReportData> {
    let start = Instant::now();
    let req = parse_report_request(&body).map_err(|e| reject(e, start))?;

    let record = find_record(&state.store, req.location.as_deref()).map_err(|e| reject(e, start))?;

    let message = match state
        .reporter
        .send_report(&record, req.recipient.as_deref())
        .await
    {
        Ok(message) => {
            state.telemetry.record_report(true);
            message
        }
        Err(e) => {
            state.telemetry.record_report(false);
            return Err(reject(e, start));
        }
    };

    info!(
        to = %message.to,
        transport = state.reporter.transport(),
        record = %record.id,
        "📧 Report sent"
    );

    let data = ReportData {
        status: "Report sent".to_string(),
        transport: state.reporter.transport().to_string(),
        to: message.to,
        subject: message.subject,
        record_id: record.id,
        report: message.text,
    };

    Ok(Json(ApiResponse::success(data, elapsed_ms(start))))
}

// ============================================
// Stats
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();
    let store_stats = state.store.stats();

    info!(
        "📊 Store Stats: {}/{} records, {} locations, {} evicted",
        store_stats.entries, store_stats.capacity, store_stats.locations, store_stats.evicted
    );

    let data = StatsData {
        telemetry: state.telemetry.get_stats(),
        store: store_stats,
        synthesis: state.synthesizer.strategy().name().to_string(),
        mail_transport: state.reporter.transport().to_string(),
        uptime_seconds: state.uptime_seconds(),
        api_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}
