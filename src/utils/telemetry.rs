//! Telemetry Module for Water Sentry
//!
//! Collects aggregate statistics about assessments:
//! - Assessments by status and predicted element
//! - Report deliveries (sent / failed)
//! - Classification latency
//!
//! Elevated assessments (Moderate or High) are buffered as events and
//! flushed to JSONL once the buffer fills.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::models::types::{Assessment, Element, RiskStatus};
use crate::utils::constants::DEFAULT_TELEMETRY_DIR;

/// Single elevated-risk event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Unix timestamp
    pub timestamp: u64,
    pub location: String,
    pub status: RiskStatus,
    /// Score rounded to one decimal
    pub risk_score: f64,
    pub elements: Vec<Element>,
    pub latency_us: u64,
}

impl TelemetryEvent {
    pub fn new(location: impl Into<String>, assessment: &Assessment, latency_us: u64) -> Self {
        Self {
            timestamp: current_timestamp(),
            location: location.into(),
            status: assessment.status,
            risk_score: (assessment.risk_score * 10.0).round() / 10.0,
            elements: assessment.elements.clone(),
            latency_us,
        }
    }
}

/// Aggregated statistics for reporting
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelemetryStats {
    pub total_assessed: u64,
    pub safe: u64,
    pub moderate: u64,
    pub high: u64,
    /// Detections per element name
    pub elements_detected: HashMap<String, u64>,
    pub reports_sent: u64,
    pub reports_failed: u64,
    /// Average classification latency (microseconds)
    pub avg_latency_us: f64,
    /// Period start timestamp
    pub period_start: u64,
    /// Period end timestamp
    pub period_end: u64,
}

impl TelemetryStats {
    /// Share of assessments that were not Safe, in percent
    pub fn elevated_rate(&self) -> f64 {
        if self.total_assessed == 0 {
            0.0
        } else {
            (self.moderate + self.high) as f64 / self.total_assessed as f64 * 100.0
        }
    }

    /// Plain-text summary for shutdown logs
    pub fn summary(&self) -> String {
        let period_hours = self.period_end.saturating_sub(self.period_start) / 3600;
        let mut elements: Vec<_> = self.elements_detected.iter().collect();
        elements.sort();
        let elements = if elements.is_empty() {
            "none".to_string()
        } else {
            elements
                .iter()
                .map(|(name, count)| format!("{}={}", name, count))
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "Period: {}h | Assessed: {} (safe {}, moderate {}, high {}, elevated {:.1}%) | Elements: {} | Reports: {} sent, {} failed | Avg latency: {:.1}us",
            period_hours,
            self.total_assessed,
            self.safe,
            self.moderate,
            self.high,
            self.elevated_rate(),
            elements,
            self.reports_sent,
            self.reports_failed,
            self.avg_latency_us,
        )
    }

    /// Export as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Export as CSV row
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{:.2}\n",
            self.period_start,
            self.period_end,
            self.total_assessed,
            self.safe,
            self.moderate,
            self.high,
            self.reports_sent,
            self.reports_failed,
            self.avg_latency_us,
        )
    }
}

/// Main telemetry collector
pub struct TelemetryCollector {
    /// Elevated-risk event buffer
    events: RwLock<Vec<TelemetryEvent>>,
    total_assessed: AtomicU64,
    safe: AtomicU64,
    moderate: AtomicU64,
    high: AtomicU64,
    reports_sent: AtomicU64,
    reports_failed: AtomicU64,
    total_latency_us: AtomicU64,
    element_counts: DashMap<Element, AtomicU64>,
    session_start: u64,
    export_dir: PathBuf,
    max_buffer_size: usize,
}

impl TelemetryCollector {
    /// Create new collector with default settings
    pub fn new() -> Self {
        Self::with_config(PathBuf::from(DEFAULT_TELEMETRY_DIR), 1000)
    }

    /// Create collector with custom config
    pub fn with_config(export_dir: PathBuf, max_buffer_size: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            total_assessed: AtomicU64::new(0),
            safe: AtomicU64::new(0),
            moderate: AtomicU64::new(0),
            high: AtomicU64::new(0),
            reports_sent: AtomicU64::new(0),
            reports_failed: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
            element_counts: DashMap::new(),
            session_start: current_timestamp(),
            export_dir,
            max_buffer_size: max_buffer_size.max(1),
        }
    }

    /// Record one assessment
    pub fn record_assessment(&self, location: &str, assessment: &Assessment, latency_us: u64) {
        self.total_assessed.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);

        let counter = match assessment.status {
            RiskStatus::Safe => &self.safe,
            RiskStatus::Moderate => &self.moderate,
            RiskStatus::High => &self.high,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        for element in &assessment.elements {
            self.element_counts
                .entry(*element)
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(1, Ordering::Relaxed);
        }

        if assessment.status == RiskStatus::Safe {
            return;
        }

        let event = TelemetryEvent::new(location, assessment, latency_us);
        let to_flush = {
            let mut events = self.events_mut();
            events.push(event);
            if events.len() >= self.max_buffer_size {
                Some(std::mem::take(&mut *events))
            } else {
                None
            }
        };

        // Lock released before I/O
        if let Some(events) = to_flush {
            if let Err(e) = self.flush_events(&events) {
                warn!("Telemetry flush failed: {}", e);
            }
        }
    }

    /// Record a report delivery outcome
    pub fn record_report(&self, delivered: bool) {
        if delivered {
            self.reports_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.reports_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Buffered events not yet flushed
    pub fn buffered_events(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        let total_assessed = self.total_assessed.load(Ordering::Relaxed);
        let total_latency = self.total_latency_us.load(Ordering::Relaxed);

        let avg_latency_us = if total_assessed > 0 {
            total_latency as f64 / total_assessed as f64
        } else {
            0.0
        };

        let elements_detected = self
            .element_counts
            .iter()
            .map(|entry| {
                (
                    entry.key().name().to_string(),
                    entry.value().load(Ordering::Relaxed),
                )
            })
            .collect();

        TelemetryStats {
            total_assessed,
            safe: self.safe.load(Ordering::Relaxed),
            moderate: self.moderate.load(Ordering::Relaxed),
            high: self.high.load(Ordering::Relaxed),
            elements_detected,
            reports_sent: self.reports_sent.load(Ordering::Relaxed),
            reports_failed: self.reports_failed.load(Ordering::Relaxed),
            avg_latency_us,
            period_start: self.session_start,
            period_end: current_timestamp(),
        }
    }

    /// Export current stats to a JSON file, flushing buffered events too
    pub fn export_stats_json(&self) -> Result<PathBuf, std::io::Error> {
        fs::create_dir_all(&self.export_dir)?;

        let pending = std::mem::take(&mut *self.events_mut());
        self.flush_events(&pending)?;

        let stats = self.get_stats();
        let filename = format!("stats_{}.json", current_timestamp());
        let path = self.export_dir.join(filename);

        fs::write(&path, stats.to_json())?;

        Ok(path)
    }

    /// Export stats to CSV (append mode)
    pub fn export_stats_csv(&self) -> Result<PathBuf, std::io::Error> {
        fs::create_dir_all(&self.export_dir)?;
        let stats = self.get_stats();
        let path = self.export_dir.join("telemetry_history.csv");

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

        // Write header if new file
        if file.metadata()?.len() == 0 {
            writeln!(file, "period_start,period_end,total_assessed,safe,moderate,high,reports_sent,reports_failed,avg_latency_us")?;
        }

        write!(file, "{}", stats.to_csv_row())?;

        Ok(path)
    }

    /// Flush events to disk
    fn flush_events(&self, events: &[TelemetryEvent]) -> Result<(), std::io::Error> {
        if events.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(&self.export_dir)?;
        let filename = format!("events_{}.jsonl", current_timestamp());
        let path = self.export_dir.join(filename);

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

        for event in events {
            if let Ok(json) = serde_json::to_string(event) {
                writeln!(file, "{}", json)?;
            }
        }

        Ok(())
    }

    /// Event buffer; a panicked writer leaves plain data behind
    fn events_mut(&self) -> RwLockWriteGuard<'_, Vec<TelemetryEvent>> {
        self.events
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::classify;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("water_sentry_{}_{}", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_collector_counts_by_status() {
        let collector = TelemetryCollector::with_config(scratch_dir("counts"), 100);

        collector.record_assessment("a", &classify(7.0, 100.0, 50.0, 10.0).unwrap(), 10);
        collector.record_assessment("b", &classify(6.0, 300.0, 250.0, 20.0).unwrap(), 20);
        collector.record_assessment("c", &classify(9.0, 1000.0, 300.0, 100.0).unwrap(), 30);

        let stats = collector.get_stats();
        assert_eq!(stats.total_assessed, 3);
        assert_eq!((stats.safe, stats.moderate, stats.high), (1, 1, 1));
        assert_eq!(stats.elements_detected.get("Uranium"), Some(&2));
        assert_eq!(stats.avg_latency_us, 20.0);
        assert_eq!(collector.buffered_events(), 2);
    }

    #[test]
    fn test_buffer_flushes_when_full() {
        let dir = scratch_dir("flush");
        let collector = TelemetryCollector::with_config(dir.clone(), 2);
        let high = classify(9.0, 1000.0, 300.0, 100.0).unwrap();

        collector.record_assessment("x", &high, 1);
        collector.record_assessment("x", &high, 1);

        assert_eq!(collector.buffered_events(), 0);
        let files = fs::read_dir(&dir).unwrap().count();
        assert_eq!(files, 1);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_report_counters() {
        let collector = TelemetryCollector::with_config(scratch_dir("reports"), 10);
        collector.record_report(true);
        collector.record_report(false);
        collector.record_report(true);

        let stats = collector.get_stats();
        assert_eq!(stats.reports_sent, 2);
        assert_eq!(stats.reports_failed, 1);
    }

    #[test]
    fn test_element_counts_across_threads() {
        let collector = std::sync::Arc::new(TelemetryCollector::with_config(scratch_dir("threads"), 10_000));
        let uranium = classify(6.0, 300.0, 250.0, 20.0).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let collector = collector.clone();
                let assessment = uranium.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        collector.record_assessment("t", &assessment, 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = collector.get_stats();
        assert_eq!(stats.total_assessed, 1000);
        assert_eq!(stats.elements_detected.get("Uranium"), Some(&1000));
    }

    #[test]
    fn test_export_csv_appends_rows() {
        let dir = scratch_dir("csv");
        let collector = TelemetryCollector::with_config(dir.clone(), 10);
        collector.record_assessment("x", &classify(7.0, 100.0, 50.0, 10.0).unwrap(), 5);

        let path = collector.export_stats_csv().unwrap();
        collector.export_stats_csv().unwrap();

        let csv = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("period_start,period_end,total_assessed"));
        assert_eq!(lines[1].split(',').nth(2), Some("1"));
        assert_eq!(lines[1].split(',').nth(3), Some("1"));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_export_json() {
        let dir = scratch_dir("export");
        let collector = TelemetryCollector::with_config(dir.clone(), 10);
        collector.record_assessment("x", &classify(9.0, 1000.0, 300.0, 100.0).unwrap(), 5);

        let path = collector.export_stats_json().unwrap();
        let json = fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"total_assessed\": 1"));
        assert_eq!(collector.buffered_events(), 0);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_summary_text() {
        let stats = TelemetryStats {
            total_assessed: 10,
            safe: 6,
            moderate: 3,
            high: 1,
            reports_sent: 2,
            ..Default::default()
        };
        let summary = stats.summary();
        assert!(summary.contains("Assessed: 10"));
        assert!(summary.contains("elevated 40.0%"));
        assert!(summary.contains("Elements: none"));
    }
}
