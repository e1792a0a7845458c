//! In-Memory Reading Store
//!
//! Thread-safe storage for classified readings. Owned by the application
//! state and injected into handlers; there is no process-wide variable.
//!
//! Features:
//! - Single latest slot (atomic replace behind a lock)
//! - Latest record per location (normalized: trimmed, lowercase)
//! - Bounded FIFO history, oldest evicted past capacity
//! - Nothing survives a restart

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::models::types::ReadingRecord;
use crate::utils::constants::DEFAULT_HISTORY_CAPACITY;

#[derive(Clone)]
pub struct ReadingStore {
    latest: Arc<RwLock<Option<ReadingRecord>>>,
    /// normalized location -> latest record there
    by_location: Arc<DashMap<String, ReadingRecord>>,
    history: Arc<RwLock<VecDeque<ReadingRecord>>>,
    capacity: usize,
    total_recorded: Arc<AtomicU64>,
    evicted: Arc<AtomicU64>,
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadingStore {
    /// Store with the default history capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Store keeping at most `capacity` records in history (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            latest: Arc::new(RwLock::new(None)),
            by_location: Arc::new(DashMap::new()),
            history: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            total_recorded: Arc::new(AtomicU64::new(0)),
            evicted: Arc::new(AtomicU64::new(0)),
        }
    }

    #[inline]
    fn normalize_location(location: &str) -> String {
        location.trim().to_lowercase()
    }

    /// Record a classified reading
    ///
    /// History, the per-location index and the latest slot are updated while
    /// the history write lock is held, so readers never see them disagree.
    pub fn record(&self, record: ReadingRecord) {
        let key = Self::normalize_location(&record.reading.location);
        let id = record.id;

        let mut history = self.history.write().unwrap_or_else(|p| p.into_inner());
        while history.len() >= self.capacity {
            if let Some(old) = history.pop_front() {
                self.evicted.fetch_add(1, Ordering::Relaxed);
                debug!("🗑️ HISTORY EVICT: {} ({})", old.id, old.reading.location);
            }
        }
        history.push_back(record.clone());
        self.by_location.insert(key, record.clone());
        *self.latest.write().unwrap_or_else(|p| p.into_inner()) = Some(record);
        drop(history);

        self.total_recorded.fetch_add(1, Ordering::Relaxed);
        debug!("💾 STORE SET: {}", id);
    }

    /// Most recent record overall
    pub fn latest(&self) -> Option<ReadingRecord> {
        self.latest.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Most recent record for a location (case-insensitive)
    pub fn latest_for(&self, location: &str) -> Option<ReadingRecord> {
        let key = Self::normalize_location(location);
        self.by_location.get(&key).map(|entry| entry.value().clone())
    }

    /// Up to `limit` records, newest first
    pub fn recent(&self, limit: usize) -> Vec<ReadingRecord> {
        let history = self.history.read().unwrap_or_else(|p| p.into_inner());
        history.iter().rev().take(limit).cloned().collect()
    }

    /// Records currently held in history
    pub fn len(&self) -> usize {
        self.history.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop everything
    pub fn clear(&self) {
        let mut history = self.history.write().unwrap_or_else(|p| p.into_inner());
        history.clear();
        self.by_location.clear();
        *self.latest.write().unwrap_or_else(|p| p.into_inner()) = None;
        drop(history);
        info!("🗑️ STORE CLEARED");
    }

    /// Store statistics for monitoring
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            entries: self.len(),
            capacity: self.capacity,
            locations: self.by_location.len(),
            total_recorded: self.total_recorded.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}

/// Store statistics for monitoring
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub entries: usize,
    pub capacity: usize,
    pub locations: usize,
    pub total_recorded: u64,
    pub evicted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::classify;
    use crate::models::types::Reading;

    fn record_at(location: &str, tds: f64) -> ReadingRecord {
        let reading = Reading::new(location, 7.0, tds, 100.0, 10.0);
        let assessment = classify(reading.ph, reading.tds, reading.hardness, reading.nitrate).unwrap();
        ReadingRecord::new(reading, assessment)
    }

    #[test]
    fn test_empty_store() {
        let store = ReadingStore::new();
        assert!(store.latest().is_none());
        assert!(store.is_empty());
        assert!(store.recent(10).is_empty());
    }

    #[test]
    fn test_latest_overwritten() {
        let store = ReadingStore::new();
        store.record(record_at("well-a", 100.0));
        store.record(record_at("well-b", 200.0));

        let latest = store.latest().unwrap();
        assert_eq!(latest.reading.location, "well-b");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_location_lookup_normalized() {
        let store = ReadingStore::new();
        store.record(record_at("North Well", 100.0));
        store.record(record_at("south well", 200.0));

        let north = store.latest_for("  north WELL ").unwrap();
        assert_eq!(north.reading.tds, 100.0);
        assert!(store.latest_for("east well").is_none());
        assert_eq!(store.stats().locations, 2);
    }

    #[test]
    fn test_history_evicts_oldest() {
        let store = ReadingStore::with_capacity(3);
        for i in 0..5 {
            store.record(record_at("tap", i as f64));
        }

        let recent = store.recent(10);
        assert_eq!(recent.len(), 3);
        let tds: Vec<f64> = recent.iter().map(|r| r.reading.tds).collect();
        assert_eq!(tds, vec![4.0, 3.0, 2.0]);

        let stats = store.stats();
        assert_eq!(stats.total_recorded, 5);
        assert_eq!(stats.evicted, 2);
        assert_eq!(stats.entries, 3);
    }

    #[test]
    fn test_recent_limit() {
        let store = ReadingStore::new();
        for i in 0..4 {
            store.record(record_at("tap", i as f64));
        }
        assert_eq!(store.recent(2).len(), 2);
        assert_eq!(store.recent(2)[0].reading.tds, 3.0);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let store = ReadingStore::with_capacity(0);
        assert_eq!(store.capacity(), 1);
        store.record(record_at("tap", 1.0));
        store.record(record_at("tap", 2.0));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clear() {
        let store = ReadingStore::new();
        store.record(record_at("tap", 1.0));
        store.clear();
        assert!(store.latest().is_none());
        assert!(store.latest_for("tap").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_writers() {
        let store = ReadingStore::with_capacity(50);
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store.record(record_at(&format!("site-{}", t), i as f64));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let stats = store.stats();
        assert_eq!(stats.total_recorded, 200);
        assert_eq!(stats.entries, 50);
        assert_eq!(stats.locations, 8);
    }

    #[test]
    fn test_concurrent_writers_keep_latest_in_step() {
        for _ in 0..200 {
            let store = ReadingStore::with_capacity(16);
            let handles: Vec<_> = (0..8)
                .map(|t| {
                    let store = store.clone();
                    std::thread::spawn(move || {
                        for i in 0..20 {
                            store.record(record_at("same", (t * 100 + i) as f64));
                        }
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }

            let newest = store.recent(1)[0].id;
            assert_eq!(store.latest().unwrap().id, newest);
            assert_eq!(store.latest_for("same").unwrap().id, newest);
        }
    }
}
