#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use super::schema;
use super::slot::DurableSlot;
use super::table::TableSet;
use crate::types::{Result, Value};

/// Counters describing persistence activity.
#[derive(Default)]
pub struct PersistMetrics {
    saves: AtomicU64,
    save_failures: AtomicU64,
    loads: AtomicU64,
    load_fallbacks: AtomicU64,
}

/// Point-in-time copy of [`PersistMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PersistMetricsSnapshot {
    /// Save attempts, successful or not.
    pub saves: u64,
    /// Saves the slot rejected.
    pub save_failures: u64,
    /// Load attempts.
    pub loads: u64,
    /// Loads that found nothing usable.
    pub load_fallbacks: u64,
}

impl PersistMetrics {
    /// Reads all counters.
    pub fn snapshot(&self) -> PersistMetricsSnapshot {
        PersistMetricsSnapshot {
            saves: self.saves.load(Ordering::Relaxed),
            save_failures: self.save_failures.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_fallbacks: self.load_fallbacks.load(Ordering::Relaxed),
        }
    }

    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Writes and reads the table set under one fixed key.
///
/// Failures never escape: a rejected save leaves memory as the only copy of
/// the data, and an unusable blob reads as "no snapshot".
pub struct Persistence {
    slot: Arc<dyn DurableSlot>,
    key: String,
    metrics: PersistMetrics,
}

impl Persistence {
    /// Binds the adapter to `slot` under `key`.
    pub fn new(slot: Arc<dyn DurableSlot>, key: impl Into<String>) -> Self {
        Self {
            slot,
            key: key.into(),
            metrics: PersistMetrics::default(),
        }
    }

    /// Key the snapshot is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Serializes and stores `tables`; errors are logged and swallowed.
    pub fn save(&self, tables: &TableSet) {
        PersistMetrics::inc(&self.metrics.saves);
        if let Err(err) = self.try_save(tables) {
            PersistMetrics::inc(&self.metrics.save_failures);
            warn!(
                key = %self.key,
                error = %err,
                "store.persist.save_failed; keeping data in memory for this process"
            );
        }
    }

    /// Reads the stored snapshot, or `None` when absent or unusable.
    pub fn load(&self) -> Option<TableSet> {
        PersistMetrics::inc(&self.metrics.loads);
        let loaded = self.try_load();
        if loaded.is_none() {
            PersistMetrics::inc(&self.metrics.load_fallbacks);
        }
        loaded
    }

    /// Current counters.
    pub fn metrics(&self) -> PersistMetricsSnapshot {
        self.metrics.snapshot()
    }

    fn try_save(&self, tables: &TableSet) -> Result<()> {
        let encoded = serde_json::to_string(tables)?;
        self.slot.set(&self.key, &encoded)?;
        debug!(key = %self.key, bytes = encoded.len(), "store.persist.saved");
        Ok(())
    }

    fn try_load(&self) -> Option<TableSet> {
        let raw = match self.slot.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "store.persist.load_missing");
                return None;
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "store.persist.load_failed");
                return None;
            }
        };
        let blob: Value = match serde_json::from_str(&raw) {
            Ok(blob) => blob,
            Err(err) => {
                warn!(key = %self.key, error = %err, "store.persist.load_malformed");
                return None;
            }
        };
        match schema::validate(blob) {
            Ok(tables) => Some(tables),
            Err(err) => {
                warn!(key = %self.key, error = %err, "store.persist.load_schema_mismatch");
                None
            }
        }
    }
}
