#![forbid(unsafe_code)]

//! Record store: the authoritative in-memory tables and their persistence.
//!
//! Reads always receive deep copies; writes run inside one critical section
//! that ends with exactly one snapshot save.

use parking_lot::Mutex;
use tracing::info;

use crate::types::Record;

/// Snapshot persistence with failure absorption.
pub mod persist;
/// Validation of stored snapshots.
pub mod schema;
/// Default dataset.
pub mod seed;
/// Durable key-value media.
pub mod slot;
/// Table shapes and row-level operations.
pub mod table;

pub use persist::{PersistMetricsSnapshot, Persistence};
pub use slot::{DurableSlot, FileSlot, MemorySlot};
pub use table::{Table, TableKind, TableSet};

/// Owner of every table in the emulated backend.
pub struct RecordStore {
    tables: Mutex<TableSet>,
    persistence: Persistence,
}

impl RecordStore {
    /// Seeds the store from `persistence`, falling back to the default
    /// dataset when nothing usable is stored. Never fails.
    pub fn open(persistence: Persistence) -> Self {
        let tables = match persistence.load() {
            Some(tables) => {
                info!(key = persistence.key(), tables = tables.len(), "store.open.snapshot");
                tables
            }
            None => {
                info!(key = persistence.key(), "store.open.defaults");
                seed::default_tables()
            }
        };
        Self {
            tables: Mutex::new(tables),
            persistence,
        }
    }

    /// Deep copy of `table` as rows; unknown tables read as empty.
    pub fn read(&self, table: &str) -> Vec<Record> {
        self.tables
            .lock()
            .get(table)
            .map(Table::rows)
            .unwrap_or_default()
    }

    /// Copy of the row with this `id`, if present.
    pub fn lookup(&self, table: &str, id: &str) -> Option<Record> {
        self.tables.lock().get(table)?.find_by_id(id)
    }

    /// Shape of `table`, if it exists.
    pub fn kind(&self, table: &str) -> Option<TableKind> {
        self.tables.lock().get(table).map(Table::kind)
    }

    /// Names of every table currently held.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.lock().keys().cloned().collect()
    }

    /// Deep copy of every table.
    pub fn snapshot(&self) -> TableSet {
        self.tables.lock().clone()
    }

    /// Persistence counters.
    pub fn persistence_metrics(&self) -> PersistMetricsSnapshot {
        self.persistence.metrics()
    }

    /// Runs `apply` against the live tables, then saves once.
    ///
    /// Memory is updated before the save is attempted and is never rolled back.
    pub(crate) fn mutate<R>(&self, apply: impl FnOnce(&mut TableSet) -> R) -> R {
        let mut tables = self.tables.lock();
        let out = apply(&mut tables);
        self.persistence.save(&tables);
        out
    }
}
