#![forbid(unsafe_code)]

//! Entry point mirroring the remote client surface: `from(table)` and `auth()`.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{BackendMode, EmulatorOptions, StorageTarget};
use crate::mutation::{self, DeleteBuilder, Enrichment, InsertResult, UpdateBuilder};
use crate::query::{ChainMode, QueryBuilder};
use crate::session::SessionBus;
use crate::storage::{DurableSlot, FileSlot, MemorySlot, Persistence, RecordStore};
use crate::types::{EmuError, Record, Result};

/// In-process stand-in for the hosted backend. Cheap to clone; clones share
/// the same tables and listeners.
#[derive(Clone)]
pub struct LocalClient {
    store: Arc<RecordStore>,
    auth: SessionBus,
    chain_mode: ChainMode,
    enrichment: Arc<Enrichment>,
}

impl LocalClient {
    /// Opens the emulator unless a live backend is configured.
    pub fn connect(options: &EmulatorOptions) -> Result<Self> {
        match options.backend_mode() {
            BackendMode::Remote(url) => Err(EmuError::RemoteBackendConfigured { url }),
            BackendMode::Local => Ok(Self::open(options)),
        }
    }

    /// Opens the emulator with `options`, ignoring any backend URL.
    ///
    /// An unusable snapshot directory degrades to in-memory storage.
    pub fn open(options: &EmulatorOptions) -> Self {
        let slot: Arc<dyn DurableSlot> = match &options.storage {
            StorageTarget::Memory { capacity: None } => Arc::new(MemorySlot::new()),
            StorageTarget::Memory {
                capacity: Some(capacity),
            } => Arc::new(MemorySlot::with_capacity(*capacity)),
            StorageTarget::Directory(dir) => match FileSlot::open(dir) {
                Ok(slot) => Arc::new(slot),
                Err(err) => {
                    warn!(dir = %dir.display(), error = %err, "client.open.slot_unavailable; using memory");
                    Arc::new(MemorySlot::new())
                }
            },
        };
        Self::with_slot(slot, &options.storage_key, options.chain_mode)
    }

    /// Opens the emulator over an explicit slot.
    pub fn with_slot(slot: Arc<dyn DurableSlot>, key: &str, chain_mode: ChainMode) -> Self {
        let store = Arc::new(RecordStore::open(Persistence::new(slot, key)));
        info!(key, ?chain_mode, "client.open");
        Self {
            auth: SessionBus::new(store.clone()),
            store,
            chain_mode,
            enrichment: Arc::new(Enrichment::default()),
        }
    }

    /// Replaces the insert-time enrichment rules.
    pub fn with_enrichment(mut self, enrichment: Enrichment) -> Self {
        self.enrichment = Arc::new(enrichment);
        self
    }

    /// Handle on one table.
    pub fn from(&self, table: &str) -> TableRef {
        TableRef {
            store: self.store.clone(),
            name: table.to_string(),
            chain_mode: self.chain_mode,
            enrichment: self.enrichment.clone(),
        }
    }

    /// Alias of [`LocalClient::from`].
    pub fn table(&self, table: &str) -> TableRef {
        self.from(table)
    }

    /// Authentication surface.
    pub fn auth(&self) -> &SessionBus {
        &self.auth
    }

    /// Underlying store, for inspection.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Semantics used for `not` / `order`.
    pub fn chain_mode(&self) -> ChainMode {
        self.chain_mode
    }
}

/// Read and write entry points for one table.
pub struct TableRef {
    store: Arc<RecordStore>,
    name: String,
    chain_mode: ChainMode,
    enrichment: Arc<Enrichment>,
}

impl TableRef {
    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts a query over a snapshot of the table.
    pub fn select(&self, columns: &str) -> QueryBuilder {
        QueryBuilder::new(self.store.clone(), self.name.clone(), self.chain_mode).select(columns)
    }

    /// Inserts one row.
    pub fn insert(&self, record: Record) -> InsertResult {
        mutation::insert(&self.store, &self.enrichment, &self.name, record)
    }

    /// Inserts or merges one row keyed by `id`.
    pub fn upsert(&self, record: Record) -> InsertResult {
        mutation::upsert(&self.store, &self.enrichment, &self.name, record)
    }

    /// Prepares a shallow-merge update; call `eq` to run it.
    pub fn update(&self, patch: Record) -> UpdateBuilder {
        UpdateBuilder::new(self.store.clone(), self.name.clone(), patch)
    }

    /// Prepares a delete; call `eq` to run it.
    pub fn delete(&self) -> DeleteBuilder {
        DeleteBuilder::new(self.store.clone(), self.name.clone())
    }
}
