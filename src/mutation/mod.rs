#![forbid(unsafe_code)]

//! Write path: insert, update, delete and upsert.
//!
//! Every entry point mutates the live tables inside one critical section and
//! then persists exactly once. None of them reports "not found"; a mutation
//! that matches nothing succeeds with a count of zero.

use std::future::{ready, IntoFuture, Ready};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::query::Response;
use crate::storage::table::{id_key, Table, TableKind, TableSet};
use crate::storage::RecordStore;
use crate::types::{Record, Value};

/// Insert-time join enrichment.
pub mod enrich;
/// Identifier and timestamp generation.
pub mod ids;

pub use enrich::{EnrichRule, Enrichment};

/// Result of an update or delete; `data` is the number of rows affected and is
/// informational only.
pub type MutationResponse = Response<usize>;

// Fields fixed at insertion time.
const IMMUTABLE_FIELDS: [&str; 2] = ["id", "created_at"];

/// The row an insert produced. Only `select().single()` is offered on it; the
/// general query chain is not available after an insert.
#[derive(Clone, Debug)]
pub struct InsertResult {
    record: Record,
}

impl InsertResult {
    /// Narrow chain over the inserted row.
    pub fn select(self) -> InsertSelect {
        InsertSelect {
            record: self.record,
        }
    }

    /// The inserted, enriched row.
    pub fn data(&self) -> &Record {
        &self.record
    }

    /// Consumes the result, returning the row.
    pub fn into_record(self) -> Record {
        self.record
    }
}

impl IntoFuture for InsertResult {
    type Output = Response<Option<Record>>;
    type IntoFuture = Ready<Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        ready(Response::ok(Some(self.record)))
    }
}

/// `insert(..).select()`.
#[derive(Clone, Debug)]
pub struct InsertSelect {
    record: Record,
}

impl InsertSelect {
    /// The inserted row in the shape a single-row query returns.
    pub fn single(self) -> Response<Option<Record>> {
        Response::ok(Some(self.record))
    }
}

/// Pending update; runs when a filter is supplied.
pub struct UpdateBuilder {
    store: Arc<RecordStore>,
    table: String,
    patch: Record,
}

impl UpdateBuilder {
    pub(crate) fn new(store: Arc<RecordStore>, table: String, mut patch: Record) -> Self {
        for field in IMMUTABLE_FIELDS {
            if patch.remove(field).is_some() {
                debug!(%table, field, "mutation.update.immutable_field_dropped");
            }
        }
        Self {
            store,
            table,
            patch,
        }
    }

    /// Shallow-merges the patch into every row whose `column` equals `value`.
    pub fn eq<V: Into<Value>>(self, column: &str, value: V) -> MutationResponse {
        let value = value.into();
        let changed = self.store.mutate(|tables| {
            tables
                .get_mut(&self.table)
                .map(|table| table.update_where(column, &value, &self.patch))
                .unwrap_or(0)
        });
        debug!(table = %self.table, %column, changed, "mutation.update");
        Response::ok(changed)
    }
}

/// Pending delete; runs when a filter is supplied.
pub struct DeleteBuilder {
    store: Arc<RecordStore>,
    table: String,
}

impl DeleteBuilder {
    pub(crate) fn new(store: Arc<RecordStore>, table: String) -> Self {
        Self { store, table }
    }

    /// Removes every row whose `column` equals `value`.
    pub fn eq<V: Into<Value>>(self, column: &str, value: V) -> MutationResponse {
        let value = value.into();
        let removed = self.store.mutate(|tables| {
            tables
                .get_mut(&self.table)
                .map(|table| table.delete_where(column, &value))
                .unwrap_or(0)
        });
        debug!(table = %self.table, %column, removed, "mutation.delete");
        Response::ok(removed)
    }
}

/// Creates a row in `table`: fresh id and timestamp, caller fields over those
/// defaults, enrichment, then prepend. Unknown tables are created.
pub(crate) fn insert(
    store: &RecordStore,
    enrichment: &Enrichment,
    table: &str,
    record: Record,
) -> InsertResult {
    let row = store.mutate(|tables| insert_row(tables, enrichment, table, record));
    debug!(%table, id = ?row.get("id"), "mutation.insert");
    InsertResult { record: row }
}

/// Merges into the row with the same `id`, or inserts when there is none.
pub(crate) fn upsert(
    store: &RecordStore,
    enrichment: &Enrichment,
    table: &str,
    mut record: Record,
) -> InsertResult {
    let row = store.mutate(|tables| {
        let existing = record
            .get("id")
            .map(id_key)
            .filter(|id| tables.get(table).is_some_and(|t| t.contains_id(id)));
        let Some(id) = existing else {
            return insert_row(tables, enrichment, table, record);
        };
        record.remove("created_at");
        let Some(target) = tables.get_mut(table) else {
            return record;
        };
        target.merge_by_id(&id, &record);
        target.find_by_id(&id).unwrap_or(record)
    });
    debug!(%table, id = ?row.get("id"), "mutation.upsert");
    InsertResult { record: row }
}

fn insert_row(tables: &mut TableSet, enrichment: &Enrichment, table: &str, record: Record) -> Record {
    let taken = |id: &str| tables.get(table).is_some_and(|t| t.contains_id(id));
    let mut rng = rand::thread_rng();

    let mut row = Record::new();
    row.insert("id".into(), Value::String(ids::fresh_id(&mut rng, &taken)));
    row.insert("created_at".into(), Value::String(ids::now_timestamp()));
    for (field, value) in record {
        row.insert(field, value);
    }
    let duplicate = row.get("id").map(id_key).filter(|id| taken(id));
    if let Some(id) = duplicate {
        warn!(%table, %id, "mutation.insert.duplicate_id; assigning a fresh id");
        row.insert("id".into(), Value::String(ids::fresh_id(&mut rng, &taken)));
    }
    enrichment.apply(tables, table, &mut row);

    let key = row.get("id").map(id_key).unwrap_or_default();
    tables
        .entry(table.to_string())
        .or_insert_with(|| Table::empty(TableKind::for_name(table)))
        .insert_front(&key, row.clone());
    row
}
