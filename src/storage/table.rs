#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{field_matches, Record, Value};

/// Name of the one map-valued table.
pub const PROFILES: &str = "profiles";
/// Learning content, newest first.
pub const CONTENTS: &str = "contents";
/// Content categories referenced by `category_id`.
pub const CATEGORIES: &str = "categories";
/// Per-user viewing history.
pub const VIEW_HISTORY: &str = "view_history";

/// Storage shape of a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableKind {
    /// Ordered sequence, newest insertion first.
    List,
    /// Records keyed by identifier.
    Map,
}

impl TableKind {
    /// Shape a table with this name takes when it is first created.
    pub fn for_name(name: &str) -> Self {
        if name == PROFILES {
            TableKind::Map
        } else {
            TableKind::List
        }
    }
}

/// A named collection inside the record store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Table {
    /// List-valued table.
    List(Vec<Record>),
    /// Map-valued table.
    Map(BTreeMap<String, Record>),
}

/// Complete set of tables, keyed by name.
pub type TableSet = BTreeMap<String, Table>;

impl Table {
    /// Creates an empty table of the given shape.
    pub fn empty(kind: TableKind) -> Self {
        match kind {
            TableKind::List => Table::List(Vec::new()),
            TableKind::Map => Table::Map(BTreeMap::new()),
        }
    }

    /// Shape of this table.
    pub fn kind(&self) -> TableKind {
        match self {
            Table::List(_) => TableKind::List,
            Table::Map(_) => TableKind::Map,
        }
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        match self {
            Table::List(rows) => rows.len(),
            Table::Map(rows) => rows.len(),
        }
    }

    /// True when the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deep copy of the table as rows in storage order.
    ///
    /// Map entries are projected with their key injected as `id`.
    pub fn rows(&self) -> Vec<Record> {
        match self {
            Table::List(rows) => rows.clone(),
            Table::Map(rows) => rows
                .iter()
                .map(|(key, record)| project_entry(key, record))
                .collect(),
        }
    }

    /// Row whose `id` equals `id`, as a copy.
    pub fn find_by_id(&self, id: &str) -> Option<Record> {
        match self {
            Table::List(rows) => rows
                .iter()
                .find(|row| has_id(row, id))
                .cloned(),
            Table::Map(rows) => rows.get(id).map(|record| project_entry(id, record)),
        }
    }

    /// True when a row with this `id` exists.
    pub fn contains_id(&self, id: &str) -> bool {
        match self {
            Table::List(rows) => rows
                .iter()
                .any(|row| has_id(row, id)),
            Table::Map(rows) => rows.contains_key(id),
        }
    }

    /// Adds a record; list tables prepend, map tables key it by `id`.
    pub(crate) fn insert_front(&mut self, id: &str, record: Record) {
        match self {
            Table::List(rows) => rows.insert(0, record),
            Table::Map(rows) => {
                rows.insert(id.to_string(), record);
            }
        }
    }

    /// Shallow-merges `patch` into every row whose `column` equals `value`.
    pub(crate) fn update_where(&mut self, column: &str, value: &Value, patch: &Record) -> usize {
        let mut changed = 0;
        match self {
            Table::List(rows) => {
                for row in rows.iter_mut().filter(|row| field_matches(row, column, value)) {
                    merge_into(row, patch);
                    changed += 1;
                }
            }
            Table::Map(rows) => {
                for (key, record) in rows.iter_mut() {
                    if field_matches(&project_entry(key, record), column, value) {
                        merge_into(record, patch);
                        changed += 1;
                    }
                }
            }
        }
        changed
    }

    /// Removes every row whose `column` equals `value`.
    pub(crate) fn delete_where(&mut self, column: &str, value: &Value) -> usize {
        let before = self.len();
        match self {
            Table::List(rows) => rows.retain(|row| !field_matches(row, column, value)),
            Table::Map(rows) => {
                rows.retain(|key, record| !field_matches(&project_entry(key, record), column, value))
            }
        }
        before - self.len()
    }

    /// Replaces the row with this `id`, merging over it. Returns false when no
    /// such row exists.
    pub(crate) fn merge_by_id(&mut self, id: &str, patch: &Record) -> bool {
        match self {
            Table::List(rows) => match rows
                .iter_mut()
                .find(|row| has_id(row, id))
            {
                Some(row) => {
                    merge_into(row, patch);
                    true
                }
                None => false,
            },
            Table::Map(rows) => match rows.get_mut(id) {
                Some(record) => {
                    merge_into(record, patch);
                    true
                }
                None => false,
            },
        }
    }
}

/// Canonical text form of an `id` value. Map tables key rows by it, and two
/// ids are the same when their keys are equal, so `5` and `"5"` collide.
pub fn id_key(value: &Value) -> String {
    match value {
        Value::String(id) => id.clone(),
        other => other.to_string(),
    }
}

fn has_id(row: &Record, id: &str) -> bool {
    row.get("id").is_some_and(|value| match value {
        Value::String(text) => text == id,
        other => other.to_string() == id,
    })
}

fn project_entry(key: &str, record: &Record) -> Record {
    let mut row = record.clone();
    row.entry("id")
        .or_insert_with(|| Value::String(key.to_string()));
    row
}

fn merge_into(target: &mut Record, patch: &Record) {
    for (field, value) in patch {
        target.insert(field.clone(), value.clone());
    }
}
