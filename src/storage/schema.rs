#![forbid(unsafe_code)]

//! Shape validation for snapshots read back from a durable slot.

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use super::table::{id_key, Table, TableKind, TableSet, CATEGORIES, CONTENTS, PROFILES, VIEW_HISTORY};
use crate::types::{Record, Value};

/// Reasons a stored blob is not accepted as a snapshot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Top level is not a JSON object.
    #[error("snapshot root must be an object")]
    RootNotObject,
    /// A table is neither an array of objects nor an object of objects.
    #[error("table '{table}' must hold objects")]
    BadTableShape {
        /// Offending table.
        table: String,
    },
    /// A well-known table has the wrong storage shape.
    #[error("table '{table}' must be {expected:?}-valued")]
    WrongKind {
        /// Offending table.
        table: String,
        /// Shape the table must have.
        expected: TableKind,
    },
    /// Two rows in one list table share an id.
    #[error("table '{table}' repeats id '{id}'")]
    DuplicateId {
        /// Offending table.
        table: String,
        /// Repeated id, in canonical text form.
        id: String,
    },
}

/// Converts a parsed blob into a table set, rejecting foreign shapes.
///
/// Well-known tables absent from the blob are created empty.
pub fn validate(blob: Value) -> Result<TableSet, SchemaError> {
    let Value::Object(root) = blob else {
        return Err(SchemaError::RootNotObject);
    };
    let mut tables = TableSet::new();
    for (name, value) in root {
        let table = convert_table(&name, value)?;
        let expected = TableKind::for_name(&name);
        if table.kind() != expected && is_well_known(&name) {
            return Err(SchemaError::WrongKind {
                table: name,
                expected,
            });
        }
        check_unique_ids(&name, &table)?;
        tables.insert(name, table);
    }
    for name in [CONTENTS, PROFILES, CATEGORIES, VIEW_HISTORY] {
        tables
            .entry(name.to_string())
            .or_insert_with(|| Table::empty(TableKind::for_name(name)));
    }
    Ok(tables)
}

fn is_well_known(name: &str) -> bool {
    matches!(name, CONTENTS | PROFILES | CATEGORIES | VIEW_HISTORY)
}

fn convert_table(name: &str, value: Value) -> Result<Table, SchemaError> {
    let bad = || SchemaError::BadTableShape {
        table: name.to_string(),
    };
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| into_record(item).ok_or_else(bad))
            .collect::<Result<Vec<_>, _>>()
            .map(Table::List),
        Value::Object(entries) => entries
            .into_iter()
            .map(|(key, item)| into_record(item).map(|r| (key, r)).ok_or_else(bad))
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Table::Map),
        _ => Err(bad()),
    }
}

fn into_record(value: Value) -> Option<Record> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn check_unique_ids(name: &str, table: &Table) -> Result<(), SchemaError> {
    let Table::List(rows) = table else {
        return Ok(());
    };
    let mut seen = HashSet::new();
    for id in rows.iter().filter_map(|row| row.get("id")).map(id_key) {
        if seen.contains(&id) {
            return Err(SchemaError::DuplicateId {
                table: name.to_string(),
                id,
            });
        }
        seen.insert(id);
    }
    Ok(())
}
