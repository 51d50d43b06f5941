#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde_json::json;

use super::table::{Table, TableSet, CATEGORIES, CONTENTS, PROFILES, VIEW_HISTORY};
use crate::types::to_record;

/// Identity used by every emulated sign-in.
pub const DEMO_USER_ID: &str = "demo-user-id";

const DEFAULT_CATEGORIES: [(&str, &str); 4] = [
    ("cat1", "Computers"),
    ("cat2", "English"),
    ("cat3", "Mathematics"),
    ("cat4", "Art"),
];

/// Dataset used when no usable snapshot exists.
pub fn default_tables() -> TableSet {
    let mut tables = TableSet::new();
    tables.insert(CONTENTS.to_string(), Table::List(Vec::new()));

    let mut profiles = BTreeMap::new();
    profiles.insert(
        DEMO_USER_ID.to_string(),
        to_record(json!({ "full_name": "Demo User", "role": "learner" })),
    );
    tables.insert(PROFILES.to_string(), Table::Map(profiles));

    let categories = DEFAULT_CATEGORIES
        .iter()
        .map(|(id, name)| to_record(json!({ "id": id, "name": name })))
        .collect();
    tables.insert(CATEGORIES.to_string(), Table::List(categories));

    tables.insert(VIEW_HISTORY.to_string(), Table::List(Vec::new()));
    tables
}
