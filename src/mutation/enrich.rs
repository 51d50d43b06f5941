#![forbid(unsafe_code)]

//! Insert-time join enrichment.
//!
//! Foreign-key-like fields are resolved once, when the row is created, into a
//! small denormalized object (`categories: {name}`) so read paths written for a
//! joining backend find the label in place. Later edits to the referenced row
//! are not propagated.

use serde_json::json;

use crate::storage::table::{TableSet, CATEGORIES, CONTENTS, PROFILES};
use crate::types::{Record, Value};

/// Resolves `source_field` against `lookup_table` and attaches
/// `{label_field: <label>}` under `target_field`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnrichRule {
    /// Field holding the referenced id, e.g. `category_id`.
    pub source_field: String,
    /// Field the label object is written to, e.g. `categories`.
    pub target_field: String,
    /// Table the id is looked up in.
    pub lookup_table: String,
    /// Field copied from the referenced row, e.g. `name`.
    pub label_field: String,
    /// Label used when the reference is null or dangling.
    pub fallback: String,
}

impl EnrichRule {
    /// Builds a rule.
    pub fn new(
        source_field: &str,
        target_field: &str,
        lookup_table: &str,
        label_field: &str,
        fallback: &str,
    ) -> Self {
        Self {
            source_field: source_field.to_string(),
            target_field: target_field.to_string(),
            lookup_table: lookup_table.to_string(),
            label_field: label_field.to_string(),
            fallback: fallback.to_string(),
        }
    }
}

/// Enrichment applied to every insert.
#[derive(Clone, Debug)]
pub struct Enrichment {
    rules: Vec<EnrichRule>,
    // (table, field) pairs that start out as an empty relation list.
    empty_relations: Vec<(String, String)>,
}

impl Default for Enrichment {
    fn default() -> Self {
        Self {
            rules: vec![
                EnrichRule::new("category_id", "categories", CATEGORIES, "name", "General"),
                EnrichRule::new("creator_id", "profiles", PROFILES, "full_name", "You (Demo User)"),
            ],
            empty_relations: vec![(CONTENTS.to_string(), "content_tags".to_string())],
        }
    }
}

impl Enrichment {
    /// No enrichment at all.
    pub fn none() -> Self {
        Self {
            rules: Vec::new(),
            empty_relations: Vec::new(),
        }
    }

    /// Adds a lookup rule.
    pub fn with_rule(mut self, rule: EnrichRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds an empty relation list attached to inserts into `table`.
    pub fn with_empty_relation(mut self, table: &str, field: &str) -> Self {
        self.empty_relations
            .push((table.to_string(), field.to_string()));
        self
    }

    /// Lookup rules in application order.
    pub fn rules(&self) -> &[EnrichRule] {
        &self.rules
    }

    /// Attaches labels to `row` (destined for `table`), overriding any
    /// caller-supplied value in the target fields.
    pub fn apply(&self, tables: &TableSet, table: &str, row: &mut Record) {
        for rule in &self.rules {
            let Some(reference) = row.get(&rule.source_field) else {
                continue;
            };
            let label = reference
                .as_str()
                .and_then(|id| tables.get(&rule.lookup_table)?.find_by_id(id))
                .and_then(|target| target.get(&rule.label_field).cloned())
                .unwrap_or_else(|| Value::String(rule.fallback.clone()));
            let mut wrapped = Record::new();
            wrapped.insert(rule.label_field.clone(), label);
            row.insert(rule.target_field.clone(), Value::Object(wrapped));
        }
        for (target_table, field) in &self.empty_relations {
            if target_table == table {
                row.insert(field.clone(), json!([]));
            }
        }
    }
}
