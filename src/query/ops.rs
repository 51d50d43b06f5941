#![forbid(unsafe_code)]

use std::cmp::Ordering;

use tracing::debug;

use crate::types::{field_matches, strict_eq, EmuError, Record, Result, Value};

/// How chain methods the emulation only partially supports behave.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChainMode {
    /// `not` and `order` are identity operations; rows keep storage order.
    #[default]
    Compat,
    /// `not` excludes rows and `order` sorts them.
    Faithful,
}

/// One step of a query chain.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryOp {
    /// Seeds the cursor with a copy of the table. Columns are not projected.
    Select {
        /// Column list as supplied.
        columns: String,
    },
    /// Keeps rows whose field strictly equals `value`.
    Eq {
        /// Field name.
        column: String,
        /// Expected value.
        value: Value,
    },
    /// Excludes rows matching `column <operator> value`.
    Not {
        /// Field name.
        column: String,
        /// Operator name (`eq`, `neq`, `in`, `is`).
        operator: String,
        /// Operand.
        value: Value,
    },
    /// Orders rows by a field.
    Order {
        /// Field name.
        column: String,
        /// Ascending when true.
        ascending: bool,
    },
    /// Keeps the first `n` rows.
    Limit(usize),
    /// Terminal: first row or nothing.
    Single,
}

impl QueryOp {
    /// Short name used in logs and explain output.
    pub fn name(&self) -> &'static str {
        match self {
            QueryOp::Select { .. } => "select",
            QueryOp::Eq { .. } => "eq",
            QueryOp::Not { .. } => "not",
            QueryOp::Order { .. } => "order",
            QueryOp::Limit(_) => "limit",
            QueryOp::Single => "single",
        }
    }

    /// Applies this step to the cursor. `Select` and `Single` are handled by
    /// the builder and leave the cursor untouched here.
    pub(crate) fn apply(&self, rows: &mut Vec<Record>, mode: ChainMode) -> Result<()> {
        match self {
            QueryOp::Select { .. } | QueryOp::Single => {}
            QueryOp::Eq { column, value } => rows.retain(|row| field_matches(row, column, value)),
            QueryOp::Not {
                column,
                operator,
                value,
            } => match mode {
                ChainMode::Compat => {
                    debug!(%column, %operator, "query.not.ignored");
                }
                ChainMode::Faithful => {
                    let predicate = NotPredicate::parse(operator, value)?;
                    rows.retain(|row| !predicate.matches(row.get(column.as_str())));
                }
            },
            QueryOp::Order { column, ascending } => match mode {
                ChainMode::Compat => {
                    debug!(%column, "query.order.storage_order");
                }
                ChainMode::Faithful => {
                    rows.sort_by(|a, b| {
                        order_rows(a.get(column.as_str()), b.get(column.as_str()), *ascending)
                    });
                }
            },
            QueryOp::Limit(n) => rows.truncate(*n),
        }
        Ok(())
    }
}

enum NotPredicate {
    Eq(Value),
    Neq(Value),
    In(Vec<String>),
    Is(Value),
}

impl NotPredicate {
    fn parse(operator: &str, value: &Value) -> Result<Self> {
        match operator {
            "eq" => Ok(NotPredicate::Eq(value.clone())),
            "neq" => Ok(NotPredicate::Neq(value.clone())),
            "in" => Ok(NotPredicate::In(parse_in_list(value))),
            "is" => Ok(NotPredicate::Is(parse_is_operand(value))),
            other => Err(EmuError::UnsupportedOperator {
                operator: other.to_string(),
                context: "not",
            }),
        }
    }

    fn matches(&self, field: Option<&Value>) -> bool {
        match self {
            NotPredicate::Eq(expected) => field.is_some_and(|f| strict_eq(f, expected)),
            NotPredicate::Neq(expected) => field.is_some_and(|f| !strict_eq(f, expected)),
            NotPredicate::In(items) => field.is_some_and(|f| in_list_contains(items, f)),
            NotPredicate::Is(expected) => match field {
                Some(field) => field == expected,
                None => expected.is_null(),
            },
        }
    }
}

/// Accepts either a JSON array or list syntax `(a,b,"c")`.
fn parse_in_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(literal_text).collect(),
        Value::String(text) => text
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .split(',')
            .map(|item| item.trim().trim_matches('"').to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        other => vec![literal_text(other)],
    }
}

fn parse_is_operand(value: &Value) -> Value {
    match value {
        Value::String(text) => match text.as_str() {
            "null" => Value::Null,
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => value.clone(),
        },
        other => other.clone(),
    }
}

fn literal_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn in_list_contains(items: &[String], field: &Value) -> bool {
    match field {
        Value::String(text) => items.iter().any(|item| item == text),
        Value::Number(n) => n
            .as_f64()
            .is_some_and(|n| items.iter().any(|item| item.parse::<f64>().ok() == Some(n))),
        Value::Bool(b) => {
            let text = b.to_string();
            items.iter().any(|item| *item == text)
        }
        Value::Null => items.iter().any(|item| item == "null"),
        _ => false,
    }
}

// Nulls and missing fields sort last in both directions.
fn order_rows(a: Option<&Value>, b: Option<&Value>, ascending: bool) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = compare_values(a, b);
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
