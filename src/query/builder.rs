#![forbid(unsafe_code)]

//! Fluent, single-use query cursor over one table.

use std::future::{ready, IntoFuture, Ready};
use std::sync::Arc;

use tracing::debug;

use crate::query::ops::{ChainMode, QueryOp};
use crate::storage::RecordStore;
use crate::types::{EmuError, Record, Result, Value};

/// Outcome of a query or mutation, shaped like the remote client's replies.
#[derive(Debug)]
pub struct Response<T> {
    /// Payload; `None` / empty when nothing matched.
    pub data: T,
    /// Set only when an earlier step failed.
    pub error: Option<EmuError>,
}

impl<T> Response<T> {
    /// Successful response.
    pub fn ok(data: T) -> Self {
        Self { data, error: None }
    }

    /// Converts into a `Result`, preferring the error when one is present.
    pub fn into_result(self) -> Result<T> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.data),
        }
    }
}

impl<T> IntoFuture for Response<T> {
    type Output = Self;
    type IntoFuture = Ready<Self>;

    fn into_future(self) -> Self::IntoFuture {
        ready(self)
    }
}

/// Chainable cursor. Each step narrows the rows captured by `select`; the
/// backing table is never consulted again after that copy is taken.
pub struct QueryBuilder {
    store: Arc<RecordStore>,
    table: String,
    mode: ChainMode,
    ops: Vec<QueryOp>,
    rows: Option<Vec<Record>>,
    error: Option<EmuError>,
}

impl QueryBuilder {
    pub(crate) fn new(store: Arc<RecordStore>, table: impl Into<String>, mode: ChainMode) -> Self {
        Self {
            store,
            table: table.into(),
            mode,
            ops: Vec::new(),
            rows: None,
            error: None,
        }
    }

    /// Seeds the cursor with a deep copy of the whole table. `columns` is
    /// recorded but whole records are always returned.
    pub fn select(mut self, columns: &str) -> Self {
        self.rows = Some(self.store.read(&self.table));
        self.ops.push(QueryOp::Select {
            columns: columns.to_string(),
        });
        self
    }

    /// Keeps rows whose `column` strictly equals `value`.
    pub fn eq<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.push(QueryOp::Eq {
            column: column.to_string(),
            value: value.into(),
        })
    }

    /// Excludes rows matching `column <operator> value`; see [`ChainMode`].
    pub fn not<V: Into<Value>>(self, column: &str, operator: &str, value: V) -> Self {
        self.push(QueryOp::Not {
            column: column.to_string(),
            operator: operator.to_string(),
            value: value.into(),
        })
    }

    /// Orders rows by `column`; see [`ChainMode`].
    pub fn order(self, column: &str, ascending: bool) -> Self {
        self.push(QueryOp::Order {
            column: column.to_string(),
            ascending,
        })
    }

    /// Keeps the first `n` rows.
    pub fn limit(self, n: usize) -> Self {
        self.push(QueryOp::Limit(n))
    }

    /// Terminal step: the first remaining row, or `None`.
    pub fn single(mut self) -> Response<Option<Record>> {
        self.ops.push(QueryOp::Single);
        self.trace_resolve();
        let data = self.rows.and_then(|rows| rows.into_iter().next());
        Response {
            data,
            error: self.error,
        }
    }

    /// Resolves the cursor without a terminal extractor. `data` is `None` when
    /// `select` was never called.
    pub fn execute(self) -> Response<Option<Vec<Record>>> {
        self.trace_resolve();
        Response {
            data: self.rows,
            error: self.error,
        }
    }

    /// Steps recorded so far.
    pub fn ops(&self) -> &[QueryOp] {
        &self.ops
    }

    /// Rows currently held by the cursor.
    pub fn rows(&self) -> Option<&[Record]> {
        self.rows.as_deref()
    }

    /// Human-readable chain, e.g. `contents: select(*) -> eq(id) -> limit(3)`.
    pub fn explain(&self) -> String {
        let steps: Vec<String> = self
            .ops
            .iter()
            .map(|op| match op {
                QueryOp::Select { columns } => format!("select({})", columns.trim()),
                QueryOp::Eq { column, .. } => format!("eq({column})"),
                QueryOp::Not {
                    column, operator, ..
                } => format!("not({column}.{operator})"),
                QueryOp::Order { column, ascending } => {
                    format!("order({column} {})", if *ascending { "asc" } else { "desc" })
                }
                QueryOp::Limit(n) => format!("limit({n})"),
                QueryOp::Single => "single".to_string(),
            })
            .collect();
        format!("{}: {}", self.table, steps.join(" -> "))
    }

    fn push(mut self, op: QueryOp) -> Self {
        if self.error.is_none() {
            if let Some(rows) = self.rows.as_mut() {
                if let Err(err) = op.apply(rows, self.mode) {
                    self.error = Some(err);
                }
            }
        }
        self.ops.push(op);
        self
    }

    fn trace_resolve(&self) {
        debug!(
            table = %self.table,
            steps = self.ops.len(),
            rows = self.rows.as_ref().map(Vec::len),
            failed = self.error.is_some(),
            "query.resolve"
        );
    }
}

impl IntoFuture for QueryBuilder {
    type Output = Response<Option<Vec<Record>>>;
    type IntoFuture = Ready<Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        ready(self.execute())
    }
}
