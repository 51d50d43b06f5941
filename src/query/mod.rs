#![forbid(unsafe_code)]

//! Read path of the emulated backend.
//!
//! A query is an explicit sequence of [`QueryOp`] steps applied eagerly to a
//! defensive copy of one table.

/// Fluent query builder and response type.
///
/// Provides the chainable cursor callers await or terminate with `single`.
pub mod builder;

/// Typed query steps and their row-level semantics.
pub mod ops;

pub use builder::{QueryBuilder, Response};
pub use ops::{ChainMode, QueryOp};
