//! Local emulation of the EduFlow hosted backend.
//!
//! When no live backend URL is configured, the application talks to a
//! [`LocalClient`] instead: an in-process record store with a fluent query
//! chain, insert/update/delete/upsert, an auth event bus, and best-effort
//! snapshotting to a durable key-value slot.

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod logging;
pub mod mutation;
pub mod query;
pub mod session;
pub mod storage;
pub mod types;

pub use client::{LocalClient, TableRef};
pub use config::{BackendMode, EmulatorOptions, StorageTarget};
pub use query::{ChainMode, QueryBuilder, Response};
pub use session::{AuthEvent, Session, SessionBus};
pub use types::{to_record, EmuError, Record, Result, Value};
