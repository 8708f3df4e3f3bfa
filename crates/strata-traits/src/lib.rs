//! # Strata Traits
//!
//! Store traits and record types for the Strata scenario engine.
//!
//! The engine never talks to a database directly: it sees the narrow
//! async interfaces defined here, and backends implement them as
//! extensions (`strata-ext-mem` ships an in-memory one). All store I/O
//! happens in the engine's load phase; the calculation kernel runs on
//! frozen snapshots.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod records;
pub mod store;

pub use error::StoreError;
pub use records::{DriverRecord, FxRecord, ResultRow};
pub use store::{
    ActionStore, DriverStore, FxStore, ResultStore, StoreAdapter, TemplateStore, UnitStore,
};
