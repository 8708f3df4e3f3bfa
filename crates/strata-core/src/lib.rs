//! # Strata Core
//!
//! Core types and abstractions for the Strata financial scenario engine.
//!
//! This crate provides the foundational building blocks used throughout
//! Strata:
//!
//! - **Types**: the domain model: line items, statement templates,
//!   drivers, management actions, period results
//! - **Units**: unit definitions, static conversion factors, and
//!   per-period FX rates behind one [`units::UnitConverter`]
//! - **Validation**: declarative rules a template attaches and the engine
//!   evaluates after each period
//!
//! ## Design Philosophy
//!
//! - **Determinism**: every collection that reaches a result is ordered;
//!   two runs with identical inputs serialize byte-identically
//! - **Frozen inputs**: registries and rate tables are built once during
//!   the load phase and never mutated mid-run
//! - **Explicit over implicit**: sign conventions, tolerances, and trigger
//!   semantics are declared, not assumed

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;
pub mod units;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::types::{
        DriverKey, DriverSet, DriverSource, DriverValue, EntityId, LineItem, ManagementAction,
        Period, PeriodResult, ScenarioActionBinding, ScenarioId, Section, SignConvention,
        StatementTemplate, Transformation, Trigger, ValidationReport, ValidationRule,
    };
    pub use crate::units::{FxRateType, FxTable, UnitConverter, UnitDefinition, UnitRegistry};
}

pub use error::{CoreError, CoreResult};
pub use types::{LineItem, Period, PeriodResult, Section, StatementTemplate};
