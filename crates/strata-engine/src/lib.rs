//! # Strata Engine
//!
//! The calculation kernel and orchestration of the Strata scenario
//! engine:
//!
//! - **Graph**: reference extraction and topological calculation order
//! - **Providers**: the value-resolution chain installed per period
//! - **Unified engine**: one period of one scenario against one template
//! - **Actions**: trigger evaluation and cached template transformation
//! - **Runner**: the multi-period state machine with cancellation
//! - **Scenarios & MAC**: combinatorial/diagonal generation, batch
//!   execution, and marginal abatement cost curves
//!
//! The engine is single-threaded within a scenario and deterministic:
//! identical inputs produce byte-identical results. Across scenarios,
//! batches may run in parallel over the frozen [`loader::ModelData`]
//! snapshot.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod actions;
pub mod engine;
pub mod error;
pub mod graph;
pub mod loader;
pub mod mac;
pub mod providers;
pub mod runner;
pub mod scenarios;
pub mod state;
pub mod validation;

pub use actions::{active_bindings, apply_transformations, ActionEngine};
pub use engine::{CompiledTemplate, PeriodContext, UnifiedEngine};
pub use error::{EngineError, EngineResult};
pub use graph::calculation_order;
pub use loader::{ModelData, ModelLoader};
pub use mac::{compute_mac_curve, MacCurve, MacPoint, MacSpec};
pub use runner::{CancelToken, PeriodRunner, RunOutcome, RunSpec};
pub use scenarios::{
    generate_all_combinations, generate_diagonal, persist_outcomes, run_batch, BatchSpec,
    ScenarioConfig,
};
pub use state::{RunHistory, ValueMap};
