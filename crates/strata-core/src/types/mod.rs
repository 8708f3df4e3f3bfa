//! Domain types for the scenario engine.

mod action;
mod driver;
mod ids;
mod line_item;
mod period;
mod result;
mod section;
mod template;
mod validation;

pub use action::{
    CostProfile, ManagementAction, ScenarioActionBinding, Transformation, Trigger,
};
pub use driver::{DriverKey, DriverSet, DriverValue};
pub use ids::{EntityId, ScenarioId};
pub use line_item::{DriverSource, LineItem, SignConvention};
pub use period::Period;
pub use result::PeriodResult;
pub use section::Section;
pub use template::StatementTemplate;
pub use validation::{
    RuleKind, Severity, ValidationIssue, ValidationReport, ValidationRule, BALANCE_TOLERANCE,
};
