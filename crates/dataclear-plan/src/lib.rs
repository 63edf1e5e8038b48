//! Deletion planning for dataclear.
//!
//! Turns a foreign-key graph and a set of protected tables into an ordered
//! list of clearing steps, refusing any cycle that mixes protected and
//! clearable tables and any delete action that would reach a kept table.
//! Plans serialise to `plan.json` and can be validated again against a fresh
//! snapshot before they are executed.

pub mod errors;
pub mod model;
pub mod planner;
pub mod protected;
pub mod schema;
pub mod validate;

pub use errors::{
    ConflictError, ConflictReason, IssueSeverity, PlanError, Result, ValidationIssue,
    ValidationReport,
};
pub use model::{DeletionPlan, PLAN_VERSION, PlanStrategy, Step};
pub use planner::{check_delete_actions, check_safety, plan, plan_snapshot, plan_with_cycles};
pub use protected::ProtectedSet;
pub use schema::plan_json_schema;
pub use validate::{ValidatedPlan, load_plan, validate_plan, validate_plan_json};
