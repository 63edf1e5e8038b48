use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Write as _;

use dataclear_core::{FkGraph, find_components};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::{IssueSeverity, ValidationIssue, ValidationReport};
use crate::planner::{check_cascades, check_cycles};
use crate::protected::ProtectedSet;

/// Contract version for `plan.json` artifacts.
pub const PLAN_VERSION: &str = "0.1";

/// One clearing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// Clear a single table.
    Single {
        table: String,
        /// The table references itself; it is cleared with the cycle-tolerant group mode.
        #[serde(default)]
        self_referencing: bool,
    },
    /// Clear the members of a foreign-key cycle in one combined operation.
    Group { tables: Vec<String> },
}

impl Step {
    pub fn single(table: impl Into<String>) -> Self {
        Step::Single {
            table: table.into(),
            self_referencing: false,
        }
    }

    pub fn group<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Step::Group {
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }

    /// Tables touched by this step.
    pub fn tables(&self) -> &[String] {
        match self {
            Step::Single { table, .. } => std::slice::from_ref(table),
            Step::Group { tables } => tables,
        }
    }

    /// Short human-readable form, used in logs and prompts.
    pub fn describe(&self) -> String {
        match self {
            Step::Single {
                table,
                self_referencing: false,
            } => table.clone(),
            Step::Single {
                table,
                self_referencing: true,
            } => format!("{table} (self-referencing)"),
            Step::Group { tables } => format!("[cycle] {}", tables.join(", ")),
        }
    }
}

/// How the steps of a plan were derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlanStrategy {
    /// Topological order, one table per step.
    Ordered,
    /// Clearable tables contain cycles; steps follow strongly connected components.
    Grouped,
}

/// Ordered clearing plan. Each table comes no later than every table it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeletionPlan {
    /// Contract version for this plan format.
    pub plan_version: String,
    pub strategy: PlanStrategy,
    /// Tables of the snapshot that are kept, in graph order.
    #[serde(default)]
    pub protected: Vec<String>,
    /// Non-fatal findings worth showing before confirmation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub steps: Vec<Step>,
}

impl DeletionPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of tables cleared across all steps.
    pub fn table_count(&self) -> usize {
        self.steps.iter().map(|step| step.tables().len()).sum()
    }

    /// Listing shown to the user before anything is deleted.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let strategy = match self.strategy {
            PlanStrategy::Ordered => "ordered",
            PlanStrategy::Grouped => "grouped",
        };
        let _ = writeln!(
            out,
            "Deletion plan ({strategy}): {} step(s), {} table(s)",
            self.steps.len(),
            self.table_count()
        );
        for (idx, step) in self.steps.iter().enumerate() {
            let _ = writeln!(out, "  {:>3}. {}", idx + 1, step.describe());
        }
        if self.steps.is_empty() {
            let _ = writeln!(out, "  (nothing to clear)");
        }
        if !self.protected.is_empty() {
            let _ = writeln!(out, "Kept: {}", self.protected.join(", "));
        }
        for warning in &self.warnings {
            let _ = writeln!(out, "warning: {warning}");
        }
        out
    }

    /// Check a (possibly stale) plan against a fresh graph and protected set.
    ///
    /// Besides the step-level checks, the tables the plan clears go through
    /// the same conflict checks as planning: no cycle may be split between
    /// cleared and remaining tables, and no remaining table may hold a
    /// foreign key whose delete action reaches a cleared one.
    pub fn verify_against(&self, graph: &FkGraph, protected: &ProtectedSet) -> ValidationReport {
        let mut report = ValidationReport::default();
        let mut step_of: HashMap<&str, usize> = HashMap::new();

        for (idx, step) in self.steps.iter().enumerate() {
            if let Step::Group { tables } = step {
                if tables.is_empty() {
                    report.push_error(ValidationIssue::new(
                        IssueSeverity::Error,
                        "empty_group",
                        format!("/steps/{idx}"),
                        "group step lists no tables",
                        None,
                    ));
                }
            }

            for table in step.tables() {
                let path = format!("/steps/{idx}");
                if !graph.contains(table) {
                    report.push_error(ValidationIssue::new(
                        IssueSeverity::Error,
                        "unknown_table",
                        path,
                        format!("table '{table}' is not part of the current schema"),
                        Some("re-run `dataclear plan` to refresh the plan".to_string()),
                    ));
                    continue;
                }
                if protected.contains(table) {
                    report.push_error(ValidationIssue::new(
                        IssueSeverity::Error,
                        "protected_table",
                        path,
                        format!("table '{table}' is protected"),
                        None,
                    ));
                    continue;
                }
                match step_of.entry(table.as_str()) {
                    Entry::Occupied(_) => report.push_error(ValidationIssue::new(
                        IssueSeverity::Error,
                        "duplicate_table",
                        path,
                        format!("table '{table}' appears in more than one step"),
                        None,
                    )),
                    Entry::Vacant(slot) => {
                        slot.insert(idx);
                    }
                }
            }
        }

        for (from, to) in graph.edges() {
            if let (Some(&from_step), Some(&to_step)) = (step_of.get(from), step_of.get(to)) {
                if from_step > to_step {
                    report.push_error(ValidationIssue::new(
                        IssueSeverity::Error,
                        "order_violation",
                        format!("/steps/{from_step}"),
                        format!("'{from}' references '{to}' but is cleared after it"),
                        Some("re-run `dataclear plan` to refresh the plan".to_string()),
                    ));
                }
            }
        }

        let cleared = |table: &str| step_of.contains_key(table);
        let conflict = check_cycles(&find_components(graph), |table| !cleared(table))
            .and_then(|()| check_cascades(graph, cleared));
        if let Err(conflict) = conflict {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "conflict",
                "/steps",
                conflict.to_string(),
                Some(conflict.hint().to_string()),
            ));
        }

        for table in graph.tables() {
            if !protected.contains(table) && !step_of.contains_key(table.as_str()) {
                report.push_warning(ValidationIssue::new(
                    IssueSeverity::Warning,
                    "missing_table",
                    "/steps",
                    format!("table '{table}' is neither protected nor cleared by the plan"),
                    None,
                ));
            }
        }

        report
    }
}
