use dataclear_core::FkGraph;
use jsonschema::JSONSchema;
use serde_json::Value;

use crate::errors::{IssueSeverity, PlanError, ValidationIssue, ValidationReport};
use crate::model::{DeletionPlan, PLAN_VERSION};
use crate::protected::ProtectedSet;
use crate::schema::plan_json_schema;

/// Plan that passed validation, with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedPlan {
    pub plan: DeletionPlan,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a plan JSON document against the plan JSON Schema.
pub fn validate_plan_json(
    plan_json: &Value,
    plan_schema: &Value,
) -> Result<ValidationReport, PlanError> {
    let compiled =
        JSONSchema::compile(plan_schema).map_err(|err| PlanError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(plan_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_violation",
                path,
                error.to_string(),
                None,
            ));
        }
    }

    Ok(report)
}

/// Structurally validate and decode a saved plan.
pub fn load_plan(plan_json: &Value) -> Result<DeletionPlan, PlanError> {
    let plan_schema = serde_json::to_value(plan_json_schema())?;
    let report = validate_plan_json(plan_json, &plan_schema)?;
    if !report.is_ok() {
        return Err(PlanError::Invalid(report));
    }

    let plan: DeletionPlan = serde_json::from_value(plan_json.clone())?;
    if plan.plan_version != PLAN_VERSION {
        let mut report = ValidationReport::default();
        report.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            "plan_version_mismatch",
            "/plan_version",
            format!(
                "plan_version '{}' is not supported (expected '{PLAN_VERSION}')",
                plan.plan_version
            ),
            Some("re-run `dataclear plan` to produce a current plan".to_string()),
        ));
        return Err(PlanError::Invalid(report));
    }

    Ok(plan)
}

/// Validate a saved plan end-to-end against the current schema.
pub fn validate_plan(
    plan_json: &Value,
    graph: &FkGraph,
    protected: &ProtectedSet,
) -> Result<ValidatedPlan, ValidationReport> {
    let plan = match load_plan(plan_json) {
        Ok(plan) => plan,
        Err(PlanError::Invalid(report)) => return Err(report),
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "invalid_plan_json",
                "/",
                err.to_string(),
                None,
            ));
            return Err(report);
        }
    };

    let current = plan.verify_against(graph, protected);
    if !current.is_ok() {
        return Err(current);
    }

    Ok(ValidatedPlan {
        plan,
        warnings: current.warnings,
    })
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn loads_a_well_formed_plan() {
        let plan = load_plan(&json!({
            "plan_version": "0.1",
            "strategy": "grouped",
            "protected": ["app.users"],
            "steps": [
                { "kind": "single", "table": "app.order_items" },
                { "kind": "group", "tables": ["app.a", "app.b"] }
            ]
        }))
        .expect("plan should load");

        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.table_count(), 3);
    }

    #[test]
    fn reports_structural_errors() {
        let err = load_plan(&json!({
            "plan_version": "0.1",
            "strategy": "sideways",
            "steps": [{ "kind": "single" }]
        }))
        .unwrap_err();

        let PlanError::Invalid(report) = err else {
            panic!("expected invalid plan");
        };
        assert!(!report.errors.is_empty());
        assert!(report.errors.iter().all(|issue| issue.code == "schema_violation"));
    }

    #[test]
    fn rejects_unknown_plan_version() {
        let err = load_plan(&json!({
            "plan_version": "9.9",
            "strategy": "ordered",
            "steps": []
        }))
        .unwrap_err();
        let PlanError::Invalid(report) = err else {
            panic!("expected invalid plan");
        };
        assert_eq!(report.error_codes(), vec!["plan_version_mismatch"]);
    }
}
