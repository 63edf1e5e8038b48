use std::fmt;

use dataclear_core::DeleteAction;
use thiserror::Error;

/// Clearing the requested tables would change rows of a table that stays.
///
/// Either a strongly connected component mixes kept and clearable tables, or
/// a table that is not cleared holds a foreign key whose delete action
/// removes or rewrites its rows once the referenced rows go. Planning stops
/// and the caller must resolve it in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ConflictError {
    /// Every table of the offending component in graph order, or the
    /// referencing and referenced table of the offending foreign key.
    pub component: Vec<String>,
    /// Tables that stay. With a delete action this may be a table of a
    /// schema that was not introspected.
    pub protected: Vec<String>,
    pub deletable: Vec<String>,
    pub reason: ConflictReason,
}

/// What ties the kept tables of a [`ConflictError`] to the cleared ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    SharedCycle,
    DeleteAction {
        constraint: Option<String>,
        action: DeleteAction,
    },
}

impl ConflictError {
    /// How the conflict can be resolved.
    pub fn hint(&self) -> &'static str {
        match self.reason {
            ConflictReason::SharedCycle => "keep every table of the cycle or none of them",
            ConflictReason::DeleteAction { .. } => {
                "keep the referenced table too, or change the foreign key's ON DELETE action"
            }
        }
    }
}

impl fmt::Display for ConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            ConflictReason::SharedCycle => write!(
                f,
                "kept table(s) {} share a foreign-key cycle with clearable table(s) {}",
                self.protected.join(", "),
                self.deletable.join(", ")
            ),
            ConflictReason::DeleteAction { constraint, action } => write!(
                f,
                "clearing {} would change rows of {}: foreign key {} is ON DELETE {}",
                self.deletable.join(", "),
                self.protected.join(", "),
                constraint.as_deref().unwrap_or("<unnamed>"),
                action.as_sql()
            ),
        }
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// Structured validation issue with location and hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: String,
    pub path: String,
    pub message: String,
    pub hint: Option<String>,
}

impl ValidationIssue {
    /// Create a new validation issue.
    pub fn new(
        severity: IssueSeverity,
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            path: path.into(),
            message: message.into(),
            hint,
        }
    }
}

/// Aggregated validation report with errors and warnings.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Returns true when there are no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push_error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    pub fn push_warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    /// Issue codes of all errors, in order.
    pub fn error_codes(&self) -> Vec<&str> {
        self.errors.iter().map(|issue| issue.code.as_str()).collect()
    }
}

/// Planning errors.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("invalid plan: {} error(s), first: {}", .0.errors.len(), first_message(.0))]
    Invalid(ValidationReport),
}

fn first_message(report: &ValidationReport) -> String {
    report
        .errors
        .first()
        .map(|issue| format!("{} at {}: {}", issue.code, issue.path, issue.message))
        .unwrap_or_default()
}

/// Result type for planning operations.
pub type Result<T> = std::result::Result<T, PlanError>;
