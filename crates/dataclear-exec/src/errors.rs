use std::fmt;

use dataclear_plan::Step;
use thiserror::Error;

/// Failure reported by an [`Executor`](crate::Executor) operation.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Core(#[from] dataclear_core::Error),
    #[error("transaction state: {0}")]
    State(String),
    #[error("{0}")]
    Other(String),
}

/// Where in the transaction a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPhase {
    Begin,
    Step,
    Commit,
}

/// A run failed; nothing it did was committed.
#[derive(Debug, Error)]
pub struct ExecutionError {
    pub phase: ExecutionPhase,
    /// Zero-based index of the failing step.
    pub failed_step: Option<usize>,
    pub step: Option<Step>,
    #[source]
    pub cause: ExecError,
    /// Set when rolling back failed as well.
    pub rollback_error: Option<ExecError>,
}

impl ExecutionError {
    pub(crate) fn begin(cause: ExecError) -> Self {
        Self {
            phase: ExecutionPhase::Begin,
            failed_step: None,
            step: None,
            cause,
            rollback_error: None,
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.phase, self.failed_step, &self.step) {
            (ExecutionPhase::Begin, _, _) => {
                write!(f, "could not begin transaction: {}", self.cause)?;
                return Ok(());
            }
            (ExecutionPhase::Step, Some(idx), Some(step)) => {
                write!(f, "step {} ({}) failed: {}", idx + 1, step.describe(), self.cause)?;
            }
            (ExecutionPhase::Step, _, _) => write!(f, "step failed: {}", self.cause)?,
            (ExecutionPhase::Commit, _, _) => write!(f, "commit failed: {}", self.cause)?,
        }

        match &self.rollback_error {
            None => write!(f, "; transaction rolled back"),
            Some(err) => write!(f, "; rollback also failed: {err}"),
        }
    }
}
