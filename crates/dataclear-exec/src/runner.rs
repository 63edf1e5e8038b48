use std::time::Instant;

use dataclear_plan::{DeletionPlan, Step};
use serde::Serialize;

use crate::errors::{ExecError, ExecutionError, ExecutionPhase};
use crate::executor::Executor;

/// Outcome of a committed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub steps: usize,
    pub tables: usize,
    pub duration_ms: u128,
}

/// Execute every step of `plan` inside one transaction.
///
/// The first failing step stops the run and rolls everything back; the store
/// is either fully cleared per the plan or left as it was.
pub async fn run<E>(plan: &DeletionPlan, executor: &mut E) -> Result<RunSummary, ExecutionError>
where
    E: Executor + ?Sized,
{
    let timer = Instant::now();

    executor.begin().await.map_err(ExecutionError::begin)?;
    tracing::info!(event = "transaction_begun", steps = plan.steps.len());

    for (idx, step) in plan.steps.iter().enumerate() {
        let target = step.describe();
        tracing::info!(event = "step_started", step = idx + 1, target = %target);

        if let Err(cause) = apply_step(executor, step).await {
            tracing::error!(event = "step_failed", step = idx + 1, target = %target, error = %cause);
            let rollback_error = roll_back(executor).await;
            return Err(ExecutionError {
                phase: ExecutionPhase::Step,
                failed_step: Some(idx),
                step: Some(step.clone()),
                cause,
                rollback_error,
            });
        }

        tracing::info!(event = "step_finished", step = idx + 1, target = %target);
    }

    if let Err(cause) = executor.commit().await {
        tracing::error!(event = "commit_failed", error = %cause);
        let rollback_error = roll_back(executor).await;
        return Err(ExecutionError {
            phase: ExecutionPhase::Commit,
            failed_step: None,
            step: None,
            cause,
            rollback_error,
        });
    }

    let summary = RunSummary {
        steps: plan.steps.len(),
        tables: plan.table_count(),
        duration_ms: timer.elapsed().as_millis(),
    };
    tracing::info!(
        event = "committed",
        steps = summary.steps,
        tables = summary.tables,
        duration_ms = summary.duration_ms
    );

    Ok(summary)
}

async fn apply_step<E>(executor: &mut E, step: &Step) -> Result<(), ExecError>
where
    E: Executor + ?Sized,
{
    match step {
        Step::Single {
            table,
            self_referencing: false,
        } => executor.delete_all_rows(table).await,
        // A self-referencing table is a cycle of one.
        Step::Single {
            table,
            self_referencing: true,
        } => {
            executor
                .delete_all_rows_group(std::slice::from_ref(table))
                .await
        }
        Step::Group { tables } => executor.delete_all_rows_group(tables).await,
    }
}

async fn roll_back<E>(executor: &mut E) -> Option<ExecError>
where
    E: Executor + ?Sized,
{
    match executor.rollback().await {
        Ok(()) => {
            tracing::warn!(event = "rolled_back");
            None
        }
        Err(err) => {
            tracing::error!(event = "rollback_failed", error = %err);
            Some(err)
        }
    }
}
