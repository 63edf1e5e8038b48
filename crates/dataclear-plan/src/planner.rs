use std::collections::BTreeSet;

use dataclear_core::{Component, FkGraph, SchemaSnapshot, find_components, plan_acyclic};

use crate::errors::{ConflictError, ConflictReason};
use crate::model::{DeletionPlan, PLAN_VERSION, PlanStrategy, Step};
use crate::protected::ProtectedSet;

/// Refuse any component that mixes protected and clearable tables.
///
/// The first offending component, in the order given, is reported.
pub fn check_safety(
    components: &[Component],
    protected: &ProtectedSet,
) -> Result<(), ConflictError> {
    check_cycles(components, |table| protected.contains(table))
}

pub(crate) fn check_cycles<F>(components: &[Component], is_kept: F) -> Result<(), ConflictError>
where
    F: Fn(&str) -> bool,
{
    for component in components {
        let (kept, deletable): (Vec<&String>, Vec<&String>) = component
            .tables()
            .iter()
            .partition(|table| is_kept(table.as_str()));

        if !kept.is_empty() && !deletable.is_empty() {
            return Err(ConflictError {
                component: component.tables().to_vec(),
                protected: kept.into_iter().cloned().collect(),
                deletable: deletable.into_iter().cloned().collect(),
                reason: ConflictReason::SharedCycle,
            });
        }
    }
    Ok(())
}

/// Refuse to clear a table when the database would carry the deletion over
/// to a table that stays.
///
/// A table stays when it is protected or lies outside the graph. Foreign keys
/// from it with `ON DELETE CASCADE`, `SET NULL` or `SET DEFAULT` into a
/// cleared table would delete or rewrite its rows.
pub fn check_delete_actions(graph: &FkGraph, protected: &ProtectedSet) -> Result<(), ConflictError> {
    check_cascades(graph, |table| graph.contains(table) && !protected.contains(table))
}

pub(crate) fn check_cascades<F>(graph: &FkGraph, cleared: F) -> Result<(), ConflictError>
where
    F: Fn(&str) -> bool,
{
    let offending = graph.incoming_foreign_keys().iter().find(|fk| {
        fk.on_delete.rewrites_referencing_rows()
            && cleared(fk.to.as_str())
            && !cleared(fk.from.as_str())
    });

    match offending {
        Some(fk) => Err(ConflictError {
            component: vec![fk.from.clone(), fk.to.clone()],
            protected: vec![fk.from.clone()],
            deletable: vec![fk.to.clone()],
            reason: ConflictReason::DeleteAction {
                constraint: fk.name.clone(),
                action: fk.on_delete,
            },
        }),
        None => Ok(()),
    }
}

/// One step per component that still has clearable members.
///
/// Components are expected in deletion order (as `find_components` returns
/// them); a cyclic component becomes a single `Group` step.
pub fn plan_with_cycles(
    components: &[Component],
    deletable: &BTreeSet<String>,
    graph: &FkGraph,
) -> Vec<Step> {
    components
        .iter()
        .filter_map(|component| {
            let members: Vec<&String> = component
                .tables()
                .iter()
                .filter(|table| deletable.contains(*table))
                .collect();

            match members.as_slice() {
                [] => None,
                [table] => Some(single_step(graph, table)),
                _ => Some(Step::group(members.into_iter().cloned())),
            }
        })
        .collect()
}

/// Plan the clearing of every table of `graph` that is not protected.
///
/// The protection checks run before any ordering is attempted; a conflict
/// aborts planning with nothing produced.
pub fn plan(graph: &FkGraph, protected: &ProtectedSet) -> Result<DeletionPlan, ConflictError> {
    let components = find_components(graph);

    let checked = check_safety(&components, protected)
        .and_then(|()| check_delete_actions(graph, protected));
    if let Err(conflict) = checked {
        tracing::warn!(
            event = "conflict_detected",
            reason = ?conflict.reason,
            component = ?conflict.component,
            protected = ?conflict.protected
        );
        return Err(conflict);
    }

    let (kept, deletable): (Vec<&String>, Vec<&String>) = graph
        .tables()
        .iter()
        .partition(|table| protected.contains(table));
    let deletable: BTreeSet<String> = deletable.into_iter().cloned().collect();

    let topo = plan_acyclic(graph, &deletable);
    let (strategy, steps) = if topo.complete {
        let steps = topo
            .order
            .iter()
            .map(|table| single_step(graph, table))
            .collect();
        (PlanStrategy::Ordered, steps)
    } else {
        tracing::info!(
            event = "cyclic_fallback",
            ordered = topo.order.len(),
            deletable = deletable.len()
        );
        (
            PlanStrategy::Grouped,
            plan_with_cycles(&components, &deletable, graph),
        )
    };

    let plan = DeletionPlan {
        plan_version: PLAN_VERSION.to_string(),
        strategy,
        protected: kept.into_iter().cloned().collect(),
        warnings: collect_warnings(graph, protected, &deletable),
        steps,
    };

    tracing::info!(
        event = "plan_built",
        strategy = ?plan.strategy,
        steps = plan.steps.len(),
        tables = plan.table_count(),
        protected = plan.protected.len()
    );

    Ok(plan)
}

/// Build the graph for a snapshot and plan it.
pub fn plan_snapshot(
    snapshot: &SchemaSnapshot,
    protected: &ProtectedSet,
) -> Result<DeletionPlan, ConflictError> {
    plan(&FkGraph::from_snapshot(snapshot), protected)
}

fn single_step(graph: &FkGraph, table: &str) -> Step {
    Step::Single {
        table: table.to_string(),
        self_referencing: graph.has_self_reference(table),
    }
}

/// A table that stays and references a cleared one keeps the parent's rows
/// alive: clearing the parent then fails and the whole run rolls back.
fn collect_warnings(
    graph: &FkGraph,
    protected: &ProtectedSet,
    deletable: &BTreeSet<String>,
) -> Vec<String> {
    let mut warnings: Vec<String> = protected
        .unmatched(graph)
        .into_iter()
        .map(|pattern| format!("protected pattern '{pattern}' matches no table"))
        .collect();

    warnings.extend(
        graph
            .edges()
            .filter(|(from, to)| !deletable.contains(*from) && deletable.contains(*to))
            .map(|(from, to)| {
                format!(
                    "kept table {from} references {to}; clearing {to} fails while referenced rows remain"
                )
            }),
    );

    warnings.extend(
        graph
            .incoming_foreign_keys()
            .iter()
            .filter(|fk| !graph.contains(&fk.from) && deletable.contains(&fk.to))
            .map(|fk| {
                format!(
                    "table {} outside the planned schemas references {}; clearing {} fails while referenced rows remain",
                    fk.from, fk.to, fk.to
                )
            }),
    );

    warnings
}
