use std::collections::{BTreeSet, VecDeque};

use crate::graph::FkGraph;

/// Result of ordering the clearable subset of a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopoOrder {
    /// Children-before-parents order. Partial when `complete` is false.
    pub order: Vec<String>,
    /// False when a cycle among clearable tables blocked the sort.
    pub complete: bool,
}

/// Order `deletable` tables so each table comes before every table it references.
///
/// Edges touching tables outside `deletable` impose no constraint, and neither
/// do self-references. Ties resolve in graph order. Names in `deletable` that
/// are not part of the graph are ignored.
pub fn plan_acyclic(graph: &FkGraph, deletable: &BTreeSet<String>) -> TopoOrder {
    let mut included = vec![false; graph.len()];
    for table in deletable {
        if let Some(idx) = graph.position(table) {
            included[idx] = true;
        }
    }
    let expected = included.iter().filter(|flag| **flag).count();

    let mut indegree = vec![0usize; graph.len()];
    for from in (0..graph.len()).filter(|&idx| included[idx]) {
        for &to in graph.adjacency(from) {
            if to != from && included[to] {
                indegree[to] += 1;
            }
        }
    }

    let mut ready: VecDeque<usize> = (0..graph.len())
        .filter(|&idx| included[idx] && indegree[idx] == 0)
        .collect();
    let mut order = Vec::with_capacity(expected);

    while let Some(node) = ready.pop_front() {
        order.push(graph.name(node).to_string());

        for &target in graph.adjacency(node) {
            if target == node || !included[target] {
                continue;
            }
            indegree[target] -= 1;
            if indegree[target] == 0 {
                ready.push_back(target);
            }
        }
    }

    TopoOrder {
        complete: order.len() == expected,
        order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::pseudo_random_graph;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn orders_children_before_parents() {
        let graph = FkGraph::build(
            ["users", "orders", "order_items"],
            [("order_items", "orders"), ("orders", "users")],
        );

        let topo = plan_acyclic(&graph, &set(&["orders", "order_items"]));
        assert!(topo.complete);
        assert_eq!(topo.order, vec!["order_items", "orders"]);
    }

    #[test]
    fn ties_follow_graph_order() {
        let graph = FkGraph::build(["b", "a", "c"], [("c", "a")]);
        let topo = plan_acyclic(&graph, &set(&["a", "b", "c"]));
        assert_eq!(topo.order, vec!["b", "c", "a"]);
    }

    #[test]
    fn self_reference_does_not_block() {
        let graph = FkGraph::build(["tree", "leaf"], [("tree", "tree"), ("leaf", "tree")]);
        let topo = plan_acyclic(&graph, &set(&["tree", "leaf"]));
        assert!(topo.complete);
        assert_eq!(topo.order, vec!["leaf", "tree"]);
    }

    #[test]
    fn protected_tables_impose_no_order() {
        // kept -> a and a -> kept would form a cycle if kept were included.
        let graph = FkGraph::build(["a", "kept", "b"], [("a", "kept"), ("kept", "a"), ("b", "a")]);
        let topo = plan_acyclic(&graph, &set(&["a", "b"]));
        assert!(topo.complete);
        assert_eq!(topo.order, vec!["b", "a"]);
    }

    #[test]
    fn reports_incomplete_order_on_cycle() {
        let graph = FkGraph::build(
            ["x", "y", "z"],
            [("x", "y"), ("y", "x"), ("z", "x")],
        );
        let topo = plan_acyclic(&graph, &set(&["x", "y", "z"]));
        assert!(!topo.complete);
        assert_eq!(topo.order, vec!["z"]);
    }

    #[test]
    fn ignores_unknown_deletable_names() {
        let graph = FkGraph::build(["a"], Vec::<(&str, &str)>::new());
        let topo = plan_acyclic(&graph, &set(&["a", "ghost"]));
        assert!(topo.complete);
        assert_eq!(topo.order, vec!["a"]);
    }

    #[test]
    fn complete_orders_respect_every_edge() {
        for seed in 0..60u64 {
            let graph = pseudo_random_graph(seed, 10);
            let deletable: BTreeSet<String> = graph
                .tables()
                .iter()
                .enumerate()
                .filter(|(idx, _)| (seed as usize + idx) % 3 != 0)
                .map(|(_, table)| table.clone())
                .collect();

            let topo = plan_acyclic(&graph, &deletable);
            if !topo.complete {
                continue;
            }
            assert_eq!(topo.order.len(), deletable.len());

            let position = |table: &str| topo.order.iter().position(|item| item == table);
            for (from, to) in graph.edges() {
                if let (Some(from_idx), Some(to_idx)) = (position(from), position(to)) {
                    assert!(from_idx <= to_idx, "seed {seed}: {from} -> {to}");
                }
            }
        }
    }
}
