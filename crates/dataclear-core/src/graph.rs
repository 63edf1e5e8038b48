use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::order::plan_acyclic;
use crate::scc::find_components;
use crate::schema::{ForeignKeyEdge, SchemaSnapshot};

/// Directed foreign-key graph. An edge `A -> B` means rows of `A` reference rows of `B`.
///
/// Tables keep the order they were supplied in and each adjacency list keeps
/// edge insertion order, so every traversal over the graph is reproducible.
#[derive(Debug, Clone, Default)]
pub struct FkGraph {
    tables: Vec<String>,
    index: HashMap<String, usize>,
    edges: Vec<Vec<usize>>,
    incoming: Vec<ForeignKeyEdge>,
}

impl FkGraph {
    /// Build a graph from a table list and raw `(from, to)` pairs.
    ///
    /// Duplicate tables collapse onto their first occurrence, duplicate edges
    /// are ignored and edges with an endpoint outside `tables` are dropped.
    pub fn build<T, E, F, G>(tables: T, edges: E) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        E: IntoIterator<Item = (F, G)>,
        F: AsRef<str>,
        G: AsRef<str>,
    {
        let mut graph = FkGraph::default();

        for table in tables {
            let table = table.into();
            if graph.index.contains_key(&table) {
                continue;
            }
            graph.index.insert(table.clone(), graph.tables.len());
            graph.tables.push(table);
            graph.edges.push(Vec::new());
        }

        for (from, to) in edges {
            let (Some(&from), Some(&to)) = (
                graph.index.get(from.as_ref()),
                graph.index.get(to.as_ref()),
            ) else {
                continue;
            };
            let targets = &mut graph.edges[from];
            if !targets.contains(&to) {
                targets.push(to);
            }
        }

        graph
    }

    /// Build the graph for an introspected snapshot.
    pub fn from_snapshot(snapshot: &SchemaSnapshot) -> Self {
        Self::build(
            snapshot.tables.iter().cloned(),
            snapshot
                .foreign_keys
                .iter()
                .map(|fk| (fk.from.as_str(), fk.to.as_str())),
        )
        .with_foreign_keys(snapshot.foreign_keys.iter().cloned())
    }

    /// Remember full foreign-key definitions, delete actions included.
    ///
    /// Only keys whose referenced table is in the graph are kept. Their
    /// referencing table may lie outside it. Edges are not changed.
    pub fn with_foreign_keys<I>(mut self, foreign_keys: I) -> Self
    where
        I: IntoIterator<Item = ForeignKeyEdge>,
    {
        let known: Vec<ForeignKeyEdge> = foreign_keys
            .into_iter()
            .filter(|fk| self.contains(&fk.to))
            .collect();
        self.incoming.extend(known);
        self
    }

    /// Foreign keys pointing into the graph, from any table.
    pub fn incoming_foreign_keys(&self) -> &[ForeignKeyEdge] {
        &self.incoming
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Tables in the order they were supplied.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn contains(&self, table: &str) -> bool {
        self.index.contains_key(table)
    }

    /// Tables referenced by `table`, in edge insertion order.
    pub fn references<'a>(&'a self, table: &str) -> impl Iterator<Item = &'a str> + 'a {
        let targets: &'a [usize] = match self.index.get(table) {
            Some(&idx) => &self.edges[idx],
            None => &[],
        };
        targets.iter().map(move |&target| self.tables[target].as_str())
    }

    /// Returns true when `table` holds a foreign key to itself.
    pub fn has_self_reference(&self, table: &str) -> bool {
        self.index
            .get(table)
            .is_some_and(|&idx| self.edges[idx].contains(&idx))
    }

    /// Total number of distinct edges, self-edges included.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// All edges as `(from, to)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.edges.iter().enumerate().flat_map(move |(from, targets)| {
            targets
                .iter()
                .map(move |&to| (self.tables[from].as_str(), self.tables[to].as_str()))
        })
    }

    pub(crate) fn position(&self, table: &str) -> Option<usize> {
        self.index.get(table).copied()
    }

    pub(crate) fn name(&self, idx: usize) -> &str {
        &self.tables[idx]
    }

    pub(crate) fn adjacency(&self, idx: usize) -> &[usize] {
        &self.edges[idx]
    }
}

/// Summary of FK graph structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FkGraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub self_references: usize,
}

/// Report describing the clearing order of a whole graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FkGraphReport {
    pub summary: FkGraphSummary,
    /// Children-before-parents order when the graph has no multi-table cycle.
    pub deletion_order: Option<Vec<String>>,
    /// Cyclic components: multi-table cycles and self-referencing tables.
    pub cycles: Vec<Vec<String>>,
}

/// Build a deterministic FK report, treating every table as clearable.
pub fn build_fk_graph_report(graph: &FkGraph) -> FkGraphReport {
    let self_references = graph
        .tables()
        .iter()
        .filter(|table| graph.has_self_reference(table))
        .count();
    let summary = FkGraphSummary {
        nodes: graph.len(),
        edges: graph.edge_count(),
        self_references,
    };

    let everything: BTreeSet<String> = graph.tables().iter().cloned().collect();
    let topo = plan_acyclic(graph, &everything);

    let cycles = find_components(graph)
        .into_iter()
        .filter(|component| component.is_cyclic(graph))
        .map(|component| component.into_tables())
        .collect();

    FkGraphReport {
        summary,
        deletion_order: topo.complete.then_some(topo.order),
        cycles,
    }
}
