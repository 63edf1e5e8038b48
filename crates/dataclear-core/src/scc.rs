//! Strongly connected components of the FK graph (Tarjan).
//!
//! The traversal keeps its own work stack instead of recursing, so long
//! reference chains cannot overflow the call stack.

use serde::{Deserialize, Serialize};

use crate::graph::FkGraph;

/// A strongly connected component. Singletons represent tables outside any
/// multi-table cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    tables: Vec<String>,
}

impl Component {
    /// Member tables in graph order.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn into_tables(self) -> Vec<String> {
        self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.iter().any(|member| member == table)
    }

    /// True for multi-table components and for a self-referencing singleton.
    pub fn is_cyclic(&self, graph: &FkGraph) -> bool {
        match self.tables.as_slice() {
            [single] => graph.has_self_reference(single),
            tables => tables.len() > 1,
        }
    }
}

/// Partition the graph into strongly connected components.
///
/// Components come back in deletion order: every component precedes the
/// components it references. Traversal follows table order and edge
/// insertion order, so the result is reproducible for a given graph.
pub fn find_components(graph: &FkGraph) -> Vec<Component> {
    let mut tarjan = Tarjan::new(graph.len());
    for root in 0..graph.len() {
        if tarjan.index[root].is_none() {
            tarjan.visit(graph, root);
        }
    }

    // Tarjan completes referenced components first.
    tarjan.completed.reverse();
    tarjan
        .completed
        .into_iter()
        .map(|members| Component {
            tables: members
                .into_iter()
                .map(|idx| graph.name(idx).to_string())
                .collect(),
        })
        .collect()
}

struct Tarjan {
    index: Vec<Option<usize>>,
    low_link: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next_index: usize,
    completed: Vec<Vec<usize>>,
}

impl Tarjan {
    fn new(nodes: usize) -> Self {
        Self {
            index: vec![None; nodes],
            low_link: vec![0; nodes],
            on_stack: vec![false; nodes],
            stack: Vec::new(),
            next_index: 0,
            completed: Vec::new(),
        }
    }

    fn discover(&mut self, node: usize) {
        self.index[node] = Some(self.next_index);
        self.low_link[node] = self.next_index;
        self.next_index += 1;
        self.stack.push(node);
        self.on_stack[node] = true;
    }

    fn visit(&mut self, graph: &FkGraph, root: usize) {
        // (node, position of the next edge to follow)
        let mut work: Vec<(usize, usize)> = vec![(root, 0)];
        self.discover(root);

        while let Some(frame) = work.last_mut() {
            let node = frame.0;
            let targets = graph.adjacency(node);

            if let Some(&next) = targets.get(frame.1) {
                frame.1 += 1;
                match self.index[next] {
                    None => {
                        self.discover(next);
                        work.push((next, 0));
                    }
                    Some(next_index) if self.on_stack[next] => {
                        self.low_link[node] = self.low_link[node].min(next_index);
                    }
                    Some(_) => {}
                }
                continue;
            }

            work.pop();
            if let Some(&(parent, _)) = work.last() {
                self.low_link[parent] = self.low_link[parent].min(self.low_link[node]);
            }
            if self.index[node] == Some(self.low_link[node]) {
                self.complete(node);
            }
        }
    }

    fn complete(&mut self, root: usize) {
        let mut members = Vec::new();
        while let Some(node) = self.stack.pop() {
            self.on_stack[node] = false;
            members.push(node);
            if node == root {
                break;
            }
        }
        members.sort_unstable();
        self.completed.push(members);
    }
}
