use crate::graph::FkGraph;

/// Deterministic xorshift-driven graph with self-edges, cycles and duplicate edges.
pub(crate) fn pseudo_random_graph(seed: u64, nodes: usize) -> FkGraph {
    let mut state = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    let tables: Vec<String> = (0..nodes).map(|idx| format!("t{idx}")).collect();
    let mut edges = Vec::new();
    for _ in 0..nodes * 2 {
        let from = (next() % nodes as u64) as usize;
        let to = (next() % nodes as u64) as usize;
        edges.push((tables[from].clone(), tables[to].clone()));
    }
    FkGraph::build(tables.iter().cloned(), edges)
}
