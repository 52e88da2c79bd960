//! Connected components of an overlap graph.

use petgraph::stable_graph::{NodeIndex, StableUnGraph};
use petgraph::visit::{Bfs, NodeIndexable};

/// Connected components, discovered by breadth-first search from each
/// unvisited node of `order` in turn.
#[must_use]
pub fn connected_components<N, E>(graph: &StableUnGraph<N, E>, order: &[NodeIndex]) -> Vec<Vec<NodeIndex>> {
    let mut seen = vec![false; graph.node_bound()];
    let mut components = Vec::new();
    for &start in order {
        if seen.get(start.index()).copied().unwrap_or(true) {
            continue;
        }
        let mut component = Vec::new();
        let mut bfs = Bfs::new(graph, start);
        while let Some(node) = bfs.next(graph) {
            seen[node.index()] = true;
            component.push(node);
        }
        components.push(component);
    }
    components
}
