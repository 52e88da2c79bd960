//! Overlap graphs over transcripts.
//!
//! Nodes are transcript ids stored in an arena-indexed petgraph graph; the
//! insertion order of the ids is kept so that every traversal is
//! deterministic.

pub mod cliques;
pub mod communities;
pub mod reducer;

use std::collections::BTreeSet;

use indexmap::IndexMap;
use petgraph::stable_graph::{NodeIndex, StableUnGraph};

use crate::transcript::Transcript;

use cliques::MaximalCliques;

#[derive(Debug, Clone, Default)]
pub struct OverlapGraph {
    graph: StableUnGraph<String, ()>,
    nodes: IndexMap<String, NodeIndex>,
}

impl OverlapGraph {
    /// One node per transcript (in iteration order) and one edge per
    /// unordered pair accepted by `predicate`.
    ///
    /// Every predicate implies overlapping spans on the same chromosome, so
    /// only such pairs are tested.
    pub fn build<'a, I, F>(transcripts: I, predicate: F) -> Self
    where
        I: IntoIterator<Item = &'a Transcript>,
        F: Fn(&Transcript, &Transcript) -> bool,
    {
        let transcripts: Vec<&Transcript> = transcripts.into_iter().collect();
        let mut result = Self::default();
        for t in &transcripts {
            result.add_node(&t.id);
        }

        let mut order: Vec<usize> = (0..transcripts.len()).collect();
        order.sort_by_key(|&i| (transcripts[i].start, transcripts[i].end));
        for (pos, &i) in order.iter().enumerate() {
            let a = transcripts[i];
            for &j in &order[pos + 1..] {
                let b = transcripts[j];
                if b.start > a.end {
                    break;
                }
                if a.chrom == b.chrom && a.id != b.id && predicate(a, b) {
                    result.add_edge(&a.id, &b.id);
                }
            }
        }
        log::debug!(
            "overlap graph with {} nodes and {} edges",
            result.node_count(),
            result.edge_count()
        );
        result
    }

    pub fn add_node(&mut self, id: &str) {
        if !self.nodes.contains_key(id) {
            let index = self.graph.add_node(id.to_string());
            self.nodes.insert(id.to_string(), index);
        }
    }

    /// Add an edge between two existing nodes; self-loops and duplicates are ignored.
    pub fn add_edge(&mut self, a: &str, b: &str) {
        let (Some(&ia), Some(&ib)) = (self.nodes.get(a), self.nodes.get(b)) else {
            return;
        };
        if ia != ib && self.graph.find_edge(ia, ib).is_none() {
            self.graph.add_edge(ia, ib, ());
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        match (self.nodes.get(a), self.nodes.get(b)) {
            (Some(&ia), Some(&ib)) => self.graph.find_edge(ia, ib).is_some(),
            _ => false,
        }
    }

    /// Node ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    #[must_use]
    pub fn degree(&self, id: &str) -> usize {
        self.nodes
            .get(id)
            .map_or(0, |&index| self.graph.neighbors(index).count())
    }

    #[must_use]
    pub fn max_degree(&self) -> usize {
        self.nodes
            .values()
            .map(|&index| self.graph.neighbors(index).count())
            .max()
            .unwrap_or(0)
    }

    /// Neighbours of `id` in insertion order.
    #[must_use]
    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        let Some(&index) = self.nodes.get(id) else {
            return Vec::new();
        };
        let adjacent: BTreeSet<usize> = self
            .graph
            .neighbors(index)
            .filter_map(|n| self.position(n))
            .collect();
        adjacent
            .into_iter()
            .filter_map(|p| self.nodes.get_index(p).map(|(id, _)| id.as_str()))
            .collect()
    }

    pub fn remove_nodes<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            if let Some(index) = self.nodes.shift_remove(id) {
                self.graph.remove_node(index);
            }
        }
    }

    /// Copy restricted to the given ids.
    #[must_use]
    pub fn induced(&self, keep: &BTreeSet<&str>) -> Self {
        let mut copy = self.clone();
        let dropped: Vec<String> = self
            .ids()
            .filter(|id| !keep.contains(id))
            .map(str::to_string)
            .collect();
        copy.remove_nodes(dropped.iter().map(String::as_str));
        copy
    }

    fn position(&self, index: NodeIndex) -> Option<usize> {
        self.graph
            .node_weight(index)
            .and_then(|id| self.nodes.get_index_of(id))
    }

    /// Dense adjacency sets indexed by insertion position.
    #[must_use]
    pub fn adjacency(&self) -> Vec<BTreeSet<usize>> {
        self.nodes
            .values()
            .map(|&index| {
                self.graph
                    .neighbors(index)
                    .filter_map(|n| self.position(n))
                    .collect()
            })
            .collect()
    }

    /// All maximal cliques, each sorted by insertion order.
    #[must_use]
    pub fn cliques(&self) -> Vec<Vec<String>> {
        let adjacency = self.adjacency();
        MaximalCliques::new(&adjacency)
            .map(|clique| self.names(&clique))
            .collect()
    }

    /// Connected components in insertion order of their first member.
    #[must_use]
    pub fn communities(&self) -> Vec<Vec<String>> {
        let order: Vec<NodeIndex> = self.nodes.values().copied().collect();
        communities::connected_components(&self.graph, &order)
            .into_iter()
            .map(|component| {
                let mut positions: Vec<usize> = component
                    .into_iter()
                    .filter_map(|n| self.position(n))
                    .collect();
                positions.sort_unstable();
                self.names(&positions)
            })
            .collect()
    }

    fn names(&self, positions: &[usize]) -> Vec<String> {
        positions
            .iter()
            .filter_map(|&p| self.nodes.get_index(p).map(|(id, _)| id.clone()))
            .collect()
    }
}
