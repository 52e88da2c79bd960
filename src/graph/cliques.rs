//! Maximal clique enumeration (Bron–Kerbosch with Tomita pivoting).

use std::collections::BTreeSet;

struct Frame {
    clique: Vec<usize>,
    candidates: BTreeSet<usize>,
    excluded: BTreeSet<usize>,
    /// Vertices still to branch on, in reverse order.
    pending: Vec<usize>,
}

impl Frame {
    fn new(
        clique: Vec<usize>,
        candidates: BTreeSet<usize>,
        excluded: BTreeSet<usize>,
        adjacency: &[BTreeSet<usize>],
    ) -> Self {
        // pivot: the vertex of P ∪ X with the most neighbours in P, lowest index on ties
        let mut pivot: Option<(usize, usize)> = None;
        for &u in candidates.union(&excluded) {
            let connected = adjacency[u].intersection(&candidates).count();
            if pivot.is_none_or(|(_, best)| connected > best) {
                pivot = Some((u, connected));
            }
        }
        let mut pending: Vec<usize> = match pivot {
            Some((u, _)) => candidates.difference(&adjacency[u]).copied().collect(),
            None => Vec::new(),
        };
        pending.reverse();
        Self {
            clique,
            candidates,
            excluded,
            pending,
        }
    }
}

/// Lazy iterator over the maximal cliques of a graph given as dense
/// adjacency sets. Cliques are yielded with their vertices sorted.
pub struct MaximalCliques<'a> {
    adjacency: &'a [BTreeSet<usize>],
    stack: Vec<Frame>,
}

impl<'a> MaximalCliques<'a> {
    #[must_use]
    pub fn new(adjacency: &'a [BTreeSet<usize>]) -> Self {
        let all: BTreeSet<usize> = (0..adjacency.len()).collect();
        let stack = if all.is_empty() {
            Vec::new()
        } else {
            vec![Frame::new(Vec::new(), all, BTreeSet::new(), adjacency)]
        };
        Self { adjacency, stack }
    }
}

impl Iterator for MaximalCliques<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(v) = frame.pending.pop() else {
                self.stack.pop();
                continue;
            };
            let neighbours = &self.adjacency[v];
            let candidates: BTreeSet<usize> = frame.candidates.intersection(neighbours).copied().collect();
            let excluded: BTreeSet<usize> = frame.excluded.intersection(neighbours).copied().collect();
            let mut clique = frame.clique.clone();
            clique.push(v);
            frame.candidates.remove(&v);
            frame.excluded.insert(v);

            if candidates.is_empty() {
                if excluded.is_empty() {
                    clique.sort_unstable();
                    return Some(clique);
                }
                continue;
            }
            let child = Frame::new(clique, candidates, excluded, self.adjacency);
            self.stack.push(child);
        }
    }
}
