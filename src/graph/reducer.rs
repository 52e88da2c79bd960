//! Graduated approximation of overlap graphs that are too large or dense
//! for clique enumeration.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

use crate::config::ComplexityConfig;
use crate::transcript::Transcript;

use super::OverlapGraph;

/// Result of [`ComplexityReducer::reduce`].
#[derive(Debug, Clone)]
pub struct Reduction {
    pub graph: OverlapGraph,
    /// 0 when the graph was within the limits, otherwise the last level applied.
    pub level: u8,
    /// Labels kept by level 3; empty for lower levels.
    pub retained_sources: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct ComplexityReducer<'a> {
    max_nodes: usize,
    max_degree: usize,
    labels: &'a [String],
}

impl<'a> ComplexityReducer<'a> {
    #[must_use]
    pub fn new(limits: &ComplexityConfig, labels: &'a [String]) -> Self {
        Self {
            max_nodes: limits.max_nodes,
            max_degree: limits.max_degree,
            labels,
        }
    }

    fn within_limits(&self, graph: &OverlapGraph) -> bool {
        graph.node_count() < self.max_nodes && graph.max_degree() < self.max_degree
    }

    /// Approximate `graph` until it fits the limits or level 3 has run.
    ///
    /// Only ever removes nodes; transcripts missing from the returned graph
    /// are to be dropped by the caller.
    #[must_use]
    pub fn reduce(&self, graph: &OverlapGraph, transcripts: &IndexMap<String, Transcript>) -> Reduction {
        let mut reduction = Reduction {
            graph: graph.clone(),
            level: 0,
            retained_sources: BTreeSet::new(),
        };
        if self.within_limits(&reduction.graph) {
            return reduction;
        }

        reduction.level = 1;
        let removed = remove_nested_duplicates(&reduction.graph, transcripts);
        self.report(1, removed.len(), &reduction.graph);
        reduction.graph.remove_nodes(removed.iter().map(String::as_str));
        if self.within_limits(&reduction.graph) {
            return reduction;
        }

        reduction.level = 2;
        let removed = remove_contained_variants(&reduction.graph, transcripts);
        self.report(2, removed.len(), &reduction.graph);
        reduction.graph.remove_nodes(removed.iter().map(String::as_str));
        if self.within_limits(&reduction.graph) {
            return reduction;
        }

        reduction.level = 3;
        let (kept, sources) = self.keep_label_groups(&reduction.graph, transcripts);
        let keep: BTreeSet<&str> = kept.iter().map(String::as_str).collect();
        log::warn!(
            "complexity reduction level 3: keeping {} of {} transcripts from sources {}",
            keep.len(),
            reduction.graph.node_count(),
            sources.iter().cloned().collect::<Vec<_>>().join(",")
        );
        reduction.graph = reduction.graph.induced(&keep);
        reduction.retained_sources = sources;
        reduction
    }

    fn report(&self, level: u8, removed: usize, graph: &OverlapGraph) {
        log::warn!(
            "complexity reduction level {level}: {} nodes, max degree {} (limits {}/{}); removing {removed}",
            graph.node_count(),
            graph.max_degree(),
            self.max_nodes,
            self.max_degree
        );
    }

    fn label_of(&self, transcript: &Transcript) -> String {
        self.labels
            .iter()
            .find(|label| {
                transcript.source == **label || transcript.id.starts_with(&format!("{label}_"))
            })
            .cloned()
            .unwrap_or_else(|| transcript.source.clone())
    }

    /// Add label groups, smallest first, while the resulting graph stays within the limits.
    fn keep_label_groups(
        &self,
        graph: &OverlapGraph,
        transcripts: &IndexMap<String, Transcript>,
    ) -> (Vec<String>, BTreeSet<String>) {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for id in graph.ids() {
            if let Some(t) = transcripts.get(id) {
                groups.entry(self.label_of(t)).or_default().push(id.to_string());
            }
        }
        let mut groups: Vec<(String, Vec<String>)> = groups.into_iter().collect();
        groups.sort_by(|a, b| a.1.len().cmp(&b.1.len()).then_with(|| a.0.cmp(&b.0)));

        let mut kept: Vec<String> = Vec::new();
        let mut sources = BTreeSet::new();
        for (label, members) in groups {
            let mut tentative = kept.clone();
            tentative.extend(members);
            let keep: BTreeSet<&str> = tentative.iter().map(String::as_str).collect();
            if !self.within_limits(&graph.induced(&keep)) {
                break;
            }
            kept = tentative;
            sources.insert(label);
        }
        (kept, sources)
    }
}

/// Level 1: transcripts nested inside a neighbour with the same intron chain.
fn remove_nested_duplicates(graph: &OverlapGraph, transcripts: &IndexMap<String, Transcript>) -> Vec<String> {
    let mut removed: BTreeSet<&str> = BTreeSet::new();
    let position = |id: &str| transcripts.get_index_of(id).unwrap_or(usize::MAX);
    for id in graph.ids() {
        let Some(a) = transcripts.get(id) else {
            continue;
        };
        let redundant = graph.neighbors(id).into_iter().any(|other| {
            if removed.contains(other) {
                return false;
            }
            let Some(b) = transcripts.get(other) else {
                return false;
            };
            a.introns() == b.introns()
                && b.span().contains(&a.span())
                && (b.span() != a.span() || position(other) < position(id))
        });
        if redundant {
            removed.insert(id);
        }
    }
    removed.into_iter().map(str::to_string).collect()
}

/// Level 2: multi-exonic transcripts whose introns are a strict subset of a
/// neighbour's and whose terminal exons sit inside the neighbour's exons.
fn remove_contained_variants(graph: &OverlapGraph, transcripts: &IndexMap<String, Transcript>) -> Vec<String> {
    let mut removed: BTreeSet<&str> = BTreeSet::new();
    for id in graph.ids() {
        let Some(a) = transcripts.get(id) else {
            continue;
        };
        if a.monoexonic() {
            continue;
        }
        let (Some(first), Some(last)) = (a.exons().first(), a.exons().last()) else {
            continue;
        };
        let absorbed = graph.neighbors(id).into_iter().any(|other| {
            if removed.contains(other) {
                return false;
            }
            let Some(b) = transcripts.get(other) else {
                return false;
            };
            !b.monoexonic()
                && a.introns().len() < b.introns().len()
                && a.introns().is_subset(b.introns())
                && b.exons().iter().any(|e| e.contains(first))
                && b.exons().iter().any(|e| e.contains(last))
        });
        if absorbed {
            removed.insert(id);
        }
    }
    removed.into_iter().map(str::to_string).collect()
}
