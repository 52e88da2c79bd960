//! The locus container shared by every stage of the hierarchy.
//!
//! A [`LocusContainer`] owns its transcripts and the aggregate structure
//! (exons, introns, splice sites) used both for admission and for the
//! metrics that are relative to the container. Stage-specific behaviour is
//! looked up in the [`Strategy`] table of its [`Stage`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use indexmap::IndexMap;

use crate::context::PickContext;
use crate::error::Error;
use crate::gff::{self, GffLine};
use crate::interval::{self, Interval};
use crate::scoring::{self, ScoreInput, ScoreTable, TOTAL};
use crate::strand::Strand;
use crate::transcript::Transcript;
use crate::transcript::metrics::{self, MetricSet};
use crate::transcript::types::RelativeMetrics;

/// Stage of the locus hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Superlocus,
    Sublocus,
    Monosublocus,
    MonosublocusHolder,
    Locus,
    Excluded,
}

/// Edge predicate between two transcripts; the flag restricts the test to
/// coding structure.
pub type Intersecting = fn(&Transcript, &Transcript, bool) -> bool;

/// How a container decides whether a new transcript belongs to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Same chromosome, overlapping span and, for stranded containers, same strand.
    SpanOverlap,
    /// Overlapping span and the holder predicate against at least one member.
    Holder,
    /// Only the seed transcript; nothing else is ever admitted.
    Seed,
    /// Anything is accepted. Locus admission goes through its own checks.
    Unchecked,
}

#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    /// Predicate of the graph used to split the container into the next stage.
    pub intersecting: Option<Intersecting>,
    pub admission: Admission,
    /// Whether the stage publishes scores.
    pub scored: bool,
}

impl Stage {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Superlocus => "superlocus",
            Self::Sublocus => "sublocus",
            Self::Monosublocus => "monosublocus",
            Self::MonosublocusHolder => "monosublocus_holder",
            Self::Locus => "locus",
            Self::Excluded => "excluded",
        }
    }

    #[must_use]
    pub fn strategy(self) -> Strategy {
        match self {
            Self::Superlocus => Strategy {
                intersecting: Some(sublocus_intersecting),
                admission: Admission::SpanOverlap,
                scored: false,
            },
            Self::Sublocus => Strategy {
                intersecting: Some(monosublocus_intersecting),
                admission: Admission::SpanOverlap,
                scored: true,
            },
            Self::Monosublocus => Strategy {
                intersecting: None,
                admission: Admission::Seed,
                scored: true,
            },
            Self::MonosublocusHolder => Strategy {
                intersecting: Some(holder_intersecting),
                admission: Admission::Holder,
                scored: true,
            },
            Self::Locus => Strategy {
                intersecting: None,
                admission: Admission::Unchecked,
                scored: true,
            },
            Self::Excluded => Strategy {
                intersecting: None,
                admission: Admission::Unchecked,
                scored: false,
            },
        }
    }

    /// Stages that carry a primary transcript.
    fn has_primary(self) -> bool {
        matches!(self, Self::Monosublocus | Self::Locus)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sublocus edges: multiexonic transcripts sharing an intron, or monoexonic
/// transcripts sharing a start, an end or any base.
#[must_use]
pub fn sublocus_intersecting(a: &Transcript, b: &Transcript, cds_only: bool) -> bool {
    if a.id == b.id {
        return false;
    }
    match (a.monoexonic(), b.monoexonic()) {
        (false, false) if cds_only => !a.combined_cds_introns().is_disjoint(b.combined_cds_introns()),
        (false, false) => !a.introns().is_disjoint(b.introns()),
        (true, true) => a.start == b.start || a.end == b.end || a.span().overlaps(&b.span()),
        _ => false,
    }
}

fn exonic_overlap(a: &Transcript, b: &Transcript, cds_only: bool) -> bool {
    if cds_only && a.is_coding() && b.is_coding() {
        interval::overlap_length(a.combined_cds(), b.combined_cds()) > 0
    } else {
        interval::overlap_length(a.exons(), b.exons()) > 0
    }
}

/// Monosublocus edges: any exonic base in common (CDS base with `cds_only`).
#[must_use]
pub fn monosublocus_intersecting(a: &Transcript, b: &Transcript, cds_only: bool) -> bool {
    a.id != b.id && exonic_overlap(a, b, cds_only)
}

/// Holder edges: compatible strands, then a shared splice site or intron for
/// two multiexonic transcripts, exonic overlap otherwise.
#[must_use]
pub fn holder_intersecting(a: &Transcript, b: &Transcript, cds_only: bool) -> bool {
    if a.id == b.id || !a.strand.compatible(b.strand) {
        return false;
    }
    if a.monoexonic() || b.monoexonic() {
        return exonic_overlap(a, b, cds_only);
    }
    if cds_only && a.is_coding() && b.is_coding() {
        let sites = |t: &Transcript| -> BTreeSet<i32> {
            t.combined_cds_introns()
                .iter()
                .flat_map(|i| [i.start, i.end])
                .collect()
        };
        !a.combined_cds_introns().is_disjoint(b.combined_cds_introns()) || !sites(a).is_disjoint(&sites(b))
    } else {
        !a.introns().is_disjoint(b.introns()) || !a.splices().is_disjoint(b.splices())
    }
}

/// A set of transcripts at one stage of the hierarchy.
#[derive(Debug, Clone)]
pub struct LocusContainer {
    pub stage: Stage,
    pub chrom: String,
    pub strand: Strand,
    pub start: i32,
    pub end: i32,
    /// Whether strand takes part in span admission.
    pub stranded: bool,
    /// Restrict intersection tests to coding structure.
    pub cds_only: bool,
    pub source: String,
    pub primary: Option<String>,
    /// Disambiguates containers that would otherwise share an id.
    pub counter: usize,
    pub parent: Option<String>,
    pub attributes: IndexMap<String, String>,

    pub(crate) transcripts: IndexMap<String, Transcript>,
    pub(crate) exons: BTreeSet<Interval>,
    pub(crate) introns: BTreeSet<Interval>,
    pub(crate) splices: BTreeSet<i32>,
    pub(crate) combined_cds_introns: BTreeSet<Interval>,
    pub(crate) selected_cds_introns: BTreeSet<Interval>,
    pub(crate) verified_introns: BTreeSet<Interval>,

    metrics: BTreeMap<String, MetricSet>,
    orf_metrics: Vec<ScoreInput>,
    scores: ScoreTable,
    metrics_calculated: bool,
    scores_calculated: bool,
}

impl LocusContainer {
    /// A container of `stage` seeded with `transcript`, which is finalized
    /// first.
    pub fn new(stage: Stage, mut transcript: Transcript) -> Result<Self, Error> {
        transcript.finalize()?;
        let mut container = Self {
            stage,
            chrom: transcript.chrom.clone(),
            strand: transcript.strand,
            start: transcript.start,
            end: transcript.end,
            stranded: true,
            cds_only: false,
            source: transcript.source.clone(),
            primary: None,
            counter: 0,
            parent: None,
            attributes: IndexMap::new(),
            transcripts: IndexMap::new(),
            exons: BTreeSet::new(),
            introns: BTreeSet::new(),
            splices: BTreeSet::new(),
            combined_cds_introns: BTreeSet::new(),
            selected_cds_introns: BTreeSet::new(),
            verified_introns: BTreeSet::new(),
            metrics: BTreeMap::new(),
            orf_metrics: Vec::new(),
            scores: ScoreTable::default(),
            metrics_calculated: false,
            scores_calculated: false,
        };
        if stage.has_primary() {
            container.primary = Some(transcript.id.clone());
            transcript.attributes.insert("primary".to_string(), "True".to_string());
        }
        container.insert(transcript);
        Ok(container)
    }

    #[must_use]
    pub fn with_stranded(mut self, stranded: bool) -> Self {
        self.stranded = stranded;
        if !stranded {
            self.strand = Strand::Unknown;
        }
        self
    }

    /// A child container of `stage` seeded with `transcript`, inheriting
    /// strandedness, the coding-only flag and the source.
    pub fn spawn(&self, stage: Stage, transcript: Transcript) -> Result<LocusContainer, Error> {
        let mut child = LocusContainer::new(stage, transcript)?.with_stranded(self.stranded);
        child.cds_only = self.cds_only;
        child.source = self.source.clone();
        Ok(child)
    }

    /// Move every member out, leaving the span and an empty container.
    pub(crate) fn take_transcripts(&mut self) -> Vec<Transcript> {
        let members = std::mem::take(&mut self.transcripts).into_values().collect();
        self.primary = None;
        self.scores = ScoreTable::default();
        self.exons.clear();
        self.introns.clear();
        self.splices.clear();
        self.combined_cds_introns.clear();
        self.selected_cds_introns.clear();
        self.verified_introns.clear();
        self.reset();
        members
    }

    /// Identifier of the container, unique within its superlocus once the
    /// counter is set.
    #[must_use]
    pub fn id(&self) -> String {
        let strand = if self.stranded {
            self.strand.to_string()
        } else {
            "mixed".to_string()
        };
        let base = format!("{}:{}{strand}:{}-{}", self.stage, self.chrom, self.start, self.end);
        if self.counter > 0 {
            format!("{base}.{}", self.counter)
        } else {
            base
        }
    }

    #[must_use]
    pub fn span(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.transcripts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty()
    }

    #[must_use]
    pub fn get(&self, tid: &str) -> Option<&Transcript> {
        self.transcripts.get(tid)
    }

    #[must_use]
    pub fn contains(&self, tid: &str) -> bool {
        self.transcripts.contains_key(tid)
    }

    /// Transcripts in insertion order.
    pub fn transcripts(&self) -> impl Iterator<Item = &Transcript> {
        self.transcripts.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.transcripts.keys().map(String::as_str)
    }

    #[must_use]
    pub fn introns(&self) -> &BTreeSet<Interval> {
        &self.introns
    }

    #[must_use]
    pub fn splices(&self) -> &BTreeSet<i32> {
        &self.splices
    }

    #[must_use]
    pub fn verified_introns(&self) -> &BTreeSet<Interval> {
        &self.verified_introns
    }

    #[must_use]
    pub fn primary_transcript(&self) -> Option<&Transcript> {
        self.primary.as_deref().and_then(|p| self.transcripts.get(p))
    }

    #[must_use]
    pub fn scores(&self) -> &ScoreTable {
        &self.scores
    }

    #[must_use]
    pub fn metrics_calculated(&self) -> bool {
        self.metrics_calculated
    }

    #[must_use]
    pub fn scores_calculated(&self) -> bool {
        self.scores_calculated
    }

    /// Whether `t` may join the container under the stage's admission rule.
    #[must_use]
    pub fn admits(&self, t: &Transcript) -> bool {
        let span_ok = t.chrom == self.chrom && t.span().overlaps(&self.span());
        match self.stage.strategy().admission {
            Admission::SpanOverlap => span_ok && (!self.stranded || t.strand == self.strand),
            Admission::Holder => {
                span_ok
                    && self
                        .transcripts
                        .values()
                        .any(|other| holder_intersecting(t, other, self.cds_only))
            }
            Admission::Seed => false,
            Admission::Unchecked => true,
        }
    }

    /// Add a transcript. With `check`, a transcript the container does not
    /// admit is a [`Error::NotInLocus`].
    pub fn add_transcript(&mut self, mut transcript: Transcript, check: bool) -> Result<(), Error> {
        transcript.finalize()?;
        if check && !self.admits(&transcript) {
            return Err(Error::NotInLocus(format!(
                "{} ({}:{}-{} {}) in {}",
                transcript.id,
                transcript.chrom,
                transcript.start,
                transcript.end,
                transcript.strand,
                self.id()
            )));
        }
        self.insert(transcript);
        Ok(())
    }

    fn insert(&mut self, transcript: Transcript) {
        self.start = self.start.min(transcript.start);
        self.end = self.end.max(transcript.end);
        self.absorb(&transcript);
        self.transcripts.insert(transcript.id.clone(), transcript);
        self.reset();
    }

    fn absorb(&mut self, t: &Transcript) {
        self.exons.extend(t.exons().iter().copied());
        self.introns.extend(t.introns().iter().copied());
        self.splices.extend(t.splices().iter().copied());
        self.combined_cds_introns
            .extend(t.combined_cds_introns().iter().copied());
        self.selected_cds_introns
            .extend(t.selected_cds_introns().iter().copied());
        self.verified_introns.extend(t.verified_introns.iter().copied());
    }

    /// Remove a transcript and recompute the aggregates; the span shrinks to
    /// the remaining transcripts.
    pub fn remove_transcript(&mut self, tid: &str) -> Option<Transcript> {
        let removed = self.transcripts.shift_remove(tid)?;
        if self.primary.as_deref() == Some(tid) {
            self.primary = None;
        }
        self.rebuild();
        self.scores.remove(tid);
        self.reset();
        Some(removed)
    }

    /// Swap in a modified version of a member, keeping its position.
    pub(crate) fn replace_transcript(&mut self, mut transcript: Transcript) -> Result<(), Error> {
        transcript.finalize()?;
        let Some(slot) = self.transcripts.get_mut(&transcript.id) else {
            return Err(Error::NotInLocus(transcript.id));
        };
        *slot = transcript;
        self.rebuild();
        self.reset();
        Ok(())
    }

    /// Recompute span and aggregates from the current members.
    fn rebuild(&mut self) {
        self.exons.clear();
        self.introns.clear();
        self.splices.clear();
        self.combined_cds_introns.clear();
        self.selected_cds_introns.clear();
        self.verified_introns.clear();
        let members: Vec<Transcript> = self.transcripts.values().cloned().collect();
        for t in &members {
            self.absorb(t);
        }
        if let Some(start) = members.iter().map(|t| t.start).min() {
            self.start = start;
        }
        if let Some(end) = members.iter().map(|t| t.end).max() {
            self.end = end;
        }
    }

    /// Invalidate metrics and scores after a membership change.
    pub(crate) fn reset(&mut self) {
        self.metrics_calculated = false;
        self.scores_calculated = false;
    }

    /// Locus introns that `t` reads through: introns of other members that
    /// lie within one exon of `t` and are not wholly coding in `t`.
    #[must_use]
    pub fn find_retained_introns(&self, t: &Transcript) -> Vec<Interval> {
        self.introns
            .iter()
            .filter(|intron| !t.introns().contains(intron))
            .filter(|intron| t.exons().iter().any(|e| e.contains(intron)))
            .filter(|intron| interval::overlap_length(&[**intron], t.combined_cds()) < intron.len())
            .copied()
            .collect()
    }

    fn relative_metrics(&self, t: &Transcript) -> RelativeMetrics {
        let fraction = |shared: usize, total: usize| {
            if total == 0 {
                0.0
            } else {
                shared as f64 / total as f64
            }
        };
        let retained_introns = self.find_retained_introns(t);
        let retained_length = interval::total_length(&retained_introns);
        RelativeMetrics {
            exon_fraction: fraction(
                t.exons().iter().filter(|e| self.exons.contains(e)).count(),
                self.exons.len(),
            ),
            intron_fraction: fraction(t.introns().intersection(&self.introns).count(), self.introns.len()),
            combined_cds_intron_fraction: fraction(
                t.combined_cds_introns()
                    .intersection(&self.combined_cds_introns)
                    .count(),
                self.combined_cds_introns.len(),
            ),
            selected_cds_intron_fraction: fraction(
                t.selected_cds_introns()
                    .intersection(&self.selected_cds_introns)
                    .count(),
                self.selected_cds_introns.len(),
            ),
            retained_fraction: if t.cdna_length() > 0 {
                f64::from(retained_length) / f64::from(t.cdna_length())
            } else {
                0.0
            },
            retained_introns,
            proportion_verified_introns_inlocus: fraction(
                t.verified_introns.intersection(&self.verified_introns).count(),
                self.verified_introns.len(),
            ),
        }
    }

    /// Finalize every member and compute its metrics, relative ones
    /// included. With `report_all_orfs`, every non-selected ORF of a
    /// multi-ORF transcript yields a transient clone row `{tid}.orf{n}`.
    pub fn get_metrics(&mut self, ctx: &PickContext) -> Result<(), Error> {
        if self.metrics_calculated {
            return Ok(());
        }
        self.metrics.clear();
        self.orf_metrics.clear();

        let mut tids: Vec<String> = self.transcripts.keys().cloned().collect();
        tids.sort();
        for tid in tids {
            let Some(mut transcript) = self.transcripts.get(&tid).cloned() else {
                continue;
            };
            transcript.finalize()?;
            transcript.relative = self.relative_metrics(&transcript);

            if ctx.config.run_options.report_all_orfs && transcript.number_internal_orfs() > 1 {
                let selected = transcript.selected_orf.unwrap_or(0);
                for index in (0..transcript.number_internal_orfs()).filter(|&i| i != selected) {
                    let clone_id = format!("{tid}.orf{}", index + 1);
                    let mut clone = transcript.with_selected_orf(index, &clone_id);
                    clone.relative = self.relative_metrics(&clone);
                    self.orf_metrics.push(ScoreInput {
                        id: clone_id,
                        source: clone.source.clone(),
                        metrics: metrics::collect(&clone),
                        transient: true,
                    });
                }
            }

            self.metrics.insert(tid.clone(), metrics::collect(&transcript));
            self.transcripts.insert(tid, transcript);
        }
        self.metrics_calculated = true;
        Ok(())
    }

    /// Metrics of a member, once [`LocusContainer::get_metrics`] has run.
    #[must_use]
    pub fn metrics_of(&self, tid: &str) -> Option<&MetricSet> {
        self.metrics.get(tid)
    }

    /// Score the members and copy the totals back onto them. A no-op for
    /// unscored stages and when nothing changed since the last call.
    pub fn calculate_scores(&mut self, ctx: &PickContext) -> Result<(), Error> {
        if self.scores_calculated || !self.stage.strategy().scored {
            return Ok(());
        }
        self.get_metrics(ctx)?;
        if self.transcripts.is_empty() {
            self.scores_calculated = true;
            return Ok(());
        }

        let mut inputs: Vec<ScoreInput> = self
            .metrics
            .iter()
            .filter_map(|(tid, metrics)| {
                self.transcripts.get(tid).map(|t| ScoreInput {
                    id: tid.clone(),
                    source: t.source.clone(),
                    metrics: metrics.clone(),
                    transient: false,
                })
            })
            .collect();
        inputs.extend(self.orf_metrics.iter().cloned());

        let table = scoring::score(&inputs, ctx)?;
        for (tid, transcript) in &mut self.transcripts {
            if let Some(row) = table.row(tid) {
                transcript.score = row.get(TOTAL).copied().unwrap_or(0.0);
                transcript.scores = row.clone();
            }
        }
        log::debug!("{}: scored {} transcripts", self.id(), table.len());
        self.scores = table;
        self.scores_calculated = true;
        Ok(())
    }

    /// Highest scoring of `ids`; ties go to the earliest inserted.
    #[must_use]
    pub fn choose_best<S: AsRef<str>>(&self, ids: &[S]) -> Option<String> {
        let wanted: BTreeSet<&str> = ids.iter().map(AsRef::as_ref).collect();
        let mut best: Option<&Transcript> = None;
        for t in self.transcripts.values().filter(|t| wanted.contains(t.id.as_str())) {
            if best.is_none_or(|b| t.score > b.score) {
                best = Some(t);
            }
        }
        best.map(|t| t.id.clone())
    }

    /// One row per published transcript: id, parent, score and every metric.
    pub fn metric_rows(&mut self, ctx: &PickContext) -> Result<Vec<IndexMap<String, String>>, Error> {
        self.calculate_scores(ctx)?;
        self.get_metrics(ctx)?;
        let parent = self.id();
        Ok(self
            .transcripts
            .values()
            .map(|t| {
                let mut row = IndexMap::new();
                row.insert("tid".to_string(), t.id.clone());
                row.insert("parent".to_string(), parent.clone());
                row.insert("score".to_string(), format!("{:.2}", t.score));
                if let Some(set) = self.metrics.get(&t.id) {
                    for name in metrics::METRIC_NAMES {
                        if let Some(value) = set.get(name) {
                            row.insert((*name).to_string(), value.to_string());
                        }
                    }
                }
                row
            })
            .collect())
    }

    /// One row per published transcript with every sub-score.
    pub fn score_rows(&mut self, ctx: &PickContext) -> Result<Vec<IndexMap<String, String>>, Error> {
        self.calculate_scores(ctx)?;
        let parent = self.id();
        Ok(self
            .transcripts
            .values()
            .map(|t| {
                let mut row = IndexMap::new();
                row.insert("tid".to_string(), t.id.clone());
                row.insert("parent".to_string(), parent.clone());
                row.insert("score".to_string(), format!("{:.2}", t.score));
                if let Some(scores) = self.scores.row(&t.id) {
                    for (name, value) in scores.iter().filter(|(name, _)| name.as_str() != TOTAL) {
                        row.insert(name.clone(), format!("{value:.2}"));
                    }
                }
                row
            })
            .collect())
    }

    /// The container line followed by the lines of every member, primary
    /// first.
    #[must_use]
    pub fn gff_lines(&self, source: &str, print_cds: bool) -> Vec<GffLine> {
        let id = self.id();
        let feature = match self.stage {
            Stage::Locus if self.transcripts.values().any(|t| t.selected_cds_length() > 0) => "gene",
            Stage::Locus => "ncRNA_gene",
            stage => stage.name(),
        };
        let mut line = GffLine::new(&self.chrom, source, feature, self.start, self.end, self.strand)
            .with_attribute("ID", &id);
        if let Some(parent) = &self.parent {
            line = line.with_attribute("Parent", parent);
        }
        let multiexonic = self.transcripts.values().any(|t| !t.monoexonic());
        line = line.with_attribute("multiexonic", if multiexonic { "True" } else { "False" });
        if let Some(primary) = &self.primary {
            line = line.with_attribute("primary", primary);
        }
        for (key, value) in &self.attributes {
            line.attributes.insert(key.clone(), value.clone());
        }
        if let Some(primary) = self.primary_transcript() {
            line.score = Some(primary.score);
        }

        let mut lines = vec![line];
        let members = self
            .primary_transcript()
            .into_iter()
            .chain(self.transcripts.values().filter(|t| Some(&t.id) != self.primary.as_ref()));
        for t in members {
            let mut t = t.clone();
            t.parent = Some(id.clone());
            lines.extend(gff::transcript_lines(&t, source, print_cds));
        }
        lines
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::PickConfig;
    use crate::transcript::test_transcript;

    pub(crate) fn context() -> PickContext {
        PickContext::new(PickConfig::default())
    }

    #[test]
    fn sublocus_predicate() {
        let a = test_transcript("a", Strand::Plus, &[(100, 200), (300, 400)], &[]);
        let b = test_transcript("b", Strand::Plus, &[(150, 200), (300, 500)], &[]);
        let c = test_transcript("c", Strand::Plus, &[(100, 210), (300, 400)], &[]);
        let m1 = test_transcript("m1", Strand::Plus, &[(150, 350)], &[]);
        let m2 = test_transcript("m2", Strand::Plus, &[(340, 600)], &[]);
        assert!(sublocus_intersecting(&a, &b, false));
        assert!(!sublocus_intersecting(&a, &c, false));
        assert!(!sublocus_intersecting(&a, &a, false));
        assert!(sublocus_intersecting(&m1, &m2, false));
        assert!(!sublocus_intersecting(&a, &m1, false));
    }

    #[test]
    fn cds_only_uses_coding_introns() {
        let a = test_transcript("a", Strand::Plus, &[(100, 200), (300, 400), (500, 600)], &[(150, 200), (300, 350)]);
        let b = test_transcript("b", Strand::Plus, &[(100, 200), (300, 400), (500, 600)], &[(520, 579)]);
        assert!(sublocus_intersecting(&a, &b, false));
        assert!(!sublocus_intersecting(&a, &b, true));

        // a non-coding transcript has no coding introns to share
        let n = test_transcript("n", Strand::Plus, &[(100, 200), (300, 400), (500, 600)], &[]);
        assert!(sublocus_intersecting(&a, &n, false));
        assert!(!sublocus_intersecting(&a, &n, true));
        let n2 = test_transcript("n2", Strand::Plus, &[(150, 200), (300, 400)], &[]);
        assert!(sublocus_intersecting(&n, &n2, false));
        assert!(!sublocus_intersecting(&n, &n2, true));
    }

    #[test]
    fn monosublocus_and_holder_predicates() {
        let a = test_transcript("a", Strand::Plus, &[(100, 200), (300, 400)], &[]);
        let b = test_transcript("b", Strand::Plus, &[(210, 290)], &[]);
        let c = test_transcript("c", Strand::Plus, &[(50, 120)], &[]);
        let d = test_transcript("d", Strand::Minus, &[(50, 120)], &[]);
        let e = test_transcript("e", Strand::Plus, &[(150, 200), (350, 450)], &[]);
        let f = test_transcript("f", Strand::Plus, &[(150, 200), (320, 450)], &[]);
        assert!(!monosublocus_intersecting(&a, &b, false));
        assert!(monosublocus_intersecting(&a, &c, false));
        assert!(holder_intersecting(&a, &c, false));
        assert!(!holder_intersecting(&a, &d, false));
        // shared donor only
        assert!(holder_intersecting(&a, &f, false));
        assert!(holder_intersecting(&e, &f, false));
        assert!(!holder_intersecting(&a, &b, false));
    }

    #[test]
    fn add_and_remove_update_aggregates() {
        let a = test_transcript("a", Strand::Plus, &[(100, 200), (300, 400)], &[]);
        let b = test_transcript("b", Strand::Plus, &[(350, 500), (600, 700)], &[]);
        let mut sublocus = LocusContainer::new(Stage::Sublocus, a).unwrap();
        sublocus.add_transcript(b, true).unwrap();
        assert_eq!((sublocus.start, sublocus.end), (100, 700));
        assert_eq!(sublocus.introns().len(), 2);

        sublocus.remove_transcript("b").unwrap();
        assert_eq!((sublocus.start, sublocus.end), (100, 400));
        assert_eq!(sublocus.introns().len(), 1);
        assert!(sublocus.remove_transcript("b").is_none());
    }

    #[test]
    fn admission_failure_is_not_in_locus() {
        let a = test_transcript("a", Strand::Plus, &[(100, 200)], &[]);
        let far = test_transcript("far", Strand::Plus, &[(1000, 1200)], &[]);
        let minus = test_transcript("minus", Strand::Minus, &[(150, 250)], &[]);
        let mut sublocus = LocusContainer::new(Stage::Sublocus, a).unwrap();
        assert!(matches!(sublocus.add_transcript(far.clone(), true), Err(Error::NotInLocus(_))));
        assert!(matches!(sublocus.add_transcript(minus, true), Err(Error::NotInLocus(_))));
        sublocus.add_transcript(far, false).unwrap();
        assert_eq!(sublocus.len(), 2);
    }

    #[test]
    fn scores_sum_and_best_choice() {
        let ctx = context();
        let a = test_transcript("a", Strand::Plus, &[(100, 200), (300, 400)], &[(150, 200), (300, 350)]);
        let b = test_transcript("b", Strand::Plus, &[(100, 200), (300, 600)], &[(150, 200), (300, 380)]);
        let mut sublocus = LocusContainer::new(Stage::Sublocus, a).unwrap();
        sublocus.add_transcript(b, true).unwrap();
        sublocus.calculate_scores(&ctx).unwrap();
        assert!(sublocus.scores_calculated());
        for (_, row) in sublocus.scores().iter() {
            let sum: f64 = row.iter().filter(|(k, _)| k.as_str() != TOTAL).map(|(_, v)| v).sum();
            assert!((crate::scoring::rules::round2(sum) - row[TOTAL]).abs() < 1e-9);
        }
        let best = sublocus.choose_best(&["a", "b"]).unwrap();
        let other = if best == "a" { "b" } else { "a" };
        assert!(sublocus.get(&best).unwrap().score >= sublocus.get(other).unwrap().score);
    }

    #[test]
    fn ties_go_to_insertion_order() {
        let a = test_transcript("z", Strand::Plus, &[(100, 200)], &[]);
        let b = test_transcript("a", Strand::Plus, &[(100, 200)], &[]);
        let mut sublocus = LocusContainer::new(Stage::Sublocus, a).unwrap();
        sublocus.add_transcript(b, true).unwrap();
        assert_eq!(sublocus.choose_best(&["a", "z"]).unwrap(), "z");
    }

    #[test]
    fn orf_clones_are_not_published() {
        let ctx = context();
        let mut t = test_transcript("t", Strand::Plus, &[(1, 900)], &[]);
        t.load_orfs(&[
            crate::transcript::orf::Orf::new("o1", 11, 400),
            crate::transcript::orf::Orf::new("o2", 501, 800),
        ])
        .unwrap();
        let mut sublocus = LocusContainer::new(Stage::Sublocus, t).unwrap();
        sublocus.calculate_scores(&ctx).unwrap();
        assert_eq!(sublocus.scores().len(), 1);
        assert!(sublocus.scores().row("t").is_some());
        assert_eq!(sublocus.metric_rows(&ctx).unwrap().len(), 1);
    }

    #[test]
    fn retained_introns_and_relative_metrics() {
        let ctx = context();
        let a = test_transcript("a", Strand::Plus, &[(100, 200), (300, 400)], &[]);
        let b = test_transcript("b", Strand::Plus, &[(100, 400)], &[]);
        let mut sublocus = LocusContainer::new(Stage::Sublocus, a).unwrap();
        sublocus.add_transcript(b, false).unwrap();
        let b = sublocus.get("b").unwrap().clone();
        assert_eq!(sublocus.find_retained_introns(&b), vec![Interval::new(201, 299)]);
        sublocus.get_metrics(&ctx).unwrap();
        let a = sublocus.get("a").unwrap();
        assert_eq!(a.relative.intron_fraction, 1.0);
        assert!(a.relative.retained_introns.is_empty());
        assert_eq!(sublocus.get("b").unwrap().relative.retained_introns.len(), 1);
    }

    #[test]
    fn rows_and_gff() {
        let ctx = context();
        let a = test_transcript("a", Strand::Plus, &[(100, 200), (300, 400)], &[(150, 200), (300, 350)]);
        let mut locus = LocusContainer::new(Stage::Locus, a).unwrap();
        let rows = locus.metric_rows(&ctx).unwrap();
        assert_eq!(rows[0]["tid"], "a");
        assert_eq!(rows[0]["parent"], "locus:chr1+:100-400");
        assert_eq!(rows[0]["cdna_length"], "202");
        let scores = locus.score_rows(&ctx).unwrap();
        assert!(scores[0].contains_key("source_score"));

        let lines = locus.gff_lines("pick", true);
        assert_eq!(lines[0].feature, "gene");
        assert_eq!(lines[0].attributes["primary"], "a");
        assert_eq!(lines[1].attributes["Parent"], "locus:chr1+:100-400");
        assert_eq!(lines[1].attributes["primary"], "True");
    }
}
