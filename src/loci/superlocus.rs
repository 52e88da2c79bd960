//! Superloci: the top of the hierarchy and the state machine that drives
//! subloci, monosubloci and loci.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::context::PickContext;
use crate::error::Error;
use crate::evidence::EvidenceSource;
use crate::gff::GffLine;
use crate::graph::OverlapGraph;
use crate::graph::reducer::ComplexityReducer;
use crate::strand::Strand;
use crate::transcript::Transcript;
use crate::transcript::types::Feature;

use super::container::{LocusContainer, Stage, holder_intersecting, sublocus_intersecting};
use super::holder::group_monosubloci;

/// Hierarchy level to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Subloci,
    Monosubloci,
    Loci,
}

impl Level {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Subloci => "subloci",
            Self::Monosubloci => "monosubloci",
            Self::Loci => "loci",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subloci" => Ok(Self::Subloci),
            "monosubloci" => Ok(Self::Monosubloci),
            "loci" => Ok(Self::Loci),
            other => Err(Error::Parse(format!("unrecognized level: {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Superlocus {
    container: LocusContainer,
    pub subloci: Vec<LocusContainer>,
    pub monosubloci: Vec<LocusContainer>,
    pub holders: Vec<LocusContainer>,
    pub loci: Vec<LocusContainer>,
    pub excluded: Option<LocusContainer>,
    pub approximation_level: u8,
    pub retained_sources: BTreeSet<String>,
    data_loaded: bool,
    subloci_defined: bool,
    monosubloci_defined: bool,
    loci_defined: bool,
}

impl Superlocus {
    pub fn new(transcript: Transcript, stranded: bool) -> Result<Self, Error> {
        Ok(Self {
            container: LocusContainer::new(Stage::Superlocus, transcript)?.with_stranded(stranded),
            subloci: Vec::new(),
            monosubloci: Vec::new(),
            holders: Vec::new(),
            loci: Vec::new(),
            excluded: None,
            approximation_level: 0,
            retained_sources: BTreeSet::new(),
            data_loaded: false,
            subloci_defined: false,
            monosubloci_defined: false,
            loci_defined: false,
        })
    }

    #[must_use]
    pub fn with_source(mut self, source: &str) -> Self {
        self.container.source = source.to_string();
        self
    }

    /// Group transcripts into unstranded superloci by span overlap.
    /// Transcripts that cannot be finalized are dropped with a warning.
    pub fn group(transcripts: impl IntoIterator<Item = Transcript>, source: &str) -> Result<Vec<Superlocus>, Error> {
        let mut finalized: Vec<Transcript> = Vec::new();
        for mut t in transcripts {
            match t.finalize() {
                Ok(()) => finalized.push(t),
                Err(e) => log::warn!("dropping {} ({}:{}-{}): {e}", t.id, t.chrom, t.start, t.end),
            }
        }
        finalized.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let mut superloci = Vec::new();
        let mut current: Option<Superlocus> = None;
        for t in finalized {
            if let Some(superlocus) = current.as_mut()
                && superlocus.container.admits(&t)
            {
                superlocus.container.add_transcript(t, false)?;
                continue;
            }
            superloci.extend(current.take());
            current = Some(Superlocus::new(t, false)?.with_source(source));
        }
        superloci.extend(current);
        Ok(superloci)
    }

    /// The underlying container.
    #[must_use]
    pub fn container(&self) -> &LocusContainer {
        &self.container
    }

    #[must_use]
    pub fn id(&self) -> String {
        self.container.id()
    }

    #[must_use]
    pub fn stranded(&self) -> bool {
        self.container.stranded
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.container.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.container.is_empty()
    }

    #[must_use]
    pub fn get(&self, tid: &str) -> Option<&Transcript> {
        self.container.get(tid)
    }

    pub fn transcripts(&self) -> impl Iterator<Item = &Transcript> {
        self.container.transcripts()
    }

    #[must_use]
    pub fn subloci_defined(&self) -> bool {
        self.subloci_defined
    }

    #[must_use]
    pub fn monosubloci_defined(&self) -> bool {
        self.monosubloci_defined
    }

    #[must_use]
    pub fn loci_defined(&self) -> bool {
        self.loci_defined
    }

    /// Re-partition an unstranded superlocus by strand. Each strand is
    /// regrown by span overlap, so one superlocus may yield several per
    /// strand. A stranded superlocus is returned unchanged.
    pub fn split_strands(self) -> Result<Vec<Superlocus>, Error> {
        if self.container.stranded {
            return Ok(vec![self]);
        }
        let source = self.container.source.clone();
        let data_loaded = self.data_loaded;
        let mut by_strand: BTreeMap<Strand, Vec<Transcript>> = BTreeMap::new();
        for t in self.container.transcripts() {
            by_strand.entry(t.strand).or_default().push(t.clone());
        }

        let mut result: Vec<Superlocus> = Vec::new();
        for (_, mut transcripts) in by_strand {
            transcripts.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
            let mut current: Option<Superlocus> = None;
            for t in transcripts {
                if let Some(superlocus) = current.as_mut()
                    && superlocus.container.admits(&t)
                {
                    superlocus.container.add_transcript(t, false)?;
                    continue;
                }
                result.extend(current.take());
                let mut superlocus = Superlocus::new(t, true)?.with_source(&source);
                superlocus.data_loaded = data_loaded;
                current = Some(superlocus);
            }
            result.extend(current);
        }
        result.sort_by_key(|s| (s.container.start, s.container.end));
        Ok(result)
    }

    /// Attach verified introns, ORFs and homology hits, then split chimeras.
    /// Transcripts whose ORFs cannot be loaded are dropped with a warning.
    pub fn load_transcript_data(&mut self, evidence: &dyn EvidenceSource, ctx: &PickContext) -> Result<(), Error> {
        if self.data_loaded {
            return Ok(());
        }
        let config = &ctx.config;
        let params = &config.chimera_split.blast_params;
        let junctions = evidence.verified_introns(&self.container.chrom, self.container.start, self.container.end);

        let mut loaded: Vec<Transcript> = Vec::new();
        for mut t in self.container.take_transcripts() {
            t.verified_introns = junctions
                .iter()
                .filter(|(intron, strand)| strand.compatible(t.strand) && t.introns().contains(intron))
                .map(|(intron, _)| *intron)
                .collect();

            if let Err(e) = t.load_orfs(&evidence.orfs(&t.id)) {
                log::warn!("dropping {} ({}:{}-{}): could not load its ORFs: {e}", t.id, t.chrom, t.start, t.end);
                continue;
            }
            t.blast_hits = evidence
                .hits(&t.id)
                .into_iter()
                .filter(|hit| hit.evalue <= params.evalue)
                .take(params.max_target_seqs)
                .collect();

            let pieces = if config.chimera_split.execute && t.number_internal_orfs() > 1 {
                match t.split_by_cds(&config.chimera_split) {
                    Ok(pieces) => pieces,
                    Err(e) => {
                        log::warn!("{} ({}:{}-{}): not split: {e}", t.id, t.chrom, t.start, t.end);
                        vec![t]
                    }
                }
            } else {
                vec![t]
            };
            for mut piece in pieces {
                piece.finalize()?;
                let introns = piece.introns().clone();
                piece.verified_introns.retain(|i| introns.contains(i));
                if !piece.is_coding() {
                    piece.feature = Feature::NcRna;
                }
                loaded.push(piece);
            }
        }
        for t in loaded {
            self.container.add_transcript(t, false)?;
        }
        self.data_loaded = true;
        Ok(())
    }

    fn exclude(&mut self, mut transcript: Transcript) -> Result<(), Error> {
        transcript.score = 0.0;
        match &mut self.excluded {
            Some(excluded) => excluded.add_transcript(transcript, false),
            None => {
                self.excluded = Some(self.container.spawn(Stage::Excluded, transcript)?);
                Ok(())
            }
        }
    }

    /// Split the superlocus into subloci.
    pub fn define_subloci(&mut self, ctx: &PickContext) -> Result<(), Error> {
        if self.subloci_defined {
            return Ok(());
        }
        let config = &ctx.config;
        let cds_only = config.run_options.subloci_from_cds_only;
        self.container.cds_only = cds_only;

        if let Some(requirements) = &config.requirements
            && config.run_options.purge
        {
            let mut failing = Vec::new();
            for t in self.container.transcripts() {
                if !requirements.evaluate(t)? {
                    failing.push(t.id.clone());
                }
            }
            for tid in failing {
                if let Some(t) = self.container.remove_transcript(&tid) {
                    log::debug!("{tid} fails the requirements; excluded from {}", self.id());
                    self.exclude(t)?;
                }
            }
        }

        let graph = OverlapGraph::build(self.container.transcripts(), |a, b| sublocus_intersecting(a, b, cds_only));
        let reduction = ComplexityReducer::new(&config.complexity, &config.prepare.labels)
            .reduce(&graph, &self.container.transcripts);
        self.approximation_level = reduction.level;
        self.retained_sources = reduction.retained_sources;
        let missing: Vec<String> = self
            .container
            .ids()
            .filter(|tid| !reduction.graph.contains(tid))
            .map(str::to_string)
            .collect();
        for tid in missing {
            log::warn!("{}: dropping {tid} to reduce the graph complexity", self.id());
            self.container.remove_transcript(&tid);
        }

        let mut subloci = Vec::new();
        for community in reduction.graph.communities() {
            let mut members: Vec<Transcript> = community
                .iter()
                .filter_map(|tid| self.container.get(tid).cloned())
                .collect();
            members.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
            let mut members = members.into_iter();
            let Some(seed) = members.next() else {
                continue;
            };
            let mut sublocus = self.container.spawn(Stage::Sublocus, seed)?;
            for t in members {
                sublocus.add_transcript(t, true)?;
            }
            subloci.push(sublocus);
        }
        subloci.sort_by_key(|s| (s.start, s.end));
        log::debug!("{}: {} subloci", self.id(), subloci.len());
        self.subloci = subloci;
        self.subloci_defined = true;
        Ok(())
    }

    /// Extract the monosubloci of every sublocus; their scores are copied
    /// back onto the superlocus transcripts.
    pub fn define_monosubloci(&mut self, ctx: &PickContext) -> Result<(), Error> {
        if self.monosubloci_defined {
            return Ok(());
        }
        self.define_subloci(ctx)?;

        let mut purged = Vec::new();
        for sublocus in &mut self.subloci {
            let (monosubloci, excluded) = sublocus.define_monosubloci(ctx)?;
            for t in sublocus.transcripts() {
                if let Some(own) = self.container.transcripts.get_mut(&t.id) {
                    own.score = t.score;
                    own.scores = t.scores.clone();
                }
            }
            self.monosubloci.extend(monosubloci);
            purged.extend(excluded);
        }
        for t in purged {
            self.exclude(t)?;
        }
        self.monosubloci.sort_by_key(|m| (m.start, m.end));
        self.monosubloci_defined = true;
        Ok(())
    }

    /// Merge monosubloci into holders and draw the final loci; then add
    /// alternative isoforms when configured.
    pub fn define_loci(&mut self, ctx: &PickContext) -> Result<(), Error> {
        if self.loci_defined {
            return Ok(());
        }
        self.define_monosubloci(ctx)?;

        let mut holders = group_monosubloci(&self.container, &self.monosubloci)?;
        let mut loci = Vec::new();
        let mut purged = Vec::new();
        for holder in &mut holders {
            let (found, excluded) = holder.define_loci(ctx)?;
            loci.extend(found);
            purged.extend(excluded);
        }
        loci.sort_by(|a, b| (a.start, a.end, &a.primary).cmp(&(b.start, b.end, &b.primary)));
        self.holders = holders;
        self.loci = loci;
        for t in purged {
            self.exclude(t)?;
        }

        if ctx.config.alternative_splicing.report {
            self.define_alternative_splicing(ctx)?;
        }
        log::debug!("{}: {} loci", self.id(), self.loci.len());
        self.loci_defined = true;
        Ok(())
    }

    /// Offer every non-primary transcript to the single locus whose primary
    /// it shares a holder clique with, best scoring first.
    pub fn define_alternative_splicing(&mut self, ctx: &PickContext) -> Result<(), Error> {
        let cds_only = self.container.cds_only;
        let graph = OverlapGraph::build(self.container.transcripts(), |a, b| holder_intersecting(a, b, cds_only));
        let cliques = graph.cliques();
        let primaries: BTreeSet<&str> = self.loci.iter().filter_map(|l| l.primary.as_deref()).collect();

        let candidate_sets: Vec<BTreeSet<&str>> = self
            .loci
            .iter()
            .map(|locus| {
                let Some(primary) = &locus.primary else {
                    return BTreeSet::new();
                };
                cliques
                    .iter()
                    .filter(|clique| clique.contains(primary))
                    .flatten()
                    .map(String::as_str)
                    .filter(|tid| !primaries.contains(tid))
                    .collect()
            })
            .collect();

        let mut candidates: Vec<Vec<Transcript>> = vec![Vec::new(); self.loci.len()];
        for t in self.container.transcripts() {
            if primaries.contains(t.id.as_str()) {
                continue;
            }
            let hosts: Vec<usize> = candidate_sets
                .iter()
                .enumerate()
                .filter(|(_, set)| set.contains(t.id.as_str()))
                .map(|(i, _)| i)
                .collect();
            if let [only] = hosts[..] {
                candidates[only].push(t.clone());
            }
        }

        for (locus, mut offered) in self.loci.iter_mut().zip(candidates) {
            offered.sort_by(|a, b| b.score.total_cmp(&a.score));
            for t in offered {
                locus.add_transcript_to_locus(t, ctx)?;
            }
            locus.finalize_alternative_splicing(ctx)?;
        }
        Ok(())
    }

    /// Deepest level defined so far.
    fn furthest_level(&self) -> Level {
        if self.loci_defined {
            Level::Loci
        } else if self.monosubloci_defined {
            Level::Monosubloci
        } else {
            Level::Subloci
        }
    }

    fn define_level(&mut self, level: Level, ctx: &PickContext) -> Result<(), Error> {
        match level {
            Level::Subloci => self.define_subloci(ctx),
            Level::Monosubloci => self.define_monosubloci(ctx),
            Level::Loci => self.define_loci(ctx),
        }
    }

    fn children_mut(&mut self, level: Level) -> &mut Vec<LocusContainer> {
        match level {
            Level::Subloci => &mut self.subloci,
            Level::Monosubloci => &mut self.monosubloci,
            Level::Loci => &mut self.loci,
        }
    }

    /// GFF3 text of `level` (or the deepest level defined), defining it if
    /// needed. Empty when there is nothing to report.
    pub fn format(&mut self, level: Option<Level>, print_cds: bool, ctx: &PickContext) -> Result<String, Error> {
        let level = level.unwrap_or_else(|| self.furthest_level());
        self.define_level(level, ctx)?;

        let source = format!("{}_{level}", self.container.source);
        let new_id = format!("{}_{}", self.container.source, self.id());
        let mut line = GffLine::new(
            &self.container.chrom,
            &source,
            Stage::Superlocus.name(),
            self.container.start,
            self.container.end,
            self.container.strand,
        )
        .with_attribute("ID", &new_id);
        if self.approximation_level > 0 {
            line = line.with_attribute("approximation_level", self.approximation_level);
        }
        if !self.retained_sources.is_empty() {
            line = line.with_attribute("retained_sources", self.retained_sources.iter().cloned().collect::<Vec<_>>().join(","));
        }

        let children = self.children_mut(level);
        if children.is_empty() {
            return Ok(String::new());
        }
        let mut lines = vec![line.to_string()];
        let mut found: BTreeMap<String, usize> = BTreeMap::new();
        for child in children.iter_mut() {
            child.parent = Some(new_id.clone());
            child.counter = 0;
            let count = found.entry(child.id()).or_insert(0);
            child.counter = *count;
            *count += 1;
            lines.extend(child.gff_lines(&source, print_cds).iter().map(ToString::to_string));
        }
        lines.push("###".to_string());
        Ok(lines.join("\n"))
    }

    /// Metric rows of every child at `level`.
    pub fn metric_rows(&mut self, level: Level, ctx: &PickContext) -> Result<Vec<IndexMap<String, String>>, Error> {
        self.rows(level, ctx, LocusContainer::metric_rows)
    }

    /// Score rows of every child at `level`.
    pub fn score_rows(&mut self, level: Level, ctx: &PickContext) -> Result<Vec<IndexMap<String, String>>, Error> {
        self.rows(level, ctx, LocusContainer::score_rows)
    }

    fn rows(
        &mut self,
        level: Level,
        ctx: &PickContext,
        producer: fn(&mut LocusContainer, &PickContext) -> Result<Vec<IndexMap<String, String>>, Error>,
    ) -> Result<Vec<IndexMap<String, String>>, Error> {
        self.define_level(level, ctx)?;
        let children = match level {
            Level::Monosubloci => &mut self.holders,
            other => self.children_mut(other),
        };
        let mut rows = Vec::new();
        for child in children.iter_mut() {
            rows.extend(producer(child, ctx)?);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PickConfig;
    use crate::evidence::{EvidenceStore, Junction};
    use crate::interval::Interval;
    use crate::loci::container::tests::context;
    use crate::scoring::expression::Expression;
    use crate::transcript::orf::Orf;
    use crate::transcript::test_transcript;

    fn two_genes() -> Vec<Transcript> {
        vec![
            test_transcript("a1", Strand::Plus, &[(100, 200), (300, 400), (600, 700)], &[(150, 200), (300, 400), (600, 648)]),
            test_transcript("a2", Strand::Plus, &[(120, 200), (300, 400), (600, 650)], &[(150, 200), (300, 400), (600, 648)]),
            test_transcript("b1", Strand::Minus, &[(650, 800), (900, 1000)], &[(700, 800), (900, 948)]),
            test_transcript("far", Strand::Plus, &[(5000, 5300)], &[]),
        ]
    }

    #[test]
    fn grouping_and_strand_split() {
        let superloci = Superlocus::group(two_genes(), "pick").unwrap();
        assert_eq!(superloci.len(), 2);
        assert_eq!(superloci[0].len(), 3);
        assert!(!superloci[0].stranded());

        let split = superloci.into_iter().next().unwrap().split_strands().unwrap();
        assert_eq!(split.len(), 2);
        assert!(split.iter().all(Superlocus::stranded));
        let plus = split.iter().find(|s| s.container().strand == Strand::Plus).unwrap();
        assert_eq!(plus.len(), 2);
    }

    #[test]
    fn invalid_transcripts_are_dropped() {
        let mut broken = test_transcript("broken", Strand::Plus, &[(100, 200), (300, 400)], &[]);
        broken.add_exon(Interval::new(150, 350));
        let superloci = Superlocus::group(vec![broken], "pick").unwrap();
        assert!(superloci.is_empty());
    }

    #[test]
    fn states_are_idempotent() {
        let ctx = context();
        let mut superlocus = Superlocus::group(two_genes(), "pick")
            .unwrap()
            .remove(0)
            .split_strands()
            .unwrap()
            .into_iter()
            .find(|s| s.container().strand == Strand::Plus)
            .unwrap();
        superlocus.define_loci(&ctx).unwrap();
        assert!(superlocus.subloci_defined() && superlocus.monosubloci_defined() && superlocus.loci_defined());
        let loci = superlocus.loci.len();
        superlocus.define_loci(&ctx).unwrap();
        superlocus.define_subloci(&ctx).unwrap();
        assert_eq!(superlocus.loci.len(), loci);
        assert_eq!(superlocus.subloci.len(), 1);
        assert_eq!(loci, 1);
    }

    #[test]
    fn format_levels() {
        let ctx = context();
        let mut superlocus = Superlocus::new(two_genes().remove(0), true).unwrap().with_source("pick");
        let loci = superlocus.format(Some(Level::Loci), true, &ctx).unwrap();
        let first = loci.lines().next().unwrap();
        assert!(first.contains("\tpick_loci\tsuperlocus\t100\t700\t.\t+\t"));
        assert!(first.contains("ID=pick_superlocus:chr1+:100-700"));
        assert!(loci.contains("\tgene\t"));
        assert!(loci.ends_with("###"));

        let subloci = superlocus.format(Some(Level::Subloci), false, &ctx).unwrap();
        assert!(subloci.contains("\tsublocus\t"));
        assert!(!subloci.contains("\tCDS\t"));
        assert_eq!(superlocus.format(None, true, &ctx).unwrap(), loci);
        assert_eq!("monosubloci".parse::<Level>().unwrap(), Level::Monosubloci);
        assert!("genes".parse::<Level>().is_err());
    }

    #[test]
    fn purge_moves_failures_to_excluded() {
        let mut config = PickConfig::default();
        config.requirements = Some(Expression::parse("exon_num > 1").unwrap());
        let ctx = PickContext::new(config);
        let mut superlocus = Superlocus::group(two_genes(), "pick").unwrap().remove(1);
        superlocus.define_loci(&ctx).unwrap();
        assert!(superlocus.loci.is_empty());
        let excluded = superlocus.excluded.as_ref().unwrap();
        assert!(excluded.contains("far"));
        assert_eq!(excluded.get("far").unwrap().score, 0.0);
    }

    #[test]
    fn alternative_isoform_joins_the_locus() {
        let mut config = PickConfig::default();
        config.alternative_splicing.only_confirmed_introns = false;
        config.alternative_splicing.min_score_perc = 0.0;
        let ctx = PickContext::new(config);
        let transcripts = vec![
            test_transcript("p", Strand::Plus, &[(100, 200), (300, 400), (600, 700)], &[(150, 200), (300, 400), (600, 648)]),
            test_transcript(
                "alt",
                Strand::Plus,
                &[(100, 200), (300, 340), (360, 400), (600, 700)],
                &[(150, 200), (300, 340), (360, 400), (600, 649)],
            ),
        ];
        let mut superlocus = Superlocus::group(transcripts, "pick").unwrap().remove(0).split_strands().unwrap().remove(0);
        superlocus.define_loci(&ctx).unwrap();
        assert_eq!(superlocus.loci.len(), 1);
        assert_eq!(superlocus.loci[0].len(), 2);
        assert_eq!(superlocus.metric_rows(Level::Loci, &ctx).unwrap().len(), 2);
        assert_eq!(superlocus.score_rows(Level::Subloci, &ctx).unwrap().len(), 2);
    }

    #[test]
    fn evidence_is_loaded_once() {
        let ctx = context();
        let mut t = test_transcript("t1", Strand::Plus, &[(100, 200), (300, 400)], &[]);
        t.source = "assembler".to_string();
        let mut store = EvidenceStore::default();
        store.junctions.push(Junction {
            chrom: "chr1".to_string(),
            start: 201,
            end: 299,
            strand: Strand::Plus,
        });
        store.orfs.insert("t1".to_string(), vec![Orf::new("t1.orf", 51, 152)]);
        let nc = test_transcript("nc", Strand::Plus, &[(150, 200), (300, 350)], &[]);

        let mut superlocus = Superlocus::group(vec![t, nc], "pick").unwrap().remove(0).split_strands().unwrap().remove(0);
        superlocus.load_transcript_data(&store, &ctx).unwrap();
        let loaded = superlocus.get("t1").unwrap();
        assert!(loaded.is_coding());
        assert_eq!(loaded.verified_introns.len(), 1);
        assert_eq!(superlocus.get("nc").unwrap().feature, Feature::NcRna);
        assert_eq!(superlocus.container().verified_introns().len(), 1);

        store.junctions.clear();
        superlocus.load_transcript_data(&store, &ctx).unwrap();
        assert_eq!(superlocus.get("t1").unwrap().verified_introns.len(), 1);
    }

    #[test]
    fn chimeras_are_split_on_load() {
        let ctx = context();
        let t = test_transcript("chim", Strand::Plus, &[(1, 600), (800, 1400)], &[]);
        let mut store = EvidenceStore::default();
        store.orfs.insert(
            "chim".to_string(),
            vec![Orf::new("o1", 11, 310), Orf::new("o2", 701, 1099)],
        );
        let mut superlocus = Superlocus::new(t, true).unwrap();
        superlocus.load_transcript_data(&store, &ctx).unwrap();
        assert_eq!(superlocus.len(), 2);
        assert!(superlocus.get("chim").is_none());
        assert!(superlocus.transcripts().all(Transcript::is_coding));
    }
}
