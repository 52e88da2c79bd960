use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use flate2::read::MultiGzDecoder;
use indexmap::IndexMap;

use locus_picker::cli;
use locus_picker::config::PickConfig;
use locus_picker::context::PickContext;
use locus_picker::evidence::EvidenceStore;
use locus_picker::loci::{Level, Superlocus, flag_fragments};
use locus_picker::prepare::{deduplicate, merge_assemblies, prepare_records};
use locus_picker::sequence::InMemoryGenome;
use locus_picker::transcript::types::TranscriptRecord;

const LEVELS: [Level; 3] = [Level::Loci, Level::Subloci, Level::Monosubloci];

#[derive(Parser)]
#[command(name = "pick", about = "Consolidate transcript assemblies into non-redundant loci")]
struct Cli {
    /// Transcript records, one JSON object per line (optionally gzipped)
    #[arg(short = 'i', long = "input", required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// Source label for each input, in the same order
    #[arg(short = 'l', long = "label", num_args = 1..)]
    labels: Vec<String>,

    /// Path to the JSON configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// JSON evidence store with junctions, ORFs and homology hits
    #[arg(short = 'e', long = "evidence")]
    evidence: Option<PathBuf>,

    /// Genome FASTA (optionally gzipped), needed to pad coding transcripts
    #[arg(short = 'g', long = "genome")]
    genome: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'o', long = "out")]
    out: PathBuf,

    /// Source column of the output GFF3 files
    #[arg(long = "source", default_value = "pick")]
    source: String,

    /// Omit CDS and UTR features from the output
    #[arg(long = "no-cds")]
    no_cds: bool,
}

fn open_maybe_gz(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(MultiGzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

fn read_records(path: &Path) -> Result<Vec<TranscriptRecord>> {
    let reader = BufReader::new(open_maybe_gz(path)?);
    let mut records = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: TranscriptRecord = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid transcript record", path.display(), line_num + 1))?;
        records.push(record);
    }
    Ok(records)
}

fn write_tsv(path: &Path, rows: &[IndexMap<String, String>]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    if let Some(first) = rows.first() {
        let header: Vec<&str> = first.keys().map(String::as_str).collect();
        writeln!(writer, "{}", header.join("\t"))?;
        for row in rows {
            let fields: Vec<&str> = header
                .iter()
                .map(|key| row.get(*key).map_or("NA", String::as_str))
                .collect();
            writeln!(writer, "{}", fields.join("\t"))?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let start = Instant::now();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli_args = Cli::parse();

    cli::banner("Pick");

    // ── Configuration ────────────────────────────────────
    cli::section("Configuration");

    let config = match &cli_args.config {
        Some(path) => {
            cli::kv("Config", &path.display().to_string());
            PickConfig::from_file(path)?
        }
        None => {
            cli::kv("Config", "built-in defaults");
            PickConfig::default()
        }
    };
    let labels = if cli_args.labels.is_empty() {
        config.prepare.labels.clone()
    } else {
        cli_args.labels.clone()
    };
    if !labels.is_empty() && labels.len() != cli_args.inputs.len() {
        bail!("{} labels given for {} inputs", labels.len(), cli_args.inputs.len());
    }
    fs::create_dir_all(&cli_args.out)
        .with_context(|| format!("failed to create directory: {}", cli_args.out.display()))?;
    cli::kv("Output", &cli_args.out.display().to_string());
    cli::kv("Purge", &config.run_options.purge.to_string());
    cli::kv("Alternative splicing", &config.alternative_splicing.report.to_string());

    eprintln!();

    // ── Input ────────────────────────────────────────────
    cli::section("Input");

    let mut assemblies = Vec::with_capacity(cli_args.inputs.len());
    for (index, path) in cli_args.inputs.iter().enumerate() {
        let label = labels.get(index).map_or("", String::as_str);
        let records = read_records(path)?;
        let count = records.len();
        let prepared = prepare_records(records, label, config.prepare.min_length)
            .with_context(|| format!("failed to prepare {}", path.display()))?;
        cli::kv(
            if label.is_empty() { "Transcripts" } else { label },
            &format!("{} ({} of {count} kept)", path.display(), prepared.len()),
        );
        assemblies.push(prepared);
    }
    let transcripts = deduplicate(merge_assemblies(assemblies)?);
    cli::kv("Unique transcripts", &transcripts.len().to_string());

    let evidence = match &cli_args.evidence {
        Some(path) => {
            let store = EvidenceStore::from_reader(BufReader::new(open_maybe_gz(path)?))
                .with_context(|| format!("failed to load evidence from {}", path.display()))?;
            cli::kv(
                "Evidence",
                &format!("{} ({} junctions, {} ORF sets)", path.display(), store.junctions.len(), store.orfs.len()),
            );
            store
        }
        None => EvidenceStore::default(),
    };

    let mut ctx = PickContext::new(config);
    if let Some(path) = &cli_args.genome {
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let genome = InMemoryGenome::from_fasta(file)?;
        cli::kv("Genome", &format!("{} ({} sequences)", path.display(), genome.len()));
        ctx = ctx.with_genome(Arc::new(genome));
    } else if ctx.config.alternative_splicing.pad {
        cli::warning("no genome given: coding transcripts will not be padded");
    }

    eprintln!();

    // ── Picking ──────────────────────────────────────────
    cli::section("Picking");

    let mut picked: Vec<Superlocus> = Vec::new();
    for mut superlocus in Superlocus::group(transcripts, &cli_args.source)? {
        superlocus.load_transcript_data(&evidence, &ctx)?;
        let mut stranded = superlocus.split_strands()?;
        for superlocus in &mut stranded {
            superlocus.define_loci(&ctx)?;
        }

        let counts: Vec<usize> = stranded.iter().map(|s| s.loci.len()).collect();
        let mut loci: Vec<_> = stranded.iter_mut().flat_map(|s| std::mem::take(&mut s.loci)).collect();
        flag_fragments(&mut loci, &ctx)?;
        let mut loci = loci.into_iter();
        for (superlocus, count) in stranded.iter_mut().zip(counts) {
            superlocus.loci = loci.by_ref().take(count).collect();
        }
        picked.extend(stranded);
    }

    let locus_count: usize = picked.iter().map(|s| s.loci.len()).sum();
    let fragments = picked
        .iter()
        .flat_map(|s| &s.loci)
        .filter(|l| l.attributes.get("is_fragment").is_some_and(|v| v == "True"))
        .count();
    cli::kv("Superloci", &picked.len().to_string());
    cli::kv("Loci", &locus_count.to_string());
    cli::kv("Fragments", &fragments.to_string());

    eprintln!();

    // ── Output ───────────────────────────────────────────
    cli::section("Output");

    for level in LEVELS {
        let gff_path = cli_args.out.join(format!("{level}.gff3"));
        let file = File::create(&gff_path).with_context(|| format!("failed to create {}", gff_path.display()))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "##gff-version 3")?;
        let mut metrics = Vec::new();
        let mut scores = Vec::new();
        for superlocus in &mut picked {
            let text = superlocus.format(Some(level), !cli_args.no_cds, &ctx)?;
            if !text.is_empty() {
                writeln!(writer, "{text}")?;
            }
            metrics.extend(superlocus.metric_rows(level, &ctx)?);
            scores.extend(superlocus.score_rows(level, &ctx)?);
        }
        writer.flush()?;
        write_tsv(&cli_args.out.join(format!("{level}.metrics.tsv")), &metrics)?;
        write_tsv(&cli_args.out.join(format!("{level}.scores.tsv")), &scores)?;
        cli::kv(level.name(), &gff_path.display().to_string());
    }

    cli::success("Done");
    cli::print_summary(start);
    Ok(())
}
