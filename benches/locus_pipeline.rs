use criterion::{Criterion, criterion_group, criterion_main};

use locus_picker::config::PickConfig;
use locus_picker::context::PickContext;
use locus_picker::interval::Interval;
use locus_picker::loci::Superlocus;
use locus_picker::strand::Strand;
use locus_picker::transcript::Transcript;

const GENES: i32 = 20;
const ISOFORMS: i32 = 12;

/// Separate genes, each with isoforms that vary their terminal exons and
/// skip or shorten the middle exon.
fn synthetic_transcripts() -> Vec<Transcript> {
    let mut transcripts = Vec::new();
    for gene in 0..GENES {
        let base = 1_000 + gene * 2_500;
        for isoform in 0..ISOFORMS {
            let shift = isoform * 10;
            let mut exons = vec![(base + shift, base + 300)];
            match isoform % 3 {
                0 => exons.push((base + 500, base + 800)),
                1 => exons.push((base + 560, base + 800)),
                _ => {}
            }
            exons.push((base + 1_000, base + 1_600 + shift * 3));
            let id = format!("g{gene}.t{isoform}");
            let start = exons[0].0;
            let end = exons[exons.len() - 1].1;
            let mut t = Transcript::new(&id, "chr1", Strand::Plus, start, end);
            t.source = if isoform % 2 == 0 { "st" } else { "cl" }.to_string();
            t.add_exons(exons.iter().map(|&e| Interval::from(e)));
            t.add_cds(Interval::new(base + 150, base + 296), None);
            transcripts.push(t);
        }
    }
    transcripts
}

fn bench_define_loci(c: &mut Criterion) {
    let ctx = PickContext::new(PickConfig::default());
    let transcripts = synthetic_transcripts();

    c.bench_function("define_loci (240 transcripts)", |b| {
        b.iter(|| {
            for superlocus in Superlocus::group(transcripts.clone(), "bench").unwrap() {
                for mut stranded in superlocus.split_strands().unwrap() {
                    stranded.define_loci(&ctx).unwrap();
                    assert!(!stranded.loci.is_empty());
                }
            }
        });
    });
}

criterion_group!(benches, bench_define_loci);
criterion_main!(benches);
