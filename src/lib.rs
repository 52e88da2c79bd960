//! Locus picker: consolidation of overlapping transcript assemblies into
//! non-redundant loci with a primary transcript and validated isoforms.

pub mod error;

pub mod cli;
pub mod codon;
pub mod compare;
pub mod config;
pub mod context;
pub mod evidence;
pub mod fasta;
pub mod gff;
pub mod graph;
pub mod homology;
pub mod interval;
pub mod loci;
pub mod prepare;
pub mod scoring;
pub mod sequence;
pub mod strand;
pub mod transcript;
