//! Error types for the locus picker library.

use thiserror::Error;

/// Errors that can occur while building, finalizing or grouping transcripts.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A parse error occurred while reading input data.
    #[error("{0}")]
    Parse(String),

    /// A validation constraint was violated.
    #[error("{0}")]
    Validation(String),

    /// Structural problem with a transcript: missing or overlapping exons,
    /// exons outside the transcript bounds, multi-exonic without a strand.
    #[error("invalid transcript: {0}")]
    InvalidTranscript(String),

    /// Coding annotation that cannot be reconciled with the exon structure.
    /// Callers usually recover by stripping the CDS.
    #[error("invalid CDS: {0}")]
    InvalidCds(String),

    /// A transcript was added to a locus it does not belong to.
    #[error("transcript not in locus: {0}")]
    NotInLocus(String),

    /// Two input transcripts share the same identifier.
    #[error("redundant transcript names: {0}")]
    RedundantNames(String),

    /// An input assembly could not be used at all.
    #[error("invalid assembly: {0}")]
    InvalidAssembly(String),

    /// A requirement or fragment expression is malformed or refers to an unknown metric.
    #[error("invalid expression: {0}")]
    Expression(String),
}
