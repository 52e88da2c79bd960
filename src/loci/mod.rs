//! The locus hierarchy: superloci, subloci, monosubloci, holders and loci.

pub mod container;
pub mod holder;
pub mod locus;
pub mod padding;
pub mod sublocus;
pub mod superlocus;

pub use container::{LocusContainer, Stage};
pub use locus::flag_fragments;
pub use superlocus::{Level, Superlocus};
