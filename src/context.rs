//! Collaborator handles passed into every pipeline entry point.

use std::sync::Arc;

use crate::config::PickConfig;
use crate::scoring::Regressor;
use crate::sequence::GenomeSequence;

/// Shared, read-only state for picking loci.
#[derive(Clone, Default)]
pub struct PickContext {
    pub config: Arc<PickConfig>,
    /// Replaces the weighted rules when present.
    pub regressor: Option<Arc<dyn Regressor + Send + Sync>>,
    /// Needed to re-express ORFs of padded coding transcripts.
    pub genome: Option<Arc<dyn GenomeSequence + Send + Sync>>,
}

impl PickContext {
    #[must_use]
    pub fn new(config: PickConfig) -> Self {
        Self {
            config: Arc::new(config),
            regressor: None,
            genome: None,
        }
    }

    #[must_use]
    pub fn with_regressor(mut self, regressor: Arc<dyn Regressor + Send + Sync>) -> Self {
        self.regressor = Some(regressor);
        self
    }

    #[must_use]
    pub fn with_genome(mut self, genome: Arc<dyn GenomeSequence + Send + Sync>) -> Self {
        self.genome = Some(genome);
        self
    }
}

impl std::fmt::Debug for PickContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickContext")
            .field("config", &self.config)
            .field("regressor", &self.regressor.is_some())
            .field("genome", &self.genome.is_some())
            .finish()
    }
}
