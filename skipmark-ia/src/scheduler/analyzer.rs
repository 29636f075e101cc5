//! Season analysis with eligibility rules

use crate::models::{QueuedEpisode, SeasonKey};
use crate::services::intro_detection::{AnalysisError, FingerprintService};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Group analyzer: applies eligibility rules, then drives the
/// fingerprinting service over an eligible season
pub struct SeasonAnalyzer {
    service: Arc<dyn FingerprintService>,
}

impl SeasonAnalyzer {
    /// Create an analyzer over the given fingerprinting service
    pub fn new(service: Arc<dyn FingerprintService>) -> Self {
        Self { service }
    }

    /// Analyze one verified season, returning how many episodes count as
    /// processed
    ///
    /// Eligibility, in order:
    /// - a season of size 0 or 1 needs no comparative fingerprinting and
    ///   counts as trivially analyzed;
    /// - the Specials group (season 0) is excluded unless opted in;
    /// - otherwise every member is fingerprinted and the member count is
    ///   returned. Fingerprinting failures propagate to the orchestrator.
    pub async fn analyze(
        &self,
        key: &SeasonKey,
        episodes: &[QueuedEpisode],
        analyze_specials: bool,
        token: &CancellationToken,
    ) -> Result<usize, AnalysisError> {
        if episodes.len() <= 1 {
            return Ok(episodes.len());
        }

        if key.is_specials() && !analyze_specials {
            tracing::debug!(season = %key, "Specials analysis disabled, excluding season");
            return Ok(0);
        }

        self.service
            .analyze_season(key, episodes, token.clone())
            .await?;

        Ok(episodes.len())
    }
}
