//! Ranks the scored instrument universe for one user profile.

use crate::domain::error::CoreError;
use crate::domain::instrument::Instrument;
use crate::domain::profile::UserProfile;
use crate::domain::recommendation::{DimensionVector, RankedCandidate};
use crate::store::{FundamentalsStore, ScoreCache};
use std::sync::Arc;

pub struct RecommendationScorer {
    fundamentals: Arc<FundamentalsStore>,
    scores: Arc<ScoreCache>,
}

impl RecommendationScorer {
    pub fn new(fundamentals: Arc<FundamentalsStore>, scores: Arc<ScoreCache>) -> Self {
        Self {
            fundamentals,
            scores,
        }
    }

    /// Score and rank candidates for `profile`.
    ///
    /// The keyword filter is advisory: when it matches nothing, the
    /// risk-filtered universe is ranked instead so the user still
    /// gets suggestions. An empty universe is an empty result, not an
    /// error.
    pub fn score(
        &self,
        profile: &UserProfile,
        keyword: &str,
        top_n: usize,
    ) -> Result<Vec<RankedCandidate>, CoreError> {
        let ceiling = profile.risk_ceiling();
        let eligible: Vec<(&Instrument, DimensionVector)> = self
            .fundamentals
            .iter()
            .filter(|i| i.risk_tier <= ceiling)
            .filter_map(|i| self.scores.get(&i.code).map(|b| (i, *b)))
            .collect();

        let mut pool: Vec<(&Instrument, DimensionVector)> = eligible
            .iter()
            .filter(|(i, _)| i.matches_keyword(keyword))
            .cloned()
            .collect();
        if pool.is_empty() && !keyword.trim().is_empty() {
            tracing::info!(keyword, "keyword matched nothing, ranking full universe");
            pool = eligible;
        }

        let weights = profile.archetype.weights();
        let mut ranked: Vec<(f64, &Instrument, DimensionVector)> = pool
            .into_iter()
            .map(|(i, breakdown)| (breakdown.dot(&weights), i, breakdown))
            .collect();

        // total_cmp keeps the order total even if a cache row carries
        // a non-finite score.
        ranked.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| {
                    let ra = a.1.return_1y.unwrap_or(f64::NEG_INFINITY);
                    let rb = b.1.return_1y.unwrap_or(f64::NEG_INFINITY);
                    rb.total_cmp(&ra)
                })
                .then_with(|| a.1.risk_tier.cmp(&b.1.risk_tier))
                .then_with(|| a.1.code.cmp(&b.1.code))
        });

        Ok(ranked
            .into_iter()
            .take(top_n.max(1))
            .enumerate()
            .map(|(idx, (composite, instrument, breakdown))| RankedCandidate {
                rank: idx as u32 + 1,
                instrument: instrument.clone(),
                composite,
                breakdown,
            })
            .collect())
    }
}
