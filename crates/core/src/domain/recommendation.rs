use crate::domain::instrument::Instrument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-instrument scores over the five fixed scoring dimensions.
///
/// The dimension set is closed: every cache record carries all five
/// values, with unreported dimensions stored as 0.0 rather than
/// omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionVector {
    #[serde(default)]
    pub ret: f64,
    #[serde(default)]
    pub risk_adjusted: f64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub liquidity: f64,
    #[serde(default)]
    pub stability: f64,
}

impl DimensionVector {
    pub fn dot(&self, weights: &DimensionVector) -> f64 {
        self.ret * weights.ret
            + self.risk_adjusted * weights.risk_adjusted
            + self.cost * weights.cost
            + self.liquidity * weights.liquidity
            + self.stability * weights.stability
    }

    pub fn sum(&self) -> f64 {
        self.ret + self.risk_adjusted + self.cost + self.liquidity + self.stability
    }
}

/// Which rung of the fallback cascade produced a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    /// Domestic exchange feed.
    Primary,
    /// Cross-market aggregator.
    Secondary,
    /// Last known good quote from an earlier successful resolution.
    LastGood,
    /// Static default built from the fundamentals store.
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveQuote {
    pub code: String,
    pub price: f64,
    pub volume: f64,
    pub as_of: DateTime<Utc>,
    pub source_tier: SourceTier,
}

/// Scorer output: one candidate with its composite score and the
/// per-dimension breakdown that produced it. Rank is 1-based and
/// dense within a result set.
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub rank: u32,
    pub instrument: Instrument,
    pub composite: f64,
    pub breakdown: DimensionVector,
}

/// Assembler output: a ranked candidate joined with a live quote.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub rank: u32,
    pub code: String,
    pub name: String,
    pub risk_tier: u8,
    pub composite: f64,
    pub breakdown: DimensionVector,
    pub quote: LiveQuote,
}

impl Recommendation {
    pub fn from_candidate(candidate: &RankedCandidate, quote: LiveQuote) -> Self {
        Self {
            rank: candidate.rank,
            code: candidate.instrument.code.clone(),
            name: candidate.instrument.name.clone(),
            risk_tier: candidate.instrument.risk_tier,
            composite: candidate.composite,
            breakdown: candidate.breakdown,
            quote,
        }
    }
}
