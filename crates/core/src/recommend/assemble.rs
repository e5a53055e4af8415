//! Joins ranked candidates with live quotes. Each candidate resolves
//! independently so one bad instrument never blocks the rest.

use crate::domain::recommendation::{RankedCandidate, Recommendation};
use crate::market::TieredResolver;
use std::sync::Arc;
use tokio::task::JoinSet;

pub struct Assembler {
    resolver: Arc<TieredResolver>,
}

impl Assembler {
    pub fn new(resolver: Arc<TieredResolver>) -> Self {
        Self { resolver }
    }

    /// Resolve quotes for every candidate concurrently and return the
    /// joined recommendations in scorer rank order. Candidates whose
    /// code turns out to be unknown are dropped with a warning.
    pub async fn assemble(&self, candidates: &[RankedCandidate]) -> Vec<Recommendation> {
        let mut tasks = JoinSet::new();
        for (idx, candidate) in candidates.iter().enumerate() {
            let resolver = Arc::clone(&self.resolver);
            let code = candidate.instrument.code.clone();
            tasks.spawn(async move { (idx, resolver.resolve(&code).await) });
        }

        let mut slots: Vec<Option<Recommendation>> = vec![None; candidates.len()];
        while let Some(joined) = tasks.join_next().await {
            let Ok((idx, resolved)) = joined else {
                continue;
            };
            match resolved {
                Ok(quote) => {
                    slots[idx] = Some(Recommendation::from_candidate(&candidates[idx], quote));
                }
                Err(err) => {
                    tracing::warn!(
                        code = %candidates[idx].instrument.code,
                        error = %err,
                        "dropping candidate without a resolvable quote"
                    );
                }
            }
        }

        slots.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::Instrument;
    use crate::domain::recommendation::{DimensionVector, SourceTier};
    use crate::market::provider::{QuoteProvider, QuoteRow};
    use crate::store::table::Table;
    use crate::store::FundamentalsStore;
    use anyhow::{anyhow, Result};
    use chrono::NaiveDate;
    use std::time::Duration;

    struct PerCodeProvider;

    #[async_trait::async_trait]
    impl QuoteProvider for PerCodeProvider {
        fn provider_name(&self) -> &'static str {
            "per_code"
        }

        async fn fetch_quote(&self, code: &str, _as_of: NaiveDate) -> Result<QuoteRow> {
            match code {
                "069500" => Ok(QuoteRow {
                    price: 36000.0,
                    volume: 5.2e6,
                }),
                "360750" => Err(anyhow!("source unavailable")),
                _ => Err(anyhow!("unknown code")),
            }
        }
    }

    fn candidate(rank: u32, code: &str, composite: f64) -> RankedCandidate {
        RankedCandidate {
            rank,
            instrument: Instrument {
                code: code.to_string(),
                name: format!("FUND {code}"),
                tags: vec![],
                risk_tier: 2,
                return_1y: None,
                volatility: None,
                expense_ratio: None,
                aum: None,
                avg_volume: None,
                last_close: Some(10000.0),
            },
            composite,
            breakdown: DimensionVector::default(),
        }
    }

    fn resolver() -> Arc<TieredResolver> {
        let fundamentals = Arc::new(FundamentalsStore::from_table(&Table::parse(
            b"code,name,risk_tier,last_close\n069500,KODEX 200,3,36000\n360750,TIGER S&P500,3,19500\n",
        )));
        Arc::new(TieredResolver::with_attempt_timeout(
            vec![(
                SourceTier::Primary,
                Arc::new(PerCodeProvider) as Arc<dyn QuoteProvider>,
            )],
            fundamentals,
            Duration::from_millis(50),
        ))
    }

    #[tokio::test]
    async fn preserves_scorer_rank_order() {
        let assembler = Assembler::new(resolver());
        let candidates = vec![
            candidate(1, "360750", 0.9),
            candidate(2, "069500", 0.8),
        ];

        let got = assembler.assemble(&candidates).await;
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].code, "360750");
        assert_eq!(got[0].quote.source_tier, SourceTier::Static);
        assert_eq!(got[1].code, "069500");
        assert_eq!(got[1].quote.source_tier, SourceTier::Primary);
        assert_eq!(got[1].quote.price, 36000.0);
    }

    #[tokio::test]
    async fn unknown_candidate_is_dropped_not_fatal() {
        let assembler = Assembler::new(resolver());
        let candidates = vec![
            candidate(1, "069500", 0.9),
            candidate(2, "999999", 0.8),
        ];

        let got = assembler.assemble(&candidates).await;
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].code, "069500");
    }

    #[tokio::test]
    async fn empty_candidate_list_assembles_empty() {
        let assembler = Assembler::new(resolver());
        let got = assembler.assemble(&[]).await;
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn repeated_assembly_is_stable() {
        let assembler = Assembler::new(resolver());
        let candidates = vec![
            candidate(1, "069500", 0.9),
            candidate(2, "360750", 0.8),
        ];
        let a = assembler.assemble(&candidates).await;
        let b = assembler.assemble(&candidates).await;
        let codes_a: Vec<_> = a.iter().map(|r| r.code.clone()).collect();
        let codes_b: Vec<_> = b.iter().map(|r| r.code.clone()).collect();
        assert_eq!(codes_a, codes_b);
    }
}
