//! Tiered quote resolution. Live sources are tried in order with a
//! per-attempt timeout; every live failure is absorbed and the
//! cascade falls through to the last-good cache and finally a static
//! default built from fundamentals. The only error a caller can see
//! is NotFound for a code outside the instrument universe.

use crate::domain::error::CoreError;
use crate::domain::recommendation::{LiveQuote, SourceTier};
use crate::market::calendar;
use crate::market::provider::QuoteProvider;
use crate::store::FundamentalsStore;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 5;

pub struct TieredResolver {
    live: Vec<(SourceTier, Arc<dyn QuoteProvider>)>,
    fundamentals: Arc<FundamentalsStore>,
    attempt_timeout: Duration,

    // Last good live quote per code. Whole-quote inserts keep each
    // entry internally consistent; concurrent writers race benignly
    // (last write wins).
    cache: RwLock<HashMap<String, LiveQuote>>,
}

impl TieredResolver {
    pub fn new(
        live: Vec<(SourceTier, Arc<dyn QuoteProvider>)>,
        fundamentals: Arc<FundamentalsStore>,
    ) -> Self {
        let timeout_secs = std::env::var("QUOTE_ATTEMPT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_ATTEMPT_TIMEOUT_SECS);
        Self::with_attempt_timeout(live, fundamentals, Duration::from_secs(timeout_secs))
    }

    pub fn with_attempt_timeout(
        live: Vec<(SourceTier, Arc<dyn QuoteProvider>)>,
        fundamentals: Arc<FundamentalsStore>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            live,
            fundamentals,
            attempt_timeout,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a quote for `code`, walking the tiers in order.
    pub async fn resolve(&self, code: &str) -> Result<LiveQuote, CoreError> {
        let as_of = match calendar::latest_trading_date(Utc::now()) {
            Ok(d) => d,
            Err(err) => {
                // Calendar math only fails on an invalid offset; treat
                // it like a dead live tier rather than a hard error.
                tracing::warn!(error = %err, "trading date resolution failed");
                return self.resolve_offline(code).await;
            }
        };

        for (tier, provider) in &self.live {
            let attempt = tokio::time::timeout(
                self.attempt_timeout,
                provider.fetch_quote(code, as_of),
            )
            .await;

            match attempt {
                Ok(Ok(row)) => {
                    let quote = LiveQuote {
                        code: code.to_string(),
                        price: row.price,
                        volume: row.volume,
                        as_of: Utc::now(),
                        source_tier: *tier,
                    };
                    self.cache
                        .write()
                        .await
                        .insert(code.to_string(), quote.clone());
                    return Ok(quote);
                }
                Ok(Err(err)) => {
                    tracing::warn!(
                        code,
                        provider = provider.provider_name(),
                        error = %err,
                        "live quote source failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        code,
                        provider = provider.provider_name(),
                        timeout = ?self.attempt_timeout,
                        "live quote source timed out"
                    );
                }
            }
        }

        self.resolve_offline(code).await
    }

    /// Tiers 3 and 4: last-good cache, then the static default.
    async fn resolve_offline(&self, code: &str) -> Result<LiveQuote, CoreError> {
        if let Some(cached) = self.cache.read().await.get(code) {
            let mut quote = cached.clone();
            quote.source_tier = SourceTier::LastGood;
            return Ok(quote);
        }

        let Some(instrument) = self.fundamentals.get(code) else {
            return Err(CoreError::NotFound(code.to_string()));
        };

        Ok(LiveQuote {
            code: code.to_string(),
            price: instrument.last_close.unwrap_or(0.0),
            volume: 0.0,
            as_of: Utc::now(),
            source_tier: SourceTier::Static,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::provider::QuoteRow;
    use crate::store::table::Table;
    use anyhow::{anyhow, Result};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProvider {
        name: &'static str,
        price: f64,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn new(name: &'static str, price: f64) -> Self {
            Self {
                name,
                price,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl QuoteProvider for FixedProvider {
        fn provider_name(&self) -> &'static str {
            self.name
        }

        async fn fetch_quote(&self, _code: &str, _as_of: NaiveDate) -> Result<QuoteRow> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(QuoteRow {
                price: self.price,
                volume: 1000.0,
            })
        }
    }

    struct FailingProvider;

    #[async_trait::async_trait]
    impl QuoteProvider for FailingProvider {
        fn provider_name(&self) -> &'static str {
            "failing"
        }

        async fn fetch_quote(&self, _code: &str, _as_of: NaiveDate) -> Result<QuoteRow> {
            Err(anyhow!("source unavailable"))
        }
    }

    struct HangingProvider;

    #[async_trait::async_trait]
    impl QuoteProvider for HangingProvider {
        fn provider_name(&self) -> &'static str {
            "hanging"
        }

        async fn fetch_quote(&self, _code: &str, _as_of: NaiveDate) -> Result<QuoteRow> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    fn fundamentals() -> Arc<FundamentalsStore> {
        let table = Table::parse(
            b"code,name,tags,risk_tier,last_close\n069500,KODEX 200,,3,36000\n102780,KODEX \xec\x82\xbc\xec\x84\xb1\xea\xb7\xb8\xeb\xa3\xb9,,3,\n",
        );
        Arc::new(FundamentalsStore::from_table(&table))
    }

    fn resolver(
        live: Vec<(SourceTier, Arc<dyn QuoteProvider>)>,
    ) -> TieredResolver {
        TieredResolver::with_attempt_timeout(live, fundamentals(), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn primary_success_short_circuits_secondary() {
        let primary = Arc::new(FixedProvider::new("primary", 100.0));
        let secondary = Arc::new(FixedProvider::new("secondary", 200.0));
        let r = resolver(vec![
            (SourceTier::Primary, primary.clone() as Arc<dyn QuoteProvider>),
            (SourceTier::Secondary, secondary.clone() as Arc<dyn QuoteProvider>),
        ]);

        let quote = r.resolve("069500").await.unwrap();
        assert_eq!(quote.source_tier, SourceTier::Primary);
        assert_eq!(quote.price, 100.0);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn primary_failure_falls_through_to_secondary() {
        let r = resolver(vec![
            (SourceTier::Primary, Arc::new(FailingProvider) as Arc<dyn QuoteProvider>),
            (
                SourceTier::Secondary,
                Arc::new(FixedProvider::new("secondary", 200.0)) as Arc<dyn QuoteProvider>,
            ),
        ]);

        let quote = r.resolve("069500").await.unwrap();
        assert_eq!(quote.source_tier, SourceTier::Secondary);
        assert_eq!(quote.price, 200.0);
    }

    #[tokio::test]
    async fn slow_source_times_out_and_cascade_advances() {
        let r = resolver(vec![
            (SourceTier::Primary, Arc::new(HangingProvider) as Arc<dyn QuoteProvider>),
            (
                SourceTier::Secondary,
                Arc::new(FixedProvider::new("secondary", 200.0)) as Arc<dyn QuoteProvider>,
            ),
        ]);

        let quote = r.resolve("069500").await.unwrap();
        assert_eq!(quote.source_tier, SourceTier::Secondary);
    }

    #[tokio::test]
    async fn earlier_success_serves_last_good_after_outage() {
        let working: Arc<dyn QuoteProvider> = Arc::new(FixedProvider::new("primary", 100.0));
        let r = resolver(vec![(SourceTier::Primary, working)]);
        let first = r.resolve("069500").await.unwrap();
        assert_eq!(first.source_tier, SourceTier::Primary);

        // Simulate a full outage by rebuilding the live tier list as
        // failing while keeping the populated cache.
        let broken = TieredResolver {
            live: vec![(SourceTier::Primary, Arc::new(FailingProvider) as Arc<dyn QuoteProvider>)],
            fundamentals: fundamentals(),
            attempt_timeout: Duration::from_millis(50),
            cache: RwLock::new(
                r.cache.read().await.clone(),
            ),
        };
        let second = broken.resolve("069500").await.unwrap();
        assert_eq!(second.source_tier, SourceTier::LastGood);
        assert_eq!(second.price, 100.0);
        assert_eq!(second.as_of, first.as_of);
    }

    #[tokio::test]
    async fn all_tiers_down_yields_static_default() {
        let r = resolver(vec![
            (SourceTier::Primary, Arc::new(FailingProvider) as Arc<dyn QuoteProvider>),
            (SourceTier::Secondary, Arc::new(FailingProvider) as Arc<dyn QuoteProvider>),
        ]);

        let quote = r.resolve("069500").await.unwrap();
        assert_eq!(quote.source_tier, SourceTier::Static);
        assert_eq!(quote.price, 36000.0);
        assert_eq!(quote.volume, 0.0);
    }

    #[tokio::test]
    async fn static_default_without_last_close_prices_at_zero() {
        let r = resolver(vec![]);
        let quote = r.resolve("102780").await.unwrap();
        assert_eq!(quote.source_tier, SourceTier::Static);
        assert_eq!(quote.price, 0.0);
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let r = resolver(vec![
            (SourceTier::Primary, Arc::new(FailingProvider) as Arc<dyn QuoteProvider>),
        ]);
        let err = r.resolve("999999").await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn live_success_overwrites_fallback_cache() {
        let r = resolver(vec![(
            SourceTier::Primary,
            Arc::new(FixedProvider::new("primary", 100.0)) as Arc<dyn QuoteProvider>,
        )]);
        r.resolve("069500").await.unwrap();
        let cached = r.cache.read().await.get("069500").cloned().unwrap();
        assert_eq!(cached.price, 100.0);
        assert_eq!(cached.source_tier, SourceTier::Primary);
    }
}
