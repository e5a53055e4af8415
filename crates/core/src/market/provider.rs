use anyhow::Result;
use chrono::NaiveDate;

/// Price and traded volume for one instrument on one trading date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteRow {
    pub price: f64,
    pub volume: f64,
}

/// A live quote source. Implementations report transient trouble
/// (network, HTTP errors, missing bars) as plain errors; the resolver
/// decides what to do about a failed source.
#[async_trait::async_trait]
pub trait QuoteProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_quote(&self, code: &str, as_of: NaiveDate) -> Result<QuoteRow>;
}
