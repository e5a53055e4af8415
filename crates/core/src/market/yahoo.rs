//! Secondary quote source: the Yahoo Finance v8 chart API (no auth).
//! Domestic codes are mapped to Yahoo symbols with the ".KS" suffix.
//! A chart whose last trade predates the requested session is stale
//! data, not a quote, and counts as a source failure.

use crate::config::Settings;
use crate::market::provider::{QuoteProvider, QuoteRow};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

const KST_OFFSET_SECS: i32 = 9 * 3600;

pub struct YahooFeed {
    http: reqwest::Client,
    base_url: String,
}

impl YahooFeed {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .yahoo_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("YAHOO_FEED_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        // Yahoo rejects default reqwest user agents.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                 AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/120.0.0.0 Safari/537.36",
            )
            .build()
            .context("failed to build Yahoo feed http client")?;

        Ok(Self { http, base_url })
    }

    fn symbol(code: &str) -> String {
        format!("{code}.KS")
    }
}

#[async_trait::async_trait]
impl QuoteProvider for YahooFeed {
    fn provider_name(&self) -> &'static str {
        "yahoo_finance"
    }

    async fn fetch_quote(&self, code: &str, as_of: NaiveDate) -> Result<QuoteRow> {
        let symbol = Self::symbol(code);
        let url = format!(
            "{}/v8/finance/chart/{symbol}?range=1d&interval=1d",
            self.base_url.trim_end_matches('/')
        );

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .context("Yahoo chart request failed")?;

        let status = res.status();
        if !status.is_success() {
            anyhow::bail!("Yahoo chart HTTP {status} for {symbol}");
        }

        let body: ChartResponse = res
            .json()
            .await
            .context("failed to parse Yahoo chart response")?;

        let meta = body
            .chart
            .result
            .as_deref()
            .and_then(|r| r.first())
            .map(|d| &d.meta)
            .with_context(|| format!("Yahoo chart has no result for {symbol}"))?;

        quote_from_meta(meta, &symbol, as_of)
    }
}

fn quote_from_meta(meta: &ChartMeta, symbol: &str, as_of: NaiveDate) -> Result<QuoteRow> {
    let price = meta
        .regular_market_price
        .with_context(|| format!("Yahoo chart has no price for {symbol}"))?;

    let kst = chrono::FixedOffset::east_opt(KST_OFFSET_SECS).context("invalid KST offset")?;
    let traded_on = meta
        .regular_market_time
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|t| t.with_timezone(&kst).date_naive())
        .with_context(|| format!("Yahoo chart has no trade time for {symbol}"))?;
    anyhow::ensure!(
        traded_on == as_of,
        "Yahoo quote for {symbol} traded on {traded_on}, wanted {as_of}"
    );

    let volume = meta.regular_market_volume.unwrap_or(0) as f64;
    Ok(QuoteRow { price, volume })
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    regular_market_time: Option<i64>,
    #[serde(default)]
    regular_market_volume: Option<u64>,
}
