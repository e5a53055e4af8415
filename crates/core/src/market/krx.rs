//! Primary quote source: the domestic brokerage OpenAPI daily chart
//! endpoint. Numeric fields come back as strings and quiet sessions
//! can omit the as-of bar entirely, which counts as a source failure.

use crate::config::Settings;
use crate::market::provider::{QuoteProvider, QuoteRow};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRIES: u32 = 3;

pub struct KrxFeed {
    http: reqwest::Client,
    base_url: String,
    appkey: String,
    appsecret: String,
    retries: u32,
}

impl KrxFeed {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_krx_feed_base_url()?.to_string();
        let appkey = settings
            .krx_feed_appkey
            .clone()
            .context("KRX_FEED_APPKEY is required")?;
        let appsecret = settings
            .krx_feed_appsecret
            .clone()
            .context("KRX_FEED_APPSECRET is required")?;

        let timeout_secs = std::env::var("KRX_FEED_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("KRX_FEED_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build KRX feed http client")?;

        Ok(Self {
            http,
            base_url,
            appkey,
            appsecret,
            retries,
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("appkey", HeaderValue::from_str(&self.appkey)?);
        headers.insert("appsecret", HeaderValue::from_str(&self.appsecret)?);
        headers.insert("custtype", HeaderValue::from_static("P"));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn fetch_daily_chart(&self, code: &str, as_of: NaiveDate) -> Result<DailyChartResponse> {
        let url = format!(
            "{}/uapi/etf/v1/quotations/inquire-daily-chart",
            self.base_url.trim_end_matches('/')
        );
        let headers = self.headers()?;
        let ymd = as_of.format("%Y%m%d").to_string();
        let params = [
            ("FID_COND_MRKT_DIV_CODE", "J"),
            ("FID_INPUT_ISCD", code),
            ("FID_INPUT_DATE_1", ymd.as_str()),
            ("FID_INPUT_DATE_2", ymd.as_str()),
            ("FID_PERIOD_DIV_CODE", "D"),
        ];

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            let res = self
                .http
                .get(url.clone())
                .headers(headers.clone())
                .query(&params)
                .send()
                .await;

            let res = match res {
                Ok(r) => r,
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err).context("KRX daily chart request failed");
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, code, error = %err, "KRX daily chart request failed; retrying");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            };

            let status = res.status();
            let text = res
                .text()
                .await
                .context("failed to read KRX daily chart response")?;

            if !status.is_success() {
                let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                if retryable && attempt < self.retries {
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, code, http_status = %status, "KRX daily chart HTTP error; retrying");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                anyhow::bail!("KRX daily chart HTTP {status}: {text}");
            }

            break serde_json::from_str::<DailyChartResponse>(&text)
                .context("failed to parse KRX daily chart response");
        }
    }
}

#[async_trait::async_trait]
impl QuoteProvider for KrxFeed {
    fn provider_name(&self) -> &'static str {
        "krx_feed"
    }

    async fn fetch_quote(&self, code: &str, as_of: NaiveDate) -> Result<QuoteRow> {
        let body = self.fetch_daily_chart(code, as_of).await?;

        let ymd = as_of.format("%Y%m%d").to_string();
        let bar = body
            .output2
            .iter()
            .find(|b| b.stck_bsop_date == ymd)
            .with_context(|| format!("missing {ymd} bar in KRX response for {code}"))?;

        let price = parse_num(&bar.stck_clpr).context("missing close")?;
        let volume = parse_num(&bar.acml_vol).unwrap_or(0.0);
        Ok(QuoteRow { price, volume })
    }
}

fn parse_num(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok()
}

#[derive(Debug, Clone, Deserialize)]
struct DailyChartResponse {
    #[serde(default)]
    output2: Vec<DailyBar>,
}

#[derive(Debug, Clone, Deserialize)]
struct DailyBar {
    #[serde(default)]
    stck_bsop_date: String,
    #[serde(default)]
    stck_clpr: String,
    #[serde(default)]
    acml_vol: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_typed_bars() {
        let text = r#"{
            "rt_cd": "0",
            "output2": [
                {"stck_bsop_date": "20260105", "stck_clpr": "36150", "acml_vol": "5230100"},
                {"stck_bsop_date": "20260102", "stck_clpr": "35900", "acml_vol": "4810200"}
            ]
        }"#;
        let body: DailyChartResponse = serde_json::from_str(text).unwrap();
        assert_eq!(body.output2.len(), 2);
        assert_eq!(parse_num(&body.output2[0].stck_clpr), Some(36150.0));
    }

    #[test]
    fn blank_numeric_fields_parse_as_none() {
        assert_eq!(parse_num(""), None);
        assert_eq!(parse_num("  "), None);
        assert_eq!(parse_num("abc"), None);
        assert_eq!(parse_num(" 19500 "), Some(19500.0));
    }
}
