use crate::config::Settings;
use crate::explain::{ExplainInput, ExplanationClient};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("OPENAI_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
        })
    }

    fn system_prompt(input: &ExplainInput) -> String {
        format!(
            "당신은 한국 ETF 투자 상담사입니다. 아래 추천 목록을 투자자에게 설명하세요.\n\
             투자자 레벨: {} (1=입문, 5=전문가). 레벨에 맞는 용어 수준을 사용하세요.\n\
             투자 유형: {}.\n{}\n\
             추천 목록에 없는 상품을 언급하지 마세요. 수익 보장 표현을 쓰지 마세요.",
            input.profile.level,
            input.profile.archetype,
            input.profile.style.prompt_line(),
        )
    }

    fn user_prompt(input: &ExplainInput) -> String {
        let items: Vec<serde_json::Value> = input
            .recommendations
            .iter()
            .map(|r| {
                serde_json::json!({
                    "rank": r.rank,
                    "code": r.code,
                    "name": r.name,
                    "risk_tier": r.risk_tier,
                    "composite": r.composite,
                    "price": r.quote.price,
                })
            })
            .collect();
        format!(
            "추천 목록 JSON:\n{}",
            serde_json::Value::Array(items)
        )
    }
}

#[async_trait::async_trait]
impl ExplanationClient for OpenAiClient {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    async fn explain(&self, input: &ExplainInput) -> anyhow::Result<String> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );

        let req = ChatCompletionRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: Self::system_prompt(input),
                },
                ChatMessage {
                    role: "user",
                    content: Self::user_prompt(input),
                },
            ],
        };

        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read OpenAI response body")?;
        if !status.is_success() {
            anyhow::bail!("OpenAI HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<ChatCompletionResponse>(&text)
            .with_context(|| format!("failed to parse OpenAI response JSON: {text}"))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        Ok(content.trim().to_string())
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}
