pub mod openai;
pub mod template;

use crate::domain::profile::UserProfile;
use crate::domain::recommendation::Recommendation;

#[derive(Debug, Clone)]
pub struct ExplainInput {
    pub profile: UserProfile,
    pub recommendations: Vec<Recommendation>,
}

#[async_trait::async_trait]
pub trait ExplanationClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn explain(&self, input: &ExplainInput) -> anyhow::Result<String>;
}

/// Ask the client for an explanation, falling back to the local
/// template on any failure. Explanations are cosmetic; they must
/// never fail a recommendation response.
pub async fn explain_or_fallback(
    client: Option<&dyn ExplanationClient>,
    input: &ExplainInput,
) -> String {
    if let Some(client) = client {
        match client.explain(input).await {
            Ok(text) if !text.trim().is_empty() => return text,
            Ok(_) => {
                tracing::warn!(
                    provider = client.provider_name(),
                    "empty explanation, using template"
                );
            }
            Err(err) => {
                tracing::warn!(
                    provider = client.provider_name(),
                    error = %err,
                    "explanation request failed, using template"
                );
            }
        }
    }
    template::render_fallback(input)
}
