use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use etfpick_core::domain::error::CoreError;
use etfpick_core::domain::profile::UserProfile;
use etfpick_core::domain::recommendation::{LiveQuote, Recommendation, SourceTier};
use etfpick_core::explain::openai::OpenAiClient;
use etfpick_core::explain::{self, ExplainInput, ExplanationClient};
use etfpick_core::market::krx::KrxFeed;
use etfpick_core::market::yahoo::YahooFeed;
use etfpick_core::market::{QuoteProvider, TieredResolver};
use etfpick_core::recommend::{Assembler, RecommendationScorer};
use etfpick_core::store::{FundamentalsStore, ScoreCache};

const DEFAULT_TOP_N: usize = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = etfpick_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let data_dir = PathBuf::from(settings.data_dir.clone().unwrap_or_else(|| "data".to_string()));
    let fundamentals = Arc::new(FundamentalsStore::load(&data_dir));
    let scores = Arc::new(ScoreCache::load(&data_dir, &fundamentals));

    let mut live: Vec<(SourceTier, Arc<dyn QuoteProvider>)> = Vec::new();
    match KrxFeed::from_settings(&settings) {
        Ok(feed) => live.push((SourceTier::Primary, Arc::new(feed) as Arc<dyn QuoteProvider>)),
        Err(e) => {
            tracing::warn!(error = %e, "KRX feed unconfigured; primary tier disabled");
        }
    }
    match YahooFeed::from_settings(&settings) {
        Ok(feed) => live.push((SourceTier::Secondary, Arc::new(feed) as Arc<dyn QuoteProvider>)),
        Err(e) => {
            tracing::warn!(error = %e, "Yahoo feed unavailable; secondary tier disabled");
        }
    }
    let resolver = Arc::new(TieredResolver::new(live, Arc::clone(&fundamentals)));

    let explainer: Option<Arc<dyn ExplanationClient>> = match OpenAiClient::from_settings(&settings)
    {
        Ok(client) => Some(Arc::new(client) as Arc<dyn ExplanationClient>),
        Err(e) => {
            tracing::warn!(error = %e, "explanation model unconfigured; using templates");
            None
        }
    };

    let state = AppState {
        scorer: Arc::new(RecommendationScorer::new(
            Arc::clone(&fundamentals),
            scores,
        )),
        assembler: Arc::new(Assembler::new(Arc::clone(&resolver))),
        resolver,
        explainer,
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/recommendations", get(get_recommendations))
        .route("/quotes/:code", get(get_quote))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    scorer: Arc<RecommendationScorer>,
    assembler: Arc<Assembler>,
    resolver: Arc<TieredResolver>,
    explainer: Option<Arc<dyn ExplanationClient>>,
}

#[derive(Debug, Deserialize)]
struct RecommendationsQuery {
    level: i64,
    wmti: String,
    #[serde(default)]
    mpti: Option<String>,
    #[serde(default)]
    keyword: Option<String>,
    #[serde(default)]
    top_n: Option<usize>,
    #[serde(default)]
    explain: Option<bool>,
}

#[derive(Debug, Serialize)]
struct RecommendationsResponse {
    profile: UserProfile,
    items: Vec<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

async fn get_recommendations(
    State(state): State<AppState>,
    Query(q): Query<RecommendationsQuery>,
) -> Result<Json<RecommendationsResponse>, (StatusCode, Json<ApiError>)> {
    let profile = UserProfile::new(
        q.level,
        &q.wmti,
        q.mpti.as_deref().unwrap_or("fact"),
    )
    .map_err(bad_request)?;

    let keyword = q.keyword.unwrap_or_default();
    let top_n = q.top_n.unwrap_or(DEFAULT_TOP_N);

    let candidates = state
        .scorer
        .score(&profile, &keyword, top_n)
        .map_err(bad_request)?;
    let items = state.assembler.assemble(&candidates).await;

    let explanation = if q.explain.unwrap_or(false) {
        let input = ExplainInput {
            profile: profile.clone(),
            recommendations: items.clone(),
        };
        Some(explain::explain_or_fallback(state.explainer.as_deref(), &input).await)
    } else {
        None
    };

    Ok(Json(RecommendationsResponse {
        profile,
        items,
        explanation,
    }))
}

async fn get_quote(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<LiveQuote>, (StatusCode, Json<ApiError>)> {
    match state.resolver.resolve(&code).await {
        Ok(quote) => Ok(Json(quote)),
        Err(err @ CoreError::NotFound(_)) => Err((
            StatusCode::NOT_FOUND,
            Json(ApiError {
                error: err.to_string(),
            }),
        )),
        Err(err) => Err(bad_request(err)),
    }
}

fn bad_request(err: CoreError) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: err.to_string(),
        }),
    )
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &etfpick_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
