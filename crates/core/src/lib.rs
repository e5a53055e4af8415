pub mod domain;
pub mod explain;
pub mod market;
pub mod recommend;
pub mod store;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub data_dir: Option<String>,
        pub krx_feed_base_url: Option<String>,
        pub krx_feed_appkey: Option<String>,
        pub krx_feed_appsecret: Option<String>,
        pub yahoo_base_url: Option<String>,
        pub openai_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                data_dir: std::env::var("DATA_DIR").ok(),
                krx_feed_base_url: std::env::var("KRX_FEED_BASE_URL").ok(),
                krx_feed_appkey: std::env::var("KRX_FEED_APPKEY").ok(),
                krx_feed_appsecret: std::env::var("KRX_FEED_APPSECRET").ok(),
                yahoo_base_url: std::env::var("YAHOO_BASE_URL").ok(),
                openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_data_dir(&self) -> anyhow::Result<&str> {
            self.data_dir.as_deref().context("DATA_DIR is required")
        }

        pub fn require_krx_feed_base_url(&self) -> anyhow::Result<&str> {
            self.krx_feed_base_url
                .as_deref()
                .context("KRX_FEED_BASE_URL is required")
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }
    }
}
