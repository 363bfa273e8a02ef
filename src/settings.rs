use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_READER_TEMPLATE: &str = "https://r.jina.ai/{url}";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("language model credential missing (set MENU_LLM_API_KEY or GROQ_API_KEY)")]
    MissingCredential,
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("failed to create Spider client: {0}")]
    Spider(String),
}

/// Read-only pipeline configuration.
///
/// Loaded from `MENU_*` environment variables, e.g. `MENU_LLM_MODEL`,
/// `MENU_BUDGET_SECS`. Everything except the model credential has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm_api_key: Option<String>,
    pub llm_endpoint: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    /// URL-to-text service; `{url}` is replaced by the target URL.
    pub reader_template: String,
    pub reader_user_agent: String,
    /// When set, remote rendering goes through spider.cloud instead of the reader.
    pub spider_api_key: Option<String>,
    /// Reduced direct-fetch text shorter than this is unusable.
    pub min_direct_chars: usize,
    /// Rendered text shorter than this is unusable.
    pub min_rendered_chars: usize,
    pub max_direct_chars: usize,
    pub max_rendered_chars: usize,
    /// Wall-clock budget for one `scrape` call or one whole batch.
    pub budget_secs: u64,
    pub concurrency: usize,
    pub db_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_api_key: None,
            llm_endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_temperature: 0.1,
            reader_template: DEFAULT_READER_TEMPLATE.to_string(),
            reader_user_agent: "LunchMenuBot/1.0".to_string(),
            spider_api_key: None,
            min_direct_chars: 500,
            min_rendered_chars: 100,
            max_direct_chars: 25_000,
            max_rendered_chars: 50_000,
            budget_secs: 60,
            concurrency: 4,
            db_path: "data/menus.sqlite".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, PipelineError> {
        let mut settings: Settings = Config::builder()
            .add_source(Environment::with_prefix("MENU").try_parsing(true))
            .build()?
            .try_deserialize()?;

        if settings.llm_api_key.is_none() {
            settings.llm_api_key = std::env::var("GROQ_API_KEY").ok();
        }
        if settings.spider_api_key.is_none() {
            settings.spider_api_key = std::env::var("SPIDER_API_KEY").ok();
        }
        debug!(
            model = %settings.llm_model,
            budget_secs = settings.budget_secs,
            spider = settings.spider_api_key.is_some(),
            "Settings loaded"
        );
        Ok(settings)
    }

    /// The model credential, or the one configuration error that is fatal.
    pub fn require_api_key(&self) -> Result<&str, PipelineError> {
        self.llm_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(PipelineError::MissingCredential)
    }

    pub fn budget(&self) -> Duration {
        Duration::from_secs(self.budget_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_missing() {
        let settings = Settings { llm_api_key: Some("  ".into()), ..Default::default() };
        assert!(matches!(settings.require_api_key(), Err(PipelineError::MissingCredential)));
    }

    #[test]
    fn key_is_trimmed() {
        let settings = Settings { llm_api_key: Some(" gsk_abc \n".into()), ..Default::default() };
        assert_eq!(settings.require_api_key().unwrap(), "gsk_abc");
    }

    #[test]
    fn defaults_match_service_limits() {
        let s = Settings::default();
        assert_eq!(s.max_direct_chars, 25_000);
        assert_eq!(s.max_rendered_chars, 50_000);
        assert_eq!(s.min_direct_chars, 500);
        assert!(s.llm_temperature <= 0.2);
        assert_eq!(s.budget(), Duration::from_secs(60));
    }
}
