use std::sync::{Arc, LazyLock};

use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::{info, warn};

use crate::parser::text::truncate_chars;
use crate::settings::{PipelineError, Settings};

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static BLANKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

enum Backend {
    /// URL-to-text service addressed through an endpoint template.
    Reader { template: String, user_agent: String },
    Spider(Arc<Spider>),
}

/// Delegates page rendering (scripts, PDFs, bot walls) to an external service
/// and returns its text.
pub struct Renderer {
    client: Client,
    backend: Backend,
    max_chars: usize,
}

impl Renderer {
    pub fn new(client: Client, settings: &Settings) -> Result<Self, PipelineError> {
        let backend = match settings.spider_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            Some(key) => {
                let spider = Spider::new_with_client(Some(key.trim().to_string()), client.clone())
                    .map_err(|e| PipelineError::Spider(e.to_string()))?;
                Backend::Spider(Arc::new(spider))
            }
            None => Backend::Reader {
                template: settings.reader_template.clone(),
                user_agent: settings.reader_user_agent.clone(),
            },
        };
        Ok(Self { client, backend, max_chars: settings.max_rendered_chars })
    }

    /// Rendered text of `url`, truncated; `None` on any failure.
    pub async fn render(&self, url: &str) -> Option<String> {
        let text = match &self.backend {
            Backend::Reader { template, user_agent } => {
                self.render_reader(template, user_agent, url).await?
            }
            Backend::Spider(spider) => render_spider(spider, url).await?,
        };
        info!("Remote render returned {} chars for {}", text.chars().count(), url);
        Some(truncate_chars(&text, self.max_chars))
    }

    async fn render_reader(&self, template: &str, user_agent: &str, url: &str) -> Option<String> {
        let endpoint = template.replace("{url}", url);
        let response = match self
            .client
            .get(&endpoint)
            .header(reqwest::header::USER_AGENT, user_agent)
            .header("X-Target-Selector", "body")
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("Remote render of {} failed: {}", url, e);
                return None;
            }
        };
        if !response.status().is_success() {
            warn!("Remote render of {} returned {}", url, response.status());
            return None;
        }
        response
            .text()
            .await
            .map_err(|e| warn!("Reading rendered body of {} failed: {}", url, e))
            .ok()
    }
}

async fn render_spider(spider: &Spider, url: &str) -> Option<String> {
    let params = RequestParams {
        return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Markdown)),
        ..Default::default()
    };
    let response = spider
        .scrape_url(url, Some(params), "application/json")
        .await
        .map_err(|e| warn!("Spider render of {} failed: {}", url, e))
        .ok()?;

    let content = spider_content(response);
    if content.is_none() {
        warn!("Spider returned no page content for {}", url);
    }
    content
}

/// Markdown of the first page in a spider.cloud reply. The reply is a JSON
/// array of pages, sometimes delivered as a string holding that array.
fn spider_content(reply: Value) -> Option<String> {
    let pages = match reply {
        Value::String(raw) => serde_json::from_str(&raw).ok()?,
        other => other,
    };
    let markdown = pages.as_array()?.first()?.get("content")?.as_str()?;
    Some(strip_images(markdown))
}

/// Remove markdown image syntax: ![alt](url) and [![alt](url)](link)
fn strip_images(md: &str) -> String {
    let cleaned = IMAGE_RE.replace_all(md, "");
    BLANKS_RE.replace_all(&cleaned, "\n\n").to_string()
}
