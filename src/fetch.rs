use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA, USER_AGENT};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::parser::reduce::reduce;
use crate::parser::text::truncate_chars;
use crate::settings::Settings;

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Cheapest acquisition path: one plain GET that looks like a desktop browser.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    min_chars: usize,
    max_chars: usize,
}

impl Fetcher {
    pub fn new(client: Client, settings: &Settings) -> Self {
        Self {
            client,
            min_chars: settings.min_direct_chars,
            max_chars: settings.max_direct_chars,
        }
    }

    /// Raw HTML of the live page, or `None` on any failure.
    pub async fn fetch_html(&self, url: &str) -> Option<String> {
        info!("Direct fetch: {}", url);
        let response = match self.client.get(url).headers(browser_headers()).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Direct fetch failed for {}: {}", url, e);
                return None;
            }
        };
        let status = response.status();
        if !status.is_success() {
            warn!("Direct fetch of {} returned {}", url, status);
            return None;
        }
        match response.text().await {
            Ok(html) => Some(html),
            Err(e) => {
                warn!("Reading body of {} failed: {}", url, e);
                None
            }
        }
    }

    /// Reduced, truncated page text; `None` when too short to be useful.
    pub async fn fetch_reduced_text(&self, url: &str) -> Option<String> {
        let html = self.fetch_html(url).await?;
        self.usable_text(&html)
    }

    /// Reduce already fetched HTML under the same length rules.
    pub fn usable_text(&self, html: &str) -> Option<String> {
        let text = reduce(html);
        let len = text.chars().count();
        if len < self.min_chars {
            debug!("Reduced text too short ({} chars)", len);
            return None;
        }
        Some(truncate_chars(&text, self.max_chars))
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("cs-CZ,cs;q=0.9,en;q=0.8"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}
