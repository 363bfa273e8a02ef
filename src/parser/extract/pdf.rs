use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::info;

use super::{PageContext, SourceLocator};
use crate::domain::resolve_url;
use crate::parser::text::{element_text, fold};

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

const DAILY_KEYWORDS: &[&str] = &["denn", "poledn", "daily", "lunch"];

/// Links to a PDF menu. Prefers one that mentions a daily/lunch menu in its
/// href or text; otherwise takes the last PDF on the page, which may well be
/// an unrelated document.
pub struct PdfLocator;

impl SourceLocator for PdfLocator {
    fn name(&self) -> &'static str {
        "pdf link"
    }

    fn locate(&self, doc: &Html, ctx: &PageContext) -> Option<String> {
        let mut last = None;
        for a in doc.select(&ANCHOR) {
            let Some(href) = a.value().attr("href") else { continue };
            if !is_pdf(href) {
                continue;
            }
            let haystack = format!("{} {}", fold(href), fold(&element_text(a)));
            if DAILY_KEYWORDS.iter().any(|k| haystack.contains(k)) {
                let abs = resolve_url(ctx.base_url, href);
                info!("Found daily menu PDF: {}", abs);
                return Some(abs);
            }
            last = Some(href);
        }

        let abs = resolve_url(ctx.base_url, last?);
        info!("Falling back to last PDF on page: {}", abs);
        Some(abs)
    }
}

fn is_pdf(href: &str) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    path.to_ascii_lowercase().ends_with(".pdf")
}
