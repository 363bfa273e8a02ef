use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::info;

use super::{PageContext, SourceLocator};
use crate::domain::resolve_url;

static IFRAME: LazyLock<Selector> = LazyLock::new(|| Selector::parse("iframe").unwrap());

/// Third-party menu widgets embedded as iframes. Their content never lives in
/// the parent document, so the located URL goes to the remote renderer.
pub struct WidgetLocator {
    pub domains: Vec<&'static str>,
}

impl Default for WidgetLocator {
    fn default() -> Self {
        Self { domains: vec!["menicka.cz"] }
    }
}

impl SourceLocator for WidgetLocator {
    fn name(&self) -> &'static str {
        "menu widget"
    }

    fn locate(&self, doc: &Html, ctx: &PageContext) -> Option<String> {
        let is_widget = |src: &str| self.domains.iter().any(|d| src.contains(d));

        // Eager `src` wins over lazy-loaded `data-src` anywhere on the page.
        let src = doc
            .select(&IFRAME)
            .filter_map(|el| el.value().attr("src"))
            .find(|src| is_widget(*src))
            .or_else(|| {
                doc.select(&IFRAME)
                    .filter_map(|el| el.value().attr("data-src"))
                    .find(|src| is_widget(*src))
            })?;

        let abs = resolve_url(ctx.base_url, src);
        info!("Found menu widget iframe: {}", abs);
        Some(abs)
    }
}
