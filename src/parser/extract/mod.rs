pub mod pdf;
pub mod table;
pub mod tabs;
pub mod widget;

use std::sync::LazyLock;

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

use super::text::element_text;
use crate::menu::WeeklyMenu;

pub use pdf::PdfLocator;
pub use table::TableExtractor;
pub use tabs::TabsExtractor;
pub use widget::WidgetLocator;

static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

/// What every heuristic gets to see besides the document.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub base_url: &'a str,
    /// Supplied by the caller so "today" fallbacks stay reproducible.
    pub today: NaiveDate,
}

/// Parses one recognized page layout straight into a menu, no model involved.
pub trait MenuExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` when the layout is not recognized or yields nothing.
    fn attempt(&self, doc: &Html, ctx: &PageContext) -> Option<WeeklyMenu>;
}

/// Finds another URL (widget, document) that holds the menu instead of the page.
pub trait SourceLocator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Absolute URL to hand to the remote renderer.
    fn locate(&self, doc: &Html, ctx: &PageContext) -> Option<String>;
}

/// Structured extractors in priority order.
pub fn default_extractors() -> Vec<Box<dyn MenuExtractor>> {
    vec![Box::new(TabsExtractor), Box::new(TableExtractor)]
}

/// Source locators in priority order.
pub fn default_locators() -> Vec<Box<dyn SourceLocator>> {
    vec![Box::new(WidgetLocator::default()), Box::new(PdfLocator)]
}

/// Collapsed text of each `<td>` in a row.
fn row_cells(tr: ElementRef) -> Vec<String> {
    tr.select(&TD).map(element_text).collect()
}

#[cfg(test)]
pub(crate) fn fixture(name: &str) -> Html {
    let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap();
    Html::parse_document(&html)
}

#[cfg(test)]
pub(crate) fn ctx() -> PageContext<'static> {
    PageContext {
        base_url: "https://restaurace.example.cz/denni-menu/",
        today: NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(),
    }
}
