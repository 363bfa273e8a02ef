use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use super::{row_cells, MenuExtractor, PageContext};
use crate::menu::{DayMenu, Dish, WeeklyMenu};
use crate::parser::sections::{classify_heading, SectionKind};
use crate::parser::text::element_text;

fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

static CONTAINER: LazyLock<Selector> = LazyLock::new(|| sel(".daily-menu"));
static DAY_TABS: LazyLock<Selector> = LazyLock::new(|| {
    sel(".daily-menu-tab__list .daily-menu-tab__item .daily-menu-tab__day")
});
static DAY_CONTENTS: LazyLock<Selector> =
    LazyLock::new(|| sel("#daily-menu-content-list .daily-menu-content__content"));
static ITEMS: LazyLock<Selector> = LazyLock::new(|| sel(".daily-menu-content__item"));
static HEADING: LazyLock<Selector> = LazyLock::new(|| sel(".daily-menu-content__heading"));
static ROWS: LazyLock<Selector> = LazyLock::new(|| sel("table tbody tr"));

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*K[cč]").unwrap());

/// Day-card layout: a tab strip of day names over one content card per day,
/// each card holding headed tables (soups, mains, ...).
pub struct TabsExtractor;

impl MenuExtractor for TabsExtractor {
    fn name(&self) -> &'static str {
        "day tabs"
    }

    fn attempt(&self, doc: &Html, _ctx: &PageContext) -> Option<WeeklyMenu> {
        doc.select(&CONTAINER).next()?;

        let labels: Vec<String> = doc
            .select(&DAY_TABS)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect();

        let mut days = Vec::new();
        for (i, content) in doc.select(&DAY_CONTENTS).enumerate() {
            let day_label = labels
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("Den {}", i + 1));
            let mut soups = Vec::new();
            let mut main_dishes = Vec::new();

            for item in content.select(&ITEMS) {
                let heading = item.select(&HEADING).next().map(element_text).unwrap_or_default();
                let kind = classify_heading(&heading);
                if kind == SectionKind::Unclassified {
                    warn!("Unclassified section {:?} on {}, keeping rows as mains", heading, day_label);
                }

                for tr in item.select(&ROWS) {
                    let cells = row_cells(tr);
                    if cells.len() < 2 || cells[1].is_empty() {
                        continue;
                    }
                    let name = cells[1].clone();
                    match kind {
                        SectionKind::Soup => soups.push(name),
                        SectionKind::Main | SectionKind::Unclassified => {
                            let price = cells.get(2).and_then(|p| parse_price(p)).unwrap_or(0);
                            main_dishes.push(Dish::new(0, name, price));
                        }
                    }
                }
            }

            days.push(DayMenu { day_label, soups, main_dishes });
        }

        if days.is_empty() {
            debug!("Day-tab container present but no day cards");
            return None;
        }
        Some(WeeklyMenu { days })
    }
}

fn parse_price(text: &str) -> Option<u32> {
    let normalized = text.replace('\u{a0}', " ");
    PRICE_RE.captures(&normalized)?[1].parse().ok()
}

// ── Tests ──
