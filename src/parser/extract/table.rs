use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use super::{row_cells, MenuExtractor, PageContext};
use crate::menu::{leading_integer, DayMenu, Dish, WeeklyMenu};
use crate::parser::days;
use crate::parser::sections::{section_row, SectionKind};
use crate::parser::text::fold;

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static TR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());
static DISH_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)[.)]?\s+(.+)$").unwrap());
static BARE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)[.)]?$").unwrap());

/// Pages exported from a spreadsheet carry this title; without it a random
/// table is not worth guessing at.
const MARKER: &str = "jidelni listek";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    None,
    Soups,
    Mains,
}

/// Spreadsheet-style single-day listing: heading rows switch between soups
/// and mains, data rows are `[number?, name, price?]`.
pub struct TableExtractor;

impl MenuExtractor for TableExtractor {
    fn name(&self) -> &'static str {
        "spreadsheet table"
    }

    fn attempt(&self, doc: &Html, ctx: &PageContext) -> Option<WeeklyMenu> {
        let table = doc.select(&TABLE).next()?;
        let body_text: String = match doc.select(&BODY).next() {
            Some(body) => body.text().collect(),
            None => doc.root_element().text().collect(),
        };
        if !fold(&body_text).contains(MARKER) {
            return None;
        }

        let mut soups = Vec::new();
        let mut mains = Vec::new();
        let mut mode = Mode::None;
        let mut weekday = None;

        for tr in table.select(&TR) {
            let cells = row_cells(tr);
            let line = cells.join(" ").trim().to_string();
            if line.is_empty() {
                continue;
            }

            if let Some(day) = days::find_weekday(&line) {
                weekday = Some(day);
            }

            match section_row(&cells) {
                Some(SectionKind::Soup) => {
                    mode = Mode::Soups;
                    continue;
                }
                Some(_) => {
                    mode = Mode::Mains;
                    continue;
                }
                None => {}
            }

            if cells.len() < 2 {
                continue;
            }
            match mode {
                Mode::None => {}
                Mode::Soups => {
                    if !cells[1].is_empty() {
                        soups.push(cells[1].clone());
                    }
                }
                Mode::Mains => {
                    if let Some(dish) = parse_dish(&cells) {
                        mains.push(dish);
                    }
                }
            }
        }

        if soups.is_empty() && mains.is_empty() {
            return None;
        }

        let weekday = weekday.unwrap_or_else(|| {
            debug!("No day name in table, assuming today");
            ctx.today.weekday()
        });
        Some(WeeklyMenu {
            days: vec![DayMenu {
                day_label: days::label(weekday).to_string(),
                soups,
                main_dishes: mains,
            }],
        })
    }
}

fn parse_dish(cells: &[String]) -> Option<Dish> {
    let raw = cells[1].as_str();
    let (mut number, name): (u32, String) = match DISH_NUMBER_RE.captures(raw) {
        Some(caps) => (caps[1].parse().unwrap_or(0), caps[2].trim().to_string()),
        None => (0, raw.to_string()),
    };
    if name.is_empty() {
        return None;
    }
    if number == 0 {
        if let Some(caps) = BARE_NUMBER_RE.captures(&cells[0]) {
            number = caps[1].parse().unwrap_or(0);
        }
    }
    let price = cells
        .get(2)
        .map(|p| p.replace('\u{a0}', " "))
        .and_then(|p| leading_integer(&p))
        .unwrap_or(0);
    Some(Dish::new(number, name, price))
}

// ── Tests ──
