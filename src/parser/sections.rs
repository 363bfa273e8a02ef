use super::text::fold;

/// What a section heading (or heading-like row) announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Soup,
    Main,
    Unclassified,
}

// Heading keywords, matched as folded substrings. Soups are checked first so
// "Polévka k menu" stays a soup heading.
const SOUP_KEYWORDS: &[&str] = &["polev", "soup"];
const MAIN_KEYWORDS: &[&str] = &[
    "hlavni", "nabidk", "menu", "jidl", "chod", "specialit", "minutk", "main", "lunch",
];

// A table row is a section heading only when a single cell is filled and
// that cell opens with one of these phrases.
const SOUP_ROW_MARKERS: &[&str] = &["polevky", "soups"];
const MAIN_ROW_MARKERS: &[&str] = &[
    "denni nabidka",
    "hlavni jidla",
    "hlavni chody",
    "poledni menu",
    "main courses",
];

/// Classify a dedicated heading element.
pub fn classify_heading(heading: &str) -> SectionKind {
    let folded = fold(heading);
    if SOUP_KEYWORDS.iter().any(|k| folded.contains(k)) {
        SectionKind::Soup
    } else if MAIN_KEYWORDS.iter().any(|k| folded.contains(k)) {
        SectionKind::Main
    } else {
        SectionKind::Unclassified
    }
}

/// Section switch announced by a table row, if any. Rows carrying data in
/// more than one cell are dishes, whatever their text says.
pub fn section_row(cells: &[String]) -> Option<SectionKind> {
    let mut filled = cells.iter().map(|c| c.trim()).filter(|c| !c.is_empty());
    let only = filled.next()?;
    if filled.next().is_some() {
        return None;
    }
    let folded = fold(only);
    let heading = folded.trim_end_matches(|c: char| c == ':' || c.is_whitespace());
    if SOUP_ROW_MARKERS.iter().any(|m| opens_with(heading, m)) {
        Some(SectionKind::Soup)
    } else if MAIN_ROW_MARKERS.iter().any(|m| opens_with(heading, m)) {
        Some(SectionKind::Main)
    } else {
        None
    }
}

fn opens_with(text: &str, phrase: &str) -> bool {
    text.strip_prefix(phrase)
        .is_some_and(|rest| !rest.starts_with(char::is_alphanumeric))
}

// ── Tests ──
