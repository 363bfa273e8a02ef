use chrono::{Datelike, NaiveDate, Weekday};

use super::text::fold;

/// Display label and folded match keys per weekday, Monday first.
const LABELS: [(Weekday, &str, &[&str]); 7] = [
    (Weekday::Mon, "Pondělí", &["pondeli", "monday"]),
    (Weekday::Tue, "Úterý", &["utery", "tuesday"]),
    (Weekday::Wed, "Středa", &["streda", "wednesday"]),
    (Weekday::Thu, "Čtvrtek", &["ctvrtek", "thursday"]),
    (Weekday::Fri, "Pátek", &["patek", "friday"]),
    (Weekday::Sat, "Sobota", &["sobota", "saturday"]),
    (Weekday::Sun, "Neděle", &["nedele", "sunday"]),
];

pub fn label(day: Weekday) -> &'static str {
    LABELS[day.num_days_from_monday() as usize].1
}

/// Weekday whose name appears earliest in `text`.
pub fn find_weekday(text: &str) -> Option<Weekday> {
    let folded = fold(text);
    let haystack = folded.as_str();
    LABELS
        .iter()
        .flat_map(|&(day, _, keys)| {
            keys.iter().filter_map(move |k| haystack.find(k).map(|pos| (pos, day)))
        })
        .min_by_key(|&(pos, _)| pos)
        .map(|(_, day)| day)
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - chrono::Duration::days(date.weekday().num_days_from_monday() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_with_or_without_diacritics() {
        assert_eq!(find_weekday("Jídelní lístek – Čtvrtek 23. 1."), Some(Weekday::Thu));
        assert_eq!(find_weekday("PONDELI"), Some(Weekday::Mon));
        assert_eq!(find_weekday("Friday lunch"), Some(Weekday::Fri));
        assert_eq!(find_weekday("Guláš s knedlíkem"), None);
    }

    #[test]
    fn earliest_mention_wins() {
        assert_eq!(find_weekday("Pátek – Pondělí"), Some(Weekday::Fri));
        assert_eq!(find_weekday("Středa: menu, v úterý zavřeno"), Some(Weekday::Wed));
    }

    #[test]
    fn labels_are_monday_indexed() {
        assert_eq!(label(Weekday::Mon), "Pondělí");
        assert_eq!(label(Weekday::Sun), "Neděle");
    }

    #[test]
    fn week_starts_on_monday() {
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let monday = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        assert_eq!(week_start(sunday), monday);
        assert_eq!(week_start(monday), monday);
    }
}
