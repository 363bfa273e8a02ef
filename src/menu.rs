use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// One restaurant's extracted lunch offering, days in document order.
///
/// Field names on the wire follow the stored JSON format (`poledni_nabidka`,
/// `den`, `polevky`, ...), which is also what the language model is asked to
/// emit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyMenu {
    #[serde(rename = "poledni_nabidka", alias = "weeklyMenu", default)]
    pub days: Vec<DayMenu>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayMenu {
    #[serde(rename = "den", default, deserialize_with = "lenient_string")]
    pub day_label: String,
    #[serde(rename = "polevky", default, deserialize_with = "lenient_strings")]
    pub soups: Vec<String>,
    #[serde(rename = "hlavni_chody", default)]
    pub main_dishes: Vec<Dish>,
}

/// Prices are whole currency units; 0 means unknown, not free of charge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dish {
    #[serde(rename = "cislo", default, deserialize_with = "lenient_number")]
    pub number: u32,
    #[serde(rename = "nazev", default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "popis", default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(rename = "cena_bez_polevky", default, deserialize_with = "lenient_number")]
    pub price_without_soup: u32,
    #[serde(rename = "cena_s_polevkou", default, deserialize_with = "lenient_number")]
    pub price_with_soup: u32,
}

impl WeeklyMenu {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Drop days without a label and dishes without a name.
    pub fn validated(self) -> Self {
        let days = self
            .days
            .into_iter()
            .filter_map(|mut day| {
                day.day_label = day.day_label.trim().to_string();
                if day.day_label.is_empty() {
                    debug!("Dropping day without label ({} dishes)", day.main_dishes.len());
                    return None;
                }
                day.soups.retain(|s| !s.trim().is_empty());
                day.main_dishes.retain(|d| {
                    let keep = !d.name.trim().is_empty();
                    if !keep {
                        debug!("Dropping unnamed dish on {}", day.day_label);
                    }
                    keep
                });
                Some(day)
            })
            .collect();
        Self { days }
    }
}

impl Dish {
    pub fn new(number: u32, name: impl Into<String>, price_without_soup: u32) -> Self {
        Self {
            number,
            name: name.into(),
            description: String::new(),
            price_without_soup,
            price_with_soup: 0,
        }
    }
}

// The model is asked for integers but sometimes returns "120 Kč", 119.9 or null.
fn lenient_number<'de, D: Deserializer<'de>>(de: D) -> Result<u32, D::Error> {
    let value = serde_json::Value::deserialize(de)?;
    Ok(match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(|v| v.min(u32::MAX as u64) as u32)
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f.round() as u32))
            .unwrap_or(0),
        serde_json::Value::String(s) => leading_integer(&s).unwrap_or(0),
        _ => 0,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(de)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_strings<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    let value = serde_json::Value::deserialize(de)?;
    Ok(match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        serde_json::Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

/// First run of ASCII digits in `s`, e.g. `"cena 120,- Kč"` -> 120.
pub fn leading_integer(s: &str) -> Option<u32> {
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_stored_format() {
        let json = r#"{"poledni_nabidka":[{"den":"Pondělí","polevky":["Zelňačka"],
            "hlavni_chody":[{"cislo":1,"nazev":"Guláš","popis":"","cena_bez_polevky":150,"cena_s_polevkou":0}]}]}"#;
        let menu: WeeklyMenu = serde_json::from_str(json).unwrap();
        assert_eq!(menu.days.len(), 1);
        assert_eq!(menu.days[0].day_label, "Pondělí");
        assert_eq!(menu.days[0].main_dishes[0], Dish::new(1, "Guláš", 150));
    }

    #[test]
    fn sloppy_numbers_become_integers() {
        let json = r#"{"nazev":"Řízek","cena_bez_polevky":"145 Kč","cena_s_polevkou":null,"cislo":2.0}"#;
        let dish: Dish = serde_json::from_str(json).unwrap();
        assert_eq!(dish.price_without_soup, 145);
        assert_eq!(dish.price_with_soup, 0);
        assert_eq!(dish.number, 2);
        assert_eq!(dish.description, "");
    }

    #[test]
    fn zero_prices_are_valid() {
        let json = r#"{"poledni_nabidka":[{"den":"Úterý","hlavni_chody":[{"nazev":"Knedlíky"}]}]}"#;
        let menu: WeeklyMenu = serde_json::from_str::<WeeklyMenu>(json).unwrap().validated();
        let dish = &menu.days[0].main_dishes[0];
        assert_eq!((dish.price_without_soup, dish.price_with_soup), (0, 0));
        assert!(menu.days[0].soups.is_empty());
    }

    #[test]
    fn missing_day_list_is_empty_menu() {
        let menu: WeeklyMenu = serde_json::from_str("{}").unwrap();
        assert!(menu.is_empty());
    }

    #[test]
    fn camel_case_alias_accepted() {
        let menu: WeeklyMenu = serde_json::from_str(r#"{"weeklyMenu":[{"den":"Pátek"}]}"#).unwrap();
        assert_eq!(menu.days[0].day_label, "Pátek");
    }

    #[test]
    fn validation_drops_unlabeled_days_and_unnamed_dishes() {
        let menu = WeeklyMenu {
            days: vec![
                DayMenu { day_label: "  ".into(), ..Default::default() },
                DayMenu {
                    day_label: "Středa".into(),
                    soups: vec!["".into(), "Česnečka".into()],
                    main_dishes: vec![Dish::new(0, "", 100), Dish::new(2, "Svíčková", 159)],
                },
            ],
        }
        .validated();
        assert_eq!(menu.days.len(), 1);
        assert_eq!(menu.days[0].soups, vec!["Česnečka".to_string()]);
        assert_eq!(menu.days[0].main_dishes.len(), 1);
    }
}
