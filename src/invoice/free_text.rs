//! Turns loosely typed text into grouped line items.
//!
//! ```text
//! Mobiliario:
//! Sillas 100 x 15
//! Mesas 10 @ 50
//!
//! # Logística
//! Transporte Q2000
//! ```

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::currency::Currency;
use crate::messages::Messages;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedItem {
    pub desc: String,
    pub qty: Option<Decimal>,
    pub price: Option<Decimal>,
    pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedGroup {
    pub title: String,
    pub items: Vec<ParsedItem>,
}

impl ParsedGroup {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_owned(),
            items: Vec::new(),
        }
    }
}

static HEADING_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[:：]\s*$").expect("valid regex"));
static HEADING_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#\s+").expect("valid regex"));

// `2`, `12,5`, `1.500` or `1.500,50`
const NUMBER: &str = r"\d+(?:[.,]\d+)*";

fn pattern(template: &str) -> Regex {
    Regex::new(&template.replace("{n}", NUMBER)).expect("valid regex")
}

// desc qty x price, desc qty × price, desc qty @ price
static QTY_TIMES_PRICE: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)^(.+?)\s+({n})\s*(?:x|×|@)\s*({n})(?:\s|$)"));
// qty desc price
static LEADING_QTY: Lazy<Regex> = Lazy::new(|| pattern(r"^({n})\s+(.+?)\s+({n})$"));
// desc price
static TRAILING_PRICE: Lazy<Regex> = Lazy::new(|| pattern(r"^(.+?)\s+({n})$"));

const GTQ_MARKERS: &[&str] = &["q", "gtq", "quetzal", "quetzales"];
const USD_MARKERS: &[&str] = &["usd", "$", "us$"];
// longest first, so "us$" wins over "$"
const GLUED_PREFIXES: &[(&str, Currency)] = &[
    ("us$", Currency::Usd),
    ("usd", Currency::Usd),
    ("gtq", Currency::Gtq),
    ("$", Currency::Usd),
    ("q", Currency::Gtq),
];

/// Parses free text into groups of items, in order of appearance. Groups without items are
/// dropped, so blank input yields nothing.
pub fn parse_free_text(input: &str) -> Vec<ParsedGroup> {
    let lines: Vec<&str> = input
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let mut groups = vec![ParsedGroup::new(Messages::DefaultGroupTitle.msg())];
    for line in lines {
        if let Some(title) = heading_title(line) {
            if !title.is_empty() {
                groups.push(ParsedGroup::new(&title));
            }
            continue;
        }
        if let Some(current) = groups.last_mut() {
            current.items.push(parse_item(line));
        }
    }

    groups.retain(|g| !g.items.is_empty());
    groups
}

/// `Some(title)` if the line is a heading; the title may be empty.
fn heading_title(line: &str) -> Option<String> {
    if !HEADING_SUFFIX.is_match(line) && !HEADING_PREFIX.is_match(line) {
        return None;
    }
    let title = HEADING_PREFIX.replace(line, "");
    let title = HEADING_SUFFIX.replace(&title, "");
    Some(title.trim().to_owned())
}

fn parse_item(line: &str) -> ParsedItem {
    let (stripped, currency) = strip_currency(line);

    if let Some(caps) = QTY_TIMES_PRICE.captures(&stripped) {
        return ParsedItem {
            desc: caps[1].trim().to_owned(),
            qty: to_number(&caps[2]),
            price: to_number(&caps[3]),
            currency,
        };
    }
    if let Some(caps) = LEADING_QTY.captures(&stripped) {
        return ParsedItem {
            desc: caps[2].trim().to_owned(),
            qty: to_number(&caps[1]),
            price: to_number(&caps[3]),
            currency,
        };
    }
    if let Some(caps) = TRAILING_PRICE.captures(&stripped) {
        return ParsedItem {
            desc: caps[1].trim().to_owned(),
            qty: Some(Decimal::ONE),
            price: to_number(&caps[2]),
            currency,
        };
    }
    ParsedItem {
        desc: line.to_owned(),
        qty: Some(Decimal::ONE),
        price: None,
        currency,
    }
}

/// Removes currency markers, standalone (`Q 50`, `50 USD`) or glued to a number (`Q2000`,
/// `$15`), and reports the currency they imply. GTQ unless a dollar marker is present.
fn strip_currency(line: &str) -> (String, Currency) {
    let mut currency = Currency::Gtq;
    let mut kept: Vec<&str> = Vec::new();
    for token in line.split_whitespace() {
        let lower = token.to_lowercase();
        if USD_MARKERS.contains(&lower.as_str()) {
            currency = Currency::Usd;
            continue;
        }
        if GTQ_MARKERS.contains(&lower.as_str()) {
            continue;
        }
        match strip_glued_prefix(token) {
            Some((number, marker)) => {
                if marker == Currency::Usd {
                    currency = Currency::Usd;
                }
                kept.push(number);
            }
            None => kept.push(token),
        }
    }
    (kept.join(" "), currency)
}

fn strip_glued_prefix(token: &str) -> Option<(&str, Currency)> {
    GLUED_PREFIXES.iter().find_map(|(prefix, currency)| {
        let head = token.get(..prefix.len())?;
        let rest = &token[prefix.len()..];
        (head.eq_ignore_ascii_case(prefix) && rest.starts_with(|c: char| c.is_ascii_digit()))
            .then_some((rest, *currency))
    })
}

/// `.` groups thousands and `,` separates decimals: `1.500,50` is 1500.50. Tokens with more
/// than one comma are not numbers.
fn to_number(token: &str) -> Option<Decimal> {
    let normalized = token.replace('.', "").replacen(',', ".", 1);
    Decimal::from_str(&normalized).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Option<Decimal> {
        Some(Decimal::from_str(s).unwrap())
    }

    fn parsed(desc: &str, qty: &str, price: Option<&str>, currency: Currency) -> ParsedItem {
        ParsedItem {
            desc: desc.into(),
            qty: dec(qty),
            price: price.and_then(dec),
            currency,
        }
    }

    #[test]
    fn groups_and_patterns() {
        let groups = parse_free_text(
            "Mobiliario:\nSillas 100 x 15\nMesas 10 @ 50\n\nLogística:\nTransporte Q2000",
        );
        assert_eq!(
            groups,
            vec![
                ParsedGroup {
                    title: "Mobiliario".into(),
                    items: vec![
                        parsed("Sillas", "100", Some("15"), Currency::Gtq),
                        parsed("Mesas", "10", Some("50"), Currency::Gtq),
                    ],
                },
                ParsedGroup {
                    title: "Logística".into(),
                    items: vec![parsed("Transporte", "1", Some("2000"), Currency::Gtq)],
                },
            ]
        );
    }

    #[test]
    fn empty_input() {
        assert!(parse_free_text("").is_empty());
        assert!(parse_free_text("  \n\r\n \t").is_empty());
    }

    #[test]
    fn items_without_heading_go_to_default_group() {
        let groups = parse_free_text("Luces 1 x 500\r\nSonido 2 × 750");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, "Items");
        assert_eq!(groups[0].items[1], parsed("Sonido", "2", Some("750"), Currency::Gtq));
    }

    #[test]
    fn hash_headings_and_empty_titles() {
        let groups = parse_free_text("# Decoración\nFlores 20 @ 35\n:\nVelas 40 x 5");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, "Decoración");
        assert_eq!(groups[0].items.len(), 2);
    }

    #[test]
    fn fullwidth_colon_heading() {
        let groups = parse_free_text("Audio：\nBocina 2 x 300");
        assert_eq!(groups[0].title, "Audio");
    }

    #[test]
    fn empty_groups_are_dropped() {
        let groups = parse_free_text("Mobiliario:\nLogística:\nTransporte 2000");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, "Logística");
    }

    #[test]
    fn leading_quantity() {
        let groups = parse_free_text("10 Mesas redondas 50");
        assert_eq!(groups[0].items[0], parsed("Mesas redondas", "10", Some("50"), Currency::Gtq));
    }

    #[test]
    fn usd_detection() {
        let groups = parse_free_text("Pantalla LED 2 x 150 USD\nDJ $300\nTarima US$ 80\nMantel Q 25");
        let items = &groups[0].items;
        assert_eq!(items[0], parsed("Pantalla LED", "2", Some("150"), Currency::Usd));
        assert_eq!(items[1], parsed("DJ", "1", Some("300"), Currency::Usd));
        assert_eq!(items[2], parsed("Tarima", "1", Some("80"), Currency::Usd));
        assert_eq!(items[3], parsed("Mantel", "1", Some("25"), Currency::Gtq));
    }

    #[test]
    fn decimal_comma_and_thousands_dot() {
        let groups = parse_free_text(
            "Catering 1.500,50\nHielo 3 x 12,5\nCarpa 2 x 1.250,75\n10 Mesas 1.200,00\n\
             Sonido Q 1.500,50\nTarima 1.000.000",
        );
        let items = &groups[0].items;
        assert_eq!(items[0], parsed("Catering", "1", Some("1500.50"), Currency::Gtq));
        assert_eq!(items[1].price, dec("12.5"));
        assert_eq!(items[2], parsed("Carpa", "2", Some("1250.75"), Currency::Gtq));
        assert_eq!(items[3], parsed("Mesas", "10", Some("1200.00"), Currency::Gtq));
        assert_eq!(items[4], parsed("Sonido", "1", Some("1500.50"), Currency::Gtq));
        assert_eq!(items[5].price, dec("1000000"));
    }

    #[test]
    fn thousands_dot_in_quantity() {
        let groups = parse_free_text("Servilletas 1.000 x 0,50");
        assert_eq!(
            groups[0].items[0],
            parsed("Servilletas", "1000", Some("0.50"), Currency::Gtq)
        );
    }

    #[test]
    fn description_only_fallback() {
        let groups = parse_free_text("Montaje y desmontaje");
        assert_eq!(groups[0].items[0], parsed("Montaje y desmontaje", "1", None, Currency::Gtq));
    }

    #[test]
    fn fallback_keeps_the_original_line() {
        let groups = parse_free_text("Servicio USD");
        assert_eq!(groups[0].items[0], parsed("Servicio USD", "1", None, Currency::Usd));
    }

    #[test]
    fn glued_prefixes() {
        assert_eq!(strip_glued_prefix("Q2000"), Some(("2000", Currency::Gtq)));
        assert_eq!(strip_glued_prefix("us$15"), Some(("15", Currency::Usd)));
        assert_eq!(strip_glued_prefix("USD7"), Some(("7", Currency::Usd)));
        assert_eq!(strip_glued_prefix("Quesos"), None);
        assert_eq!(strip_glued_prefix("Ñ5"), None);
    }

    #[test]
    fn numbers() {
        assert_eq!(to_number("2000"), dec("2000"));
        assert_eq!(to_number("12,75"), dec("12.75"));
        assert_eq!(to_number("1.500"), dec("1500"));
        assert_eq!(to_number("1.500,50"), dec("1500.50"));
        assert_eq!(to_number("1,2,3"), None);
        assert_eq!(to_number(""), None);
    }
}
