use log::debug;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use uuid::Uuid;

use crate::data::{
    Group, Invoice, LineItem,
    currency::{Money, default_currency_value},
};

pub mod free_text;

use free_text::{ParsedGroup, ParsedItem, parse_free_text};

fn new_id() -> String {
    Uuid::now_v7().to_string()
}

impl From<&ParsedItem> for LineItem {
    fn from(value: &ParsedItem) -> Self {
        LineItem {
            id: new_id(),
            qty: whole_qty(value.qty),
            desc: value.desc.clone(),
            unit: Money::new(
                value.price.unwrap_or_else(default_currency_value),
                value.currency,
            ),
            notes: None,
        }
    }
}

/// Fractional quantities round half up, anything unrepresentable counts as one.
fn whole_qty(qty: Option<Decimal>) -> u32 {
    qty.and_then(|q| {
        q.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u32()
    })
    .unwrap_or(1)
}

/// Appends parsed items to the invoice. Items land in the existing group whose title matches
/// (trimmed, case-insensitive), otherwise in a new group added at the end. Every item gets a
/// fresh id.
pub fn merge_parsed_groups(invoice: &mut Invoice, parsed: &[ParsedGroup]) {
    for parsed_group in parsed {
        let key = parsed_group.title.trim().to_lowercase();
        let items = parsed_group.items.iter().map(LineItem::from);
        match invoice
            .groups
            .iter_mut()
            .find(|g| g.title.trim().to_lowercase() == key)
        {
            Some(existing) => existing.items.extend(items),
            None => invoice.groups.push(Group {
                id: new_id(),
                title: parsed_group.title.clone(),
                items: items.collect(),
            }),
        }
    }
}

/// Parses `text` and merges the result into the invoice. Returns the number of items added.
pub fn import_free_text(invoice: &mut Invoice, text: &str) -> usize {
    let parsed = parse_free_text(text);
    let count = parsed.iter().map(|g| g.items.len()).sum();
    merge_parsed_groups(invoice, &parsed);
    debug!("imported {count} items in {} groups", parsed.len());
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::currency::Currency;
    use crate::data::fixtures::{group, invoice, item};
    use std::str::FromStr;

    fn parsed_item(desc: &str, qty: Option<&str>, price: Option<&str>) -> ParsedItem {
        ParsedItem {
            desc: desc.into(),
            qty: qty.map(|q| Decimal::from_str(q).unwrap()),
            price: price.map(|p| Decimal::from_str(p).unwrap()),
            currency: Currency::Gtq,
        }
    }

    #[test]
    fn merges_into_matching_group() {
        let mut inv = invoice(
            vec![group("g1", "Mobiliario", vec![item("1", 2, "Sillas", "15")])],
            "0.12",
        );
        let parsed = vec![ParsedGroup {
            title: "  mobiliario ".into(),
            items: vec![parsed_item("Mesas", Some("10"), Some("50"))],
        }];
        merge_parsed_groups(&mut inv, &parsed);

        assert_eq!(inv.groups.len(), 1);
        let items = &inv.groups[0].items;
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].desc, "Mesas");
        assert_eq!(items[1].qty, 10);
        assert_eq!(items[1].unit.amount, Decimal::new(50, 0));
        assert_ne!(items[1].id, "1");
    }

    #[test]
    fn unknown_titles_become_new_groups() {
        let mut inv = invoice(vec![group("g1", "Mobiliario", vec![])], "0.12");
        let parsed = vec![ParsedGroup {
            title: "Logística".into(),
            items: vec![parsed_item("Transporte", None, None)],
        }];
        merge_parsed_groups(&mut inv, &parsed);

        assert_eq!(inv.groups.len(), 2);
        let added = &inv.groups[1];
        assert_eq!(added.title, "Logística");
        assert!(!added.id.is_empty());
        assert_eq!(added.items[0].qty, 1);
        assert_eq!(added.items[0].unit.amount, Decimal::ZERO);
        assert_eq!(added.items[0].unit.currency, Currency::Gtq);
    }

    #[test]
    fn ids_are_unique() {
        let mut inv = invoice(vec![], "0.12");
        import_free_text(&mut inv, "Sillas 100 x 15\nMesas 10 @ 50");
        let items = &inv.groups[0].items;
        assert_ne!(items[0].id, items[1].id);
        assert_ne!(inv.groups[0].id, items[0].id);
    }

    #[test]
    fn quantities_round_half_up() {
        assert_eq!(whole_qty(Decimal::from_str("2.5").ok()), 3);
        assert_eq!(whole_qty(Decimal::from_str("2.4").ok()), 2);
        assert_eq!(whole_qty(Some(Decimal::ZERO)), 0);
        assert_eq!(whole_qty(None), 1);
        assert_eq!(whole_qty(Decimal::from_str("-3").ok()), 1);
    }

    #[test]
    fn import_counts_items() {
        let mut inv = invoice(vec![], "0.12");
        let added = import_free_text(
            &mut inv,
            "Mobiliario:\nSillas 100 x 15\nMesas 10 @ 50\n\nLogística:\nTransporte Q2000",
        );
        assert_eq!(added, 3);
        assert_eq!(inv.groups.len(), 2);
        assert_eq!(inv.groups[1].items[0].unit.amount, Decimal::new(2000, 0));
    }

    #[test]
    fn blank_text_changes_nothing() {
        let mut inv = invoice(vec![group("g1", "Mobiliario", vec![])], "0.12");
        assert_eq!(import_free_text(&mut inv, " \n "), 0);
        assert_eq!(inv.groups.len(), 1);
    }
}
