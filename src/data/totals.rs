use rust_decimal::Decimal;
use serde::Serialize;

use super::currency::{default_currency_value, round_to_cents};
use super::{Group, Invoice};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Sum of `qty × unit amount` over the group, unrounded.
pub fn group_total(group: &Group) -> Decimal {
    group.items.iter().fold(default_currency_value(), |sum, item| {
        sum.checked_add(item.line_total())
            .unwrap_or_else(default_currency_value)
    })
}

/// Only the tax term is rounded to cents; the subtotal is carried unrounded into the total.
/// Existing invoices were issued with this policy, so it must not be "fixed" here.
pub fn invoice_totals(invoice: &Invoice) -> Totals {
    let subtotal = invoice
        .groups
        .iter()
        .fold(default_currency_value(), |sum, group| {
            sum.checked_add(group_total(group))
                .unwrap_or_else(default_currency_value)
        });
    let tax = round_to_cents(
        subtotal
            .checked_mul(invoice.tax.rate)
            .unwrap_or_else(default_currency_value),
    );
    let total = subtotal
        .checked_add(tax)
        .unwrap_or_else(default_currency_value);
    Totals {
        subtotal,
        tax,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{group, invoice, item};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn empty_invoice() {
        let totals = invoice_totals(&invoice(vec![], "0.12"));
        assert!(totals.subtotal.is_zero());
        assert!(totals.tax.is_zero());
        assert!(totals.total.is_zero());
    }

    #[test]
    fn group_total_sums_lines() {
        let g = group(
            "grp-1",
            "Mobiliario",
            vec![item("it-1", 16, "Mesas", "75"), item("it-2", 70, "Bancos", "20")],
        );
        assert_eq!(group_total(&g), dec("2600"));
    }

    #[test]
    fn twelve_percent_of_thousand() {
        let inv = invoice(
            vec![group("g", "G", vec![item("it", 1, "Servicio", "1000")])],
            "0.12",
        );
        let totals = invoice_totals(&inv);
        assert_eq!(totals.subtotal, dec("1000"));
        assert_eq!(totals.tax, dec("120.00"));
        assert_eq!(totals.total, dec("1120.00"));
    }

    #[test]
    fn tax_rounds_half_up_on_cent_boundary() {
        // 40.04 × 0.125 = 5.005
        let inv = invoice(
            vec![group("g", "G", vec![item("it", 1, "Servicio", "40.04")])],
            "0.125",
        );
        assert_eq!(invoice_totals(&inv).tax, dec("5.01"));
    }

    #[test]
    fn subtotal_is_not_rounded_before_total() {
        let inv = invoice(
            vec![group("g", "G", vec![item("it", 3, "Servicio", "3.333")])],
            "0.10",
        );
        let totals = invoice_totals(&inv);
        assert_eq!(totals.subtotal, dec("9.999"));
        assert_eq!(totals.tax, dec("1.00"));
        assert_eq!(totals.total, dec("10.999"));
    }

    #[test]
    fn sums_across_groups_in_order() {
        let inv = invoice(
            vec![
                group("a", "Mobiliario", vec![item("1", 2, "Sillas", "15")]),
                group("b", "Logística", vec![item("2", 1, "Transporte", "2000")]),
            ],
            "0",
        );
        let totals = invoice_totals(&inv);
        assert_eq!(totals.subtotal, dec("2030"));
        assert_eq!(totals.total, dec("2030"));
    }

    #[test]
    fn is_idempotent() {
        let inv = invoice(
            vec![group("g", "G", vec![item("it", 7, "Luces", "123.45")])],
            "0.12",
        );
        assert_eq!(invoice_totals(&inv), invoice_totals(&inv));
    }
}
