use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::data::{Invoice, currency::Currency, non_empty};
use crate::messages::Messages;
use crate::util::DATE_FORMAT;

#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
pub enum Field {
    IssuedAt,
    DueAt,
    ClientName,
    EventDate,
    GroupTitle,
    Description,
    Amount,
    TaxRate,
    Currency,
    SecondaryCurrency,
}

#[derive(Debug, Default)]
pub struct ValidationResult {
    warnings: HashMap<Field, Vec<String>>,
    errors: HashMap<Field, Vec<String>>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ok(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn get_warnings(&self, field: &Field) -> Option<&Vec<String>> {
        self.warnings.get(field)
    }

    pub fn get_errors(&self, field: &Field) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    pub fn add_warning(&mut self, field: Field, msg: String) {
        self.warnings.entry(field).or_default().push(msg);
    }

    pub fn add_error(&mut self, field: Field, msg: String) {
        self.errors.entry(field).or_default().push(msg);
    }

    /// All errors as `Field: message` lines.
    pub fn error_lines(&self) -> Vec<String> {
        Self::lines(&self.errors)
    }

    pub fn warning_lines(&self) -> Vec<String> {
        Self::lines(&self.warnings)
    }

    fn lines(map: &HashMap<Field, Vec<String>>) -> Vec<String> {
        let mut lines: Vec<String> = map
            .iter()
            .flat_map(|(field, msgs)| msgs.iter().map(move |msg| format!("{field:?}: {msg}")))
            .collect();
        lines.sort();
        lines
    }
}

fn is_iso_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).is_ok()
}

impl Invoice {
    /// Checks the invariants the layout relies on. Errors make the document unusable,
    /// warnings only flag suspicious content.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        let max_rate = Decimal::new(25, 2);
        if self.tax.rate < Decimal::ZERO || self.tax.rate > max_rate {
            result.add_error(Field::TaxRate, Messages::TaxRateOutOfRange.into());
        }

        if self.currency != Currency::Gtq {
            result.add_error(Field::Currency, Messages::PrimaryCurrencyMustBeGtq.into());
        }
        if let Some(secondary) = &self.secondary_currency {
            if secondary.code != Currency::Usd {
                result.add_error(
                    Field::SecondaryCurrency,
                    Messages::SecondaryCurrencyMustBeUsd.into(),
                );
            }
        }

        if self.meta.issued_at.trim().is_empty() {
            result.add_error(Field::IssuedAt, Messages::CanNotBeEmpty.into());
        } else if !is_iso_date(&self.meta.issued_at) {
            result.add_warning(Field::IssuedAt, Messages::InvalidDate.into());
        }
        if let Some(due) = non_empty(&self.meta.due_at) {
            if !is_iso_date(due) {
                result.add_warning(Field::DueAt, Messages::InvalidDate.into());
            }
        }
        if let Some(date) = self.event.as_ref().and_then(|e| non_empty(&e.date)) {
            if !is_iso_date(date) {
                result.add_warning(Field::EventDate, Messages::InvalidDate.into());
            }
        }

        if self.client.name.trim().is_empty() {
            result.add_warning(Field::ClientName, Messages::CanNotBeEmpty.into());
        }

        for group in &self.groups {
            if group.title.trim().is_empty() {
                result.add_warning(Field::GroupTitle, Messages::CanNotBeEmpty.into());
            }
            for item in &group.items {
                if item.unit.amount.is_sign_negative() && !item.unit.amount.is_zero() {
                    result.add_error(
                        Field::Amount,
                        format!("{}: {}", Messages::NegativeAmount, item.desc),
                    );
                }
                if item.desc.trim().is_empty() {
                    result.add_warning(Field::Description, Messages::CanNotBeEmpty.into());
                }
                // totals add raw amounts, there is no exchange rate
                if item.unit.currency != self.currency {
                    result.add_warning(
                        Field::Currency,
                        format!("{}: {}", Messages::ItemCurrencyNotConverted, item.desc),
                    );
                }
            }
        }

        result
    }
}
