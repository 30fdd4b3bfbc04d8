use currency::{Currency, Money, default_currency_value};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::messages::Messages;

pub mod currency;
pub mod totals;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub meta: Meta,
    pub client: Client,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<Event>,
    #[serde(default)]
    pub groups: Vec<Group>,
    pub tax: TaxConfig,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_currency: Option<SecondaryCurrency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank: Option<BankDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub issued_at: String,
    #[serde(default)]
    pub locale: Locale,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "es-GT")]
    EsGt,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub qty: u32,
    pub desc: String,
    pub unit: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LineItem {
    pub fn line_total(&self) -> Decimal {
        self.unit
            .amount
            .checked_mul(Decimal::from(self.qty))
            .unwrap_or_else(default_currency_value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxConfig {
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryCurrency {
    pub code: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gtq: Option<BankAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usd: Option<BankAccount>,
}

impl BankDetails {
    /// Accounts in print order, each paired with its currency.
    pub fn accounts(&self) -> impl Iterator<Item = (Currency, &BankAccount)> {
        self.gtq
            .iter()
            .map(|a| (Currency::Gtq, a))
            .chain(self.usd.iter().map(|a| (Currency::Usd, a)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub bank: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub account: String,
    pub name: String,
}

/// Per-render presentation settings. Not persisted with the invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    pub title: Option<String>,
    pub logo_url: Option<String>,
    pub logo_data_url: Option<String>,
    pub footer_note: Option<String>,
    pub header_color_hex: Option<String>,
    pub items_heading: Option<String>,
    pub signer_name: Option<String>,
    pub signer_title: Option<String>,
    pub signature_url: Option<String>,
    pub signature_data_url: Option<String>,
    pub signature_printed_name: Option<String>,
}

pub const DEFAULT_HEADER_COLOR: &str = "#161616";

impl RenderOptions {
    pub fn title(&self) -> &str {
        non_empty(&self.title).unwrap_or(Messages::DefaultTitle.msg())
    }

    pub fn items_heading(&self) -> &str {
        // an explicitly empty heading is kept, like the title of an untitled group
        self.items_heading
            .as_deref()
            .unwrap_or(Messages::DefaultItemsHeading.msg())
    }

    pub fn header_color_hex(&self) -> &str {
        non_empty(&self.header_color_hex).unwrap_or(DEFAULT_HEADER_COLOR)
    }

    pub fn footer_note(&self) -> &str {
        self.footer_note.as_deref().unwrap_or_default()
    }

    /// First non-empty of the in-memory data URL and the URL.
    pub fn logo_source(&self) -> Option<&str> {
        non_empty(&self.logo_data_url).or(non_empty(&self.logo_url))
    }

    pub fn signature_source(&self) -> Option<&str> {
        non_empty(&self.signature_data_url).or(non_empty(&self.signature_url))
    }
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use std::str::FromStr;

    pub(crate) fn item(id: &str, qty: u32, desc: &str, amount: &str) -> LineItem {
        LineItem {
            id: id.into(),
            qty,
            desc: desc.into(),
            unit: Money::new(Decimal::from_str(amount).unwrap(), Currency::Gtq),
            notes: None,
        }
    }

    pub(crate) fn group(id: &str, title: &str, items: Vec<LineItem>) -> Group {
        Group {
            id: id.into(),
            title: title.into(),
            items,
        }
    }

    pub(crate) fn invoice(groups: Vec<Group>, rate: &str) -> Invoice {
        Invoice {
            id: "inv-test".into(),
            meta: Meta {
                issued_at: "2025-05-15".into(),
                locale: Locale::EsGt,
                number: None,
                series: None,
                due_at: None,
            },
            client: Client {
                name: "FAUSTO CASTILLO".into(),
                ..Default::default()
            },
            event: None,
            groups,
            tax: TaxConfig {
                rate: Decimal::from_str(rate).unwrap(),
            },
            currency: Currency::Gtq,
            secondary_currency: None,
            bank: None,
            terms: None,
            notes: None,
        }
    }
}
