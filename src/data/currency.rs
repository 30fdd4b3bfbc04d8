use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

pub const SCALE: u32 = 2;

pub fn default_currency_value() -> Decimal {
    Decimal::new(0, SCALE)
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "GTQ")]
    Gtq,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Currency::Gtq => "GTQ",
            Currency::Usd => "USD",
        }
    }

    /// Prefix printed in front of amounts.
    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Gtq => "Q",
            Currency::Usd => "$",
        }
    }

    /// Prefix used for the bank account lines.
    pub fn label(self) -> &'static str {
        match self {
            Currency::Gtq => "Q",
            Currency::Usd => "USD",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }
}

/// Rounds to cents, half away from zero (100.005 -> 100.01).
pub fn round_to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Two decimals with a literal currency prefix, e.g. `Q 1500.00`.
pub fn format_amount(value: Decimal, currency: Currency) -> String {
    format!("{} {}", currency.symbol(), to_fixed(value))
}

fn to_fixed(value: Decimal) -> String {
    let mut scaled_value = round_to_cents(value);
    scaled_value.rescale(SCALE);
    if scaled_value.is_zero() {
        // -0.00 would otherwise keep its sign
        scaled_value.set_sign_positive(true);
    }
    scaled_value.to_string()
}
