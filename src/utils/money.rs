// Amounts cross the API boundary in major units and go to providers in minor units.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::str::FromStr;

/// `round(amount * 100)`, half away from zero. Done in decimal so that
/// `10.005` becomes `1001`.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Accepts a JSON number or numeric string. Zero, negatives and
/// anything non-numeric are rejected.
pub fn parse_amount(value: &Value) -> Option<Decimal> {
    let amount = match value {
        Value::Number(n) => parse_decimal(&n.to_string())?,
        Value::String(s) => parse_decimal(s.trim())?,
        _ => return None,
    };
    (amount > Decimal::ZERO).then_some(amount)
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

pub fn format_currency(amount: Decimal) -> String {
    format!("${:.2}", amount)
}
