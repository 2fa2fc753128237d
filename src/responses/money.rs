//! Dollar amounts in whole cents.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("{0:?} is not a dollar amount")]
    Malformed(String),

    #[error("{0:?} has more than two digits after the period")]
    TooPrecise(String),

    #[error("{0:?} is too large")]
    Overflow(String),
}

/// An amount of money in cents.
///
/// Displays as `$1,234.56`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(pub i64);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Parses `$1,234.5` style text. The `$` and thousands separators are
    /// optional; at most two fractional digits are allowed.
    pub fn parse(text: &str) -> Result<Self, MoneyError> {
        let cleaned: String = text
            .trim()
            .chars()
            .filter(|c| *c != ',' && *c != '$')
            .collect();
        let malformed = || MoneyError::Malformed(text.to_string());

        let (whole, fraction) = match cleaned.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (cleaned.as_str(), ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let fraction_cents = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| malformed())? * 10,
            2 => fraction.parse::<i64>().map_err(|_| malformed())?,
            _ => return Err(MoneyError::TooPrecise(text.to_string())),
        };

        let overflow = || MoneyError::Overflow(text.to_string());
        let dollars = whole.parse::<i64>().map_err(|_| overflow())?;
        dollars
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction_cents))
            .map(Money)
            .ok_or_else(overflow)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let dollars = (abs / 100).to_string();
        let cents = abs % 100;

        let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
        for (i, digit) in dollars.chars().enumerate() {
            if i > 0 && (dollars.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }
        write!(f, "{}${}.{:02}", sign, grouped, cents)
    }
}
