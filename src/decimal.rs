use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use crate::types::ChargeFrequency;

/// Money type with cent precision; amounts are pesos in a single abstract currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const ONE: Money = Money(Decimal::ONE);
    pub const CENT: Money = Money(Decimal::from_parts(1, 0, 0, false, 2));

    /// create from decimal
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d.round_dp(2))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money(Decimal::from_str(s)?.round_dp(2)))
    }

    /// create from whole currency units
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// create from cents
    pub fn from_minor(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// negative amounts become zero
    pub fn clamp_non_negative(self) -> Self {
        self.max(Money::ZERO)
    }

    /// `self - other`, never below zero
    pub fn saturating_sub(self, other: Self) -> Self {
        (self - other).clamp_non_negative()
    }

    /// round any positive fraction up to the next whole unit; zero and negatives become zero
    pub fn round_up(&self) -> Self {
        if self.0 <= Decimal::ZERO {
            return Money::ZERO;
        }
        Money(self.0.ceil())
    }

    /// round an unrounded amount up to whole units before it loses sub-cent digits
    pub fn from_decimal_round_up(d: Decimal) -> Self {
        if d <= Decimal::ZERO {
            return Money::ZERO;
        }
        Money(d.ceil())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money((self.0 + other.0).round_dp(2))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 = (self.0 + other.0).round_dp(2);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money((self.0 - other.0).round_dp(2))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 = (self.0 - other.0).round_dp(2);
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

/// rate type for interest rates; held as a fraction, written out as a percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// create from percentage (e.g., 5 for 5%)
    pub fn from_percentage(p: Decimal) -> Self {
        Rate(p / Decimal::ONE_HUNDRED)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn as_percentage(&self) -> Decimal {
        self.0 * Decimal::ONE_HUNDRED
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// per-period rate for an annual rate charged at the given frequency
    pub fn period_rate(&self, frequency: ChargeFrequency) -> Rate {
        Rate(self.0 / Decimal::from(frequency.periods_per_year()))
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().normalize())
    }
}

// stored rows and sync payloads carry `interest_rate: 20` for 20%
impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.as_percentage().normalize(), serializer)
    }
}

impl<'de> Deserialize<'de> for Rate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <Decimal as Deserialize>::deserialize(deserializer).map(Rate::from_percentage)
    }
}

/// render an amount as whole pesos with es-CO grouping, e.g. `$ 1.234.567`
pub fn format_currency(amount: Money) -> String {
    let whole = amount
        .as_decimal()
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = whole.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if whole < Decimal::ZERO {
        format!("-$ {}", grouped)
    } else {
        format!("$ {}", grouped)
    }
}

/// read user input as whole pesos, keeping only digits
pub fn parse_currency_input(text: &str) -> Option<Money> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    Decimal::from_str(&digits).ok().map(Money::from_decimal)
}

/// reformat user input as currency; empty when the input has no digits
pub fn format_currency_input(text: &str) -> String {
    parse_currency_input(text)
        .map(format_currency)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_precision() {
        let m = Money::from_str_exact("100.126").unwrap();
        assert_eq!(m.to_string(), "100.13");
        assert_eq!(Money::from_minor(1), Money::CENT);
    }

    #[test]
    fn test_round_up() {
        assert_eq!(Money::from_decimal(dec!(100.01)).round_up(), Money::from_major(101));
        assert_eq!(Money::from_decimal(dec!(0.01)).round_up(), Money::ONE);
        assert_eq!(Money::from_major(250).round_up(), Money::from_major(250));
        assert_eq!(Money::ZERO.round_up(), Money::ZERO);
        assert_eq!(Money::from_decimal(dec!(-3.5)).round_up(), Money::ZERO);
    }

    #[test]
    fn test_round_up_matches_ceil_for_positive_values() {
        for cents in [1_i64, 49, 50, 99, 100, 101, 123_456] {
            let m = Money::from_minor(cents);
            assert_eq!(m.round_up().as_decimal(), m.as_decimal().ceil());
        }
    }

    #[test]
    fn test_saturating_sub() {
        let a = Money::from_major(100);
        let b = Money::from_major(150);
        assert_eq!(a.saturating_sub(b), Money::ZERO);
        assert_eq!(b.saturating_sub(a), Money::from_major(50));
    }

    #[test]
    fn test_rates() {
        let rate = Rate::from_percentage(dec!(12));
        assert_eq!(rate.as_decimal(), dec!(0.12));
        assert_eq!(rate.period_rate(ChargeFrequency::Monthly).as_decimal(), dec!(0.01));
        assert_eq!(rate.to_string(), "12%");
    }

    #[test]
    fn test_rate_serializes_as_percentage() {
        let rate = Rate::from_percentage(dec!(20));
        assert_eq!(serde_json::to_value(rate).unwrap(), serde_json::json!("20"));

        let parsed: Rate = serde_json::from_str("\"1.5\"").unwrap();
        assert_eq!(parsed.as_decimal(), dec!(0.015));
        assert_eq!(serde_json::from_value::<Rate>(serde_json::to_value(parsed).unwrap()).unwrap(), parsed);
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(Money::ZERO), "$ 0");
        assert_eq!(format_currency(Money::from_major(950)), "$ 950");
        assert_eq!(format_currency(Money::from_major(1_234_567)), "$ 1.234.567");
        assert_eq!(format_currency(Money::from_decimal(dec!(1499.5))), "$ 1.500");
        assert_eq!(format_currency(Money::from_major(-12_000)), "-$ 12.000");
    }

    #[test]
    fn test_currency_input() {
        assert_eq!(parse_currency_input("$ 1.200.000"), Some(Money::from_major(1_200_000)));
        assert_eq!(parse_currency_input("abc"), None);
        assert_eq!(format_currency_input("15000"), "$ 15.000");
        assert_eq!(format_currency_input(""), "");
    }
}
