// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Fixed-precision value objects for prices, quantities and monetary amounts.
//!
//! All value accounting is exact decimal arithmetic. Conversion to `f64` is
//! provided for serialization hints and logging only.

use std::{
    fmt::{Debug, Display},
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use ustr::Ustr;

/// A currency with its standard rounding precision.
#[derive(Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// The ISO-style currency code.
    pub code: Ustr,
    /// The standard decimal precision for amounts in this currency.
    pub precision: u32,
}

impl Currency {
    /// Creates a new [`Currency`].
    #[must_use]
    pub fn new(code: &str, precision: u32) -> Self {
        Self {
            code: Ustr::from(code),
            precision,
        }
    }

    /// United States dollar.
    #[must_use]
    pub fn usd() -> Self {
        Self::new("USD", 2)
    }

    /// Australian dollar.
    #[must_use]
    pub fn aud() -> Self {
        Self::new("AUD", 2)
    }

    /// British pound.
    #[must_use]
    pub fn gbp() -> Self {
        Self::new("GBP", 2)
    }

    /// Euro.
    #[must_use]
    pub fn eur() -> Self {
        Self::new("EUR", 2)
    }

    /// Japanese yen.
    #[must_use]
    pub fn jpy() -> Self {
        Self::new("JPY", 0)
    }

    /// Bitcoin.
    #[must_use]
    pub fn btc() -> Self {
        Self::new("BTC", 8)
    }

    /// Ether.
    #[must_use]
    pub fn eth() -> Self {
        Self::new("ETH", 8)
    }

    /// Tether.
    #[must_use]
    pub fn usdt() -> Self {
        Self::new("USDT", 8)
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Self::usd()),
            "AUD" => Ok(Self::aud()),
            "GBP" => Ok(Self::gbp()),
            "EUR" => Ok(Self::eur()),
            "JPY" => Ok(Self::jpy()),
            "BTC" => Ok(Self::btc()),
            "ETH" => Ok(Self::eth()),
            "USDT" => Ok(Self::usdt()),
            _ => anyhow::bail!("unknown currency code '{s}'"),
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code)
    }
}

impl Debug for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}('{}')", stringify!(Currency), self.code)
    }
}

/// A price in a market, with explicit decimal precision.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Creates a new [`Price`] from the given decimal value.
    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the price as a decimal.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns the decimal precision (scale) of the price.
    #[must_use]
    pub const fn precision(&self) -> u32 {
        self.0.scale()
    }

    /// Returns the price as an `f64` for logging and serialization hints only.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }
}

impl FromStr for Price {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s).map_err(|e| anyhow::anyhow!("invalid Price '{s}': {e}"))?;
        Ok(Self(value))
    }
}

impl From<Decimal> for Price {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}('{}')", stringify!(Price), self.0)
    }
}

/// A non-negative quantity of an instrument, with explicit decimal precision.
#[derive(
    Copy, Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Creates a new [`Quantity`].
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is negative.
    pub fn new(value: Decimal) -> anyhow::Result<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            anyhow::bail!("invalid Quantity: was negative ({value})");
        }
        Ok(Self(value))
    }

    /// A zero quantity.
    #[must_use]
    pub const fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Returns the quantity as a decimal.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns true if the quantity is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns the quantity as an `f64` for logging and serialization hints only.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }

    /// Returns the saturating difference `self - other`, floored at zero.
    #[must_use]
    pub fn saturating_sub(&self, other: Self) -> Self {
        let diff = self.0 - other.0;
        if diff.is_sign_negative() {
            Self(Decimal::ZERO)
        } else {
            Self(diff)
        }
    }
}

impl FromStr for Quantity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s).map_err(|e| anyhow::anyhow!("invalid Quantity '{s}': {e}"))?;
        Self::new(value)
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self(Decimal::from(value))
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A monetary amount in a specific currency, rounded to the currency precision.
#[derive(Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    /// The currency of the amount.
    pub currency: Currency,
}

impl Money {
    /// Creates a new [`Money`], rounding `amount` to the currency precision.
    #[must_use]
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp(currency.precision),
            currency,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Returns the amount as a decimal.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.amount
    }

    /// Returns the amount as an `f64` for logging and serialization hints only.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.amount.to_f64().unwrap_or(f64::NAN)
    }

    fn check_currency(&self, rhs: &Self, op: &str) {
        assert_eq!(
            self.currency, rhs.currency,
            "cannot {op} Money with different currencies: {} vs {}",
            self.currency, rhs.currency
        );
    }
}

impl Add for Money {
    type Output = Self;

    /// # Panics
    ///
    /// Panics if the currencies differ.
    fn add(self, rhs: Self) -> Self::Output {
        self.check_currency(&rhs, "add");
        Self::new(self.amount + rhs.amount, self.currency)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.check_currency(&rhs, "add");
        self.amount = (self.amount + rhs.amount).round_dp(self.currency.precision);
    }
}

impl Sub for Money {
    type Output = Self;

    /// # Panics
    ///
    /// Panics if the currencies differ.
    fn sub(self, rhs: Self) -> Self::Output {
        self.check_currency(&rhs, "subtract");
        Self::new(self.amount - rhs.amount, self.currency)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.check_currency(&rhs, "subtract");
        self.amount = (self.amount - rhs.amount).round_dp(self.currency.precision);
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.amount, self.currency)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

impl Debug for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}('{} {}')", stringify!(Money), self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_decimal_macros::dec;

    use super::*;

    #[rstest]
    fn test_price_precision_from_str() {
        let price = Price::from_str("1.00001").unwrap();

        assert_eq!(price.precision(), 5);
        assert_eq!(price.to_string(), "1.00001");
    }

    #[rstest]
    #[case("90.002", "90.002", true)]
    #[case("90.002", "90.005", false)]
    fn test_price_equality(#[case] a: &str, #[case] b: &str, #[case] expected: bool) {
        let price_a = Price::from_str(a).unwrap();
        let price_b = Price::from_str(b).unwrap();

        assert_eq!(price_a == price_b, expected);
    }

    #[rstest]
    fn test_quantity_rejects_negative() {
        assert!(Quantity::new(dec!(-1)).is_err());
        assert!(Quantity::from_str("-0.1").is_err());
    }

    #[rstest]
    fn test_quantity_saturating_sub_floors_at_zero() {
        let a = Quantity::new(dec!(4)).unwrap();
        let b = Quantity::new(dec!(10)).unwrap();

        assert_eq!(a.saturating_sub(b), Quantity::zero());
        assert_eq!(b.saturating_sub(a).as_decimal(), dec!(6));
    }

    #[rstest]
    fn test_money_rounds_to_currency_precision() {
        let money = Money::new(dec!(1.005), Currency::usd());

        // Banker's rounding at scale 2
        assert_eq!(money.as_decimal(), dec!(1.00));
    }

    #[rstest]
    fn test_money_arithmetic_same_currency() {
        let a = Money::new(dec!(100.50), Currency::usd());
        let b = Money::new(dec!(0.25), Currency::usd());

        assert_eq!((a + b).as_decimal(), dec!(100.75));
        assert_eq!((a - b).as_decimal(), dec!(100.25));
    }

    #[rstest]
    #[should_panic]
    fn test_money_add_different_currencies_panics() {
        let usd = Money::new(dec!(1), Currency::usd());
        let btc = Money::new(dec!(1), Currency::btc());

        let _ = usd + btc;
    }

    #[rstest]
    fn test_currency_from_str() {
        assert_eq!(Currency::from_str("USD").unwrap(), Currency::usd());
        assert!(Currency::from_str("XXX").is_err());
    }
}
