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

//! Tradable contract definitions.

use std::collections::HashMap;

use meridian_core::{UnixNanos, correctness::check_predicate_true};
use rust_decimal::Decimal;

use crate::{
    enums::LiquiditySide,
    identifiers::Security,
    types::{Currency, Money, Price, Quantity},
};

/// Fees and margins carry at most this decimal scale.
const MAX_RATE_SCALE: u32 = 8;

/// Describes a tradable contract for a [`Security`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instrument {
    /// The security identity.
    pub security: Security,
    /// The base currency of the pair/contract.
    pub base_currency: Currency,
    /// The quote currency.
    pub quote_currency: Currency,
    /// The settlement currency.
    pub settlement_currency: Currency,
    /// True if quantity is expressed in the quote currency.
    pub is_inverse: bool,
    /// True if the settlement currency is neither base nor quote.
    pub is_quanto: bool,
    /// The decimal precision of prices.
    pub price_precision: u32,
    /// The decimal precision of quantities.
    pub size_precision: u32,
    /// The decimal precision of cost calculations.
    pub cost_precision: u32,
    /// The minimum price increment.
    pub tick_size: Decimal,
    /// The contract multiplier.
    pub multiplier: Decimal,
    /// The maximum leverage offered.
    pub leverage: Decimal,
    /// The rounded lot size.
    pub lot_size: Quantity,
    /// The maximum order quantity, if bounded.
    pub max_quantity: Option<Quantity>,
    /// The minimum order quantity, if bounded.
    pub min_quantity: Option<Quantity>,
    /// The maximum order notional, if bounded.
    pub max_notional: Option<Money>,
    /// The minimum order notional, if bounded.
    pub min_notional: Option<Money>,
    /// The maximum order price, if bounded.
    pub max_price: Option<Price>,
    /// The minimum order price, if bounded.
    pub min_price: Option<Price>,
    /// The initial margin rate.
    pub margin_init: Decimal,
    /// The maintenance margin rate.
    pub margin_maint: Decimal,
    /// The maker fee rate.
    pub maker_fee: Decimal,
    /// The taker fee rate.
    pub taker_fee: Decimal,
    /// Venue-specific financing information (rollover/funding).
    pub financing: HashMap<String, String>,
    /// When the definition was initialized.
    pub timestamp: UnixNanos,
}

impl Instrument {
    /// Creates a new [`Instrument`], enforcing the definition invariants.
    ///
    /// The quanto flag is derived: an instrument is quanto exactly when its
    /// settlement currency is neither the base nor the quote currency.
    ///
    /// # Errors
    ///
    /// Returns an error if quantity bounds are inverted, or if any fee or
    /// margin rate is negative or carries excessive decimal scale.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        security: Security,
        base_currency: Currency,
        quote_currency: Currency,
        settlement_currency: Currency,
        is_inverse: bool,
        price_precision: u32,
        size_precision: u32,
        cost_precision: u32,
        tick_size: Decimal,
        multiplier: Decimal,
        leverage: Decimal,
        lot_size: Quantity,
        max_quantity: Option<Quantity>,
        min_quantity: Option<Quantity>,
        max_notional: Option<Money>,
        min_notional: Option<Money>,
        max_price: Option<Price>,
        min_price: Option<Price>,
        margin_init: Decimal,
        margin_maint: Decimal,
        maker_fee: Decimal,
        taker_fee: Decimal,
        financing: HashMap<String, String>,
        timestamp: UnixNanos,
    ) -> anyhow::Result<Self> {
        if let (Some(min), Some(max)) = (min_quantity, max_quantity) {
            check_predicate_true(
                min.as_decimal() <= max.as_decimal(),
                &format!("min_quantity {min} exceeds max_quantity {max}"),
            )?;
        }
        for (rate, name) in [
            (margin_init, "margin_init"),
            (margin_maint, "margin_maint"),
            (maker_fee, "maker_fee"),
            (taker_fee, "taker_fee"),
        ] {
            check_predicate_true(
                !rate.is_sign_negative() || rate.is_zero(),
                &format!("{name} was negative ({rate})"),
            )?;
            check_predicate_true(
                rate.scale() <= MAX_RATE_SCALE,
                &format!("{name} scale {} exceeds maximum {MAX_RATE_SCALE}", rate.scale()),
            )?;
        }
        check_predicate_true(
            tick_size > Decimal::ZERO,
            &format!("tick_size must be positive, was {tick_size}"),
        )?;

        let is_quanto =
            settlement_currency != base_currency && settlement_currency != quote_currency;

        Ok(Self {
            security,
            base_currency,
            quote_currency,
            settlement_currency,
            is_inverse,
            is_quanto,
            price_precision,
            size_precision,
            cost_precision,
            tick_size,
            multiplier,
            leverage,
            lot_size,
            max_quantity,
            min_quantity,
            max_notional,
            min_notional,
            max_price,
            min_price,
            margin_init,
            margin_maint,
            maker_fee,
            taker_fee,
            financing,
            timestamp,
        })
    }

    /// Calculates the notional value of the given quantity at `price`.
    ///
    /// For inverse instruments the notional is expressed in the base
    /// currency, so quantity is divided by price.
    #[must_use]
    pub fn calculate_notional(&self, quantity: Quantity, price: Price) -> Decimal {
        if self.is_inverse {
            quantity.as_decimal() * self.multiplier / price.as_decimal()
        } else {
            quantity.as_decimal() * self.multiplier * price.as_decimal()
        }
    }

    /// Calculates the commission for a fill of `quantity` at `avg_price`.
    ///
    /// Maker fills use the maker rate, taker fills the taker rate; the result
    /// is rounded to the cost precision in the settlement currency. A
    /// negative rate (rebate) produces negative commission.
    #[must_use]
    pub fn calculate_commission(
        &self,
        quantity: Quantity,
        avg_price: Price,
        liquidity_side: LiquiditySide,
    ) -> Money {
        let notional = self.calculate_notional(quantity, avg_price);
        let rate = match liquidity_side {
            LiquiditySide::Maker => self.maker_fee,
            LiquiditySide::Taker => self.taker_fee,
        };
        Money::new(
            (notional * rate).round_dp(self.cost_precision),
            self.settlement_currency,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::stubs::{instrument_audusd, instrument_xbtusd_bitmex, security_audusd};

    #[rstest]
    fn test_quanto_flag_derived_from_currencies() {
        let instrument = instrument_audusd();

        assert!(!instrument.is_quanto);
        assert_eq!(instrument.settlement_currency, instrument.quote_currency);
    }

    #[rstest]
    fn test_new_rejects_inverted_quantity_bounds() {
        let result = Instrument::new(
            security_audusd(),
            Currency::aud(),
            Currency::usd(),
            Currency::usd(),
            false,
            5,
            0,
            2,
            dec!(0.00001),
            dec!(1),
            dec!(50),
            Quantity::from(1000),
            Some(Quantity::from(100)),
            Some(Quantity::from(1000)),
            None,
            None,
            None,
            None,
            dec!(0.03),
            dec!(0.01),
            dec!(0.0002),
            dec!(0.0002),
            HashMap::new(),
            meridian_core::UnixNanos::default(),
        );

        assert!(result.is_err());
    }

    #[rstest]
    fn test_new_rejects_negative_fee() {
        let result = Instrument::new(
            security_audusd(),
            Currency::aud(),
            Currency::usd(),
            Currency::usd(),
            false,
            5,
            0,
            2,
            dec!(0.00001),
            dec!(1),
            dec!(50),
            Quantity::from(1000),
            None,
            None,
            None,
            None,
            None,
            None,
            dec!(-0.03),
            dec!(0.01),
            dec!(0.0002),
            dec!(0.0002),
            HashMap::new(),
            meridian_core::UnixNanos::default(),
        );

        assert!(result.is_err());
    }

    #[rstest]
    fn test_calculate_commission_taker_linear() {
        let instrument = instrument_audusd();

        let commission = instrument.calculate_commission(
            Quantity::from(100_000),
            Price::from_str("1.00000").unwrap(),
            LiquiditySide::Taker,
        );

        // 100_000 * 1.0 * 0.0002 = 20.00 USD
        assert_eq!(commission, Money::new(dec!(20.00), Currency::usd()));
    }

    #[rstest]
    fn test_calculate_notional_inverse() {
        let instrument = instrument_xbtusd_bitmex();

        let notional = instrument
            .calculate_notional(Quantity::from(10_000), Price::from_str("50000").unwrap());

        // Inverse: 10_000 / 50_000 = 0.2 XBT
        assert_eq!(notional, dec!(0.2));
    }
}
