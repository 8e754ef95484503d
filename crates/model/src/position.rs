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

//! The position entity, built and mutated exclusively from order fills.

use std::fmt::{Debug, Display};

use meridian_core::UnixNanos;
use rust_decimal::Decimal;

use crate::{
    enums::{OrderSide, PositionSide},
    events::OrderFilled,
    identifiers::{AccountId, ExecutionId, PositionId, Security, StrategyId},
    types::{Currency, Money, Price, Quantity},
};

/// A net market exposure for a `(strategy, security)` key.
///
/// Created from its opening fill; subsequent fills for the same key
/// accumulate, reduce or close the exposure. Side flips are handled by the
/// portfolio, which closes the position and opens a new one with the residual
/// quantity.
#[derive(Clone)]
pub struct Position {
    /// The position identifier.
    pub id: PositionId,
    /// The strategy which owns the position.
    pub strategy_id: StrategyId,
    /// The security held.
    pub security: Security,
    /// The venue account the position was opened through.
    pub account_id: AccountId,
    /// The current market side.
    pub side: PositionSide,
    /// The current absolute quantity.
    pub quantity: Quantity,
    /// The quantity-weighted average entry price.
    pub avg_open: Decimal,
    /// The currency PnL is accounted in.
    pub currency: Currency,
    /// Realized PnL, net of commissions in the accounting currency.
    pub realized_pnl: Money,
    /// When the position was opened.
    pub opened_time: UnixNanos,
    /// When the position was closed, if flat.
    pub closed_time: Option<UnixNanos>,
    execution_ids: Vec<ExecutionId>,
    events: Vec<OrderFilled>,
}

impl Position {
    /// Creates a new [`Position`] from its opening fill.
    #[must_use]
    pub fn new(id: PositionId, fill: OrderFilled) -> Self {
        let side = match fill.order_side {
            OrderSide::Buy => PositionSide::Long,
            OrderSide::Sell => PositionSide::Short,
        };
        let mut realized_pnl = Money::zero(fill.currency);
        if fill.commission.currency == fill.currency {
            realized_pnl -= fill.commission;
        }

        Self {
            id,
            strategy_id: fill.strategy_id,
            security: fill.security,
            account_id: fill.account_id,
            side,
            quantity: fill.fill_qty,
            avg_open: fill.fill_price.as_decimal(),
            currency: fill.currency,
            realized_pnl,
            opened_time: fill.execution_time,
            closed_time: None,
            execution_ids: vec![fill.execution_id],
            events: vec![fill],
        }
    }

    /// Applies a subsequent fill for the same `(strategy, security)` key.
    ///
    /// Same-direction fills accumulate quantity and re-weight the average
    /// entry price; opposing fills realize PnL against the average entry and
    /// reduce quantity, closing the position when it reaches zero. Callers
    /// must split flip fills first; an opposing quantity greater than the
    /// open quantity is clamped and logged.
    pub fn apply(&mut self, fill: OrderFilled) {
        let fill_px = fill.fill_price.as_decimal();
        let fill_qty = fill.fill_qty.as_decimal();

        if self.is_opposite_side(fill.order_side) {
            let open_qty = self.quantity.as_decimal();
            let reduce_qty = if fill_qty > open_qty {
                log::warn!(
                    "Fill {} for {} exceeds open quantity {open_qty}, clamping",
                    fill.execution_id,
                    self.id
                );
                open_qty
            } else {
                fill_qty
            };

            let direction = match self.side {
                PositionSide::Long => Decimal::ONE,
                PositionSide::Short => -Decimal::ONE,
                PositionSide::Flat => Decimal::ZERO,
            };
            let pnl = (fill_px - self.avg_open) * reduce_qty * direction;
            self.realized_pnl += Money::new(pnl, self.currency);

            self.quantity = self.quantity.saturating_sub(fill.fill_qty);
            if self.quantity.is_zero() {
                self.side = PositionSide::Flat;
                self.closed_time = Some(fill.execution_time);
            }
        } else {
            // Accumulating in the entry direction
            let open_qty = self.quantity.as_decimal();
            self.avg_open =
                (self.avg_open * open_qty + fill_px * fill_qty) / (open_qty + fill_qty);
            self.quantity = self.quantity + fill.fill_qty;
        }

        if fill.commission.currency == self.currency {
            self.realized_pnl -= fill.commission;
        }

        self.execution_ids.push(fill.execution_id);
        self.events.push(fill);
    }

    /// Returns true if `side` opposes the current position side.
    #[must_use]
    pub const fn is_opposite_side(&self, side: OrderSide) -> bool {
        matches!(
            (self.side, side),
            (PositionSide::Long, OrderSide::Sell) | (PositionSide::Short, OrderSide::Buy)
        )
    }

    /// Returns true if the position has open quantity.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.quantity.is_zero()
    }

    /// Returns true if the position has returned to zero quantity.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.quantity.is_zero()
    }

    /// Returns the unrealized PnL of the open quantity against `last_price`.
    #[must_use]
    pub fn unrealized_pnl(&self, last_price: Price) -> Money {
        let direction = match self.side {
            PositionSide::Long => Decimal::ONE,
            PositionSide::Short => -Decimal::ONE,
            PositionSide::Flat => return Money::zero(self.currency),
        };
        let pnl = (last_price.as_decimal() - self.avg_open) * self.quantity.as_decimal() * direction;
        Money::new(pnl, self.currency)
    }

    /// Returns the execution IDs applied to this position, in order.
    #[must_use]
    pub fn execution_ids(&self) -> &[ExecutionId] {
        &self.execution_ids
    }

    /// Returns the fills applied to this position, in order.
    #[must_use]
    pub fn events(&self) -> &[OrderFilled] {
        &self.events
    }

    /// Returns the most recently applied fill.
    #[must_use]
    pub fn last_event(&self) -> &OrderFilled {
        self.events.last().expect("positions always hold a fill")
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Position({} {} {}, id={})",
            self.side, self.quantity, self.security, self.id
        )
    }
}

impl Debug for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(Position))
            .field("id", &self.id)
            .field("side", &self.side)
            .field("quantity", &self.quantity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::stubs::{TestStubs, security_audusd};

    fn fill(
        side: OrderSide,
        exec_id: &str,
        qty: u64,
        px: &str,
    ) -> OrderFilled {
        TestStubs::fill(
            security_audusd(),
            side,
            ExecutionId::new(exec_id),
            Quantity::from(qty),
            Price::from_str(px).unwrap(),
        )
    }

    #[rstest]
    fn test_position_opened_from_buy_fill() {
        let position = Position::new(
            PositionId::new("P-1"),
            fill(OrderSide::Buy, "E-1", 100, "1.00010"),
        );

        assert_eq!(position.side, PositionSide::Long);
        assert_eq!(position.quantity, Quantity::from(100));
        assert_eq!(position.avg_open, dec!(1.00010));
        assert!(position.is_open());
    }

    #[rstest]
    fn test_accumulating_fills_reweight_average() {
        let mut position = Position::new(
            PositionId::new("P-1"),
            fill(OrderSide::Buy, "E-1", 100, "1.0000"),
        );

        position.apply(fill(OrderSide::Buy, "E-2", 100, "1.0002"));

        assert_eq!(position.quantity, Quantity::from(200));
        assert_eq!(position.avg_open, dec!(1.0001));
    }

    #[rstest]
    fn test_reducing_fill_realizes_pnl() {
        let mut position = Position::new(
            PositionId::new("P-1"),
            fill(OrderSide::Buy, "E-1", 100, "1.0000"),
        );

        position.apply(fill(OrderSide::Sell, "E-2", 50, "1.0010"));

        assert_eq!(position.quantity, Quantity::from(50));
        assert_eq!(position.side, PositionSide::Long);
        assert_eq!(position.realized_pnl.as_decimal(), dec!(0.05));
        assert!(position.is_open());
    }

    #[rstest]
    fn test_closing_fill_flattens_position() {
        let mut position = Position::new(
            PositionId::new("P-1"),
            fill(OrderSide::Sell, "E-1", 100, "1.0010"),
        );

        position.apply(fill(OrderSide::Buy, "E-2", 100, "1.0000"));

        assert_eq!(position.side, PositionSide::Flat);
        assert!(position.is_closed());
        assert!(position.closed_time.is_some());
        // Short from 1.0010 covered at 1.0000
        assert_eq!(position.realized_pnl.as_decimal(), dec!(0.10));
    }

    #[rstest]
    fn test_unrealized_pnl_long() {
        let position = Position::new(
            PositionId::new("P-1"),
            fill(OrderSide::Buy, "E-1", 100, "1.0000"),
        );

        let pnl = position.unrealized_pnl(Price::from_str("1.0005").unwrap());

        assert_eq!(pnl.as_decimal(), dec!(0.05));
    }
}
