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

//! The event family for orders, accounts and positions.
//!
//! Events are immutable facts. Order events drive the order state machine;
//! account events update venue account projections; position events are
//! emitted by the portfolio as fills are applied.

use std::{collections::HashMap, fmt::Display};

use meridian_core::{UUID4, UnixNanos};

use crate::{
    enums::{LiquiditySide, OrderSide, OrderType, TimeInForce},
    identifiers::{
        AccountId, ClientOrderId, ExecutionId, OrderId, PositionId, Security, StrategyId,
    },
    position::Position,
    types::{Currency, Money, Price, Quantity},
};

/// An order has been created locally and is ready for submission.
///
/// This is always the first event applied to an order; its fields define the
/// order's immutable attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderInitialized {
    /// The strategy-assigned order identifier.
    pub cl_ord_id: ClientOrderId,
    /// The strategy which created the order.
    pub strategy_id: StrategyId,
    /// The security to trade.
    pub security: Security,
    /// The order side.
    pub order_side: OrderSide,
    /// The order type.
    pub order_type: OrderType,
    /// The order quantity.
    pub quantity: Quantity,
    /// The time-in-force instruction.
    pub time_in_force: TimeInForce,
    /// The limit price (`None` for MARKET orders).
    pub price: Option<Price>,
    /// The stop trigger price (STOP and STOP_LIMIT orders).
    pub trigger: Option<Price>,
    /// The expire time (GTD orders).
    pub expire_time: Option<UnixNanos>,
    /// The purpose the order serves within its strategy.
    pub purpose: crate::enums::OrderPurpose,
    /// The event correlation identifier.
    pub event_id: UUID4,
    /// When the event occurred.
    pub event_timestamp: UnixNanos,
}

/// An order has failed an integrity check and is now unusable (terminal).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderInvalid {
    /// The strategy-assigned order identifier.
    pub cl_ord_id: ClientOrderId,
    /// The reason the order was invalidated.
    pub reason: String,
    /// The event correlation identifier.
    pub event_id: UUID4,
    /// When the event occurred.
    pub event_timestamp: UnixNanos,
}

/// An order has been denied locally before reaching a venue (terminal).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderDenied {
    /// The strategy-assigned order identifier.
    pub cl_ord_id: ClientOrderId,
    /// The reason the order was denied.
    pub reason: String,
    /// The event correlation identifier.
    pub event_id: UUID4,
    /// When the event occurred.
    pub event_timestamp: UnixNanos,
}

/// An order has been sent to a venue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderSubmitted {
    /// The venue account the order was submitted through.
    pub account_id: AccountId,
    /// The strategy-assigned order identifier.
    pub cl_ord_id: ClientOrderId,
    /// When the order was submitted.
    pub submitted_time: UnixNanos,
    /// The event correlation identifier.
    pub event_id: UUID4,
    /// When the event occurred.
    pub event_timestamp: UnixNanos,
}

/// A venue has rejected an order (terminal).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderRejected {
    /// The venue account.
    pub account_id: AccountId,
    /// The strategy-assigned order identifier.
    pub cl_ord_id: ClientOrderId,
    /// When the order was rejected.
    pub rejected_time: UnixNanos,
    /// The venue-supplied rejection reason.
    pub reason: String,
    /// The event correlation identifier.
    pub event_id: UUID4,
    /// When the event occurred.
    pub event_timestamp: UnixNanos,
}

/// A venue has accepted an order, binding the venue order identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderAccepted {
    /// The venue account.
    pub account_id: AccountId,
    /// The strategy-assigned order identifier.
    pub cl_ord_id: ClientOrderId,
    /// The venue-assigned order identifier.
    pub order_id: OrderId,
    /// When the order was accepted.
    pub accepted_time: UnixNanos,
    /// The event correlation identifier.
    pub event_id: UUID4,
    /// When the event occurred.
    pub event_timestamp: UnixNanos,
}

/// An order is now resting in the venue book.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderWorking {
    /// The venue account.
    pub account_id: AccountId,
    /// The strategy-assigned order identifier.
    pub cl_ord_id: ClientOrderId,
    /// The venue-assigned order identifier.
    pub order_id: OrderId,
    /// The security the order trades.
    pub security: Security,
    /// The order side.
    pub order_side: OrderSide,
    /// The order type.
    pub order_type: OrderType,
    /// The working quantity.
    pub quantity: Quantity,
    /// The working price.
    pub price: Price,
    /// The time-in-force instruction.
    pub time_in_force: TimeInForce,
    /// The expire time (GTD orders).
    pub expire_time: Option<UnixNanos>,
    /// When the order started working.
    pub working_time: UnixNanos,
    /// The event correlation identifier.
    pub event_id: UUID4,
    /// When the event occurred.
    pub event_timestamp: UnixNanos,
}

/// A venue has rejected a cancel or modify request.
///
/// Does not change order state; logged and forwarded for observability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderCancelReject {
    /// The venue account.
    pub account_id: AccountId,
    /// The strategy-assigned order identifier.
    pub cl_ord_id: ClientOrderId,
    /// When the request was rejected.
    pub rejected_time: UnixNanos,
    /// Which request was rejected (e.g. `cancel_order`).
    pub response_to: String,
    /// The venue-supplied reason.
    pub reason: String,
    /// The event correlation identifier.
    pub event_id: UUID4,
    /// When the event occurred.
    pub event_timestamp: UnixNanos,
}

/// An order has been cancelled at the venue (terminal).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderCancelled {
    /// The venue account.
    pub account_id: AccountId,
    /// The strategy-assigned order identifier.
    pub cl_ord_id: ClientOrderId,
    /// The venue-assigned order identifier.
    pub order_id: OrderId,
    /// When the order was cancelled.
    pub cancelled_time: UnixNanos,
    /// The event correlation identifier.
    pub event_id: UUID4,
    /// When the event occurred.
    pub event_timestamp: UnixNanos,
}

/// An order has expired at the venue (terminal).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderExpired {
    /// The venue account.
    pub account_id: AccountId,
    /// The strategy-assigned order identifier.
    pub cl_ord_id: ClientOrderId,
    /// The venue-assigned order identifier.
    pub order_id: OrderId,
    /// When the order expired.
    pub expired_time: UnixNanos,
    /// The event correlation identifier.
    pub event_id: UUID4,
    /// When the event occurred.
    pub event_timestamp: UnixNanos,
}

/// A stop-limit order's trigger price has traded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderTriggered {
    /// The venue account.
    pub account_id: AccountId,
    /// The strategy-assigned order identifier.
    pub cl_ord_id: ClientOrderId,
    /// The venue-assigned order identifier.
    pub order_id: OrderId,
    /// When the order triggered.
    pub triggered_time: UnixNanos,
    /// The event correlation identifier.
    pub event_id: UUID4,
    /// When the event occurred.
    pub event_timestamp: UnixNanos,
}

/// A venue has confirmed an order modification; price/quantity replaced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderAmended {
    /// The venue account.
    pub account_id: AccountId,
    /// The strategy-assigned order identifier.
    pub cl_ord_id: ClientOrderId,
    /// The venue-assigned order identifier.
    pub order_id: OrderId,
    /// The new working quantity.
    pub quantity: Quantity,
    /// The new working price.
    pub price: Price,
    /// When the amendment was confirmed.
    pub amended_time: UnixNanos,
    /// The event correlation identifier.
    pub event_id: UUID4,
    /// When the event occurred.
    pub event_timestamp: UnixNanos,
}

/// A venue has executed some or all of an order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderFilled {
    /// The venue account.
    pub account_id: AccountId,
    /// The strategy-assigned order identifier.
    pub cl_ord_id: ClientOrderId,
    /// The venue-assigned order identifier.
    pub order_id: OrderId,
    /// The venue-assigned identifier for this fill.
    pub execution_id: ExecutionId,
    /// The position this fill applies to, if already determined.
    pub position_id: Option<PositionId>,
    /// The strategy which owns the order.
    pub strategy_id: StrategyId,
    /// The security traded.
    pub security: Security,
    /// The order side.
    pub order_side: OrderSide,
    /// The quantity of this fill.
    pub fill_qty: Quantity,
    /// The cumulative filled quantity after this fill.
    pub cum_qty: Quantity,
    /// The remaining unfilled quantity after this fill.
    pub leaves_qty: Quantity,
    /// The price of this fill.
    pub fill_price: Price,
    /// The currency of the fill price.
    pub currency: Currency,
    /// The commission charged for this fill.
    pub commission: Money,
    /// Whether the fill provided or took liquidity.
    pub liquidity_side: LiquiditySide,
    /// When the venue executed the fill.
    pub execution_time: UnixNanos,
    /// The event correlation identifier.
    pub event_id: UUID4,
    /// When the event occurred.
    pub event_timestamp: UnixNanos,
}

impl OrderFilled {
    /// Returns true if the fill leaves quantity still working.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.leaves_qty.is_zero()
    }
}

/// The tagged union of all order lifecycle events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderEvent {
    /// Order created locally.
    Initialized(OrderInitialized),
    /// Order failed an integrity check (terminal).
    Invalid(OrderInvalid),
    /// Order denied locally (terminal).
    Denied(OrderDenied),
    /// Order sent to the venue.
    Submitted(OrderSubmitted),
    /// Order rejected by the venue (terminal).
    Rejected(OrderRejected),
    /// Order accepted by the venue.
    Accepted(OrderAccepted),
    /// Order resting in the venue book.
    Working(OrderWorking),
    /// Cancel/modify request rejected (no state change).
    CancelReject(OrderCancelReject),
    /// Order cancelled (terminal).
    Cancelled(OrderCancelled),
    /// Order expired (terminal).
    Expired(OrderExpired),
    /// Stop-limit trigger traded.
    Triggered(OrderTriggered),
    /// Order modification confirmed.
    Amended(OrderAmended),
    /// Order partially executed.
    PartiallyFilled(OrderFilled),
    /// Order completely executed (terminal).
    Filled(OrderFilled),
}

impl OrderEvent {
    /// Returns the strategy-assigned order identifier the event applies to.
    #[must_use]
    pub fn cl_ord_id(&self) -> ClientOrderId {
        match self {
            Self::Initialized(e) => e.cl_ord_id,
            Self::Invalid(e) => e.cl_ord_id,
            Self::Denied(e) => e.cl_ord_id,
            Self::Submitted(e) => e.cl_ord_id,
            Self::Rejected(e) => e.cl_ord_id,
            Self::Accepted(e) => e.cl_ord_id,
            Self::Working(e) => e.cl_ord_id,
            Self::CancelReject(e) => e.cl_ord_id,
            Self::Cancelled(e) => e.cl_ord_id,
            Self::Expired(e) => e.cl_ord_id,
            Self::Triggered(e) => e.cl_ord_id,
            Self::Amended(e) => e.cl_ord_id,
            Self::PartiallyFilled(e) | Self::Filled(e) => e.cl_ord_id,
        }
    }

    /// Returns the event correlation identifier.
    #[must_use]
    pub fn event_id(&self) -> UUID4 {
        match self {
            Self::Initialized(e) => e.event_id,
            Self::Invalid(e) => e.event_id,
            Self::Denied(e) => e.event_id,
            Self::Submitted(e) => e.event_id,
            Self::Rejected(e) => e.event_id,
            Self::Accepted(e) => e.event_id,
            Self::Working(e) => e.event_id,
            Self::CancelReject(e) => e.event_id,
            Self::Cancelled(e) => e.event_id,
            Self::Expired(e) => e.event_id,
            Self::Triggered(e) => e.event_id,
            Self::Amended(e) => e.event_id,
            Self::PartiallyFilled(e) | Self::Filled(e) => e.event_id,
        }
    }

    /// Returns the venue-assigned order identifier carried by the event, if any.
    #[must_use]
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            Self::Accepted(e) => Some(e.order_id),
            Self::Working(e) => Some(e.order_id),
            Self::Cancelled(e) => Some(e.order_id),
            Self::Expired(e) => Some(e.order_id),
            Self::Triggered(e) => Some(e.order_id),
            Self::Amended(e) => Some(e.order_id),
            Self::PartiallyFilled(e) | Self::Filled(e) => Some(e.order_id),
            _ => None,
        }
    }

    /// Returns the fill payload if this is a fill event.
    #[must_use]
    pub const fn fill(&self) -> Option<&OrderFilled> {
        match self {
            Self::PartiallyFilled(e) | Self::Filled(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the event type name, e.g. `OrderAccepted`.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Initialized(_) => "OrderInitialized",
            Self::Invalid(_) => "OrderInvalid",
            Self::Denied(_) => "OrderDenied",
            Self::Submitted(_) => "OrderSubmitted",
            Self::Rejected(_) => "OrderRejected",
            Self::Accepted(_) => "OrderAccepted",
            Self::Working(_) => "OrderWorking",
            Self::CancelReject(_) => "OrderCancelReject",
            Self::Cancelled(_) => "OrderCancelled",
            Self::Expired(_) => "OrderExpired",
            Self::Triggered(_) => "OrderTriggered",
            Self::Amended(_) => "OrderAmended",
            Self::PartiallyFilled(_) => "OrderPartiallyFilled",
            Self::Filled(_) => "OrderFilled",
        }
    }
}

impl Display for OrderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(e) => write!(
                f,
                "{}(cl_ord_id={}, reason='{}', event_id={})",
                self.type_name(),
                e.cl_ord_id,
                e.reason,
                e.event_id
            ),
            Self::Denied(e) => write!(
                f,
                "{}(cl_ord_id={}, reason='{}', event_id={})",
                self.type_name(),
                e.cl_ord_id,
                e.reason,
                e.event_id
            ),
            Self::Rejected(e) => write!(
                f,
                "{}(cl_ord_id={}, reason='{}', event_id={})",
                self.type_name(),
                e.cl_ord_id,
                e.reason,
                e.event_id
            ),
            Self::PartiallyFilled(e) | Self::Filled(e) => write!(
                f,
                "{}(cl_ord_id={}, execution_id={}, fill_qty={}, cum_qty={}, leaves_qty={}, fill_price={}, event_id={})",
                self.type_name(),
                e.cl_ord_id,
                e.execution_id,
                e.fill_qty,
                e.cum_qty,
                e.leaves_qty,
                e.fill_price,
                e.event_id
            ),
            _ => write!(
                f,
                "{}(cl_ord_id={}, event_id={})",
                self.type_name(),
                self.cl_ord_id(),
                self.event_id()
            ),
        }
    }
}

/// The state of a venue account at a point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountState {
    /// The venue account.
    pub account_id: AccountId,
    /// Total balances per currency.
    pub balances: Vec<Money>,
    /// Free balances per currency.
    pub balances_free: Vec<Money>,
    /// Locked (margin/held) balances per currency.
    pub balances_locked: Vec<Money>,
    /// Venue-specific account information.
    pub info: HashMap<String, String>,
    /// The event correlation identifier.
    pub event_id: UUID4,
    /// When the event occurred.
    pub event_timestamp: UnixNanos,
}

impl Display for AccountState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let free: Vec<String> = self.balances_free.iter().map(ToString::to_string).collect();
        let locked: Vec<String> = self
            .balances_locked
            .iter()
            .map(ToString::to_string)
            .collect();
        write!(
            f,
            "AccountState(account_id={}, free=[{}], locked=[{}], event_id={})",
            self.account_id,
            free.join(", "),
            locked.join(", "),
            self.event_id
        )
    }
}

/// The envelope of events consumed by the execution engine queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// An order lifecycle event.
    Order(OrderEvent),
    /// A venue account state event.
    Account(AccountState),
}

impl Event {
    /// Returns the event correlation identifier.
    #[must_use]
    pub fn event_id(&self) -> UUID4 {
        match self {
            Self::Order(e) => e.event_id(),
            Self::Account(e) => e.event_id,
        }
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Order(e) => write!(f, "{e}"),
            Self::Account(e) => write!(f, "{e}"),
        }
    }
}

/// A position lifecycle event emitted by the portfolio projection.
#[derive(Clone, Debug)]
pub enum PositionEvent {
    /// A new position was opened by a fill.
    Opened(PositionStateChange),
    /// An open position was modified by a fill.
    Changed(PositionStateChange),
    /// A position quantity returned to zero.
    Closed(PositionStateChange),
}

/// The payload shared by all position events.
#[derive(Clone, Debug)]
pub struct PositionStateChange {
    /// A snapshot of the position after the fill was applied.
    pub position: Position,
    /// The fill which caused the change.
    pub fill: OrderFilled,
    /// The event correlation identifier.
    pub event_id: UUID4,
    /// When the event occurred.
    pub event_timestamp: UnixNanos,
}

impl PositionEvent {
    /// Returns the position snapshot carried by the event.
    #[must_use]
    pub const fn position(&self) -> &Position {
        match self {
            Self::Opened(e) | Self::Changed(e) | Self::Closed(e) => &e.position,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use meridian_core::{UUID4, UnixNanos};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        enums::{AssetClass, AssetType, OrderSide},
        identifiers::{Symbol, Venue},
        types::Quantity,
    };

    fn security_audusd() -> Security {
        Security::new(
            Symbol::new("AUD/USD"),
            Venue::new("SIM"),
            AssetClass::Fx,
            AssetType::Spot,
        )
    }

    #[rstest]
    fn test_order_invalid_display() {
        let event_id = UUID4::new();
        let event = OrderEvent::Invalid(OrderInvalid {
            cl_ord_id: ClientOrderId::new("O-2020872378423"),
            reason: "DUPLICATE_CL_ORD_ID".to_string(),
            event_id,
            event_timestamp: UnixNanos::default(),
        });

        assert_eq!(
            event.to_string(),
            format!(
                "OrderInvalid(cl_ord_id=O-2020872378423, reason='DUPLICATE_CL_ORD_ID', event_id={event_id})"
            )
        );
    }

    #[rstest]
    fn test_account_state_display() {
        let event_id = UUID4::new();
        let event = AccountState {
            account_id: AccountId::new("SIM", "000"),
            balances: vec![Money::new(dec!(1525000), Currency::usd())],
            balances_free: vec![Money::new(dec!(1525000), Currency::usd())],
            balances_locked: vec![Money::new(dec!(0), Currency::usd())],
            info: HashMap::new(),
            event_id,
            event_timestamp: UnixNanos::default(),
        };

        assert_eq!(
            event.to_string(),
            format!(
                "AccountState(account_id=SIM-000, free=[1525000 USD], locked=[0 USD], event_id={event_id})"
            )
        );
    }

    #[rstest]
    fn test_fill_event_accessors() {
        let fill = OrderFilled {
            account_id: AccountId::new("SIM", "000"),
            cl_ord_id: ClientOrderId::new("O-1"),
            order_id: OrderId::new("1"),
            execution_id: ExecutionId::new("E-1"),
            position_id: None,
            strategy_id: StrategyId::new("S", "001"),
            security: security_audusd(),
            order_side: OrderSide::Buy,
            fill_qty: Quantity::from(4),
            cum_qty: Quantity::from(4),
            leaves_qty: Quantity::from(6),
            fill_price: Price::from_str("1.00000").unwrap(),
            currency: Currency::usd(),
            commission: Money::zero(Currency::usd()),
            liquidity_side: LiquiditySide::Taker,
            execution_time: UnixNanos::default(),
            event_id: UUID4::new(),
            event_timestamp: UnixNanos::default(),
        };

        assert!(fill.is_partial());

        let event = OrderEvent::PartiallyFilled(fill.clone());
        assert_eq!(event.cl_ord_id(), ClientOrderId::new("O-1"));
        assert_eq!(event.order_id(), Some(OrderId::new("1")));
        assert_eq!(event.fill(), Some(&fill));
        assert_eq!(event.type_name(), "OrderPartiallyFilled");
    }
}
