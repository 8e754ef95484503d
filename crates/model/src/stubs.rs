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

//! Test stubs for the domain model, shared across the workspace test suites.

use std::{collections::HashMap, str::FromStr};

use meridian_core::{UUID4, UnixNanos};
use rust_decimal_macros::dec;

use crate::{
    enums::{AssetClass, AssetType, LiquiditySide, OrderSide},
    events::{
        AccountState, OrderAccepted, OrderAmended, OrderCancelReject, OrderCancelled, OrderEvent,
        OrderExpired, OrderFilled, OrderInvalid, OrderRejected, OrderSubmitted, OrderTriggered,
        OrderWorking,
    },
    identifiers::{AccountId, ExecutionId, OrderId, Security, StrategyId, Symbol, TraderId, Venue},
    instruments::Instrument,
    orders::Order,
    types::{Currency, Money, Price, Quantity},
};

/// Returns the standard AUD/USD spot security on the SIM venue.
#[must_use]
pub fn security_audusd() -> Security {
    Security::new(
        Symbol::new("AUD/USD"),
        Venue::new("SIM"),
        AssetClass::Fx,
        AssetType::Spot,
    )
}

/// Returns the standard GBP/USD spot security on the SIM venue.
#[must_use]
pub fn security_gbpusd() -> Security {
    Security::new(
        Symbol::new("GBP/USD"),
        Venue::new("SIM"),
        AssetClass::Fx,
        AssetType::Spot,
    )
}

/// Returns the standard XBT/USD swap security on BITMEX.
#[must_use]
pub fn security_xbtusd_bitmex() -> Security {
    Security::new(
        Symbol::new("XBT/USD"),
        Venue::new("BITMEX"),
        AssetClass::Crypto,
        AssetType::Swap,
    )
}

/// Returns a linear AUD/USD spot instrument definition.
#[must_use]
pub fn instrument_audusd() -> Instrument {
    Instrument::new(
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
        Some(Quantity::from(50_000_000)),
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
        UnixNanos::default(),
    )
    .expect("valid instrument definition")
}

/// Returns an inverse XBT/USD swap instrument definition.
#[must_use]
pub fn instrument_xbtusd_bitmex() -> Instrument {
    Instrument::new(
        security_xbtusd_bitmex(),
        Currency::btc(),
        Currency::usd(),
        Currency::btc(),
        true,
        1,
        0,
        8,
        dec!(0.5),
        dec!(1),
        dec!(100),
        Quantity::from(1),
        None,
        Some(Quantity::from(1)),
        None,
        None,
        None,
        None,
        dec!(0.01),
        dec!(0.0035),
        dec!(-0.00025),
        dec!(0.00075),
        HashMap::new(),
        UnixNanos::default(),
    )
    .expect("valid instrument definition")
}

/// Canonical stub values and event constructors for tests.
pub struct TestStubs;

impl TestStubs {
    /// The standard test trader identifier.
    #[must_use]
    pub fn trader_id() -> TraderId {
        TraderId::new("TESTER", "000")
    }

    /// The standard test strategy identifier.
    #[must_use]
    pub fn strategy_id() -> StrategyId {
        StrategyId::new("S", "001")
    }

    /// The standard test account identifier.
    #[must_use]
    pub fn account_id() -> AccountId {
        AccountId::new("SIM", "000")
    }

    /// Builds an `OrderSubmitted` event for `order`.
    #[must_use]
    pub fn event_order_submitted(order: &Order) -> OrderEvent {
        OrderEvent::Submitted(OrderSubmitted {
            account_id: Self::account_id(),
            cl_ord_id: order.cl_ord_id(),
            submitted_time: UnixNanos::default(),
            event_id: UUID4::new(),
            event_timestamp: UnixNanos::default(),
        })
    }

    /// Builds an `OrderAccepted` event for `order` binding `order_id`.
    #[must_use]
    pub fn event_order_accepted(order: &Order, order_id: OrderId) -> OrderEvent {
        OrderEvent::Accepted(OrderAccepted {
            account_id: Self::account_id(),
            cl_ord_id: order.cl_ord_id(),
            order_id,
            accepted_time: UnixNanos::default(),
            event_id: UUID4::new(),
            event_timestamp: UnixNanos::default(),
        })
    }

    /// Builds an `OrderRejected` event for `order`.
    #[must_use]
    pub fn event_order_rejected(order: &Order, reason: &str) -> OrderEvent {
        OrderEvent::Rejected(OrderRejected {
            account_id: Self::account_id(),
            cl_ord_id: order.cl_ord_id(),
            rejected_time: UnixNanos::default(),
            reason: reason.to_string(),
            event_id: UUID4::new(),
            event_timestamp: UnixNanos::default(),
        })
    }

    /// Builds an `OrderWorking` event for `order`.
    #[must_use]
    pub fn event_order_working(order: &Order) -> OrderEvent {
        OrderEvent::Working(OrderWorking {
            account_id: Self::account_id(),
            cl_ord_id: order.cl_ord_id(),
            order_id: order.order_id().unwrap_or_else(|| OrderId::new("1")),
            security: order.security(),
            order_side: order.side(),
            order_type: order.order_type(),
            quantity: order.quantity(),
            price: order
                .price()
                .unwrap_or_else(|| Price::from_str("1.00000").expect("valid price")),
            time_in_force: order.time_in_force(),
            expire_time: order.expire_time(),
            working_time: UnixNanos::default(),
            event_id: UUID4::new(),
            event_timestamp: UnixNanos::default(),
        })
    }

    /// Builds an `OrderCancelled` event for `order`.
    #[must_use]
    pub fn event_order_cancelled(order: &Order) -> OrderEvent {
        OrderEvent::Cancelled(OrderCancelled {
            account_id: Self::account_id(),
            cl_ord_id: order.cl_ord_id(),
            order_id: order.order_id().unwrap_or_else(|| OrderId::new("1")),
            cancelled_time: UnixNanos::default(),
            event_id: UUID4::new(),
            event_timestamp: UnixNanos::default(),
        })
    }

    /// Builds an `OrderExpired` event for `order`.
    #[must_use]
    pub fn event_order_expired(order: &Order) -> OrderEvent {
        OrderEvent::Expired(OrderExpired {
            account_id: Self::account_id(),
            cl_ord_id: order.cl_ord_id(),
            order_id: order.order_id().unwrap_or_else(|| OrderId::new("1")),
            expired_time: UnixNanos::default(),
            event_id: UUID4::new(),
            event_timestamp: UnixNanos::default(),
        })
    }

    /// Builds an `OrderTriggered` event for `order`.
    #[must_use]
    pub fn event_order_triggered(order: &Order) -> OrderEvent {
        OrderEvent::Triggered(OrderTriggered {
            account_id: Self::account_id(),
            cl_ord_id: order.cl_ord_id(),
            order_id: order.order_id().unwrap_or_else(|| OrderId::new("1")),
            triggered_time: UnixNanos::default(),
            event_id: UUID4::new(),
            event_timestamp: UnixNanos::default(),
        })
    }

    /// Builds an `OrderAmended` event for `order`.
    #[must_use]
    pub fn event_order_amended(order: &Order, quantity: Quantity, price: Price) -> OrderEvent {
        OrderEvent::Amended(OrderAmended {
            account_id: Self::account_id(),
            cl_ord_id: order.cl_ord_id(),
            order_id: order.order_id().unwrap_or_else(|| OrderId::new("1")),
            quantity,
            price,
            amended_time: UnixNanos::default(),
            event_id: UUID4::new(),
            event_timestamp: UnixNanos::default(),
        })
    }

    /// Builds an `OrderInvalid` event for `order`.
    #[must_use]
    pub fn event_order_invalid(order: &Order, reason: &str) -> OrderEvent {
        OrderEvent::Invalid(OrderInvalid {
            cl_ord_id: order.cl_ord_id(),
            reason: reason.to_string(),
            event_id: UUID4::new(),
            event_timestamp: UnixNanos::default(),
        })
    }

    /// Builds an `OrderCancelReject` event for `order`.
    #[must_use]
    pub fn event_order_cancel_reject(
        order: &Order,
        response_to: &str,
        reason: &str,
    ) -> OrderEvent {
        OrderEvent::CancelReject(OrderCancelReject {
            account_id: Self::account_id(),
            cl_ord_id: order.cl_ord_id(),
            rejected_time: UnixNanos::default(),
            response_to: response_to.to_string(),
            reason: reason.to_string(),
            event_id: UUID4::new(),
            event_timestamp: UnixNanos::default(),
        })
    }

    /// Builds a fill payload for `order`, computing cumulative and leaves
    /// quantities from the order's current fill state.
    #[must_use]
    pub fn order_fill(
        order: &Order,
        execution_id: ExecutionId,
        fill_qty: Quantity,
        fill_price: Price,
    ) -> OrderFilled {
        let cum_qty = order.filled_qty() + fill_qty;
        OrderFilled {
            account_id: Self::account_id(),
            cl_ord_id: order.cl_ord_id(),
            order_id: order.order_id().unwrap_or_else(|| OrderId::new("1")),
            execution_id,
            position_id: None,
            strategy_id: order.strategy_id(),
            security: order.security(),
            order_side: order.side(),
            fill_qty,
            cum_qty,
            leaves_qty: order.quantity().saturating_sub(cum_qty),
            fill_price,
            currency: Currency::usd(),
            commission: Money::zero(Currency::usd()),
            liquidity_side: LiquiditySide::Taker,
            execution_time: UnixNanos::default(),
            event_id: UUID4::new(),
            event_timestamp: UnixNanos::default(),
        }
    }

    /// Builds an `OrderPartiallyFilled` event for `order`.
    #[must_use]
    pub fn event_order_partially_filled(
        order: &Order,
        execution_id: ExecutionId,
        fill_qty: Quantity,
        fill_price: Price,
    ) -> OrderEvent {
        OrderEvent::PartiallyFilled(Self::order_fill(order, execution_id, fill_qty, fill_price))
    }

    /// Builds an `OrderFilled` event for `order`.
    #[must_use]
    pub fn event_order_filled(
        order: &Order,
        execution_id: ExecutionId,
        fill_qty: Quantity,
        fill_price: Price,
    ) -> OrderEvent {
        OrderEvent::Filled(Self::order_fill(order, execution_id, fill_qty, fill_price))
    }

    /// Builds a standalone fill payload, not tied to an order entity.
    #[must_use]
    pub fn fill(
        security: Security,
        order_side: OrderSide,
        execution_id: ExecutionId,
        fill_qty: Quantity,
        fill_price: Price,
    ) -> OrderFilled {
        OrderFilled {
            account_id: Self::account_id(),
            cl_ord_id: crate::identifiers::ClientOrderId::new("O-19700101-000-001-1"),
            order_id: OrderId::new("1"),
            execution_id,
            position_id: None,
            strategy_id: Self::strategy_id(),
            security,
            order_side,
            fill_qty,
            cum_qty: fill_qty,
            leaves_qty: Quantity::zero(),
            fill_price,
            currency: Currency::usd(),
            commission: Money::zero(Currency::usd()),
            liquidity_side: LiquiditySide::Taker,
            execution_time: UnixNanos::default(),
            event_id: UUID4::new(),
            event_timestamp: UnixNanos::default(),
        }
    }

    /// Builds an `AccountState` event, defaulting to the test account.
    #[must_use]
    pub fn event_account_state(account_id: Option<AccountId>) -> AccountState {
        AccountState {
            account_id: account_id.unwrap_or_else(Self::account_id),
            balances: vec![Money::new(dec!(1000000), Currency::usd())],
            balances_free: vec![Money::new(dec!(1000000), Currency::usd())],
            balances_locked: vec![Money::zero(Currency::usd())],
            info: HashMap::from([(
                "default_currency".to_string(),
                "USD".to_string(),
            )]),
            event_id: UUID4::new(),
            event_timestamp: UnixNanos::default(),
        }
    }
}
