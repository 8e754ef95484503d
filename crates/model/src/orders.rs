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

//! The order entity and its lifecycle state machine.
//!
//! Orders are event-sourced: an order is constructed from its
//! `OrderInitialized` event and every subsequent change flows through
//! [`Order::apply`]. Unspecified transitions are rejected without mutating
//! state; fill accounting maintains `filled_qty + leaves_qty = quantity` and
//! the quantity-weighted average fill price.

use std::fmt::{Debug, Display};

use ahash::AHashMap;
use meridian_core::{UUID4, UnixNanos};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    enums::{OrderPurpose, OrderSide, OrderState, OrderType, TimeInForce},
    events::{OrderEvent, OrderFilled, OrderInitialized},
    identifiers::{
        AccountId, ClientOrderId, ExecutionId, OrderId, PositionId, Security, StrategyId,
    },
    types::{Currency, Money, Price, Quantity},
};

/// Errors produced when applying events to an order.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The event is not a legal transition from the current state.
    #[error("invalid state transition: {state} -> {event}")]
    InvalidStateTransition {
        /// The order state at the time of the attempt.
        state: OrderState,
        /// The offending event type name.
        event: &'static str,
    },

    /// The fill's execution ID was already applied to this order.
    #[error("duplicate execution: {0}")]
    DuplicateExecution(ExecutionId),

    /// Applying the fill would exceed the order quantity.
    #[error("over-fill: cum_qty {cum_qty} would exceed order quantity {quantity}")]
    OverFill {
        /// The order quantity.
        quantity: Quantity,
        /// The cumulative quantity the fill would produce.
        cum_qty: Quantity,
    },
}

/// A request to buy or sell a security, tracked through its full lifecycle.
#[derive(Clone)]
pub struct Order {
    cl_ord_id: ClientOrderId,
    strategy_id: StrategyId,
    security: Security,
    order_side: OrderSide,
    order_type: OrderType,
    quantity: Quantity,
    time_in_force: TimeInForce,
    purpose: OrderPurpose,
    price: Option<Price>,
    trigger: Option<Price>,
    expire_time: Option<UnixNanos>,
    order_id: Option<OrderId>,
    account_id: Option<AccountId>,
    position_id: Option<PositionId>,
    state: OrderState,
    filled_qty: Quantity,
    leaves_qty: Quantity,
    avg_price: Option<Decimal>,
    commissions: AHashMap<Currency, Money>,
    execution_ids: Vec<ExecutionId>,
    events: Vec<OrderEvent>,
}

impl Order {
    /// Creates a new [`Order`] from its initialization event.
    #[must_use]
    pub fn new(init: OrderInitialized) -> Self {
        let quantity = init.quantity;
        Self {
            cl_ord_id: init.cl_ord_id,
            strategy_id: init.strategy_id,
            security: init.security,
            order_side: init.order_side,
            order_type: init.order_type,
            quantity,
            time_in_force: init.time_in_force,
            purpose: init.purpose,
            price: init.price,
            trigger: init.trigger,
            expire_time: init.expire_time,
            order_id: None,
            account_id: None,
            position_id: None,
            state: OrderState::Initialized,
            filled_qty: Quantity::zero(),
            leaves_qty: quantity,
            avg_price: None,
            commissions: AHashMap::new(),
            execution_ids: Vec::new(),
            events: vec![OrderEvent::Initialized(init)],
        }
    }

    /// Creates a new MARKET order.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn market(
        cl_ord_id: ClientOrderId,
        strategy_id: StrategyId,
        security: Security,
        order_side: OrderSide,
        quantity: Quantity,
        event_id: UUID4,
        event_timestamp: UnixNanos,
    ) -> Self {
        Self::new(OrderInitialized {
            cl_ord_id,
            strategy_id,
            security,
            order_side,
            order_type: OrderType::Market,
            quantity,
            time_in_force: TimeInForce::Gtc,
            price: None,
            trigger: None,
            expire_time: None,
            purpose: OrderPurpose::None,
            event_id,
            event_timestamp,
        })
    }

    /// Creates a new LIMIT order.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn limit(
        cl_ord_id: ClientOrderId,
        strategy_id: StrategyId,
        security: Security,
        order_side: OrderSide,
        quantity: Quantity,
        price: Price,
        time_in_force: TimeInForce,
        expire_time: Option<UnixNanos>,
        event_id: UUID4,
        event_timestamp: UnixNanos,
    ) -> Self {
        Self::new(OrderInitialized {
            cl_ord_id,
            strategy_id,
            security,
            order_side,
            order_type: OrderType::Limit,
            quantity,
            time_in_force,
            price: Some(price),
            trigger: None,
            expire_time,
            purpose: OrderPurpose::None,
            event_id,
            event_timestamp,
        })
    }

    /// Creates a new STOP order.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn stop(
        cl_ord_id: ClientOrderId,
        strategy_id: StrategyId,
        security: Security,
        order_side: OrderSide,
        quantity: Quantity,
        trigger: Price,
        time_in_force: TimeInForce,
        event_id: UUID4,
        event_timestamp: UnixNanos,
    ) -> Self {
        Self::new(OrderInitialized {
            cl_ord_id,
            strategy_id,
            security,
            order_side,
            order_type: OrderType::Stop,
            quantity,
            time_in_force,
            price: None,
            trigger: Some(trigger),
            expire_time: None,
            purpose: OrderPurpose::None,
            event_id,
            event_timestamp,
        })
    }

    /// Creates a new STOP_LIMIT order.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn stop_limit(
        cl_ord_id: ClientOrderId,
        strategy_id: StrategyId,
        security: Security,
        order_side: OrderSide,
        quantity: Quantity,
        price: Price,
        trigger: Price,
        time_in_force: TimeInForce,
        event_id: UUID4,
        event_timestamp: UnixNanos,
    ) -> Self {
        Self::new(OrderInitialized {
            cl_ord_id,
            strategy_id,
            security,
            order_side,
            order_type: OrderType::StopLimit,
            quantity,
            time_in_force,
            price: Some(price),
            trigger: Some(trigger),
            expire_time: None,
            purpose: OrderPurpose::None,
            event_id,
            event_timestamp,
        })
    }

    /// Applies `event` to the order, transitioning state and updating
    /// execution facts.
    ///
    /// # Errors
    ///
    /// Returns an error and leaves the order unchanged if the event is not a
    /// legal transition from the current state, if a fill's execution ID was
    /// already applied, or if a fill would exceed the order quantity.
    pub fn apply(&mut self, event: OrderEvent) -> Result<(), OrderError> {
        let new_state = self.transition(&event)?;

        match &event {
            OrderEvent::Submitted(e) => {
                self.account_id = Some(e.account_id);
            }
            OrderEvent::Accepted(e) => {
                self.order_id = Some(e.order_id);
            }
            OrderEvent::Working(e) => {
                self.price = Some(e.price);
            }
            OrderEvent::Amended(e) => {
                self.quantity = e.quantity;
                self.price = Some(e.price);
                self.leaves_qty = e.quantity.saturating_sub(self.filled_qty);
            }
            OrderEvent::PartiallyFilled(fill) | OrderEvent::Filled(fill) => {
                self.apply_fill(fill)?;
            }
            _ => {}
        }

        self.state = new_state;
        self.events.push(event);
        Ok(())
    }

    fn transition(&self, event: &OrderEvent) -> Result<OrderState, OrderError> {
        use OrderState as S;

        let state = self.state;
        let target = match (state, event) {
            (S::Initialized, OrderEvent::Denied(_)) => S::Denied,
            (S::Initialized, OrderEvent::Submitted(_)) => S::Submitted,
            (S::Submitted, OrderEvent::Rejected(_)) => S::Rejected,
            (S::Submitted, OrderEvent::Accepted(_)) => S::Accepted,
            (S::Accepted | S::Triggered, OrderEvent::Working(_)) => S::Working,
            (S::Working, OrderEvent::Amended(_)) => S::Working,
            (S::Accepted | S::Working | S::Triggered, OrderEvent::Cancelled(_)) => S::Cancelled,
            (S::Working | S::Triggered, OrderEvent::Expired(_)) => S::Expired,
            (S::Working, OrderEvent::Triggered(_)) if self.order_type == OrderType::StopLimit => {
                S::Triggered
            }
            (S::Working | S::PartiallyFilled, OrderEvent::PartiallyFilled(_)) => {
                S::PartiallyFilled
            }
            (S::Working | S::PartiallyFilled, OrderEvent::Filled(_)) => S::Filled,
            (state, OrderEvent::Invalid(_)) if !state.is_completed() => S::Invalid,
            (state, OrderEvent::CancelReject(_)) if !state.is_completed() => state,
            _ => {
                return Err(OrderError::InvalidStateTransition {
                    state,
                    event: event.type_name(),
                });
            }
        };

        Ok(target)
    }

    fn apply_fill(&mut self, fill: &OrderFilled) -> Result<(), OrderError> {
        if self.execution_ids.contains(&fill.execution_id) {
            return Err(OrderError::DuplicateExecution(fill.execution_id));
        }

        let new_filled = self.filled_qty + fill.fill_qty;
        if new_filled.as_decimal() > self.quantity.as_decimal() {
            return Err(OrderError::OverFill {
                quantity: self.quantity,
                cum_qty: new_filled,
            });
        }

        let old_cum = self.filled_qty.as_decimal();
        let fill_qty = fill.fill_qty.as_decimal();
        let fill_px = fill.fill_price.as_decimal();
        self.avg_price = Some(match self.avg_price {
            Some(old_avg) => (old_avg * old_cum + fill_px * fill_qty) / (old_cum + fill_qty),
            None => fill_px,
        });

        self.filled_qty = new_filled;
        self.leaves_qty = self.quantity.saturating_sub(new_filled);
        self.execution_ids.push(fill.execution_id);

        if self.position_id.is_none() {
            self.position_id = fill.position_id;
        }

        self.commissions
            .entry(fill.commission.currency)
            .and_modify(|total| *total += fill.commission)
            .or_insert(fill.commission);

        Ok(())
    }

    /// Returns true if applying a fill of `fill_qty` would exceed the order
    /// quantity.
    #[must_use]
    pub fn would_overfill(&self, fill_qty: Quantity) -> bool {
        (self.filled_qty + fill_qty).as_decimal() > self.quantity.as_decimal()
    }

    /// Returns the strategy-assigned order identifier.
    #[must_use]
    pub const fn cl_ord_id(&self) -> ClientOrderId {
        self.cl_ord_id
    }

    /// Returns the owning strategy identifier.
    #[must_use]
    pub const fn strategy_id(&self) -> StrategyId {
        self.strategy_id
    }

    /// Returns the security the order trades.
    #[must_use]
    pub const fn security(&self) -> Security {
        self.security
    }

    /// Returns the order side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.order_side
    }

    /// Returns the order type.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Returns the order quantity.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Returns the time-in-force instruction.
    #[must_use]
    pub const fn time_in_force(&self) -> TimeInForce {
        self.time_in_force
    }

    /// Returns the purpose the order serves within its strategy.
    #[must_use]
    pub const fn purpose(&self) -> OrderPurpose {
        self.purpose
    }

    /// Returns the current limit/working price, if any.
    #[must_use]
    pub const fn price(&self) -> Option<Price> {
        self.price
    }

    /// Returns the stop trigger price, if any.
    #[must_use]
    pub const fn trigger(&self) -> Option<Price> {
        self.trigger
    }

    /// Returns the expire time, if any.
    #[must_use]
    pub const fn expire_time(&self) -> Option<UnixNanos> {
        self.expire_time
    }

    /// Returns the venue-assigned order identifier, bound on acceptance.
    #[must_use]
    pub const fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    /// Returns the venue account the order was submitted through.
    #[must_use]
    pub const fn account_id(&self) -> Option<AccountId> {
        self.account_id
    }

    /// Returns the position the order contributes to, once determined.
    #[must_use]
    pub const fn position_id(&self) -> Option<PositionId> {
        self.position_id
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> OrderState {
        self.state
    }

    /// Returns the cumulative filled quantity.
    #[must_use]
    pub const fn filled_qty(&self) -> Quantity {
        self.filled_qty
    }

    /// Returns the remaining unfilled quantity.
    #[must_use]
    pub const fn leaves_qty(&self) -> Quantity {
        self.leaves_qty
    }

    /// Returns the quantity-weighted average fill price, if any fills applied.
    #[must_use]
    pub const fn avg_price(&self) -> Option<Decimal> {
        self.avg_price
    }

    /// Returns the accumulated commissions, one amount per currency.
    #[must_use]
    pub fn commissions(&self) -> Vec<Money> {
        self.commissions.values().copied().collect()
    }

    /// Returns the execution IDs applied to this order, in order.
    #[must_use]
    pub fn execution_ids(&self) -> &[ExecutionId] {
        &self.execution_ids
    }

    /// Returns true if the order is resting or partially executed at a venue.
    #[must_use]
    pub const fn is_working(&self) -> bool {
        matches!(
            self.state,
            OrderState::Working | OrderState::Triggered | OrderState::PartiallyFilled
        )
    }

    /// Returns true if the order is in a terminal state.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.state.is_completed()
    }

    /// Returns the applied event history.
    #[must_use]
    pub fn events(&self) -> &[OrderEvent] {
        &self.events
    }

    /// Returns the most recently applied event.
    #[must_use]
    pub fn last_event(&self) -> &OrderEvent {
        self.events.last().expect("orders always hold an init event")
    }

    /// Returns the number of events applied.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Order(cl_ord_id={}, state={}, {} {} {} {}, filled_qty={}, leaves_qty={})",
            self.cl_ord_id,
            self.state,
            self.order_side,
            self.quantity,
            self.security,
            self.order_type,
            self.filled_qty,
            self.leaves_qty
        )
    }
}

impl Debug for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(Order))
            .field("cl_ord_id", &self.cl_ord_id)
            .field("state", &self.state)
            .field("filled_qty", &self.filled_qty)
            .field("leaves_qty", &self.leaves_qty)
            .finish()
    }
}
