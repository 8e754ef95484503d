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

//! The portfolio projection for the Meridian trading platform.
//!
//! A pure projection over engine-forwarded events: maintains per-strategy
//! positions and per-venue accounts, never mutates orders, and deduplicates
//! its inputs by event identity so replays during reconciliation do not
//! corrupt PnL.

use std::{cell::RefCell, fmt::Debug, rc::Rc};

use ahash::{AHashMap, AHashSet};
use meridian_common::clock::Clock;
use meridian_core::UUID4;
use meridian_model::{
    accounts::Account,
    events::{AccountState, Event, OrderEvent, OrderFilled, PositionEvent, PositionStateChange},
    identifiers::{ExecutionId, PositionId, Security, StrategyId, Venue},
    position::Position,
    types::{Money, Price},
};
use rust_decimal::Decimal;

/// A callback invoked with every position event the portfolio emits.
pub type PositionEventHandler = Box<dyn Fn(&PositionEvent)>;

/// Maintains the derived account and position view of execution events.
pub struct Portfolio {
    clock: Rc<RefCell<dyn Clock>>,
    positions: AHashMap<(StrategyId, Security), Position>,
    positions_closed: Vec<Position>,
    accounts: AHashMap<Venue, Account>,
    processed_events: AHashSet<UUID4>,
    processed_executions: AHashSet<(Venue, ExecutionId)>,
    handlers: Vec<PositionEventHandler>,
}

impl Debug for Portfolio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(Portfolio))
            .field("positions_open", &self.positions.len())
            .field("positions_closed", &self.positions_closed.len())
            .field("accounts", &self.accounts.len())
            .finish()
    }
}

impl Portfolio {
    /// Creates a new empty [`Portfolio`].
    #[must_use]
    pub fn new(clock: Rc<RefCell<dyn Clock>>) -> Self {
        Self {
            clock,
            positions: AHashMap::new(),
            positions_closed: Vec::new(),
            accounts: AHashMap::new(),
            processed_events: AHashSet::new(),
            processed_executions: AHashSet::new(),
            handlers: Vec::new(),
        }
    }

    /// Registers a handler for emitted position events.
    ///
    /// Handlers are invoked in registration order for every emitted event.
    pub fn register_position_event_handler(&mut self, handler: PositionEventHandler) {
        self.handlers.push(handler);
    }

    /// Processes an engine-forwarded event.
    ///
    /// Idempotent with respect to event identity: an event id seen before is
    /// ignored, and a fill's `(venue, execution_id)` is applied at most once
    /// even when the fill is replayed under a fresh event id during
    /// reconciliation.
    pub fn process_event(&mut self, event: &Event) {
        if !self.processed_events.insert(event.event_id()) {
            log::debug!("Already processed event {}, skipping", event.event_id());
            return;
        }

        match event {
            Event::Order(OrderEvent::PartiallyFilled(fill) | OrderEvent::Filled(fill)) => {
                self.handle_fill(fill.clone());
            }
            Event::Order(_) => {}
            Event::Account(state) => self.handle_account_state(state),
        }
    }

    fn handle_fill(&mut self, fill: OrderFilled) {
        let execution_key = (fill.security.venue, fill.execution_id);
        if !self.processed_executions.insert(execution_key) {
            log::warn!(
                "Duplicate execution ({}, {}) ignored",
                fill.security.venue,
                fill.execution_id
            );
            return;
        }

        enum Action {
            Open,
            Reopen,
            Flip,
            Apply,
        }

        let key = (fill.strategy_id, fill.security);
        let action = match self.positions.get(&key) {
            None => Action::Open,
            Some(position) if position.is_closed() => Action::Reopen,
            Some(position)
                if position.is_opposite_side(fill.order_side)
                    && fill.fill_qty.as_decimal() > position.quantity.as_decimal() =>
            {
                Action::Flip
            }
            Some(_) => Action::Apply,
        };

        match action {
            Action::Open => self.open_position(key, fill),
            Action::Reopen => {
                let closed = self.positions.remove(&key).expect("position exists");
                self.positions_closed.push(closed);
                self.open_position(key, fill);
            }
            Action::Flip => self.flip_position(key, fill),
            Action::Apply => {
                let position = self.positions.get_mut(&key).expect("position exists");
                position.apply(fill.clone());
                let snapshot = position.clone();
                if snapshot.is_closed() {
                    let closed = self.positions.remove(&key).expect("position exists");
                    self.positions_closed.push(closed);
                    self.emit(PositionEvent::Closed, snapshot, fill);
                } else {
                    self.emit(PositionEvent::Changed, snapshot, fill);
                }
            }
        }
    }

    fn open_position(&mut self, key: (StrategyId, Security), fill: OrderFilled) {
        let position_id = fill
            .position_id
            .unwrap_or_else(|| Self::netting_position_id(key.1, key.0));
        let position = Position::new(position_id, fill.clone());
        let snapshot = position.clone();
        self.positions.insert(key, position);
        self.emit(PositionEvent::Opened, snapshot, fill);
    }

    /// Splits a side-crossing fill: the open quantity closes the current
    /// position, the residual opens a new one in the fill's direction.
    fn flip_position(&mut self, key: (StrategyId, Security), fill: OrderFilled) {
        let position = self.positions.get_mut(&key).expect("position exists");
        let open_qty = position.quantity;
        let residual_qty = fill.fill_qty.saturating_sub(open_qty);

        // Commission is split pro rata between the two legs
        let fill_qty = fill.fill_qty.as_decimal();
        let close_ratio = if fill_qty.is_zero() {
            Decimal::ZERO
        } else {
            open_qty.as_decimal() / fill_qty
        };
        let close_commission = Money::new(
            fill.commission.as_decimal() * close_ratio,
            fill.commission.currency,
        );
        let open_commission = fill.commission - close_commission;

        let close_fill = OrderFilled {
            fill_qty: open_qty,
            cum_qty: fill.cum_qty,
            commission: close_commission,
            ..fill.clone()
        };
        position.apply(close_fill.clone());
        let snapshot = position.clone();
        let closed = self.positions.remove(&key).expect("position exists");
        self.positions_closed.push(closed);
        self.emit(PositionEvent::Closed, snapshot, close_fill);

        let open_fill = OrderFilled {
            fill_qty: residual_qty,
            commission: open_commission,
            ..fill
        };
        self.open_position(key, open_fill);
    }

    fn handle_account_state(&mut self, state: &AccountState) {
        let venue = state.account_id.issuer_as_venue();
        match self.accounts.get_mut(&venue) {
            Some(account) => account.apply(state.clone()),
            None => {
                self.accounts.insert(venue, Account::new(state.clone()));
                log::info!("Registered account for venue {venue}");
            }
        }
    }

    fn emit(
        &self,
        variant: fn(PositionStateChange) -> PositionEvent,
        position: Position,
        fill: OrderFilled,
    ) {
        if self.handlers.is_empty() {
            return;
        }
        let event = variant(PositionStateChange {
            position,
            fill,
            event_id: UUID4::new(),
            event_timestamp: self.clock.borrow().timestamp_ns(),
        });
        for handler in &self.handlers {
            handler(&event);
        }
    }

    fn netting_position_id(security: Security, strategy_id: StrategyId) -> PositionId {
        PositionId::new(&format!("{security}-{strategy_id}"))
    }

    /// Returns the open position for the given key, if any.
    #[must_use]
    pub fn position(&self, strategy_id: StrategyId, security: Security) -> Option<&Position> {
        self.positions.get(&(strategy_id, security))
    }

    /// Returns all open positions.
    #[must_use]
    pub fn positions_open(&self) -> Vec<&Position> {
        self.positions.values().filter(|p| p.is_open()).collect()
    }

    /// Returns all closed positions.
    #[must_use]
    pub fn positions_closed(&self) -> Vec<&Position> {
        self.positions_closed.iter().collect()
    }

    /// Returns the account for the given venue, if any.
    #[must_use]
    pub fn account(&self, venue: Venue) -> Option<&Account> {
        self.accounts.get(&venue)
    }

    /// Returns the unrealized PnL of the open position for the given key
    /// against `last_price`, if the position exists.
    #[must_use]
    pub fn unrealized_pnl(
        &self,
        strategy_id: StrategyId,
        security: Security,
        last_price: Price,
    ) -> Option<Money> {
        self.position(strategy_id, security)
            .map(|p| p.unrealized_pnl(last_price))
    }
}
