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

//! The authoritative execution database and its read-side cache façade.
//!
//! The execution engine is the only writer: every order, position and account
//! mutation funnels through the engine's consumer task into an
//! implementation of [`ExecutionDatabase`]. Reads return snapshots by clone
//! so observers on other tasks always see consistent state.

use std::{cell::RefCell, fmt::Debug};

use ahash::AHashMap;
use meridian_model::{
    accounts::Account,
    events::AccountState,
    identifiers::{ClientOrderId, OrderId, PositionId, Security, StrategyId, Venue},
    orders::Order,
    position::Position,
};

/// The authoritative persistent store of orders, positions and accounts.
///
/// After a restart, `orders_open` must return every order not in a terminal
/// state at the time of the last successful write; live engines reconcile
/// against venue state before accepting new commands.
pub trait ExecutionDatabase {
    /// Adds a new order keyed by its client order ID.
    ///
    /// # Errors
    ///
    /// Returns an error if an order with the same ID already exists, or on a
    /// backend write failure.
    fn add_order(&self, order: Order) -> anyhow::Result<()>;

    /// Writes the latest state of an existing order.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is unknown or on a backend write failure.
    fn update_order(&self, order: &Order) -> anyhow::Result<()>;

    /// Adds a new position keyed by its position ID.
    ///
    /// # Errors
    ///
    /// Returns an error if an open position with the same ID already exists,
    /// or on a backend write failure.
    fn add_position(&self, position: Position) -> anyhow::Result<()>;

    /// Writes the latest state of an existing position.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is unknown or on a backend write
    /// failure.
    fn update_position(&self, position: &Position) -> anyhow::Result<()>;

    /// Applies an account state event to the stored account for its venue.
    ///
    /// # Errors
    ///
    /// Returns an error on a backend write failure.
    fn update_account(&self, event: &AccountState) -> anyhow::Result<()>;

    /// Loads all stored orders; called once on engine start.
    fn load_orders(&self) -> Vec<Order>;

    /// Loads all stored positions; called once on engine start.
    fn load_positions(&self) -> Vec<Position>;

    /// Loads all stored accounts; called once on engine start.
    fn load_accounts(&self) -> Vec<Account>;

    /// Returns snapshots of all orders.
    fn orders(&self) -> Vec<Order>;

    /// Returns snapshots of every order not in a terminal state.
    fn orders_open(&self) -> Vec<Order>;

    /// Returns a snapshot of the order with the given client order ID.
    fn order(&self, cl_ord_id: &ClientOrderId) -> Option<Order>;

    /// Resolves a venue-assigned order ID to its client order ID.
    fn cl_ord_id(&self, order_id: &OrderId) -> Option<ClientOrderId>;

    /// Returns a snapshot of the open position for the given key.
    fn position(&self, strategy_id: StrategyId, security: Security) -> Option<Position>;

    /// Returns snapshots of all positions.
    fn positions(&self) -> Vec<Position>;

    /// Returns a snapshot of the account for the given venue.
    fn account(&self, venue: Venue) -> Option<Account>;

    /// Flushes pending writes to the backend.
    ///
    /// # Errors
    ///
    /// Returns an error on a backend write failure.
    fn flush(&self) -> anyhow::Result<()>;
}

#[derive(Default)]
struct InMemoryState {
    orders: AHashMap<ClientOrderId, Order>,
    index_order_ids: AHashMap<OrderId, ClientOrderId>,
    positions: AHashMap<PositionId, Position>,
    accounts: AHashMap<Venue, Account>,
}

/// An in-memory [`ExecutionDatabase`] for backtests and tests.
#[derive(Default)]
pub struct InMemoryExecutionDatabase {
    state: RefCell<InMemoryState>,
}

impl InMemoryExecutionDatabase {
    /// Creates a new empty [`InMemoryExecutionDatabase`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Debug for InMemoryExecutionDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct(stringify!(InMemoryExecutionDatabase))
            .field("orders", &state.orders.len())
            .field("positions", &state.positions.len())
            .field("accounts", &state.accounts.len())
            .finish()
    }
}

impl ExecutionDatabase for InMemoryExecutionDatabase {
    fn add_order(&self, order: Order) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        let cl_ord_id = order.cl_ord_id();
        if state.orders.contains_key(&cl_ord_id) {
            anyhow::bail!("order {cl_ord_id} already exists");
        }
        if let Some(order_id) = order.order_id() {
            state.index_order_ids.insert(order_id, cl_ord_id);
        }
        state.orders.insert(cl_ord_id, order);
        Ok(())
    }

    fn update_order(&self, order: &Order) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        let cl_ord_id = order.cl_ord_id();
        if !state.orders.contains_key(&cl_ord_id) {
            anyhow::bail!("cannot update unknown order {cl_ord_id}");
        }
        if let Some(order_id) = order.order_id() {
            state.index_order_ids.insert(order_id, cl_ord_id);
        }
        state.orders.insert(cl_ord_id, order.clone());
        Ok(())
    }

    fn add_position(&self, position: Position) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(existing) = state.positions.get(&position.id)
            && existing.is_open()
        {
            anyhow::bail!("open position {} already exists", position.id);
        }
        state.positions.insert(position.id, position);
        Ok(())
    }

    fn update_position(&self, position: &Position) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.positions.contains_key(&position.id) {
            anyhow::bail!("cannot update unknown position {}", position.id);
        }
        state.positions.insert(position.id, position.clone());
        Ok(())
    }

    fn update_account(&self, event: &AccountState) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        let venue = event.account_id.issuer_as_venue();
        match state.accounts.get_mut(&venue) {
            Some(account) => account.apply(event.clone()),
            None => {
                state.accounts.insert(venue, Account::new(event.clone()));
            }
        }
        Ok(())
    }

    fn load_orders(&self) -> Vec<Order> {
        self.orders()
    }

    fn load_positions(&self) -> Vec<Position> {
        self.positions()
    }

    fn load_accounts(&self) -> Vec<Account> {
        self.state.borrow().accounts.values().cloned().collect()
    }

    fn orders(&self) -> Vec<Order> {
        self.state.borrow().orders.values().cloned().collect()
    }

    fn orders_open(&self) -> Vec<Order> {
        self.state
            .borrow()
            .orders
            .values()
            .filter(|o| !o.is_completed())
            .cloned()
            .collect()
    }

    fn order(&self, cl_ord_id: &ClientOrderId) -> Option<Order> {
        self.state.borrow().orders.get(cl_ord_id).cloned()
    }

    fn cl_ord_id(&self, order_id: &OrderId) -> Option<ClientOrderId> {
        self.state.borrow().index_order_ids.get(order_id).copied()
    }

    fn position(&self, strategy_id: StrategyId, security: Security) -> Option<Position> {
        self.state
            .borrow()
            .positions
            .values()
            .find(|p| p.is_open() && p.strategy_id == strategy_id && p.security == security)
            .cloned()
    }

    fn positions(&self) -> Vec<Position> {
        self.state.borrow().positions.values().cloned().collect()
    }

    fn account(&self, venue: Venue) -> Option<Account> {
        self.state.borrow().accounts.get(&venue).cloned()
    }

    fn flush(&self) -> anyhow::Result<()> {
        // Nothing buffered for the in-memory backend
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use meridian_core::{UUID4, UnixNanos};
    use meridian_model::{
        enums::{OrderSide, OrderState},
        identifiers::{ExecutionId, PositionId},
        stubs::{TestStubs, security_audusd},
        types::{Price, Quantity},
    };
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn database() -> InMemoryExecutionDatabase {
        InMemoryExecutionDatabase::new()
    }

    fn market_order(id: &str) -> Order {
        Order::market(
            ClientOrderId::new(id),
            TestStubs::strategy_id(),
            security_audusd(),
            OrderSide::Buy,
            Quantity::from(100_000),
            UUID4::new(),
            UnixNanos::default(),
        )
    }

    #[rstest]
    fn test_add_order_then_read_back(database: InMemoryExecutionDatabase) {
        database.add_order(market_order("O-1")).unwrap();

        let order = database.order(&ClientOrderId::new("O-1")).unwrap();
        assert_eq!(order.state(), OrderState::Initialized);
        assert_eq!(database.orders().len(), 1);
        assert_eq!(database.orders_open().len(), 1);
    }

    #[rstest]
    fn test_add_duplicate_order_rejected(database: InMemoryExecutionDatabase) {
        database.add_order(market_order("O-1")).unwrap();

        assert!(database.add_order(market_order("O-1")).is_err());
    }

    #[rstest]
    fn test_update_unknown_order_rejected(database: InMemoryExecutionDatabase) {
        let order = market_order("O-1");

        assert!(database.update_order(&order).is_err());
    }

    #[rstest]
    fn test_order_id_index_built_on_update(database: InMemoryExecutionDatabase) {
        let mut order = market_order("O-1");
        database.add_order(order.clone()).unwrap();

        order.apply(TestStubs::event_order_submitted(&order)).unwrap();
        order
            .apply(TestStubs::event_order_accepted(
                &order,
                meridian_model::identifiers::OrderId::new("V-1"),
            ))
            .unwrap();
        database.update_order(&order).unwrap();

        assert_eq!(
            database.cl_ord_id(&meridian_model::identifiers::OrderId::new("V-1")),
            Some(ClientOrderId::new("O-1"))
        );
    }

    #[rstest]
    fn test_orders_open_excludes_terminal(database: InMemoryExecutionDatabase) {
        let mut order = market_order("O-1");
        database.add_order(order.clone()).unwrap();

        order.apply(TestStubs::event_order_submitted(&order)).unwrap();
        order
            .apply(TestStubs::event_order_rejected(&order, "NO_MARGIN"))
            .unwrap();
        database.update_order(&order).unwrap();

        assert!(database.orders_open().is_empty());
        assert_eq!(database.orders().len(), 1);
    }

    #[rstest]
    fn test_position_lookup_by_key(database: InMemoryExecutionDatabase) {
        let fill = TestStubs::fill(
            security_audusd(),
            OrderSide::Buy,
            ExecutionId::new("E-1"),
            Quantity::from(100),
            Price::from_str("1.0000").unwrap(),
        );
        database
            .add_position(Position::new(PositionId::new("P-1"), fill))
            .unwrap();

        let position = database
            .position(TestStubs::strategy_id(), security_audusd())
            .unwrap();
        assert_eq!(position.id, PositionId::new("P-1"));
    }

    #[rstest]
    fn test_update_account_creates_then_applies(database: InMemoryExecutionDatabase) {
        let event = TestStubs::event_account_state(None);

        database.update_account(&event).unwrap();
        database.update_account(&TestStubs::event_account_state(None)).unwrap();

        let account = database.account(Venue::new("SIM")).unwrap();
        assert_eq!(account.event_count(), 2);
    }
}
