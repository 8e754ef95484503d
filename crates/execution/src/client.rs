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

//! The execution client capability consumed by the engine.
//!
//! A client adapts one trading venue: it accepts routed commands, translates
//! identifiers, encodes the wire protocol, manages reconnects, and emits the
//! canonical order events back into the engine via its handle. Clients never
//! mutate orders directly and own nothing but connection state.

use ahash::AHashMap;
use async_trait::async_trait;
use meridian_common::messages::{CancelOrder, ModifyOrder, SubmitBracketOrder, SubmitOrder};
use meridian_core::UnixNanos;
use meridian_model::{
    enums::OrderState,
    identifiers::{AccountId, OrderId, Venue},
    orders::Order,
    types::Quantity,
};

/// A snapshot of the venue's view of a set of orders at a point in time.
///
/// Delivered during reconciliation; represents ground truth against which
/// the engine's cache converges.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionStateReport {
    /// The reporting venue.
    pub venue: Option<Venue>,
    /// The reporting account.
    pub account_id: Option<AccountId>,
    /// When the snapshot was taken.
    pub timestamp: UnixNanos,
    /// The venue-reported state per order.
    pub order_states: AHashMap<OrderId, OrderState>,
    /// The venue-reported cumulative filled quantity per order.
    pub order_filled_qtys: AHashMap<OrderId, Quantity>,
}

impl ExecutionStateReport {
    /// Creates a new empty report for the given venue and account.
    #[must_use]
    pub fn new(venue: Venue, account_id: AccountId, timestamp: UnixNanos) -> Self {
        Self {
            venue: Some(venue),
            account_id: Some(account_id),
            timestamp,
            order_states: AHashMap::new(),
            order_filled_qtys: AHashMap::new(),
        }
    }

    /// Records the venue-reported state and filled quantity for an order.
    pub fn add(&mut self, order_id: OrderId, state: OrderState, filled_qty: Quantity) {
        self.order_states.insert(order_id, state);
        self.order_filled_qtys.insert(order_id, filled_qty);
    }
}

/// The venue adapter capability required by the execution engine.
///
/// Registered with the engine keyed by [`Venue`]. All methods take `&self`;
/// implementations hold their mutable connection state behind interior
/// mutability so the engine and the reconciler can share the client.
#[async_trait(?Send)]
pub trait ExecutionClient {
    /// Returns the venue this client adapts.
    fn venue(&self) -> Venue;

    /// Returns the account this client trades through.
    fn account_id(&self) -> AccountId;

    /// Returns true if the client is connected to its venue.
    fn is_connected(&self) -> bool;

    /// Connects to the venue.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    async fn connect(&self) -> anyhow::Result<()>;

    /// Disconnects from the venue.
    ///
    /// # Errors
    ///
    /// Returns an error if disconnection fails.
    async fn disconnect(&self) -> anyhow::Result<()>;

    /// Submits a single order to the venue.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be sent.
    async fn submit_order(&self, command: &SubmitOrder) -> anyhow::Result<()>;

    /// Submits an entry order with bracketing stop-loss and take-profit.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be sent.
    async fn submit_bracket_order(&self, command: &SubmitBracketOrder) -> anyhow::Result<()>;

    /// Requests cancellation of a working order.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be sent.
    async fn cancel_order(&self, command: &CancelOrder) -> anyhow::Result<()>;

    /// Requests modification of a working order's quantity and/or price.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be sent.
    async fn modify_order(&self, command: &ModifyOrder) -> anyhow::Result<()>;

    /// Produces the venue's state report for the given open orders
    /// (live clients only; suspends on venue I/O).
    ///
    /// # Errors
    ///
    /// Returns an error if the venue cannot be queried.
    async fn state_report(&self, open_orders: &[Order]) -> anyhow::Result<ExecutionStateReport>;

    /// Synthesizes and emits the lifecycle events required to bring `order`
    /// from its local state to the venue-reported state.
    ///
    /// Called by the reconciliation protocol when local and reported state
    /// diverge; the engine only observes convergence.
    ///
    /// # Errors
    ///
    /// Returns an error if the missing events cannot be generated.
    async fn resolve_order(
        &self,
        order: &Order,
        reported_state: OrderState,
        reported_filled_qty: Quantity,
    ) -> anyhow::Result<()>;
}
