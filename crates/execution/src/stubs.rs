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

//! Stub execution client for engine tests.

use std::cell::{Cell, RefCell};

use ahash::AHashMap;
use anyhow::Context;
use async_trait::async_trait;
use meridian_common::messages::{
    CancelOrder, ModifyOrder, SubmitBracketOrder, SubmitOrder, TradingCommand,
};
use meridian_core::UnixNanos;
use meridian_model::{
    enums::OrderState,
    events::{Event, OrderEvent},
    identifiers::{AccountId, ClientOrderId, Venue},
    orders::Order,
    types::{Currency, Quantity},
};

use crate::{
    client::{ExecutionClient, ExecutionStateReport},
    engine::ExecutionEngineHandle,
    reconciliation::missing_lifecycle_events,
};

/// A scriptable [`ExecutionClient`] which records every routed command and
/// replays pre-programmed venue behavior through the engine handle.
pub struct StubExecutionClient {
    venue: Venue,
    account_id: AccountId,
    connected: Cell<bool>,
    handle: RefCell<Option<ExecutionEngineHandle>>,
    recorded: RefCell<Vec<TradingCommand>>,
    scripted_events: RefCell<AHashMap<ClientOrderId, Vec<OrderEvent>>>,
    scripted_report: RefCell<Option<ExecutionStateReport>>,
    fail_state_report: Cell<bool>,
}

impl StubExecutionClient {
    /// Creates a new [`StubExecutionClient`] for the given venue and account.
    #[must_use]
    pub fn new(venue: Venue, account_id: AccountId) -> Self {
        Self {
            venue,
            account_id,
            connected: Cell::new(true),
            handle: RefCell::new(None),
            recorded: RefCell::new(Vec::new()),
            scripted_events: RefCell::new(AHashMap::new()),
            scripted_report: RefCell::new(None),
            fail_state_report: Cell::new(false),
        }
    }

    /// Registers the engine back-reference used to emit events.
    pub fn register_handle(&self, handle: ExecutionEngineHandle) {
        *self.handle.borrow_mut() = Some(handle);
    }

    /// Scripts the events emitted when a command for `cl_ord_id` arrives.
    pub fn script_events(&self, cl_ord_id: ClientOrderId, events: Vec<OrderEvent>) {
        self.scripted_events.borrow_mut().insert(cl_ord_id, events);
    }

    /// Scripts the state report returned by `state_report`.
    pub fn script_state_report(&self, report: ExecutionStateReport) {
        *self.scripted_report.borrow_mut() = Some(report);
    }

    /// Makes `state_report` fail, simulating venue I/O trouble.
    pub fn fail_state_report(&self, fail: bool) {
        self.fail_state_report.set(fail);
    }

    /// Sets the connected flag.
    pub fn set_connected(&self, connected: bool) {
        self.connected.set(connected);
    }

    /// Returns clones of every command routed to this client, in order.
    #[must_use]
    pub fn recorded_commands(&self) -> Vec<TradingCommand> {
        self.recorded.borrow().clone()
    }

    async fn emit_scripted(&self, cl_ord_id: ClientOrderId) -> anyhow::Result<()> {
        let events = self.scripted_events.borrow_mut().remove(&cl_ord_id);
        let handle = self.handle.borrow().clone();
        if let (Some(events), Some(handle)) = (events, handle) {
            for event in events {
                handle
                    .process(Event::Order(event))
                    .await
                    .context("stub failed to emit scripted event")?;
            }
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl ExecutionClient for StubExecutionClient {
    fn venue(&self) -> Venue {
        self.venue
    }

    fn account_id(&self) -> AccountId {
        self.account_id
    }

    fn is_connected(&self) -> bool {
        self.connected.get()
    }

    async fn connect(&self) -> anyhow::Result<()> {
        self.connected.set(true);
        Ok(())
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        self.connected.set(false);
        Ok(())
    }

    async fn submit_order(&self, command: &SubmitOrder) -> anyhow::Result<()> {
        let cl_ord_id = command.order.cl_ord_id();
        self.recorded
            .borrow_mut()
            .push(TradingCommand::SubmitOrder(command.clone()));
        self.emit_scripted(cl_ord_id).await
    }

    async fn submit_bracket_order(&self, command: &SubmitBracketOrder) -> anyhow::Result<()> {
        let entry_id = command.bracket.entry.cl_ord_id();
        self.recorded
            .borrow_mut()
            .push(TradingCommand::SubmitBracketOrder(command.clone()));
        self.emit_scripted(entry_id).await
    }

    async fn cancel_order(&self, command: &CancelOrder) -> anyhow::Result<()> {
        let cl_ord_id = command.cl_ord_id;
        self.recorded
            .borrow_mut()
            .push(TradingCommand::CancelOrder(command.clone()));
        self.emit_scripted(cl_ord_id).await
    }

    async fn modify_order(&self, command: &ModifyOrder) -> anyhow::Result<()> {
        let cl_ord_id = command.cl_ord_id;
        self.recorded
            .borrow_mut()
            .push(TradingCommand::ModifyOrder(command.clone()));
        self.emit_scripted(cl_ord_id).await
    }

    async fn state_report(&self, _open_orders: &[Order]) -> anyhow::Result<ExecutionStateReport> {
        if self.fail_state_report.get() {
            anyhow::bail!("venue unavailable");
        }
        Ok(self
            .scripted_report
            .borrow()
            .clone()
            .unwrap_or_else(|| {
                ExecutionStateReport::new(self.venue, self.account_id, UnixNanos::default())
            }))
    }

    async fn resolve_order(
        &self,
        order: &Order,
        reported_state: OrderState,
        reported_filled_qty: Quantity,
    ) -> anyhow::Result<()> {
        let events = missing_lifecycle_events(
            order,
            reported_state,
            reported_filled_qty,
            self.account_id,
            Currency::usd(),
            UnixNanos::default(),
        );
        let handle = self.handle.borrow().clone();
        let Some(handle) = handle else {
            anyhow::bail!("no engine handle registered");
        };
        for event in events {
            handle
                .process(Event::Order(event))
                .await
                .context("stub failed to emit resolution event")?;
        }
        Ok(())
    }
}
