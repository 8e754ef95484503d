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

//! The execution engine: single-owner message loop, routing and order state.
//!
//! Commands from strategies and events from venue clients land in one
//! bounded FIFO queue, deliberately shared so that, for example, a cancel
//! sent after an observed partial fill cannot be reordered ahead of the
//! fill. A single consumer task drains the queue; only this task mutates
//! order, position and account state. Producers suspend only when the queue
//! is full (cooperative backpressure).

use std::{
    cell::{Cell, RefCell},
    fmt::Debug,
    rc::Rc,
};

use ahash::AHashMap;
use meridian_common::{
    clock::Clock,
    component::ComponentState,
    config::ExecutionEngineConfig,
    messages::{EngineMessage, SubmitBracketOrder, SubmitOrder, TradingCommand},
};
use meridian_core::UUID4;
use meridian_model::{
    events::{Event, OrderDenied, OrderEvent, OrderInvalid, PositionEvent},
    identifiers::Venue,
    orders::{Order, OrderError},
};
use meridian_portfolio::Portfolio;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{
    client::ExecutionClient, database::ExecutionDatabase,
    reconciliation::ReconciliationPolicy,
};

pub(crate) const RECV: &str = "<--";
pub(crate) const SEND: &str = "-->";
pub(crate) const CMD: &str = "[CMD]";
pub(crate) const EVT: &str = "[EVT]";

/// The state shared between the engine façade, its handle, the consumer task
/// and the reconciler.
///
/// All mutation happens on the engine's scheduler thread; interior
/// mutability is never held across a suspension point.
pub(crate) struct EngineCore {
    pub(crate) clock: Rc<RefCell<dyn Clock>>,
    pub(crate) database: Rc<dyn ExecutionDatabase>,
    pub(crate) portfolio: Rc<RefCell<Portfolio>>,
    pub(crate) clients: RefCell<AHashMap<Venue, Rc<dyn ExecutionClient>>>,
    pub(crate) state: Cell<ComponentState>,
    pub(crate) degraded: Cell<bool>,
}

impl EngineCore {
    pub(crate) fn client_for_venue(&self, venue: Venue) -> Option<Rc<dyn ExecutionClient>> {
        self.clients.borrow().get(&venue).cloned()
    }

    /// Dispatches a dequeued command to its venue client.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal database write failures; all other
    /// failures are answered with rejection events and logged.
    pub(crate) async fn handle_command(&self, command: TradingCommand) -> anyhow::Result<()> {
        log::debug!("{RECV}{CMD} {command}");

        if self.degraded.get() {
            log::warn!(
                "Engine degraded awaiting reconciliation, rejecting {}",
                command.type_name()
            );
            return self.reject_command(&command, "ENGINE_DEGRADED_AWAITING_RECONCILIATION");
        }

        let Some(client) = self.client_for_venue(command.venue()) else {
            log::error!(
                "No execution client registered for venue {}, command={command}",
                command.venue()
            );
            return self.reject_command(&command, "NO_EXECUTION_CLIENT_FOR_VENUE");
        };

        if !client.is_connected() {
            log::error!(
                "Execution client for venue {} disconnected, command={command}",
                command.venue()
            );
            return self.reject_command(&command, "EXECUTION_CLIENT_DISCONNECTED");
        }

        match command {
            TradingCommand::SubmitOrder(cmd) => self.handle_submit_order(&client, cmd).await,
            TradingCommand::SubmitBracketOrder(cmd) => {
                self.handle_submit_bracket_order(&client, cmd).await
            }
            TradingCommand::CancelOrder(cmd) => {
                if let Err(e) = client.cancel_order(&cmd).await {
                    log::error!("Error canceling order {}: {e}", cmd.cl_ord_id);
                }
                Ok(())
            }
            TradingCommand::ModifyOrder(cmd) => {
                if let Err(e) = client.modify_order(&cmd).await {
                    log::error!("Error modifying order {}: {e}", cmd.cl_ord_id);
                }
                Ok(())
            }
        }
    }

    async fn handle_submit_order(
        &self,
        client: &Rc<dyn ExecutionClient>,
        cmd: SubmitOrder,
    ) -> anyhow::Result<()> {
        if !self.register_order(&cmd.order)? {
            return Ok(());
        }

        if let Err(e) = client.submit_order(&cmd).await {
            log::error!("Error submitting order to client: {e}");
            self.deny_order(&cmd.order, &format!("failed-to-submit-order-to-client: {e}"))?;
        }
        Ok(())
    }

    async fn handle_submit_bracket_order(
        &self,
        client: &Rc<dyn ExecutionClient>,
        cmd: SubmitBracketOrder,
    ) -> anyhow::Result<()> {
        for order in [
            &cmd.bracket.entry,
            &cmd.bracket.stop_loss,
            &cmd.bracket.take_profit,
        ] {
            if !self.register_order(order)? {
                return Ok(());
            }
        }

        if let Err(e) = client.submit_bracket_order(&cmd).await {
            log::error!("Error submitting bracket order to client: {e}");
            for order in [
                &cmd.bracket.entry,
                &cmd.bracket.stop_loss,
                &cmd.bracket.take_profit,
            ] {
                self.deny_order(order, &format!("failed-to-submit-bracket-order-to-client: {e}"))?;
            }
        }
        Ok(())
    }

    /// Adds the order to the database, invalidating on a duplicate ID.
    ///
    /// Returns true if the order was registered and the command should
    /// proceed to the client.
    fn register_order(&self, order: &Order) -> anyhow::Result<bool> {
        if self.database.order(&order.cl_ord_id()).is_some() {
            log::error!(
                "Cannot submit order: {} already exists in the database",
                order.cl_ord_id()
            );
            self.invalidate_order(order, "DUPLICATE_CL_ORD_ID");
            return Ok(false);
        }

        self.database
            .add_order(order.clone())
            .map_err(|e| anyhow::anyhow!("fatal database write failure: {e}"))?;
        Ok(true)
    }

    fn reject_command(&self, command: &TradingCommand, reason: &str) -> anyhow::Result<()> {
        match command {
            TradingCommand::SubmitOrder(cmd) => self.deny_order(&cmd.order, reason),
            TradingCommand::SubmitBracketOrder(cmd) => {
                self.deny_order(&cmd.bracket.entry, reason)?;
                self.deny_order(&cmd.bracket.stop_loss, reason)?;
                self.deny_order(&cmd.bracket.take_profit, reason)
            }
            TradingCommand::CancelOrder(cmd) => {
                log::warn!("CancelOrder {} dropped: {reason}", cmd.cl_ord_id);
                Ok(())
            }
            TradingCommand::ModifyOrder(cmd) => {
                log::warn!("ModifyOrder {} dropped: {reason}", cmd.cl_ord_id);
                Ok(())
            }
        }
    }

    /// Applies a local `OrderDenied` to the order, registering it first if
    /// the command never reached the database.
    fn deny_order(&self, order: &Order, reason: &str) -> anyhow::Result<()> {
        log::error!("Order denied: {reason}, cl_ord_id={}", order.cl_ord_id());

        if self.database.order(&order.cl_ord_id()).is_none() {
            self.database
                .add_order(order.clone())
                .map_err(|e| anyhow::anyhow!("fatal database write failure: {e}"))?;
        }

        let denied = OrderEvent::Denied(OrderDenied {
            cl_ord_id: order.cl_ord_id(),
            reason: reason.to_string(),
            event_id: UUID4::new(),
            event_timestamp: self.clock.borrow().timestamp_ns(),
        });
        self.handle_order_event(&denied)
    }

    /// Marks a never-registered order INVALID without touching the stored
    /// record that owns its client order ID.
    fn invalidate_order(&self, order: &Order, reason: &str) {
        let invalid = OrderEvent::Invalid(OrderInvalid {
            cl_ord_id: order.cl_ord_id(),
            reason: reason.to_string(),
            event_id: UUID4::new(),
            event_timestamp: self.clock.borrow().timestamp_ns(),
        });
        let mut order = order.clone();
        if let Err(e) = order.apply(invalid.clone()) {
            log::warn!("Could not apply {invalid}: {e}");
            return;
        }
        self.portfolio
            .borrow_mut()
            .process_event(&Event::Order(invalid));
    }

    /// Applies a dequeued event to engine state and forwards it on success.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal database write failures.
    pub(crate) fn handle_event(&self, event: &Event) -> anyhow::Result<()> {
        log::debug!("{RECV}{EVT} {event}");

        match event {
            Event::Order(order_event) => self.handle_order_event(order_event),
            Event::Account(state) => {
                self.database
                    .update_account(state)
                    .map_err(|e| anyhow::anyhow!("fatal database write failure: {e}"))?;
                self.portfolio.borrow_mut().process_event(event);
                Ok(())
            }
        }
    }

    fn handle_order_event(&self, event: &OrderEvent) -> anyhow::Result<()> {
        let cl_ord_id = event.cl_ord_id();
        let mut order = match self.database.order(&cl_ord_id) {
            Some(order) => order,
            None => {
                log::warn!("Order with {cl_ord_id} not found in the database to apply {event}");

                // Fall back to the venue order ID index
                let Some(order_id) = event.order_id() else {
                    log::error!(
                        "Cannot apply event to any order: {cl_ord_id} not found and no OrderId"
                    );
                    return Ok(());
                };
                let Some(mapped) = self.database.cl_ord_id(&order_id) else {
                    log::error!(
                        "Cannot apply event to any order: {cl_ord_id} and {order_id} not found"
                    );
                    return Ok(());
                };
                match self.database.order(&mapped) {
                    Some(order) => order,
                    None => {
                        log::error!(
                            "Cannot apply event to any order: {mapped} and {order_id} not found"
                        );
                        return Ok(());
                    }
                }
            }
        };

        // Integrity guard: an over-fill marks the order INVALID without
        // mutating fill state or positions
        if let Some(fill) = event.fill()
            && order.would_overfill(fill.fill_qty)
        {
            log::error!(
                "Over-fill detected for {}: fill_qty={}, filled_qty={}, quantity={}",
                order.cl_ord_id(),
                fill.fill_qty,
                order.filled_qty(),
                order.quantity()
            );
            let invalid = OrderEvent::Invalid(OrderInvalid {
                cl_ord_id: order.cl_ord_id(),
                reason: format!(
                    "OVER_FILL: cum_qty {} would exceed quantity {}",
                    order.filled_qty() + fill.fill_qty,
                    order.quantity()
                ),
                event_id: UUID4::new(),
                event_timestamp: self.clock.borrow().timestamp_ns(),
            });
            return self.apply_and_forward(&mut order, &invalid);
        }

        self.apply_and_forward(&mut order, event)
    }

    fn apply_and_forward(&self, order: &mut Order, event: &OrderEvent) -> anyhow::Result<()> {
        match order.apply(event.clone()) {
            Ok(()) => {}
            Err(OrderError::InvalidStateTransition { state, event: name }) => {
                log::warn!(
                    "InvalidStateTransition: {state} -> {name} for {}, did not apply {event}",
                    order.cl_ord_id()
                );
                return Ok(());
            }
            Err(OrderError::DuplicateExecution(execution_id)) => {
                log::warn!(
                    "Duplicate execution {execution_id} for {}, did not apply {event}",
                    order.cl_ord_id()
                );
                return Ok(());
            }
            Err(OrderError::OverFill { quantity, cum_qty }) => {
                // Secondary guard; the pre-apply check above reports first
                log::error!(
                    "Over-fill rejected for {}: cum_qty={cum_qty}, quantity={quantity}",
                    order.cl_ord_id()
                );
                return Ok(());
            }
        }

        self.database
            .update_order(order)
            .map_err(|e| anyhow::anyhow!("fatal database write failure: {e}"))?;

        log::debug!("{SEND}{EVT} {event}");
        self.portfolio
            .borrow_mut()
            .process_event(&Event::Order(event.clone()));
        Ok(())
    }
}

/// Central execution engine responsible for orchestrating order routing and
/// execution across registered venue clients.
pub struct ExecutionEngine {
    core: Rc<EngineCore>,
    config: ExecutionEngineConfig,
    reconciliation_policy: ReconciliationPolicy,
    msg_tx: mpsc::Sender<EngineMessage>,
    msg_rx: Option<mpsc::Receiver<EngineMessage>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(ExecutionEngine))
            .field("state", &self.core.state.get())
            .field("client_count", &self.core.clients.borrow().len())
            .finish()
    }
}

impl ExecutionEngine {
    /// Creates a new [`ExecutionEngine`] wired to its collaborators.
    #[must_use]
    pub fn new(
        clock: Rc<RefCell<dyn Clock>>,
        database: Rc<dyn ExecutionDatabase>,
        portfolio: Rc<RefCell<Portfolio>>,
        config: ExecutionEngineConfig,
    ) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(config.qsize.max(1));
        let core = Rc::new(EngineCore {
            clock,
            database,
            portfolio,
            clients: RefCell::new(AHashMap::new()),
            state: Cell::new(ComponentState::PreInitialized),
            degraded: Cell::new(false),
        });

        // The database owns persistent position records; the portfolio's
        // position events funnel every change back through it
        let position_store = core.database.clone();
        core.portfolio
            .borrow_mut()
            .register_position_event_handler(Box::new(move |event| {
                let result = match event {
                    PositionEvent::Opened(e) => position_store.add_position(e.position.clone()),
                    PositionEvent::Changed(e) | PositionEvent::Closed(e) => {
                        position_store.update_position(&e.position)
                    }
                };
                if let Err(e) = result {
                    log::error!("Failed to persist position state: {e}");
                }
            }));

        core.state.set(ComponentState::Initialized);

        Self {
            core,
            config,
            reconciliation_policy: ReconciliationPolicy::default(),
            msg_tx,
            msg_rx: Some(msg_rx),
            task: None,
        }
    }

    /// Returns the engine lifecycle state.
    #[must_use]
    pub fn state(&self) -> ComponentState {
        self.core.state.get()
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &ExecutionEngineConfig {
        &self.config
    }

    /// Returns true if the engine is degraded awaiting reconciliation.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.core.degraded.get()
    }

    /// Sets the tie-break policy applied during reconciliation.
    pub fn set_reconciliation_policy(&mut self, policy: ReconciliationPolicy) {
        self.reconciliation_policy = policy;
    }

    pub(crate) fn core(&self) -> &Rc<EngineCore> {
        &self.core
    }

    pub(crate) const fn reconciliation_policy(&self) -> ReconciliationPolicy {
        self.reconciliation_policy
    }

    /// Registers an execution client, keyed by its venue.
    ///
    /// # Errors
    ///
    /// Returns an error if a client is already registered for the venue.
    pub fn register_client(&self, client: Rc<dyn ExecutionClient>) -> anyhow::Result<()> {
        let venue = client.venue();
        let mut clients = self.core.clients.borrow_mut();
        if clients.contains_key(&venue) {
            anyhow::bail!("client already registered for venue {venue}");
        }
        clients.insert(venue, client);
        log::info!("Registered execution client for venue {venue}");
        Ok(())
    }

    /// Deregisters the execution client for the given venue.
    ///
    /// # Errors
    ///
    /// Returns an error if no client is registered for the venue.
    pub fn deregister_client(&self, venue: Venue) -> anyhow::Result<()> {
        if self.core.clients.borrow_mut().remove(&venue).is_none() {
            anyhow::bail!("no client registered for venue {venue}");
        }
        log::info!("Deregistered execution client for venue {venue}");
        Ok(())
    }

    /// Connects all registered execution clients concurrently.
    ///
    /// Connection failures are logged but do not prevent the engine from
    /// running; commands for an unconnected venue are answered with
    /// rejection events.
    pub async fn connect(&self) {
        let clients: Vec<_> = self.core.clients.borrow().values().cloned().collect();
        let futures: Vec<_> = clients.iter().map(|c| c.connect()).collect();
        for error in futures::future::join_all(futures)
            .await
            .into_iter()
            .filter_map(Result::err)
        {
            log::error!("Failed to connect execution client: {error}");
        }
    }

    /// Disconnects all registered execution clients concurrently.
    ///
    /// # Errors
    ///
    /// Returns an error if any client fails to disconnect.
    pub async fn disconnect(&self) -> anyhow::Result<()> {
        let clients: Vec<_> = self.core.clients.borrow().values().cloned().collect();
        let futures: Vec<_> = clients.iter().map(|c| c.disconnect()).collect();
        let errors: Vec<_> = futures::future::join_all(futures)
            .await
            .into_iter()
            .filter_map(Result::err)
            .map(|e| e.to_string())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("failed to disconnect execution clients: {}", errors.join("; "))
        }
    }

    /// Returns a cloneable handle for enqueuing commands and events.
    #[must_use]
    pub fn handle(&self) -> ExecutionEngineHandle {
        ExecutionEngineHandle {
            msg_tx: self.msg_tx.clone(),
            core: self.core.clone(),
        }
    }

    /// Returns the number of messages currently queued.
    #[must_use]
    pub fn qsize(&self) -> usize {
        self.msg_tx.max_capacity() - self.msg_tx.capacity()
    }

    /// Enqueues a trading command; see [`ExecutionEngineHandle::execute`].
    ///
    /// # Errors
    ///
    /// Returns a validation error synchronously if no client is registered
    /// for the command's venue, or if the engine queue is closed.
    pub async fn execute(&self, command: TradingCommand) -> anyhow::Result<()> {
        self.handle().execute(command).await
    }

    /// Enqueues an execution event; see [`ExecutionEngineHandle::process`].
    ///
    /// # Errors
    ///
    /// Returns an error if the engine queue is closed.
    pub async fn process(&self, event: Event) -> anyhow::Result<()> {
        self.handle().process(event).await
    }

    /// Starts the consumer task, draining the queue until stopped.
    ///
    /// Loads persisted orders, positions and accounts first; if any
    /// non-terminal orders were loaded the engine starts degraded and
    /// requires a successful [`Self::reconcile_state`] before accepting
    /// commands.
    ///
    /// # Errors
    ///
    /// Returns an error unless the engine is in the `INITIALIZED` state.
    ///
    /// # Panics
    ///
    /// Panics if called outside a `tokio` `LocalSet` scheduler context.
    pub fn start(&mut self) -> anyhow::Result<()> {
        if self.core.state.get() != ComponentState::Initialized {
            anyhow::bail!(
                "cannot start engine from state {}",
                self.core.state.get()
            );
        }
        let mut msg_rx = self
            .msg_rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("engine queue receiver already taken"))?;

        let orders = self.core.database.load_orders();
        let positions = self.core.database.load_positions();
        let accounts = self.core.database.load_accounts();
        log::info!(
            "Loaded {} orders, {} positions, {} accounts",
            orders.len(),
            positions.len(),
            accounts.len()
        );

        let open_count = orders.iter().filter(|o| !o.is_completed()).count();
        if open_count > 0 {
            self.core.degraded.set(true);
            log::warn!(
                "{open_count} open orders loaded from database; reconciliation required before accepting commands"
            );
        }

        let core = self.core.clone();
        self.task = Some(tokio::task::spawn_local(async move {
            while let Some(message) = msg_rx.recv().await {
                let result = match message {
                    EngineMessage::Shutdown => {
                        log::info!("Consumer received shutdown sentinel");
                        break;
                    }
                    EngineMessage::Command(command) => core.handle_command(command).await,
                    EngineMessage::Event(event) => core.handle_event(&event),
                };
                if let Err(e) = result {
                    // Fatal: stop consuming and signal the host via state
                    log::error!("Fatal engine error: {e}");
                    core.state.set(ComponentState::Stopped);
                    return;
                }
            }
            core.state.set(ComponentState::Stopped);
            log::info!("Consumer task exited");
        }));

        self.core.state.set(ComponentState::Running);
        log::info!("Started");
        Ok(())
    }

    /// Posts the shutdown sentinel and waits for the consumer to drain the
    /// queue and exit gracefully.
    pub async fn stop(&mut self) {
        if self.core.state.get() != ComponentState::Running {
            log::warn!("Stop called but engine not running");
            return;
        }

        if let Err(e) = self.msg_tx.send(EngineMessage::Shutdown).await {
            log::error!("Failed to send shutdown sentinel: {e}");
        }

        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            log::error!("Consumer task join error: {e}");
        }
        self.core.state.set(ComponentState::Stopped);
        log::info!("Stopped");
    }

    /// Cancels the consumer task without draining the queue.
    ///
    /// Used only when a graceful shutdown is compromised; any message being
    /// applied completes its current state transition (transitions are
    /// non-suspending).
    pub fn kill(&mut self) {
        log::warn!("Killing consumer task");
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.core.state.set(ComponentState::Stopped);
    }

    /// Releases engine resources; the engine cannot be restarted.
    pub fn dispose(&mut self) {
        if self.core.state.get() == ComponentState::Running {
            log::warn!("Disposing a running engine; killing consumer task");
            self.kill();
        }
        self.core.state.set(ComponentState::Disposed);
        log::info!("Disposed");
    }
}

/// A cloneable producer handle onto the engine's bounded queue.
///
/// This is the sole legal way for strategies and foreign tasks (execution
/// clients) to touch engine state. The typed API makes enqueuing the
/// shutdown sentinel impossible from the outside.
#[derive(Clone)]
pub struct ExecutionEngineHandle {
    msg_tx: mpsc::Sender<EngineMessage>,
    core: Rc<EngineCore>,
}

impl Debug for ExecutionEngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(ExecutionEngineHandle)).finish()
    }
}

impl ExecutionEngineHandle {
    /// Enqueues a trading command, suspending only when the queue is full.
    ///
    /// # Errors
    ///
    /// Returns a validation error synchronously (never enqueued) if no
    /// client is registered for the command's venue, or if the engine queue
    /// is closed.
    pub async fn execute(&self, command: TradingCommand) -> anyhow::Result<()> {
        let venue = command.venue();
        if !self.core.clients.borrow().contains_key(&venue) {
            anyhow::bail!("no execution client registered for venue {venue}");
        }
        self.enqueue(EngineMessage::Command(command)).await
    }

    /// Enqueues an execution event, suspending only when the queue is full.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine queue is closed.
    pub async fn process(&self, event: Event) -> anyhow::Result<()> {
        self.enqueue(EngineMessage::Event(event)).await
    }

    /// Returns the number of messages currently queued.
    #[must_use]
    pub fn qsize(&self) -> usize {
        self.msg_tx.max_capacity() - self.msg_tx.capacity()
    }

    async fn enqueue(&self, message: EngineMessage) -> anyhow::Result<()> {
        match self.msg_tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) => {
                log::warn!(
                    "Engine queue full at capacity {}, blocking until space available",
                    self.msg_tx.max_capacity()
                );
                self.msg_tx
                    .send(message)
                    .await
                    .map_err(|e| anyhow::anyhow!("engine queue closed: {e}"))
            }
            Err(TrySendError::Closed(_)) => anyhow::bail!("engine queue closed"),
        }
    }
}
