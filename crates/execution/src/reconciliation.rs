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

//! Execution state reconciliation.
//!
//! On (re)connect the engine converges its cache of open orders with each
//! venue's view: it partitions open orders by venue, requests state reports
//! in parallel, and re-evaluates resolution on each pass until every order
//! is resolved or the deadline elapses. Missing lifecycle events are
//! synthesized by the clients; the engine only observes convergence.

use std::time::Duration;

use ahash::{AHashMap, AHashSet};
use futures::future::join_all;
use meridian_core::{UUID4, UnixNanos};
use meridian_model::{
    enums::{LiquiditySide, OrderState},
    events::{
        Event, OrderAccepted, OrderCancelled, OrderEvent, OrderExpired, OrderFilled, OrderRejected,
        OrderTriggered, OrderWorking,
    },
    identifiers::{AccountId, ClientOrderId, ExecutionId, Venue},
    orders::Order,
    types::{Currency, Money, Price, Quantity},
};

use crate::{client::ExecutionStateReport, engine::ExecutionEngine};

/// The tie-break applied when a locally terminal order is reported live by
/// its venue.
///
/// The local state wins only after operator confirmation; the default holds
/// the order unresolved (and the reconciliation run failing) until an
/// operator intervenes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReconciliationPolicy {
    /// Log an error and report the order unresolved until an operator
    /// confirms.
    #[default]
    HoldForOperator,
    /// Operator has confirmed: the local terminal state wins and the
    /// venue-side order is assumed stale.
    LocalWins,
}

/// The resolution status of one order against its venue report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderResolution {
    /// Local and venue state agree.
    Resolved,
    /// The venue does not know the order while it is locally `SUBMITTED`;
    /// it is treated as rejected.
    UnknownToVenue,
    /// No venue information is available to act on.
    Unresolved,
    /// The venue reports a different state; the client must synthesize the
    /// missing lifecycle events.
    Divergent {
        /// The venue-reported order state.
        reported_state: OrderState,
        /// The venue-reported cumulative filled quantity.
        reported_filled_qty: Quantity,
    },
}

/// Compares one order to its venue-reported state.
///
/// An order is resolved when the reported state equals the local state and,
/// for fill states, the reported filled quantity equals the local filled
/// quantity.
#[must_use]
pub fn check_order_resolution(order: &Order, report: &ExecutionStateReport) -> OrderResolution {
    if order.is_completed() {
        return OrderResolution::Resolved;
    }

    let Some(order_id) = order.order_id() else {
        // Never acknowledged, so the venue cannot key it
        return if order.state() == OrderState::Submitted {
            OrderResolution::UnknownToVenue
        } else {
            OrderResolution::Unresolved
        };
    };

    match report.order_states.get(&order_id) {
        None => {
            if order.state() == OrderState::Submitted {
                OrderResolution::UnknownToVenue
            } else {
                OrderResolution::Unresolved
            }
        }
        Some(reported_state) => {
            let reported_filled_qty = report
                .order_filled_qtys
                .get(&order_id)
                .copied()
                .unwrap_or_default();

            if *reported_state == order.state() {
                let is_fill_state = matches!(
                    reported_state,
                    OrderState::Filled | OrderState::PartiallyFilled
                );
                if is_fill_state && reported_filled_qty != order.filled_qty() {
                    OrderResolution::Divergent {
                        reported_state: *reported_state,
                        reported_filled_qty,
                    }
                } else {
                    OrderResolution::Resolved
                }
            } else {
                OrderResolution::Divergent {
                    reported_state: *reported_state,
                    reported_filled_qty,
                }
            }
        }
    }
}

/// Synthesizes the lifecycle events required to bring `order` from its local
/// state to `reported_state`.
///
/// This is the client-side default used by adapters without richer venue
/// data (a real adapter would prefer venue-supplied fill prices and
/// execution IDs). Synthesized fills are priced from the order's average
/// fill price, falling back to its limit price; when neither is available
/// no events are produced and the caller must resolve by other means.
#[must_use]
pub fn missing_lifecycle_events(
    order: &Order,
    reported_state: OrderState,
    reported_filled_qty: Quantity,
    account_id: AccountId,
    currency: Currency,
    ts_now: UnixNanos,
) -> Vec<OrderEvent> {
    let mut events = Vec::new();
    let mut state = order.state();

    if reported_state == OrderState::Rejected {
        if state == OrderState::Submitted {
            events.push(OrderEvent::Rejected(OrderRejected {
                account_id,
                cl_ord_id: order.cl_ord_id(),
                rejected_time: ts_now,
                reason: "RECONCILIATION".to_string(),
                event_id: UUID4::new(),
                event_timestamp: ts_now,
            }));
        }
        return events;
    }

    let Some(order_id) = order.order_id() else {
        // Cannot synthesize venue events without a venue order ID
        return events;
    };

    if state == OrderState::Submitted {
        events.push(OrderEvent::Accepted(OrderAccepted {
            account_id,
            cl_ord_id: order.cl_ord_id(),
            order_id,
            accepted_time: ts_now,
            event_id: UUID4::new(),
            event_timestamp: ts_now,
        }));
        state = OrderState::Accepted;
    }

    let working_event = |price: Price| {
        OrderEvent::Working(OrderWorking {
            account_id,
            cl_ord_id: order.cl_ord_id(),
            order_id,
            security: order.security(),
            order_side: order.side(),
            order_type: order.order_type(),
            quantity: order.quantity(),
            price,
            time_in_force: order.time_in_force(),
            expire_time: order.expire_time(),
            working_time: ts_now,
            event_id: UUID4::new(),
            event_timestamp: ts_now,
        })
    };

    match reported_state {
        OrderState::Accepted => {}
        OrderState::Working => {
            if state == OrderState::Accepted
                && let Some(price) = order.price()
            {
                events.push(working_event(price));
            }
        }
        OrderState::Triggered => {
            if state == OrderState::Accepted
                && let Some(price) = order.price()
            {
                events.push(working_event(price));
                state = OrderState::Working;
            }
            if state == OrderState::Working {
                events.push(OrderEvent::Triggered(OrderTriggered {
                    account_id,
                    cl_ord_id: order.cl_ord_id(),
                    order_id,
                    triggered_time: ts_now,
                    event_id: UUID4::new(),
                    event_timestamp: ts_now,
                }));
            }
        }
        OrderState::Cancelled => {
            events.push(OrderEvent::Cancelled(OrderCancelled {
                account_id,
                cl_ord_id: order.cl_ord_id(),
                order_id,
                cancelled_time: ts_now,
                event_id: UUID4::new(),
                event_timestamp: ts_now,
            }));
        }
        OrderState::Expired => {
            if state == OrderState::Accepted
                && let Some(price) = order.price()
            {
                events.push(working_event(price));
            }
            events.push(OrderEvent::Expired(OrderExpired {
                account_id,
                cl_ord_id: order.cl_ord_id(),
                order_id,
                expired_time: ts_now,
                event_id: UUID4::new(),
                event_timestamp: ts_now,
            }));
        }
        OrderState::Filled | OrderState::PartiallyFilled => {
            if matches!(state, OrderState::Accepted | OrderState::Triggered)
                && let Some(price) = order.price()
            {
                events.push(working_event(price));
            }
            let missing_qty = reported_filled_qty.saturating_sub(order.filled_qty());
            if missing_qty.is_zero() {
                return events;
            }
            let Some(price) = order.avg_price().map(Price::new).or_else(|| order.price())
            else {
                log::warn!(
                    "Cannot synthesize fill for {}: no reference price available",
                    order.cl_ord_id()
                );
                return events;
            };

            let leaves_qty = order.quantity().saturating_sub(reported_filled_qty);
            let fill = OrderFilled {
                account_id,
                cl_ord_id: order.cl_ord_id(),
                order_id,
                execution_id: ExecutionId::new(&format!(
                    "E-RECON-{}-{}",
                    order.cl_ord_id(),
                    order.execution_ids().len() + 1
                )),
                position_id: None,
                strategy_id: order.strategy_id(),
                security: order.security(),
                order_side: order.side(),
                fill_qty: missing_qty,
                cum_qty: reported_filled_qty,
                leaves_qty,
                fill_price: price,
                currency,
                commission: Money::zero(currency),
                liquidity_side: LiquiditySide::Taker,
                execution_time: ts_now,
                event_id: UUID4::new(),
                event_timestamp: ts_now,
            };
            if reported_state == OrderState::Filled {
                events.push(OrderEvent::Filled(fill));
            } else {
                events.push(OrderEvent::PartiallyFilled(fill));
            }
        }
        _ => {}
    }

    events
}

impl ExecutionEngine {
    /// Converges the engine's cache of open orders with each venue's view.
    ///
    /// Collects all non-terminal orders, requests a state report from each
    /// registered client in parallel, then re-evaluates resolution on each
    /// pass (sleeping the configured poll interval in between) until every
    /// order is resolved or `timeout` elapses. Divergent orders are handed
    /// to their client's `resolve_order`; the synthesized events flow back
    /// through the running consumer, so the engine must be started before
    /// reconciling.
    ///
    /// Returns true on convergence, clearing the degraded flag; on timeout
    /// the unresolved orders are logged, the engine enters degraded mode and
    /// commands are rejected until a later successful run. With no `timeout`
    /// argument the configured default applies. Running twice against an
    /// unchanged venue report succeeds both times and mutates nothing on the
    /// second run.
    pub async fn reconcile_state(&self, timeout: Option<Duration>) -> bool {
        let core = self.core().clone();
        let recon_config = self.config().reconciliation;
        let timeout = timeout.unwrap_or(Duration::from_secs(recon_config.timeout_secs));
        let poll_interval = Duration::from_millis(recon_config.poll_interval_ms.max(1));

        let open_orders = core.database.orders_open();
        if open_orders.is_empty() {
            core.degraded.set(false);
            log::info!("State reconciliation complete: no open orders");
            return true;
        }
        log::info!("Reconciling state for {} open orders", open_orders.len());

        // Partition open orders by venue
        let mut by_venue: AHashMap<Venue, Vec<Order>> = AHashMap::new();
        for order in &open_orders {
            by_venue
                .entry(order.security().venue)
                .or_default()
                .push(order.clone());
        }

        // Request state reports from each registered client in parallel
        let mut requests = Vec::new();
        for (venue, orders) in by_venue {
            match core.client_for_venue(venue) {
                Some(client) => requests.push((venue, client, orders)),
                None => log::error!(
                    "No execution client registered for venue {venue}; {} orders cannot be reconciled",
                    orders.len()
                ),
            }
        }
        let futures: Vec<_> = requests
            .iter()
            .map(|(venue, client, orders)| async move {
                (*venue, client.state_report(orders).await)
            })
            .collect();
        let mut reports: AHashMap<Venue, ExecutionStateReport> = AHashMap::new();
        for (venue, result) in join_all(futures).await {
            match result {
                Ok(report) => {
                    reports.insert(venue, report);
                }
                Err(e) => log::error!("Failed to obtain state report for venue {venue}: {e}"),
            }
        }

        let tracked: Vec<ClientOrderId> = open_orders.iter().map(Order::cl_ord_id).collect();
        let policy = self.reconciliation_policy();
        let handle = self.handle();
        let deadline = tokio::time::Instant::now() + timeout;
        let mut resolutions_requested: AHashSet<ClientOrderId> = AHashSet::new();
        let mut rejections_sent: AHashSet<ClientOrderId> = AHashSet::new();

        loop {
            let mut unresolved: Vec<ClientOrderId> = Vec::new();

            for cl_ord_id in &tracked {
                let Some(order) = core.database.order(cl_ord_id) else {
                    continue;
                };
                if order.is_completed() {
                    continue;
                }
                let venue = order.security().venue;
                let Some(report) = reports.get(&venue) else {
                    unresolved.push(*cl_ord_id);
                    continue;
                };

                match check_order_resolution(&order, report) {
                    OrderResolution::Resolved => {}
                    OrderResolution::UnknownToVenue => {
                        unresolved.push(*cl_ord_id);
                        if rejections_sent.insert(*cl_ord_id)
                            && let Some(client) = core.client_for_venue(venue)
                        {
                            log::warn!(
                                "Order {cl_ord_id} unknown to venue {venue} while SUBMITTED, treating as REJECTED"
                            );
                            let rejected = OrderEvent::Rejected(OrderRejected {
                                account_id: client.account_id(),
                                cl_ord_id: *cl_ord_id,
                                rejected_time: core.clock.borrow().timestamp_ns(),
                                reason: "UNKNOWN_TO_VENUE".to_string(),
                                event_id: UUID4::new(),
                                event_timestamp: core.clock.borrow().timestamp_ns(),
                            });
                            if let Err(e) = handle.process(Event::Order(rejected)).await {
                                log::error!("Failed to enqueue synthesized rejection: {e}");
                            }
                        }
                    }
                    OrderResolution::Unresolved => {
                        unresolved.push(*cl_ord_id);
                    }
                    OrderResolution::Divergent {
                        reported_state,
                        reported_filled_qty,
                    } => {
                        unresolved.push(*cl_ord_id);
                        if resolutions_requested.insert(*cl_ord_id)
                            && let Some(client) = core.client_for_venue(venue)
                            && let Err(e) = client
                                .resolve_order(&order, reported_state, reported_filled_qty)
                                .await
                        {
                            log::error!("Failed to resolve order {cl_ord_id}: {e}");
                        }
                    }
                }
            }

            // Locally terminal orders the venue still reports live
            for report in reports.values() {
                for (order_id, reported_state) in &report.order_states {
                    if reported_state.is_completed() {
                        continue;
                    }
                    let Some(cl_ord_id) = core.database.cl_ord_id(order_id) else {
                        continue;
                    };
                    let Some(order) = core.database.order(&cl_ord_id) else {
                        continue;
                    };
                    if !order.is_completed() {
                        continue;
                    }
                    match policy {
                        ReconciliationPolicy::LocalWins => log::warn!(
                            "Venue reports {order_id} as {reported_state} but {cl_ord_id} is locally {}; local state wins per operator confirmation",
                            order.state()
                        ),
                        ReconciliationPolicy::HoldForOperator => {
                            log::error!(
                                "Venue reports {order_id} as {reported_state} but {cl_ord_id} is locally {}; operator confirmation required",
                                order.state()
                            );
                            unresolved.push(cl_ord_id);
                        }
                    }
                }
            }

            if unresolved.is_empty() {
                core.degraded.set(false);
                log::info!("State reconciliation complete: all orders resolved");
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                log::error!(
                    "State reconciliation timed out with {} unresolved orders: {unresolved:?}",
                    unresolved.len()
                );
                core.degraded.set(true);
                return false;
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use meridian_core::{UUID4, UnixNanos};
    use meridian_model::{
        enums::{OrderSide, TimeInForce},
        identifiers::OrderId,
        stubs::{TestStubs, security_audusd},
    };
    use rstest::rstest;

    use super::*;

    fn working_limit_order() -> Order {
        let mut order = Order::limit(
            ClientOrderId::new("O-1"),
            TestStubs::strategy_id(),
            security_audusd(),
            OrderSide::Buy,
            Quantity::from(10),
            Price::from_str("100").unwrap(),
            TimeInForce::Gtc,
            None,
            UUID4::new(),
            UnixNanos::default(),
        );
        order.apply(TestStubs::event_order_submitted(&order)).unwrap();
        order
            .apply(TestStubs::event_order_accepted(&order, OrderId::new("V-1")))
            .unwrap();
        order.apply(TestStubs::event_order_working(&order)).unwrap();
        order
    }

    fn report_with(order_id: &str, state: OrderState, filled: u64) -> ExecutionStateReport {
        let mut report = ExecutionStateReport::new(
            Venue::new("SIM"),
            TestStubs::account_id(),
            UnixNanos::default(),
        );
        report.add(OrderId::new(order_id), state, Quantity::from(filled));
        report
    }

    #[rstest]
    fn test_resolution_matching_state_is_resolved() {
        let order = working_limit_order();
        let report = report_with("V-1", OrderState::Working, 0);

        assert_eq!(
            check_order_resolution(&order, &report),
            OrderResolution::Resolved
        );
    }

    #[rstest]
    fn test_resolution_fill_state_requires_matching_qty() {
        let mut order = working_limit_order();
        order
            .apply(TestStubs::event_order_partially_filled(
                &order,
                ExecutionId::new("E-1"),
                Quantity::from(4),
                Price::from_str("100").unwrap(),
            ))
            .unwrap();

        let matching = report_with("V-1", OrderState::PartiallyFilled, 4);
        assert_eq!(
            check_order_resolution(&order, &matching),
            OrderResolution::Resolved
        );

        let divergent = report_with("V-1", OrderState::PartiallyFilled, 7);
        assert_eq!(
            check_order_resolution(&order, &divergent),
            OrderResolution::Divergent {
                reported_state: OrderState::PartiallyFilled,
                reported_filled_qty: Quantity::from(7),
            }
        );
    }

    #[rstest]
    fn test_resolution_submitted_unknown_to_venue() {
        let mut order = Order::market(
            ClientOrderId::new("O-2"),
            TestStubs::strategy_id(),
            security_audusd(),
            OrderSide::Sell,
            Quantity::from(5),
            UUID4::new(),
            UnixNanos::default(),
        );
        order.apply(TestStubs::event_order_submitted(&order)).unwrap();

        let report = ExecutionStateReport::new(
            Venue::new("SIM"),
            TestStubs::account_id(),
            UnixNanos::default(),
        );

        assert_eq!(
            check_order_resolution(&order, &report),
            OrderResolution::UnknownToVenue
        );
    }

    #[rstest]
    fn test_resolution_divergent_state() {
        let order = working_limit_order();
        let report = report_with("V-1", OrderState::Filled, 10);

        assert_eq!(
            check_order_resolution(&order, &report),
            OrderResolution::Divergent {
                reported_state: OrderState::Filled,
                reported_filled_qty: Quantity::from(10),
            }
        );
    }

    #[rstest]
    fn test_missing_events_for_full_fill() {
        let order = working_limit_order();

        let events = missing_lifecycle_events(
            &order,
            OrderState::Filled,
            Quantity::from(10),
            TestStubs::account_id(),
            Currency::usd(),
            UnixNanos::default(),
        );

        assert_eq!(events.len(), 1);
        match &events[0] {
            OrderEvent::Filled(fill) => {
                assert_eq!(fill.fill_qty, Quantity::from(10));
                assert_eq!(fill.cum_qty, Quantity::from(10));
                assert_eq!(fill.leaves_qty, Quantity::zero());
                assert_eq!(fill.fill_price, Price::from_str("100").unwrap());
            }
            other => panic!("expected OrderFilled, was {other}"),
        }
    }

    #[rstest]
    fn test_missing_events_from_accepted_to_cancelled() {
        let mut order = Order::limit(
            ClientOrderId::new("O-3"),
            TestStubs::strategy_id(),
            security_audusd(),
            OrderSide::Buy,
            Quantity::from(10),
            Price::from_str("100").unwrap(),
            TimeInForce::Gtc,
            None,
            UUID4::new(),
            UnixNanos::default(),
        );
        order.apply(TestStubs::event_order_submitted(&order)).unwrap();
        order
            .apply(TestStubs::event_order_accepted(&order, OrderId::new("V-3")))
            .unwrap();

        let events = missing_lifecycle_events(
            &order,
            OrderState::Cancelled,
            Quantity::zero(),
            TestStubs::account_id(),
            Currency::usd(),
            UnixNanos::default(),
        );

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], OrderEvent::Cancelled(_)));
    }

    #[rstest]
    fn test_missing_events_bridge_working_before_fill() {
        let mut order = Order::limit(
            ClientOrderId::new("O-5"),
            TestStubs::strategy_id(),
            security_audusd(),
            OrderSide::Buy,
            Quantity::from(10),
            Price::from_str("100").unwrap(),
            TimeInForce::Gtc,
            None,
            UUID4::new(),
            UnixNanos::default(),
        );
        order.apply(TestStubs::event_order_submitted(&order)).unwrap();
        order
            .apply(TestStubs::event_order_accepted(&order, OrderId::new("V-5")))
            .unwrap();

        let events = missing_lifecycle_events(
            &order,
            OrderState::Filled,
            Quantity::from(10),
            TestStubs::account_id(),
            Currency::usd(),
            UnixNanos::default(),
        );

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], OrderEvent::Working(_)));
        assert!(matches!(events[1], OrderEvent::Filled(_)));

        for event in events {
            order.apply(event).unwrap();
        }
        assert_eq!(order.state(), OrderState::Filled);
        assert_eq!(order.filled_qty(), Quantity::from(10));
    }

    #[rstest]
    fn test_missing_events_applied_reach_reported_state() {
        let mut order = working_limit_order();

        let events = missing_lifecycle_events(
            &order,
            OrderState::Filled,
            Quantity::from(10),
            TestStubs::account_id(),
            Currency::usd(),
            UnixNanos::default(),
        );
        for event in events {
            order.apply(event).unwrap();
        }

        assert_eq!(order.state(), OrderState::Filled);
        assert_eq!(order.filled_qty(), Quantity::from(10));
    }

    #[rstest]
    fn test_no_events_synthesized_without_reference_price() {
        let mut order = Order::market(
            ClientOrderId::new("O-4"),
            TestStubs::strategy_id(),
            security_audusd(),
            OrderSide::Buy,
            Quantity::from(10),
            UUID4::new(),
            UnixNanos::default(),
        );
        order.apply(TestStubs::event_order_submitted(&order)).unwrap();
        order
            .apply(TestStubs::event_order_accepted(&order, OrderId::new("V-4")))
            .unwrap();

        let events = missing_lifecycle_events(
            &order,
            OrderState::Filled,
            Quantity::from(10),
            TestStubs::account_id(),
            Currency::usd(),
            UnixNanos::default(),
        );

        assert!(events.is_empty());
    }
}
