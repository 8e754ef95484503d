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

//! End-to-end tests for the `ExecutionEngine` message loop, routing, order
//! state and reconciliation.

use std::{cell::RefCell, rc::Rc, str::FromStr, time::Duration};

use meridian_common::{
    clock::{Clock, TestClock},
    component::ComponentState,
    config::{ExecutionEngineConfig, ReconciliationConfig},
    messages::{SubmitOrder, TradingCommand},
};
use meridian_core::{UUID4, UnixNanos};
use meridian_execution::{
    client::ExecutionStateReport,
    database::{ExecutionDatabase, InMemoryExecutionDatabase},
    engine::{ExecutionEngine, ExecutionEngineHandle},
    stubs::StubExecutionClient,
};
use meridian_model::{
    enums::{LiquiditySide, OrderSide, OrderState, TimeInForce},
    events::{Event, OrderEvent, OrderFilled},
    identifiers::{AccountId, ClientOrderId, ExecutionId, OrderId, Venue},
    orders::Order,
    stubs::{TestStubs, security_audusd},
    types::{Currency, Money, Price, Quantity},
};
use meridian_portfolio::Portfolio;
use rust_decimal_macros::dec;

struct TestHarness {
    engine: ExecutionEngine,
    handle: ExecutionEngineHandle,
    client: Rc<StubExecutionClient>,
    database: Rc<InMemoryExecutionDatabase>,
    portfolio: Rc<RefCell<Portfolio>>,
}

fn harness_with_config(config: ExecutionEngineConfig) -> TestHarness {
    let clock: Rc<RefCell<dyn Clock>> = Rc::new(RefCell::new(TestClock::new()));
    let database = Rc::new(InMemoryExecutionDatabase::new());
    let portfolio = Rc::new(RefCell::new(Portfolio::new(clock.clone())));
    let engine = ExecutionEngine::new(clock, database.clone(), portfolio.clone(), config);

    let client = Rc::new(StubExecutionClient::new(
        Venue::new("SIM"),
        AccountId::new("SIM", "000"),
    ));
    engine.register_client(client.clone()).unwrap();

    let handle = engine.handle();
    client.register_handle(handle.clone());

    TestHarness {
        engine,
        handle,
        client,
        database,
        portfolio,
    }
}

fn harness() -> TestHarness {
    harness_with_config(ExecutionEngineConfig::default())
}

fn limit_buy(cl_ord_id: &str, qty: u64, price: &str) -> Order {
    Order::limit(
        ClientOrderId::new(cl_ord_id),
        TestStubs::strategy_id(),
        security_audusd(),
        OrderSide::Buy,
        Quantity::from(qty),
        Price::from_str(price).unwrap(),
        TimeInForce::Gtc,
        None,
        UUID4::new(),
        UnixNanos::default(),
    )
}

fn submit(order: Order) -> TradingCommand {
    TradingCommand::SubmitOrder(SubmitOrder {
        trader_id: TestStubs::trader_id(),
        strategy_id: TestStubs::strategy_id(),
        position_id: None,
        order,
        command_id: UUID4::new(),
        timestamp: UnixNanos::default(),
    })
}

fn fill_event(
    order: &Order,
    order_id: &str,
    execution_id: &str,
    fill_qty: u64,
    cum_qty: u64,
    leaves_qty: u64,
    price: &str,
) -> OrderEvent {
    let fill = OrderFilled {
        account_id: TestStubs::account_id(),
        cl_ord_id: order.cl_ord_id(),
        order_id: OrderId::new(order_id),
        execution_id: ExecutionId::new(execution_id),
        position_id: None,
        strategy_id: order.strategy_id(),
        security: order.security(),
        order_side: order.side(),
        fill_qty: Quantity::from(fill_qty),
        cum_qty: Quantity::from(cum_qty),
        leaves_qty: Quantity::from(leaves_qty),
        fill_price: Price::from_str(price).unwrap(),
        currency: Currency::usd(),
        commission: Money::zero(Currency::usd()),
        liquidity_side: LiquiditySide::Taker,
        execution_time: UnixNanos::default(),
        event_id: UUID4::new(),
        event_timestamp: UnixNanos::default(),
    };
    if leaves_qty > 0 {
        OrderEvent::PartiallyFilled(fill)
    } else {
        OrderEvent::Filled(fill)
    }
}

/// Yields to the consumer task until `condition` holds (bounded by a 2s
/// deadline so a broken loop fails the test rather than hanging it).
async fn await_condition(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached within deadline");
}

#[tokio::test]
async fn test_happy_path_limit_order_lifecycle() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let mut h = harness();
            let order = limit_buy("O-1", 10, "100");

            h.client.script_events(
                order.cl_ord_id(),
                vec![
                    TestStubs::event_order_submitted(&order),
                    TestStubs::event_order_accepted(&order, OrderId::new("V-1")),
                    TestStubs::event_order_working(&order),
                ],
            );

            h.engine.start().unwrap();
            h.handle.execute(submit(order.clone())).await.unwrap();

            await_condition(|| {
                h.database
                    .order(&order.cl_ord_id())
                    .is_some_and(|o| o.state() == OrderState::Working)
            })
            .await;

            let working = h.database.order(&order.cl_ord_id()).unwrap();
            assert_eq!(working.order_id(), Some(OrderId::new("V-1")));
            assert_eq!(working.leaves_qty(), Quantity::from(10));

            // Partial fill 4 @ 100
            h.handle
                .process(Event::Order(fill_event(&order, "V-1", "E-1", 4, 4, 6, "100")))
                .await
                .unwrap();
            await_condition(|| {
                h.database
                    .order(&order.cl_ord_id())
                    .is_some_and(|o| o.state() == OrderState::PartiallyFilled)
            })
            .await;

            let partial = h.database.order(&order.cl_ord_id()).unwrap();
            assert_eq!(partial.filled_qty(), Quantity::from(4));
            assert_eq!(partial.leaves_qty(), Quantity::from(6));
            assert_eq!(partial.avg_price(), Some(dec!(100)));

            // Final fill 6 @ 101
            h.handle
                .process(Event::Order(fill_event(&order, "V-1", "E-2", 6, 10, 0, "101")))
                .await
                .unwrap();
            await_condition(|| {
                h.database
                    .order(&order.cl_ord_id())
                    .is_some_and(|o| o.state() == OrderState::Filled)
            })
            .await;

            let filled = h.database.order(&order.cl_ord_id()).unwrap();
            assert_eq!(filled.filled_qty(), Quantity::from(10));
            assert_eq!(filled.leaves_qty(), Quantity::zero());
            assert_eq!(filled.avg_price(), Some(dec!(100.6)));

            // The portfolio projected the position from the fills and the
            // engine persisted it through the database
            let position = h
                .portfolio
                .borrow()
                .position(TestStubs::strategy_id(), security_audusd())
                .cloned()
                .unwrap();
            assert_eq!(position.quantity, Quantity::from(10));
            let stored = h
                .database
                .position(TestStubs::strategy_id(), security_audusd())
                .unwrap();
            assert_eq!(stored.quantity, Quantity::from(10));

            h.engine.stop().await;
            assert_eq!(h.engine.state(), ComponentState::Stopped);
        })
        .await;
}

#[tokio::test]
async fn test_rejected_order_ignores_subsequent_fill() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let mut h = harness();
            let order = Order::market(
                ClientOrderId::new("O-1"),
                TestStubs::strategy_id(),
                security_audusd(),
                OrderSide::Sell,
                Quantity::from(5),
                UUID4::new(),
                UnixNanos::default(),
            );

            h.client.script_events(
                order.cl_ord_id(),
                vec![
                    TestStubs::event_order_submitted(&order),
                    TestStubs::event_order_rejected(&order, "insufficient margin"),
                ],
            );

            h.engine.start().unwrap();
            h.handle.execute(submit(order.clone())).await.unwrap();

            await_condition(|| {
                h.database
                    .order(&order.cl_ord_id())
                    .is_some_and(|o| o.state() == OrderState::Rejected)
            })
            .await;

            // A late fill for the same order is ignored and logged
            h.handle
                .process(Event::Order(fill_event(&order, "V-1", "E-1", 5, 5, 0, "1.0")))
                .await
                .unwrap();
            await_condition(|| h.engine.qsize() == 0).await;
            tokio::task::yield_now().await;

            let rejected = h.database.order(&order.cl_ord_id()).unwrap();
            assert_eq!(rejected.state(), OrderState::Rejected);
            assert_eq!(rejected.filled_qty(), Quantity::zero());
            assert!(h.portfolio.borrow().positions_open().is_empty());

            h.engine.stop().await;
        })
        .await;
}

#[tokio::test]
async fn test_over_fill_marks_order_invalid_without_position_mutation() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let mut h = harness();
            let order = limit_buy("O-1", 10, "100");

            h.client.script_events(
                order.cl_ord_id(),
                vec![
                    TestStubs::event_order_submitted(&order),
                    TestStubs::event_order_accepted(&order, OrderId::new("V-1")),
                ],
            );

            h.engine.start().unwrap();
            h.handle.execute(submit(order.clone())).await.unwrap();
            await_condition(|| {
                h.database
                    .order(&order.cl_ord_id())
                    .is_some_and(|o| o.state() == OrderState::Accepted)
            })
            .await;

            // Venue erroneously fills 12 on quantity 10
            h.handle
                .process(Event::Order(fill_event(&order, "V-1", "E-1", 12, 12, 0, "100")))
                .await
                .unwrap();

            await_condition(|| {
                h.database
                    .order(&order.cl_ord_id())
                    .is_some_and(|o| o.state() == OrderState::Invalid)
            })
            .await;

            let invalid = h.database.order(&order.cl_ord_id()).unwrap();
            assert_eq!(invalid.filled_qty(), Quantity::zero());
            assert!(h.portfolio.borrow().positions_open().is_empty());

            h.engine.stop().await;
        })
        .await;
}

#[tokio::test]
async fn test_reconciliation_converges_on_venue_reported_fill() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let mut h = harness();

            // Local cache: O-1 WORKING with no fills
            let mut order = limit_buy("O-1", 10, "100");
            order.apply(TestStubs::event_order_submitted(&order)).unwrap();
            order
                .apply(TestStubs::event_order_accepted(&order, OrderId::new("V-1")))
                .unwrap();
            order.apply(TestStubs::event_order_working(&order)).unwrap();
            h.database.add_order(order.clone()).unwrap();

            // Venue ground truth: O-1 fully filled
            let mut report = ExecutionStateReport::new(
                Venue::new("SIM"),
                TestStubs::account_id(),
                UnixNanos::default(),
            );
            report.add(OrderId::new("V-1"), OrderState::Filled, Quantity::from(10));
            h.client.script_state_report(report);

            h.engine.start().unwrap();
            assert!(h.engine.is_degraded());

            let resolved = h.engine.reconcile_state(Some(Duration::from_secs(2))).await;

            assert!(resolved);
            assert!(!h.engine.is_degraded());
            let filled = h.database.order(&order.cl_ord_id()).unwrap();
            assert_eq!(filled.state(), OrderState::Filled);
            assert_eq!(filled.filled_qty(), Quantity::from(10));

            // Idempotent: a second run with unchanged venue state succeeds
            // without further mutation
            let event_count = filled.event_count();
            assert!(h.engine.reconcile_state(Some(Duration::from_secs(2))).await);
            assert_eq!(
                h.database.order(&order.cl_ord_id()).unwrap().event_count(),
                event_count
            );

            h.engine.stop().await;
        })
        .await;
}

#[tokio::test]
async fn test_reconciliation_timeout_degrades_engine_until_success() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let config = ExecutionEngineConfig {
                reconciliation: ReconciliationConfig {
                    timeout_secs: 10,
                    poll_interval_ms: 1,
                },
                ..Default::default()
            };
            let mut h = harness_with_config(config);

            // Local cache: O-2 WORKING; the venue report omits it entirely
            let mut order = limit_buy("O-2", 10, "100");
            order.apply(TestStubs::event_order_submitted(&order)).unwrap();
            order
                .apply(TestStubs::event_order_accepted(&order, OrderId::new("V-2")))
                .unwrap();
            order.apply(TestStubs::event_order_working(&order)).unwrap();
            h.database.add_order(order).unwrap();

            h.engine.start().unwrap();

            let resolved = h
                .engine
                .reconcile_state(Some(Duration::from_millis(50)))
                .await;

            assert!(!resolved);
            assert!(h.engine.is_degraded());

            // Commands are rejected with denial events while degraded
            let denied_order = limit_buy("O-3", 1, "100");
            h.handle.execute(submit(denied_order.clone())).await.unwrap();
            await_condition(|| {
                h.database
                    .order(&denied_order.cl_ord_id())
                    .is_some_and(|o| o.state() == OrderState::Denied)
            })
            .await;

            // No submit reached the client
            assert!(h.client.recorded_commands().is_empty());

            // Once the venue reports matching state, reconciliation succeeds
            // and commands flow again
            let mut report = ExecutionStateReport::new(
                Venue::new("SIM"),
                TestStubs::account_id(),
                UnixNanos::default(),
            );
            report.add(OrderId::new("V-2"), OrderState::Working, Quantity::zero());
            h.client.script_state_report(report);

            assert!(h.engine.reconcile_state(Some(Duration::from_secs(2))).await);
            assert!(!h.engine.is_degraded());

            let accepted_order = limit_buy("O-4", 1, "100");
            h.handle.execute(submit(accepted_order)).await.unwrap();
            await_condition(|| !h.client.recorded_commands().is_empty()).await;

            h.engine.stop().await;
        })
        .await;
}

#[tokio::test]
async fn test_backpressure_blocks_producer_and_preserves_order() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let config = ExecutionEngineConfig {
                qsize: 2,
                ..Default::default()
            };
            let mut h = harness_with_config(config);

            // Two rapid submissions fill the queue while the consumer is not
            // yet running
            h.handle.execute(submit(limit_buy("O-1", 1, "100"))).await.unwrap();
            h.handle.execute(submit(limit_buy("O-2", 1, "100"))).await.unwrap();
            assert_eq!(h.engine.qsize(), 2);

            // The third blocks until the consumer frees a slot
            let handle = h.handle.clone();
            let third = tokio::task::spawn_local(async move {
                handle.execute(submit(limit_buy("O-3", 1, "100"))).await
            });
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            assert!(!third.is_finished());
            assert_eq!(h.engine.qsize(), 2);

            h.engine.start().unwrap();
            third.await.unwrap().unwrap();

            await_condition(|| h.client.recorded_commands().len() == 3).await;

            // Arrival order at the client is identical to submission order
            let recorded: Vec<String> = h
                .client
                .recorded_commands()
                .iter()
                .map(|cmd| match cmd {
                    TradingCommand::SubmitOrder(cmd) => cmd.order.cl_ord_id().to_string(),
                    other => panic!("unexpected command {other}"),
                })
                .collect();
            assert_eq!(recorded, vec!["O-1", "O-2", "O-3"]);

            h.engine.stop().await;
        })
        .await;
}

#[tokio::test]
async fn test_unknown_venue_command_rejected_at_boundary() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let h = harness();

            let order = Order::market(
                ClientOrderId::new("O-1"),
                TestStubs::strategy_id(),
                meridian_model::stubs::security_xbtusd_bitmex(),
                OrderSide::Buy,
                Quantity::from(1),
                UUID4::new(),
                UnixNanos::default(),
            );

            // Synchronous validation failure; nothing is enqueued
            let result = h.handle.execute(submit(order)).await;
            assert!(result.is_err());
            assert_eq!(h.engine.qsize(), 0);
        })
        .await;
}

#[tokio::test]
async fn test_disconnected_client_commands_answered_with_rejection() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let mut h = harness();
            h.client.set_connected(false);

            let order = limit_buy("O-1", 1, "100");
            h.engine.start().unwrap();
            h.handle.execute(submit(order.clone())).await.unwrap();

            await_condition(|| {
                h.database
                    .order(&order.cl_ord_id())
                    .is_some_and(|o| o.state() == OrderState::Denied)
            })
            .await;
            assert!(h.client.recorded_commands().is_empty());

            h.engine.stop().await;
        })
        .await;
}

#[tokio::test]
async fn test_event_lookup_falls_back_to_venue_order_id() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let mut h = harness();
            let order = limit_buy("O-1", 10, "100");

            h.client.script_events(
                order.cl_ord_id(),
                vec![
                    TestStubs::event_order_submitted(&order),
                    TestStubs::event_order_accepted(&order, OrderId::new("V-1")),
                    TestStubs::event_order_working(&order),
                ],
            );

            h.engine.start().unwrap();
            h.handle.execute(submit(order.clone())).await.unwrap();
            await_condition(|| {
                h.database
                    .order(&order.cl_ord_id())
                    .is_some_and(|o| o.state() == OrderState::Working)
            })
            .await;

            // Venue callback knows only its own order ID
            let mut external = limit_buy("O-EXTERNAL", 10, "100");
            external
                .apply(TestStubs::event_order_submitted(&external))
                .unwrap();
            external
                .apply(TestStubs::event_order_accepted(&external, OrderId::new("V-1")))
                .unwrap();
            h.handle
                .process(Event::Order(TestStubs::event_order_cancelled(&external)))
                .await
                .unwrap();

            await_condition(|| {
                h.database
                    .order(&order.cl_ord_id())
                    .is_some_and(|o| o.state() == OrderState::Cancelled)
            })
            .await;

            h.engine.stop().await;
        })
        .await;
}

#[tokio::test]
async fn test_stop_drains_pending_messages_before_exit() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let mut h = harness();
            let order = limit_buy("O-1", 1, "100");

            h.engine.start().unwrap();
            h.handle.execute(submit(order)).await.unwrap();
            h.engine.stop().await;

            // The command enqueued before the sentinel reached the client
            assert_eq!(h.client.recorded_commands().len(), 1);
            assert_eq!(h.engine.state(), ComponentState::Stopped);
        })
        .await;
}

#[tokio::test]
async fn test_kill_cancels_consumer_without_draining() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let mut h = harness();
            h.engine.start().unwrap();
            assert_eq!(h.engine.state(), ComponentState::Running);

            h.engine.kill();

            assert_eq!(h.engine.state(), ComponentState::Stopped);
        })
        .await;
}

#[tokio::test]
async fn test_duplicate_cl_ord_id_submission_preserves_original() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let mut h = harness();
            let order = limit_buy("O-1", 10, "100");

            h.client.script_events(
                order.cl_ord_id(),
                vec![
                    TestStubs::event_order_submitted(&order),
                    TestStubs::event_order_accepted(&order, OrderId::new("V-1")),
                    TestStubs::event_order_working(&order),
                ],
            );

            h.engine.start().unwrap();
            h.handle.execute(submit(order.clone())).await.unwrap();
            await_condition(|| {
                h.database
                    .order(&order.cl_ord_id())
                    .is_some_and(|o| o.state() == OrderState::Working)
            })
            .await;

            // Resubmission under the same client order ID is invalidated
            // without disturbing the stored order
            h.handle.execute(submit(limit_buy("O-1", 5, "99"))).await.unwrap();
            await_condition(|| h.engine.qsize() == 0).await;
            tokio::task::yield_now().await;

            let stored = h.database.order(&order.cl_ord_id()).unwrap();
            assert_eq!(stored.state(), OrderState::Working);
            assert_eq!(stored.quantity(), Quantity::from(10));
            assert_eq!(h.client.recorded_commands().len(), 1);

            h.engine.stop().await;
        })
        .await;
}

#[tokio::test]
async fn test_events_from_one_client_applied_in_emission_order() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let mut h = harness();
            let order = limit_buy("O-1", 10, "100");

            // The full lifecycle is scripted as one emission sequence
            h.client.script_events(
                order.cl_ord_id(),
                vec![
                    TestStubs::event_order_submitted(&order),
                    TestStubs::event_order_accepted(&order, OrderId::new("V-1")),
                    TestStubs::event_order_working(&order),
                    fill_event(&order, "V-1", "E-1", 4, 4, 6, "100"),
                    fill_event(&order, "V-1", "E-2", 6, 10, 0, "101"),
                ],
            );

            h.engine.start().unwrap();
            h.handle.execute(submit(order.clone())).await.unwrap();

            await_condition(|| {
                h.database
                    .order(&order.cl_ord_id())
                    .is_some_and(|o| o.state() == OrderState::Filled)
            })
            .await;

            // Every transition applied in emission order, none skipped
            let stored = h.database.order(&order.cl_ord_id()).unwrap();
            let states: Vec<&str> = stored
                .events()
                .iter()
                .map(meridian_model::events::OrderEvent::type_name)
                .collect();
            assert_eq!(
                states,
                vec![
                    "OrderInitialized",
                    "OrderSubmitted",
                    "OrderAccepted",
                    "OrderWorking",
                    "OrderPartiallyFilled",
                    "OrderFilled",
                ]
            );

            h.engine.stop().await;
        })
        .await;
}
