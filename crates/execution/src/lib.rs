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

//! The execution layer for the Meridian trading platform.
//!
//! The execution engine's primary responsibility is to orchestrate
//! interactions between the registered `ExecutionClient` instances and the
//! rest of the platform: routing trading commands to venue clients over a
//! single bounded FIFO queue, driving the order state machine from execution
//! events through the authoritative execution database, forwarding events to
//! the portfolio projection, and reconciling cached order state against
//! venue-reported state on startup or recovery.

pub mod client;
pub mod database;
pub mod engine;
pub mod reconciliation;
pub mod stubs;
