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

//! The domain model for the Meridian trading platform.
//!
//! Defines the typed identifiers, fixed-precision value objects, instrument
//! definitions, the order entity with its lifecycle state machine, the event
//! and tick families, positions and accounts. All value accounting is exact
//! decimal arithmetic; floats appear only in serialization hints and logs.

pub mod accounts;
pub mod enums;
pub mod events;
pub mod identifiers;
pub mod instruments;
pub mod orders;
pub mod position;
pub mod ticks;
pub mod types;

#[cfg(any(test, feature = "stubs"))]
pub mod stubs;
