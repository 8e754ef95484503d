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

//! The core foundation layer for the Meridian trading platform.
//!
//! Provides the low-level building blocks shared by every other crate in the
//! workspace: correlation identifiers, nanosecond timestamps, validated-string
//! correctness checks and a generic parse-memoization cache.

pub mod cache;
pub mod correctness;
pub mod nanos;
pub mod uuid;

pub use crate::{cache::ObjectCache, nanos::UnixNanos, uuid::UUID4};
