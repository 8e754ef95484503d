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

//! The clock capability, injected everywhere time is read.
//!
//! There is no process-global time source: live components share a
//! [`LiveClock`], backtests a [`TestClock`] which advances only on explicit
//! tick.

use chrono::{DateTime, Utc};
use meridian_core::UnixNanos;

/// An injected source of time.
pub trait Clock {
    /// Returns the current time as UNIX nanoseconds.
    fn timestamp_ns(&self) -> UnixNanos;

    /// Returns the current time as a UTC datetime.
    fn utc_now(&self) -> DateTime<Utc> {
        self.timestamp_ns().to_datetime_utc()
    }
}

/// A monotonic real-time clock for live trading.
#[derive(Clone, Debug, Default)]
pub struct LiveClock;

impl LiveClock {
    /// Creates a new [`LiveClock`].
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for LiveClock {
    fn timestamp_ns(&self) -> UnixNanos {
        UnixNanos::from(Utc::now())
    }
}

/// A virtual clock for backtests and tests, advancing only on explicit tick.
#[derive(Clone, Debug, Default)]
pub struct TestClock {
    time: UnixNanos,
}

impl TestClock {
    /// Creates a new [`TestClock`] at the UNIX epoch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the clock to the given time.
    pub fn set_time(&mut self, time: UnixNanos) {
        self.time = time;
    }

    /// Advances the clock by the given nanosecond count.
    pub fn advance_time(&mut self, nanos: u64) {
        self.time = UnixNanos::new(self.time.as_u64() + nanos);
    }
}

impl Clock for TestClock {
    fn timestamp_ns(&self) -> UnixNanos {
        self.time
    }
}
