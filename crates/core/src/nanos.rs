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

//! A UNIX epoch timestamp in nanoseconds.

use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Represents a timestamp as UNIX nanoseconds (UTC).
#[derive(
    Copy, Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnixNanos(u64);

impl UnixNanos {
    /// Creates a new [`UnixNanos`] from the given raw nanosecond count.
    #[must_use]
    pub const fn new(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Creates a new [`UnixNanos`] from UNIX milliseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis * 1_000_000)
    }

    /// Returns the raw nanosecond count.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the timestamp truncated to whole UNIX milliseconds.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// Returns the timestamp as a UTC datetime.
    ///
    /// # Panics
    ///
    /// Panics if the value is out of range for [`DateTime<Utc>`] (year 2262+).
    #[must_use]
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_nanos(self.0 as i64)
    }
}

impl From<DateTime<Utc>> for UnixNanos {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value.timestamp_nanos_opt().unwrap_or_default() as u64)
    }
}

impl From<u64> for UnixNanos {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for UnixNanos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_millis_round_trip() {
        let ts = UnixNanos::from_millis(1_610_000_000_123);

        assert_eq!(ts.as_millis(), 1_610_000_000_123);
        assert_eq!(ts.as_u64(), 1_610_000_000_123_000_000);
    }

    #[rstest]
    fn test_datetime_conversion() {
        let dt = Utc.with_ymd_and_hms(2021, 1, 7, 7, 33, 20).unwrap();

        let ts = UnixNanos::from(dt);

        assert_eq!(ts.to_datetime_utc(), dt);
    }

    #[rstest]
    fn test_default_is_unix_epoch() {
        assert_eq!(UnixNanos::default().as_u64(), 0);
    }
}
