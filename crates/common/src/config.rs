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

//! Execution engine configuration.
//!
//! Only the recognized keys deserialize; unknown keys are rejected.

use serde::Deserialize;

const fn default_qsize() -> usize {
    10_000
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_poll_interval_ms() -> u64 {
    1
}

/// Configuration for the state reconciliation protocol.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReconciliationConfig {
    /// Overall deadline for a reconciliation run, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sleep between resolution passes, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Configuration for the execution engine.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExecutionEngineConfig {
    /// The bounded capacity of the engine's command/event queue.
    #[serde(default = "default_qsize")]
    pub qsize: usize,
    /// The reconciliation protocol settings.
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
}

impl Default for ExecutionEngineConfig {
    fn default() -> Self {
        Self {
            qsize: default_qsize(),
            reconciliation: ReconciliationConfig::default(),
        }
    }
}
