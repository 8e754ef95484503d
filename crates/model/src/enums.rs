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

//! Enumerations for the trading domain model.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// The broad asset class of a tradable instrument.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    PartialEq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetClass {
    /// Foreign exchange.
    Fx,
    /// Equities.
    Equity,
    /// Commodities.
    Commodity,
    /// Fixed income.
    Bond,
    /// Cryptocurrencies.
    Crypto,
    /// Index products.
    Index,
}

/// The contract type of a tradable instrument.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    PartialEq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    /// Spot market.
    Spot,
    /// Perpetual swap.
    Swap,
    /// Futures contract.
    Future,
    /// Forward contract.
    Forward,
    /// Contract for difference.
    Cfd,
    /// Options contract.
    Option,
}

/// The side of an order or fill.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    PartialEq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    /// Buy side.
    Buy,
    /// Sell side.
    Sell,
}

impl OrderSide {
    /// Returns the opposing side.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// The type of an order.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    PartialEq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Execute immediately at best available price.
    Market,
    /// Execute at the given price or better.
    Limit,
    /// Becomes a market order once the stop price trades.
    Stop,
    /// Becomes a limit order once the trigger price trades.
    StopLimit,
}

/// The lifecycle state of an order.
///
/// Terminal states are `Invalid`, `Denied`, `Rejected`, `Cancelled`,
/// `Expired` and `Filled`.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    PartialEq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    /// Created locally, not yet sent to a venue.
    Initialized,
    /// Failed an integrity check (terminal).
    Invalid,
    /// Denied locally before reaching the venue (terminal).
    Denied,
    /// Sent to the venue, awaiting acknowledgement.
    Submitted,
    /// Rejected by the venue (terminal).
    Rejected,
    /// Acknowledged by the venue, venue order ID bound.
    Accepted,
    /// Resting in the venue book.
    Working,
    /// Cancelled at the venue (terminal).
    Cancelled,
    /// Expired at the venue (terminal).
    Expired,
    /// Stop-limit trigger price traded; now behaves as a limit order.
    Triggered,
    /// Partially executed; re-entrant while fills accrue.
    PartiallyFilled,
    /// Completely executed (terminal).
    Filled,
}

impl OrderState {
    /// Returns true if the state is terminal.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(
            self,
            Self::Invalid
                | Self::Denied
                | Self::Rejected
                | Self::Cancelled
                | Self::Expired
                | Self::Filled
        )
    }
}

/// The time-in-force instruction for an order.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    PartialEq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    /// Good until cancelled.
    Gtc,
    /// Good until the session close.
    Day,
    /// Immediate or cancel.
    Ioc,
    /// Fill or kill.
    Fok,
    /// Good until the specified expire time.
    Gtd,
}

/// The purpose an order serves within a strategy.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    PartialEq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderPurpose {
    /// No specific purpose assigned.
    #[default]
    None,
    /// Position entry.
    Entry,
    /// Position exit.
    Exit,
    /// Protective stop-loss.
    StopLoss,
    /// Profit target.
    TakeProfit,
}

/// The liquidity side of a fill.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    PartialEq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiquiditySide {
    /// Provided liquidity (resting order).
    Maker,
    /// Took liquidity (aggressing order).
    Taker,
}

/// The market side of a position.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    PartialEq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionSide {
    /// No net exposure.
    Flat,
    /// Net long.
    Long,
    /// Net short.
    Short,
}
