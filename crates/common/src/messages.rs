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

//! Trading command messages and the execution engine message envelope.

use std::fmt::Display;

use meridian_core::{UUID4, UnixNanos};
use meridian_model::{
    events::Event,
    identifiers::{ClientOrderId, PositionId, Security, StrategyId, TraderId, Venue},
    orders::Order,
    types::{Price, Quantity},
};

/// A command to submit a single order to its venue.
#[derive(Clone, Debug)]
pub struct SubmitOrder {
    /// The trader submitting the command.
    pub trader_id: TraderId,
    /// The strategy which created the order.
    pub strategy_id: StrategyId,
    /// The position the order is intended for, if known.
    pub position_id: Option<PositionId>,
    /// The order to submit.
    pub order: Order,
    /// The command correlation identifier.
    pub command_id: UUID4,
    /// When the command was created.
    pub timestamp: UnixNanos,
}

/// An entry order bracketed by protective stop-loss and take-profit orders.
#[derive(Clone, Debug)]
pub struct BracketOrder {
    /// The entry order.
    pub entry: Order,
    /// The protective stop-loss order.
    pub stop_loss: Order,
    /// The profit target order.
    pub take_profit: Order,
}

/// A command to submit a bracket order atomically.
#[derive(Clone, Debug)]
pub struct SubmitBracketOrder {
    /// The trader submitting the command.
    pub trader_id: TraderId,
    /// The strategy which created the bracket.
    pub strategy_id: StrategyId,
    /// The bracket to submit.
    pub bracket: BracketOrder,
    /// The command correlation identifier.
    pub command_id: UUID4,
    /// When the command was created.
    pub timestamp: UnixNanos,
}

/// A command to cancel a working order.
#[derive(Clone, Debug)]
pub struct CancelOrder {
    /// The trader submitting the command.
    pub trader_id: TraderId,
    /// The strategy which owns the order.
    pub strategy_id: StrategyId,
    /// The security the order trades (routes the command).
    pub security: Security,
    /// The order to cancel.
    pub cl_ord_id: ClientOrderId,
    /// The command correlation identifier.
    pub command_id: UUID4,
    /// When the command was created.
    pub timestamp: UnixNanos,
}

/// A command to modify a working order's quantity and/or price.
///
/// Whether the venue preserves queue position is venue-specific and not
/// prescribed here.
#[derive(Clone, Debug)]
pub struct ModifyOrder {
    /// The trader submitting the command.
    pub trader_id: TraderId,
    /// The strategy which owns the order.
    pub strategy_id: StrategyId,
    /// The security the order trades (routes the command).
    pub security: Security,
    /// The order to modify.
    pub cl_ord_id: ClientOrderId,
    /// The new quantity, if changing.
    pub quantity: Option<Quantity>,
    /// The new price, if changing.
    pub price: Option<Price>,
    /// The command correlation identifier.
    pub command_id: UUID4,
    /// When the command was created.
    pub timestamp: UnixNanos,
}

/// The tagged union of all trading commands accepted by the execution engine.
#[derive(Clone, Debug)]
pub enum TradingCommand {
    /// Submit a single order.
    SubmitOrder(SubmitOrder),
    /// Submit a bracket order.
    SubmitBracketOrder(SubmitBracketOrder),
    /// Cancel a working order.
    CancelOrder(CancelOrder),
    /// Modify a working order.
    ModifyOrder(ModifyOrder),
}

impl TradingCommand {
    /// Returns the security the command applies to.
    #[must_use]
    pub fn security(&self) -> Security {
        match self {
            Self::SubmitOrder(cmd) => cmd.order.security(),
            Self::SubmitBracketOrder(cmd) => cmd.bracket.entry.security(),
            Self::CancelOrder(cmd) => cmd.security,
            Self::ModifyOrder(cmd) => cmd.security,
        }
    }

    /// Returns the venue the command routes to.
    #[must_use]
    pub fn venue(&self) -> Venue {
        self.security().venue
    }

    /// Returns the command correlation identifier.
    #[must_use]
    pub const fn command_id(&self) -> UUID4 {
        match self {
            Self::SubmitOrder(cmd) => cmd.command_id,
            Self::SubmitBracketOrder(cmd) => cmd.command_id,
            Self::CancelOrder(cmd) => cmd.command_id,
            Self::ModifyOrder(cmd) => cmd.command_id,
        }
    }

    /// Returns the command type name, e.g. `SubmitOrder`.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::SubmitOrder(_) => "SubmitOrder",
            Self::SubmitBracketOrder(_) => "SubmitBracketOrder",
            Self::CancelOrder(_) => "CancelOrder",
            Self::ModifyOrder(_) => "ModifyOrder",
        }
    }
}

impl Display for TradingCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubmitOrder(cmd) => write!(
                f,
                "SubmitOrder(cl_ord_id={}, command_id={})",
                cmd.order.cl_ord_id(),
                cmd.command_id
            ),
            Self::SubmitBracketOrder(cmd) => write!(
                f,
                "SubmitBracketOrder(entry={}, command_id={})",
                cmd.bracket.entry.cl_ord_id(),
                cmd.command_id
            ),
            Self::CancelOrder(cmd) => write!(
                f,
                "CancelOrder(cl_ord_id={}, command_id={})",
                cmd.cl_ord_id, cmd.command_id
            ),
            Self::ModifyOrder(cmd) => write!(
                f,
                "ModifyOrder(cl_ord_id={}, command_id={})",
                cmd.cl_ord_id, cmd.command_id
            ),
        }
    }
}

/// The envelope flowing through the execution engine's single FIFO queue.
///
/// Commands and events deliberately share one queue so their relative
/// enqueue order is preserved. `Shutdown` is the consumer wake sentinel;
/// only the engine itself may enqueue it, which the typed `execute`/`process`
/// boundary enforces.
#[derive(Clone, Debug)]
pub enum EngineMessage {
    /// A trading command bound for an execution client.
    Command(TradingCommand),
    /// An execution event bound for the order state machine and portfolio.
    Event(Event),
    /// The consumer shutdown sentinel.
    Shutdown,
}

impl Display for EngineMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command(cmd) => write!(f, "{cmd}"),
            Self::Event(event) => write!(f, "{event}"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}
