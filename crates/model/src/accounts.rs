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

//! Venue account state, projected from `AccountState` events.

use std::fmt::{Debug, Display};

use ahash::AHashMap;
use meridian_core::UUID4;

use crate::{
    events::AccountState,
    identifiers::AccountId,
    types::{Currency, Money},
};

/// The balances held in one currency on an account.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AccountBalance {
    /// The balance currency.
    pub currency: Currency,
    /// The total balance.
    pub total: Money,
    /// The balance locked as margin or held for open orders.
    pub locked: Money,
    /// The balance free for trading.
    pub free: Money,
}

/// A venue account, keyed by its issuing venue.
#[derive(Clone)]
pub struct Account {
    /// The account identifier.
    pub id: AccountId,
    balances: AHashMap<Currency, AccountBalance>,
    margin_call_status: Option<String>,
    last_event_id: Option<UUID4>,
    event_count: usize,
}

impl Account {
    /// Creates a new [`Account`] from its first state event.
    #[must_use]
    pub fn new(event: AccountState) -> Self {
        let mut account = Self {
            id: event.account_id,
            balances: AHashMap::new(),
            margin_call_status: None,
            last_event_id: None,
            event_count: 0,
        };
        account.apply(event);
        account
    }

    /// Applies an account state event, replacing balances per currency.
    pub fn apply(&mut self, event: AccountState) {
        for money in &event.balances {
            let free = event
                .balances_free
                .iter()
                .find(|m| m.currency == money.currency)
                .copied()
                .unwrap_or_else(|| Money::zero(money.currency));
            let locked = event
                .balances_locked
                .iter()
                .find(|m| m.currency == money.currency)
                .copied()
                .unwrap_or_else(|| Money::zero(money.currency));

            self.balances.insert(
                money.currency,
                AccountBalance {
                    currency: money.currency,
                    total: *money,
                    locked,
                    free,
                },
            );
        }

        self.margin_call_status = event.info.get("margin_call_status").cloned();
        self.last_event_id = Some(event.event_id);
        self.event_count += 1;
    }

    /// Returns the balance held in `currency`, if any.
    #[must_use]
    pub fn balance(&self, currency: Currency) -> Option<AccountBalance> {
        self.balances.get(&currency).copied()
    }

    /// Returns all currency balances.
    #[must_use]
    pub fn balances(&self) -> Vec<AccountBalance> {
        self.balances.values().copied().collect()
    }

    /// Returns the venue-reported margin call status, if any.
    #[must_use]
    pub fn margin_call_status(&self) -> Option<&str> {
        self.margin_call_status.as_deref()
    }

    /// Returns the identifier of the last applied event.
    #[must_use]
    pub const fn last_event_id(&self) -> Option<UUID4> {
        self.last_event_id
    }

    /// Returns the number of state events applied.
    #[must_use]
    pub const fn event_count(&self) -> usize {
        self.event_count
    }
}

impl Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Account(id={})", self.id)
    }
}

impl Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(Account))
            .field("id", &self.id)
            .field("event_count", &self.event_count)
            .finish()
    }
}
