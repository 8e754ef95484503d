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

//! Typed identifiers for the trading domain.
//!
//! All identifiers are backed by interned strings so that equality and
//! hashing are pointer comparisons on hot paths.

use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

use meridian_core::correctness::{check_string_contains_none, check_valid_string};
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use crate::enums::{AssetClass, AssetType};

macro_rules! identifier {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ustr);

        impl $name {
            /// Creates a new identifier from `value`.
            ///
            /// # Panics
            ///
            /// Panics if `value` is empty or all whitespace.
            #[must_use]
            pub fn new(value: &str) -> Self {
                check_valid_string(value, stringify!($name)).expect("invalid identifier value");
                Self(Ustr::from(value))
            }

            /// Returns the identifier value as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            /// Returns the inner interned string.
            #[must_use]
            pub const fn inner(&self) -> Ustr {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}('{}')", stringify!($name), self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

identifier!(Symbol, "The ticker symbol for a tradable instrument.");
identifier!(Venue, "A trading venue; the namespace for venue-assigned order IDs.");
identifier!(
    ClientOrderId,
    "A strategy-assigned order identifier, unique within a process lifetime."
);
identifier!(OrderId, "A venue-assigned order identifier, bound on acceptance.");
identifier!(ExecutionId, "A venue-assigned identifier for a single fill.");
identifier!(TradeMatchId, "A venue-assigned trade match identifier.");
identifier!(PositionId, "An identifier for a position.");

/// An identifier composed of a name and an order-tag suffix, joined by `-`.
///
/// Shared shape for trader, strategy and account identifiers, e.g.
/// `TESTER-000`.
macro_rules! tagged_identifier {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ustr);

        impl $name {
            /// Creates a new identifier from a `name` and `tag`.
            ///
            /// # Panics
            ///
            /// Panics if either part is empty, all whitespace, or contains `-`.
            #[must_use]
            pub fn new(name: &str, tag: &str) -> Self {
                check_valid_string(name, "name").expect("invalid identifier name");
                check_valid_string(tag, "tag").expect("invalid identifier tag");
                check_string_contains_none(name, &['-'], "name")
                    .expect("identifier name must not contain '-'");
                Self(Ustr::from(&format!("{name}-{tag}")))
            }

            /// Returns the identifier value as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            /// Returns the name portion (before the last `-`).
            #[must_use]
            pub fn name(&self) -> &str {
                self.as_str()
                    .rsplit_once('-')
                    .map_or(self.as_str(), |(name, _)| name)
            }

            /// Returns the tag portion (after the last `-`).
            #[must_use]
            pub fn tag(&self) -> &str {
                self.as_str()
                    .rsplit_once('-')
                    .map_or(self.as_str(), |(_, tag)| tag)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}('{}')", stringify!($name), self.0)
            }
        }

        impl FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.rsplit_once('-') {
                    Some((name, tag)) => Ok(Self::new(name, tag)),
                    None => anyhow::bail!(
                        "invalid {}: expected '<name>-<tag>', was '{s}'",
                        stringify!($name)
                    ),
                }
            }
        }
    };
}

tagged_identifier!(TraderId, "The identifier for a trader, e.g. `TESTER-000`.");
tagged_identifier!(
    StrategyId,
    "The identifier for a strategy instance, e.g. `SCALPER-001`."
);
tagged_identifier!(
    AccountId,
    "The identifier for a venue account: issuer and account number, e.g. `SIM-000`."
);

impl AccountId {
    /// Returns the venue implied by the account issuer.
    #[must_use]
    pub fn issuer_as_venue(&self) -> Venue {
        Venue::new(self.name())
    }
}

/// The globally unique identity of a tradable instrument.
///
/// Equality and hashing are defined over all four components.
#[derive(Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Security {
    /// The ticker symbol.
    pub symbol: Symbol,
    /// The venue the instrument trades on.
    pub venue: Venue,
    /// The asset class.
    pub asset_class: AssetClass,
    /// The contract type.
    pub asset_type: AssetType,
}

impl Security {
    /// Creates a new [`Security`].
    #[must_use]
    pub const fn new(
        symbol: Symbol,
        venue: Venue,
        asset_class: AssetClass,
        asset_type: AssetType,
    ) -> Self {
        Self {
            symbol,
            venue,
            asset_class,
            asset_type,
        }
    }

    /// Returns the serializable form `"<symbol>.<venue>,<asset_class>,<asset_type>"`.
    #[must_use]
    pub fn to_serializable_str(&self) -> String {
        format!(
            "{}.{},{},{}",
            self.symbol, self.venue, self.asset_class, self.asset_type
        )
    }

    /// Parses a [`Security`] from its serializable form.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not three comma-separated fields
    /// with a `<symbol>.<venue>` head, or if an enum field is unknown.
    pub fn from_serializable_str(value: &str) -> anyhow::Result<Self> {
        check_valid_string(value, "value")?;

        let parts: Vec<&str> = value.split(',').collect();
        if parts.len() != 3 {
            anyhow::bail!(
                "invalid Security string: expected 3 comma-separated fields, was '{value}'"
            );
        }

        let (symbol, venue) = parts[0].rsplit_once('.').ok_or_else(|| {
            anyhow::anyhow!("invalid Security string: expected '<symbol>.<venue>', was '{value}'")
        })?;

        Ok(Self {
            symbol: Symbol::new(symbol),
            venue: Venue::new(venue),
            asset_class: AssetClass::from_str(parts[1])
                .map_err(|e| anyhow::anyhow!("invalid asset class '{}': {e}", parts[1]))?,
            asset_type: AssetType::from_str(parts[2])
                .map_err(|e| anyhow::anyhow!("invalid asset type '{}': {e}", parts[2]))?,
        })
    }
}

impl Display for Security {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.symbol, self.venue)
    }
}

impl Debug for Security {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}('{}.{},{},{}')",
            stringify!(Security),
            self.symbol,
            self.venue,
            self.asset_class,
            self.asset_type
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn security_audusd() -> Security {
        Security::new(
            Symbol::new("AUD/USD"),
            Venue::new("SIM"),
            AssetClass::Fx,
            AssetType::Spot,
        )
    }

    #[rstest]
    fn test_security_display() {
        assert_eq!(security_audusd().to_string(), "AUD/USD.SIM");
    }

    #[rstest]
    fn test_security_serializable_round_trip() {
        let security = security_audusd();

        let serialized = security.to_serializable_str();
        let parsed = Security::from_serializable_str(&serialized).unwrap();

        assert_eq!(serialized, "AUD/USD.SIM,FX,SPOT");
        assert_eq!(parsed, security);
    }

    #[rstest]
    #[case("AUD/USD.SIM")]
    #[case("AUD/USD.SIM,FX")]
    #[case("AUD/USD.SIM,FX,SPOT,EXTRA")]
    #[case("AUDUSD,FX,SPOT")]
    #[case("AUD/USD.SIM,WOOD,SPOT")]
    fn test_security_from_serializable_str_rejects(#[case] value: &str) {
        assert!(Security::from_serializable_str(value).is_err());
    }

    #[rstest]
    fn test_security_equality_over_all_components() {
        let spot = security_audusd();
        let swap = Security::new(
            Symbol::new("AUD/USD"),
            Venue::new("SIM"),
            AssetClass::Fx,
            AssetType::Swap,
        );

        assert_ne!(spot, swap);
    }

    #[rstest]
    fn test_security_parse_memoized() {
        let mut cache =
            meridian_core::ObjectCache::new(Security::from_serializable_str);

        let security = cache.get("AUD/USD.SIM,FX,SPOT").unwrap();

        assert_eq!(security.to_serializable_str(), "AUD/USD.SIM,FX,SPOT");
        assert_eq!(cache.get("AUD/USD.SIM,FX,SPOT").unwrap(), security);
        assert_eq!(cache.keys().len(), 1);
    }

    #[rstest]
    fn test_tagged_identifier_parts() {
        let strategy_id = StrategyId::new("SCALPER", "001");

        assert_eq!(strategy_id.to_string(), "SCALPER-001");
        assert_eq!(strategy_id.name(), "SCALPER");
        assert_eq!(strategy_id.tag(), "001");
    }

    #[rstest]
    fn test_account_id_issuer_as_venue() {
        let account_id = AccountId::new("SIM", "000");

        assert_eq!(account_id.issuer_as_venue(), Venue::new("SIM"));
    }

    #[rstest]
    #[should_panic]
    fn test_identifier_rejects_empty_value() {
        let _ = ClientOrderId::new("");
    }
}
