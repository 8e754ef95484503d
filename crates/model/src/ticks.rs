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

//! Market ticks and their stable wire form.
//!
//! The wire form is the security id followed by exactly five comma-separated
//! value fields; parsing is strict and rejects anything else.

use std::{
    fmt::Display,
    str::FromStr,
};

use meridian_core::UnixNanos;
use thiserror::Error;

use crate::{
    enums::OrderSide,
    identifiers::{Security, TradeMatchId},
    types::{Price, Quantity},
};

/// Errors produced when parsing a tick from its wire form.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TickParseError {
    /// The value payload did not contain exactly five fields.
    #[error("expected 5 comma-separated fields, was {was} in '{input}'")]
    FieldCount {
        /// The field count found.
        was: usize,
        /// The offending input.
        input: String,
    },

    /// A field failed to parse as its expected type.
    #[error("invalid {field} field '{value}'")]
    InvalidField {
        /// The field name.
        field: &'static str,
        /// The offending value.
        value: String,
    },
}

fn split_five(values: &str) -> Result<[&str; 5], TickParseError> {
    let parts: Vec<&str> = values.split(',').collect();
    match <[&str; 5]>::try_from(parts.as_slice()) {
        Ok(fields) => Ok(fields),
        Err(_) => Err(TickParseError::FieldCount {
            was: values.split(',').count(),
            input: values.to_string(),
        }),
    }
}

fn parse_field<T: FromStr>(value: &str, field: &'static str) -> Result<T, TickParseError> {
    value.parse().map_err(|_| TickParseError::InvalidField {
        field,
        value: value.to_string(),
    })
}

/// A top-of-book quote for a security at a point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteTick {
    /// The security quoted.
    pub security: Security,
    /// The best bid price.
    pub bid: Price,
    /// The best ask price.
    pub ask: Price,
    /// The size at the best bid.
    pub bid_size: Quantity,
    /// The size at the best ask.
    pub ask_size: Quantity,
    /// When the quote occurred.
    pub timestamp: UnixNanos,
}

impl QuoteTick {
    /// Returns the wire value payload
    /// `"<bid>,<ask>,<bid_size>,<ask_size>,<unix_ms>"`.
    #[must_use]
    pub fn to_serializable_str(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.bid,
            self.ask,
            self.bid_size,
            self.ask_size,
            self.timestamp.as_millis()
        )
    }

    /// Parses a [`QuoteTick`] for `security` from its wire value payload.
    ///
    /// # Errors
    ///
    /// Returns an error unless `values` is exactly five well-formed
    /// comma-separated fields.
    pub fn from_serializable_str(
        security: Security,
        values: &str,
    ) -> Result<Self, TickParseError> {
        let [bid, ask, bid_size, ask_size, unix_ms] = split_five(values)?;

        Ok(Self {
            security,
            bid: parse_field(bid, "bid")?,
            ask: parse_field(ask, "ask")?,
            bid_size: parse_field(bid_size, "bid_size")?,
            ask_size: parse_field(ask_size, "ask_size")?,
            timestamp: UnixNanos::from_millis(parse_field(unix_ms, "unix_ms")?),
        })
    }
}

impl Display for QuoteTick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.security, self.to_serializable_str())
    }
}

/// A single trade print for a security.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TradeTick {
    /// The security traded.
    pub security: Security,
    /// The traded price.
    pub price: Price,
    /// The traded size.
    pub size: Quantity,
    /// The aggressor side of the trade.
    pub side: OrderSide,
    /// The venue trade match identifier.
    pub match_id: TradeMatchId,
    /// When the trade occurred.
    pub timestamp: UnixNanos,
}

impl TradeTick {
    /// Returns the wire value payload
    /// `"<price>,<size>,<side>,<match_id>,<unix_ms>"`.
    #[must_use]
    pub fn to_serializable_str(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.price,
            self.size,
            self.side,
            self.match_id,
            self.timestamp.as_millis()
        )
    }

    /// Parses a [`TradeTick`] for `security` from its wire value payload.
    ///
    /// # Errors
    ///
    /// Returns an error unless `values` is exactly five well-formed
    /// comma-separated fields with side ∈ {BUY, SELL}.
    pub fn from_serializable_str(
        security: Security,
        values: &str,
    ) -> Result<Self, TickParseError> {
        let [price, size, side, match_id, unix_ms] = split_five(values)?;

        if match_id.trim().is_empty() {
            return Err(TickParseError::InvalidField {
                field: "match_id",
                value: match_id.to_string(),
            });
        }

        Ok(Self {
            security,
            price: parse_field(price, "price")?,
            size: parse_field(size, "size")?,
            side: OrderSide::from_str(side).map_err(|_| TickParseError::InvalidField {
                field: "side",
                value: side.to_string(),
            })?,
            match_id: TradeMatchId::new(match_id),
            timestamp: UnixNanos::from_millis(parse_field(unix_ms, "unix_ms")?),
        })
    }
}

impl Display for TradeTick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.security, self.to_serializable_str())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::stubs::security_audusd;

    fn quote_tick() -> QuoteTick {
        QuoteTick {
            security: security_audusd(),
            bid: Price::from_str("1.00001").unwrap(),
            ask: Price::from_str("1.00003").unwrap(),
            bid_size: Quantity::from(1),
            ask_size: Quantity::from(1),
            timestamp: UnixNanos::from_millis(1_610_000_000_000),
        }
    }

    fn trade_tick() -> TradeTick {
        TradeTick {
            security: security_audusd(),
            price: Price::from_str("1.00001").unwrap(),
            size: Quantity::from(100_000),
            side: OrderSide::Buy,
            match_id: TradeMatchId::new("123456"),
            timestamp: UnixNanos::from_millis(1_610_000_000_000),
        }
    }

    #[rstest]
    fn test_quote_tick_round_trip() {
        let tick = quote_tick();

        let serialized = tick.to_serializable_str();
        let parsed = QuoteTick::from_serializable_str(tick.security, &serialized).unwrap();

        assert_eq!(serialized, "1.00001,1.00003,1,1,1610000000000");
        assert_eq!(parsed, tick);
    }

    #[rstest]
    fn test_trade_tick_round_trip() {
        let tick = trade_tick();

        let serialized = tick.to_serializable_str();
        let parsed = TradeTick::from_serializable_str(tick.security, &serialized).unwrap();

        assert_eq!(serialized, "1.00001,100000,BUY,123456,1610000000000");
        assert_eq!(parsed, tick);
    }

    #[rstest]
    fn test_tick_display_prepends_security() {
        assert_eq!(
            trade_tick().to_string(),
            "AUD/USD.SIM,1.00001,100000,BUY,123456,1610000000000"
        );
    }

    #[rstest]
    #[case("1.0,1.1,1,1")]
    #[case("1.0,1.1,1,1,123,extra")]
    #[case("")]
    fn test_quote_parse_rejects_wrong_field_count(#[case] values: &str) {
        let result = QuoteTick::from_serializable_str(security_audusd(), values);

        assert!(matches!(result, Err(TickParseError::FieldCount { .. })));
    }

    #[rstest]
    fn test_trade_parse_rejects_unknown_side() {
        let result =
            TradeTick::from_serializable_str(security_audusd(), "1.0,100,HOLD,123456,1610000000000");

        assert_eq!(
            result,
            Err(TickParseError::InvalidField {
                field: "side",
                value: "HOLD".to_string()
            })
        );
    }

    #[rstest]
    fn test_trade_parse_rejects_empty_match_id() {
        let result =
            TradeTick::from_serializable_str(security_audusd(), "1.0,100,BUY,,1610000000000");

        assert!(matches!(
            result,
            Err(TickParseError::InvalidField {
                field: "match_id",
                ..
            })
        ));
    }

    #[rstest]
    fn test_quote_parse_rejects_malformed_price() {
        let result =
            QuoteTick::from_serializable_str(security_audusd(), "abc,1.1,1,1,1610000000000");

        assert!(matches!(
            result,
            Err(TickParseError::InvalidField { field: "bid", .. })
        ));
    }
}
