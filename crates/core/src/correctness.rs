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

//! Condition checks for function and constructor arguments.
//!
//! These checks are applied at domain-object boundaries so that malformed
//! values are surfaced synchronously as validation errors and never propagate
//! into engine state.

use anyhow::bail;

/// Checks the string `value` is non-empty and contains no whitespace-only content.
///
/// # Errors
///
/// Returns an error if `value` is empty or all whitespace.
pub fn check_valid_string(value: &str, param: &str) -> anyhow::Result<()> {
    if value.is_empty() {
        bail!("invalid string for '{param}': was empty");
    }
    if value.chars().all(char::is_whitespace) {
        bail!("invalid string for '{param}': was all whitespace");
    }
    Ok(())
}

/// Checks the string `value` contains none of the characters in `invalid_chars`.
///
/// # Errors
///
/// Returns an error if `value` contains any of the characters.
pub fn check_string_contains_none(
    value: &str,
    invalid_chars: &[char],
    param: &str,
) -> anyhow::Result<()> {
    for c in invalid_chars {
        if value.contains(*c) {
            bail!("invalid string for '{param}': contained invalid character '{c}' in '{value}'");
        }
    }
    Ok(())
}

/// Checks the `predicate` holds.
///
/// # Errors
///
/// Returns an error with `fail_msg` if the predicate is false.
pub fn check_predicate_true(predicate: bool, fail_msg: &str) -> anyhow::Result<()> {
    if !predicate {
        bail!("{fail_msg}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("AUD/USD")]
    #[case("O-19700101-000-001-1")]
    fn test_check_valid_string_accepts(#[case] value: &str) {
        assert!(check_valid_string(value, "value").is_ok());
    }

    #[rstest]
    #[case("")]
    #[case(" ")]
    #[case("   ")]
    fn test_check_valid_string_rejects(#[case] value: &str) {
        assert!(check_valid_string(value, "value").is_err());
    }

    #[rstest]
    fn test_check_string_contains_none() {
        assert!(check_string_contains_none("BTC/USDT", &[','], "symbol").is_ok());
        assert!(check_string_contains_none("BTC,USDT", &[','], "symbol").is_err());
    }

    #[rstest]
    fn test_check_predicate_true() {
        assert!(check_predicate_true(true, "unused").is_ok());
        assert!(check_predicate_true(false, "failed").is_err());
    }
}
