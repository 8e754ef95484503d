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

//! A generic memoization cache for parsed objects.

use std::collections::HashMap;

use crate::correctness::check_valid_string;

/// Caches the result of a fallible string parser, keyed by the input string.
///
/// Identifier types which are parsed repeatedly from the same wire strings
/// (for example `Security` keys on every tick) are memoized here to avoid
/// re-parsing hot paths.
pub struct ObjectCache<T> {
    cache: HashMap<String, T>,
    parser: fn(&str) -> anyhow::Result<T>,
}

impl<T: Clone> ObjectCache<T> {
    /// Creates a new empty [`ObjectCache`] around the given parser.
    #[must_use]
    pub fn new(parser: fn(&str) -> anyhow::Result<T>) -> Self {
        Self {
            cache: HashMap::new(),
            parser,
        }
    }

    /// Returns the parsed object for `key`, parsing and caching on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` is empty/whitespace or if parsing fails.
    pub fn get(&mut self, key: &str) -> anyhow::Result<T> {
        check_valid_string(key, "key")?;

        if let Some(value) = self.cache.get(key) {
            return Ok(value.clone());
        }

        let parsed = (self.parser)(key)?;
        self.cache.insert(key.to_string(), parsed.clone());
        Ok(parsed)
    }

    /// Returns the currently cached keys.
    #[must_use]
    pub fn keys(&self) -> Vec<&String> {
        self.cache.keys().collect()
    }

    /// Clears all cached objects.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl<T> std::fmt::Debug for ObjectCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(ObjectCache))
            .field("len", &self.cache.len())
            .finish()
    }
}
