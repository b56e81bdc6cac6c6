// Copyright (C) 2026  Apex Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Label sets and label key ordering
//!
//! The backend declares label keys once, in a fixed order, and expects values
//! in that same order on every mutation. A [`Labels`] map has no stable
//! order, so values are always looked up by key name against the order that
//! was pinned when the metric was first registered. Positional values given
//! under a different key order are rearranged by [`align_values`].

use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::{MetricsError, MetricsResult};

/// Unordered set of label key/value pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels(HashMap<String, String>);

impl Labels {
    /// Create an empty label set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a label
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Label keys in the map's iteration order.
    ///
    /// The order is only meaningful for the call that registers a metric.
    pub fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    /// Resolve values for `keys`, in the order of `keys`.
    ///
    /// # Errors
    /// [`MetricsError::LabelCardinalityMismatch`] if the set holds a different
    /// number of labels, [`MetricsError::MissingLabel`] if a key is absent.
    pub fn values_for<'a>(&'a self, metric: &str, keys: &[String]) -> MetricsResult<Vec<&'a str>> {
        if keys.len() != self.0.len() {
            return Err(MetricsError::LabelCardinalityMismatch {
                name: metric.to_string(),
                expected: keys.len(),
                got: self.0.len(),
            });
        }

        keys.iter()
            .map(|key| {
                self.0
                    .get(key)
                    .map(String::as_str)
                    .ok_or_else(|| MetricsError::MissingLabel {
                        name: metric.to_string(),
                        key: key.clone(),
                    })
            })
            .collect()
    }

    /// Look up a single label value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.0
    }
}

impl From<HashMap<String, String>> for Labels {
    fn from(map: HashMap<String, String>) -> Self {
        Labels(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Labels {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Labels(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Decode a flat `key, value, key, value` list into a label set.
///
/// # Errors
/// [`MetricsError::OddLabelPairs`] when the list has an odd length.
pub fn pairs_to_map<S: AsRef<str>>(pairs: &[S]) -> MetricsResult<Labels> {
    if pairs.len() % 2 != 0 {
        return Err(MetricsError::OddLabelPairs(pairs.len()));
    }

    Ok(pairs
        .chunks_exact(2)
        .map(|pair| (pair[0].as_ref(), pair[1].as_ref()))
        .collect())
}

/// Reorder `values`, given in `declared` key order, into `pinned` order.
///
/// Values pass through untouched when both orders agree.
///
/// # Errors
/// [`MetricsError::LabelCardinalityMismatch`] if `values` does not match
/// `declared` or the two key sets differ in size, [`MetricsError::MissingLabel`]
/// if a pinned key is not declared.
pub fn align_values<'b, 'v>(
    metric: &str,
    pinned: &[String],
    declared: &[String],
    values: &'b [&'v str],
) -> MetricsResult<Cow<'b, [&'v str]>> {
    if pinned == declared {
        return Ok(Cow::Borrowed(values));
    }
    if declared.len() != values.len() || pinned.len() != declared.len() {
        return Err(MetricsError::LabelCardinalityMismatch {
            name: metric.to_string(),
            expected: pinned.len(),
            got: values.len(),
        });
    }

    pinned
        .iter()
        .map(|key| {
            declared
                .iter()
                .position(|d| d == key)
                .map(|i| values[i])
                .ok_or_else(|| MetricsError::MissingLabel {
                    name: metric.to_string(),
                    key: key.clone(),
                })
        })
        .collect::<MetricsResult<Vec<_>>>()
        .map(Cow::Owned)
}
