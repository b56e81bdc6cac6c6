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
//! Typed wrappers around the backend collector vectors
//!
//! Each wrapper owns one registered collector and pins the label key order
//! it was declared with. Positional mutations take values in that order;
//! the `*_labels` variants resolve values by key name.

mod counter;
mod gauge;
mod histogram;
mod summary;

pub use counter::CounterVec;
pub use gauge::GaugeVec;
pub use histogram::HistogramVec;
pub use summary::SummaryVec;

use crate::error::MetricsError;

fn key_refs(keys: &[String]) -> Vec<&str> {
    keys.iter().map(String::as_str).collect()
}

/// Fail unless exactly one value was supplied per declared key.
fn check_cardinality(name: &str, keys: &[String], values: &[&str]) -> Result<(), MetricsError> {
    if keys.len() == values.len() {
        Ok(())
    } else {
        Err(MetricsError::LabelCardinalityMismatch {
            name: name.to_string(),
            expected: keys.len(),
            got: values.len(),
        })
    }
}
