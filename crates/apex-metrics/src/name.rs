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
//! Qualified metric name construction

use crate::error::{MetricsError, MetricsResult};

/// Build a qualified metric name from its components.
///
/// Non-empty segments are joined with `separator` in order: namespace, each
/// prefix segment, then the leaf name. Empty segments are skipped so no
/// doubled separators appear.
///
/// # Errors
/// [`MetricsError::InvalidMetricName`] when `name` is empty.
///
/// # Example
/// ```
/// use apex_metrics::build_name;
///
/// let name = build_name("svc", &["http", ""], "requests_total", '_').unwrap();
/// assert_eq!(name, "svc_http_requests_total");
/// ```
pub fn build_name<S: AsRef<str>>(
    namespace: &str,
    prefix: &[S],
    name: &str,
    separator: char,
) -> MetricsResult<String> {
    if name.is_empty() {
        return Err(MetricsError::InvalidMetricName);
    }

    let mut qualified = join_segments(
        std::iter::once(namespace).chain(prefix.iter().map(|s| s.as_ref())),
        separator,
    );
    if !qualified.is_empty() {
        qualified.push(separator);
    }
    qualified.push_str(name);
    Ok(qualified)
}

/// Join the non-empty segments with `separator`.
pub fn join_segments<'a, I>(segments: I, separator: char) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut joined = String::new();
    for segment in segments.into_iter().filter(|s| !s.is_empty()) {
        if !joined.is_empty() {
            joined.push(separator);
        }
        joined.push_str(segment);
    }
    joined
}
