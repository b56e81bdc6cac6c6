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
//! Histogram bucket layouts

pub use prometheus::DEFAULT_BUCKETS;

use crate::error::{MetricsError, MetricsResult};

/// `count` buckets starting at `start`, each `width` wide
pub fn linear_buckets(start: f64, width: f64, count: usize) -> MetricsResult<Vec<f64>> {
    prometheus::linear_buckets(start, width, count)
        .map_err(|e| MetricsError::InvalidConfig(e.to_string()))
}

/// `count` buckets starting at `start`, each `factor` times the previous
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> MetricsResult<Vec<f64>> {
    prometheus::exponential_buckets(start, factor, count)
        .map_err(|e| MetricsError::InvalidConfig(e.to_string()))
}

/// `count` exponentially spaced buckets from `min` to `max` inclusive
pub fn exponential_buckets_range(min: f64, max: f64, count: usize) -> MetricsResult<Vec<f64>> {
    if count < 1 {
        return Err(MetricsError::InvalidConfig(
            "exponential_buckets_range needs a positive count".to_string(),
        ));
    }
    if min <= 0.0 {
        return Err(MetricsError::InvalidConfig(format!(
            "exponential_buckets_range needs a positive minimum, got {}",
            min
        )));
    }
    if count == 1 {
        return Ok(vec![min]);
    }
    if max <= min {
        return Err(MetricsError::InvalidConfig(format!(
            "exponential_buckets_range needs max > min, got {} and {}",
            max, min
        )));
    }

    let factor = (max / min).powf(1.0 / (count - 1) as f64);
    exponential_buckets(min, factor, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_buckets() {
        assert_eq!(linear_buckets(1.0, 2.0, 3).unwrap(), vec![1.0, 3.0, 5.0]);
        assert!(linear_buckets(1.0, 0.0, 3).is_err());
    }

    #[test]
    fn test_exponential_buckets() {
        assert_eq!(
            exponential_buckets(1.0, 10.0, 3).unwrap(),
            vec![1.0, 10.0, 100.0]
        );
        assert!(exponential_buckets(1.0, 1.0, 3).is_err());
    }

    #[test]
    fn test_exponential_buckets_range() {
        let buckets = exponential_buckets_range(1.0, 1000.0, 4).unwrap();
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[0], 1.0);
        assert!((buckets[3] - 1000.0).abs() < 1e-9);
        assert!((buckets[1] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_exponential_buckets_range_rejects_bad_input() {
        assert!(exponential_buckets_range(0.0, 10.0, 3).is_err());
        assert!(exponential_buckets_range(1.0, 10.0, 0).is_err());
        assert!(exponential_buckets_range(10.0, 1.0, 3).is_err());
        assert_eq!(exponential_buckets_range(2.0, 10.0, 1).unwrap(), vec![2.0]);
    }

    #[test]
    fn test_default_buckets() {
        assert_eq!(DEFAULT_BUCKETS.len(), 11);
        assert_eq!(DEFAULT_BUCKETS[0], 0.005);
    }
}
