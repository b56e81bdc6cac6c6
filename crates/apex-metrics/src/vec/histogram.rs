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
//! Histogram vector

use prometheus::{Histogram, HistogramOpts, DEFAULT_BUCKETS};
use std::collections::HashMap;
use std::sync::Arc;

use super::{check_cardinality, key_refs};
use crate::error::{MetricsError, MetricsResult};
use crate::labels::Labels;
use crate::registerer::{register, Registerer};
use crate::timer::Timer;
use crate::types::{MetricKind, DEFAULT_HELP};

/// A registered family of histograms sharing one bucket layout
#[derive(Clone)]
pub struct HistogramVec {
    name: Arc<str>,
    label_keys: Arc<[String]>,
    buckets: Arc<[f64]>,
    inner: prometheus::HistogramVec,
}

impl HistogramVec {
    /// Build the backend collector and register it.
    ///
    /// Empty `buckets` select [`prometheus::DEFAULT_BUCKETS`]. Bounds must be
    /// finite or `+Inf` and strictly increasing.
    pub fn create(
        registerer: &dyn Registerer,
        name: &str,
        label_keys: &[String],
        const_labels: &HashMap<String, String>,
        buckets: &[f64],
    ) -> MetricsResult<Self> {
        let buckets = if buckets.is_empty() {
            DEFAULT_BUCKETS.to_vec()
        } else {
            buckets.to_vec()
        };
        check_buckets(name, &buckets)?;

        let opts = HistogramOpts::new(name, DEFAULT_HELP)
            .const_labels(const_labels.clone())
            .buckets(buckets.clone());
        let inner = prometheus::HistogramVec::new(opts, &key_refs(label_keys))
            .map_err(|e| MetricsError::registration_failed(name, e))?;
        register(registerer, name, Box::new(inner.clone()))?;

        Ok(Self {
            name: name.into(),
            label_keys: label_keys.into(),
            buckets: buckets.into(),
            inner,
        })
    }

    fn series(&self, values: &[&str]) -> MetricsResult<Histogram> {
        check_cardinality(&self.name, &self.label_keys, values)?;
        self.inner
            .get_metric_with_label_values(values)
            .map_err(|e| MetricsError::registration_failed(&*self.name, e))
    }

    /// Record one observation
    pub fn observe(&self, value: f64, values: &[&str]) -> MetricsResult<()> {
        self.series(values)?.observe(value);
        Ok(())
    }

    /// Start a timer that records elapsed seconds into the series
    pub fn start_timer(&self, values: &[&str]) -> MetricsResult<Timer> {
        Ok(Timer::histogram(self.series(values)?))
    }

    /// [`HistogramVec::observe`] with values resolved by key name
    pub fn observe_labels(&self, value: f64, labels: &Labels) -> MetricsResult<()> {
        self.observe(value, &labels.values_for(&self.name, &self.label_keys)?)
    }

    /// [`HistogramVec::start_timer`] with values resolved by key name
    pub fn start_timer_labels(&self, labels: &Labels) -> MetricsResult<Timer> {
        self.start_timer(&labels.values_for(&self.name, &self.label_keys)?)
    }

    /// Observation count of a series
    pub fn sample_count(&self, values: &[&str]) -> MetricsResult<u64> {
        Ok(self.series(values)?.get_sample_count())
    }

    /// Observation sum of a series
    pub fn sample_sum(&self, values: &[&str]) -> MetricsResult<f64> {
        Ok(self.series(values)?.get_sample_sum())
    }

    /// Upper bounds the histogram was created with
    pub fn buckets(&self) -> &[f64] {
        &self.buckets
    }

    /// Qualified metric name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Always [`MetricKind::Histogram`]
    pub fn kind(&self) -> MetricKind {
        MetricKind::Histogram
    }

    /// Label keys in their pinned order
    pub fn label_keys(&self) -> &[String] {
        &self.label_keys
    }
}

// The backend accepts any layout at construction and only rejects it on
// the first child lookup, after registration.
fn check_buckets(name: &str, buckets: &[f64]) -> MetricsResult<()> {
    if let Some(bound) = buckets.iter().find(|b| b.is_nan()) {
        return Err(MetricsError::registration_failed(
            name,
            format!("bucket bound {bound} is not a number"),
        ));
    }
    match buckets.windows(2).find(|pair| pair[0] >= pair[1]) {
        Some(pair) => Err(MetricsError::registration_failed(
            name,
            format!(
                "buckets must be strictly increasing, {} is followed by {}",
                pair[0], pair[1]
            ),
        )),
        None => Ok(()),
    }
}
