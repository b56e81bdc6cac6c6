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
//! Counter vector

use prometheus::{Counter, Opts};
use std::collections::HashMap;
use std::sync::Arc;

use super::{check_cardinality, key_refs};
use crate::error::{MetricsError, MetricsResult};
use crate::labels::Labels;
use crate::registerer::{register, Registerer};
use crate::types::{MetricKind, DEFAULT_HELP};

/// A registered family of counters
#[derive(Clone)]
pub struct CounterVec {
    name: Arc<str>,
    label_keys: Arc<[String]>,
    inner: prometheus::CounterVec,
}

impl CounterVec {
    /// Build the backend collector and register it.
    pub fn create(
        registerer: &dyn Registerer,
        name: &str,
        label_keys: &[String],
        const_labels: &HashMap<String, String>,
    ) -> MetricsResult<Self> {
        let opts = Opts::new(name, DEFAULT_HELP).const_labels(const_labels.clone());
        let inner = prometheus::CounterVec::new(opts, &key_refs(label_keys))
            .map_err(|e| MetricsError::registration_failed(name, e))?;
        register(registerer, name, Box::new(inner.clone()))?;

        Ok(Self {
            name: name.into(),
            label_keys: label_keys.into(),
            inner,
        })
    }

    fn series(&self, values: &[&str]) -> MetricsResult<Counter> {
        check_cardinality(&self.name, &self.label_keys, values)?;
        self.inner
            .get_metric_with_label_values(values)
            .map_err(|e| MetricsError::registration_failed(&*self.name, e))
    }

    /// Increment by one
    pub fn inc(&self, values: &[&str]) -> MetricsResult<()> {
        self.series(values)?.inc();
        Ok(())
    }

    /// Add `delta` to the series.
    ///
    /// # Errors
    /// [`MetricsError::NegativeCounterDelta`] when `delta` is negative.
    pub fn add(&self, delta: f64, values: &[&str]) -> MetricsResult<()> {
        if delta < 0.0 {
            return Err(MetricsError::NegativeCounterDelta {
                name: self.name.to_string(),
                delta,
            });
        }
        self.series(values)?.inc_by(delta);
        Ok(())
    }

    /// [`CounterVec::inc`] with values resolved by key name
    pub fn inc_labels(&self, labels: &Labels) -> MetricsResult<()> {
        self.inc(&labels.values_for(&self.name, &self.label_keys)?)
    }

    /// [`CounterVec::add`] with values resolved by key name
    pub fn add_labels(&self, delta: f64, labels: &Labels) -> MetricsResult<()> {
        self.add(delta, &labels.values_for(&self.name, &self.label_keys)?)
    }

    /// Current value of a series, creating it at zero if absent
    pub fn value(&self, values: &[&str]) -> MetricsResult<f64> {
        Ok(self.series(values)?.get())
    }

    /// Qualified metric name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Always [`MetricKind::Counter`]
    pub fn kind(&self) -> MetricKind {
        MetricKind::Counter
    }

    /// Label keys in their pinned order
    pub fn label_keys(&self) -> &[String] {
        &self.label_keys
    }
}
