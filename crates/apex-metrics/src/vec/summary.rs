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
//! Summary vector

use std::collections::HashMap;
use std::sync::Arc;

use super::check_cardinality;
use crate::collector::{Summary, SummaryCollector, SummarySnapshot};
use crate::error::{MetricsError, MetricsResult};
use crate::labels::Labels;
use crate::registerer::{register, Registerer};
use crate::timer::Timer;
use crate::types::{MetricKind, SummaryOpts, DEFAULT_HELP};

/// A registered family of summaries sharing one set of objectives
#[derive(Clone)]
pub struct SummaryVec {
    name: Arc<str>,
    label_keys: Arc<[String]>,
    inner: SummaryCollector,
}

impl SummaryVec {
    /// Build the collector and register it.
    ///
    /// Zero or empty fields in `opts` are replaced by their defaults.
    pub fn create(
        registerer: &dyn Registerer,
        name: &str,
        label_keys: &[String],
        const_labels: &HashMap<String, String>,
        opts: &SummaryOpts,
    ) -> MetricsResult<Self> {
        let inner = SummaryCollector::new(
            name,
            DEFAULT_HELP,
            label_keys,
            const_labels,
            opts.clone(),
        )
        .map_err(|e| MetricsError::registration_failed(name, e))?;
        register(registerer, name, Box::new(inner.clone()))?;

        Ok(Self {
            name: name.into(),
            label_keys: label_keys.into(),
            inner,
        })
    }

    fn series(&self, values: &[&str]) -> MetricsResult<Summary> {
        check_cardinality(&self.name, &self.label_keys, values)?;
        self.inner
            .with_label_values(values)
            .ok_or_else(|| MetricsError::LabelCardinalityMismatch {
                name: self.name.to_string(),
                expected: self.inner.label_count(),
                got: values.len(),
            })
    }

    /// Record one observation
    pub fn observe(&self, value: f64, values: &[&str]) -> MetricsResult<()> {
        self.series(values)?.observe(value);
        Ok(())
    }

    /// Start a timer that records elapsed seconds into the series
    pub fn start_timer(&self, values: &[&str]) -> MetricsResult<Timer> {
        Ok(Timer::summary(self.series(values)?))
    }

    /// [`SummaryVec::observe`] with values resolved by key name
    pub fn observe_labels(&self, value: f64, labels: &Labels) -> MetricsResult<()> {
        self.observe(value, &labels.values_for(&self.name, &self.label_keys)?)
    }

    /// [`SummaryVec::start_timer`] with values resolved by key name
    pub fn start_timer_labels(&self, labels: &Labels) -> MetricsResult<Timer> {
        self.start_timer(&labels.values_for(&self.name, &self.label_keys)?)
    }

    /// Count, sum and quantiles of a series
    pub fn snapshot(&self, values: &[&str]) -> MetricsResult<SummarySnapshot> {
        Ok(self.series(values)?.snapshot())
    }

    /// Options the summary was created with, after defaulting
    pub fn opts(&self) -> &SummaryOpts {
        self.inner.opts()
    }

    /// Qualified metric name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Always [`MetricKind::Summary`]
    pub fn kind(&self) -> MetricKind {
        MetricKind::Summary
    }

    /// Label keys in their pinned order
    pub fn label_keys(&self) -> &[String] {
        &self.label_keys
    }
}
