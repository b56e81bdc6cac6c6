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
//! Lazily populated cache of registered collectors
//!
//! The store maps a qualified metric name to the collector registered for it.
//! The first call for a name builds and registers the collector; later calls
//! return the cached handle without re-validating label keys or options.
//! One lock covers the whole check-and-insert, so concurrent first use of a
//! name registers exactly once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::error::{MetricsError, MetricsResult};
use crate::registerer::Registerer;
use crate::types::{MetricKind, SummaryOpts};
use crate::vec::{CounterVec, GaugeVec, HistogramVec, SummaryVec};

/// A registered collector of any kind
#[derive(Clone)]
pub enum MetricVec {
    /// Counter family
    Counter(CounterVec),
    /// Gauge family
    Gauge(GaugeVec),
    /// Histogram family
    Histogram(HistogramVec),
    /// Summary family
    Summary(SummaryVec),
}

impl MetricVec {
    /// Kind of the wrapped collector
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricVec::Counter(_) => MetricKind::Counter,
            MetricVec::Gauge(_) => MetricKind::Gauge,
            MetricVec::Histogram(_) => MetricKind::Histogram,
            MetricVec::Summary(_) => MetricKind::Summary,
        }
    }

    /// Qualified name of the wrapped collector
    pub fn name(&self) -> &str {
        match self {
            MetricVec::Counter(v) => v.name(),
            MetricVec::Gauge(v) => v.name(),
            MetricVec::Histogram(v) => v.name(),
            MetricVec::Summary(v) => v.name(),
        }
    }
}

/// Kind-specific options applied when a collector is first created
#[derive(Debug, Clone, Copy)]
pub enum KindOpts<'a> {
    /// Counters take no options
    Counter,
    /// Gauges take no options
    Gauge,
    /// Bucket upper bounds; empty selects the defaults
    Histogram(&'a [f64]),
    /// Objectives and window
    Summary(&'a SummaryOpts),
}

impl KindOpts<'_> {
    /// Kind the options create
    pub fn kind(&self) -> MetricKind {
        match self {
            KindOpts::Counter => MetricKind::Counter,
            KindOpts::Gauge => MetricKind::Gauge,
            KindOpts::Histogram(_) => MetricKind::Histogram,
            KindOpts::Summary(_) => MetricKind::Summary,
        }
    }
}

/// Name to collector cache shared by a facade and every facade derived from it
pub struct Store {
    registerer: Arc<dyn Registerer>,
    const_labels: HashMap<String, String>,
    vecs: Mutex<HashMap<String, MetricVec>>,
}

impl Store {
    /// Create an empty store registering into `registerer`.
    ///
    /// `const_labels` are attached to every collector the store creates.
    pub fn new(registerer: Arc<dyn Registerer>, const_labels: HashMap<String, String>) -> Self {
        Self {
            registerer,
            const_labels,
            vecs: Mutex::new(HashMap::new()),
        }
    }

    /// Return the collector for `name`, creating and registering it on first use.
    ///
    /// # Errors
    /// - [`MetricsError::RegistrationFailed`] if the backend rejects the
    ///   collector, or if `name` is cached under a different kind
    /// - [`MetricsError::AlreadyRegistered`] if the backend already holds a
    ///   collector with this name that the store did not create; nothing is
    ///   cached in that case
    pub fn get_or_create(
        &self,
        name: &str,
        label_keys: &[String],
        opts: KindOpts<'_>,
    ) -> MetricsResult<MetricVec> {
        let mut vecs = self.vecs.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = vecs.get(name) {
            if existing.kind() != opts.kind() {
                return Err(MetricsError::registration_failed(
                    name,
                    format!(
                        "already registered as a {}, requested as a {}",
                        existing.kind(),
                        opts.kind()
                    ),
                ));
            }
            return Ok(existing.clone());
        }

        let registerer = self.registerer.as_ref();
        let created = match opts {
            KindOpts::Counter => MetricVec::Counter(CounterVec::create(
                registerer,
                name,
                label_keys,
                &self.const_labels,
            )?),
            KindOpts::Gauge => MetricVec::Gauge(GaugeVec::create(
                registerer,
                name,
                label_keys,
                &self.const_labels,
            )?),
            KindOpts::Histogram(buckets) => MetricVec::Histogram(HistogramVec::create(
                registerer,
                name,
                label_keys,
                &self.const_labels,
                buckets,
            )?),
            KindOpts::Summary(summary) => MetricVec::Summary(SummaryVec::create(
                registerer,
                name,
                label_keys,
                &self.const_labels,
                summary,
            )?),
        };

        debug!(
            metric = name,
            kind = %created.kind(),
            labels = ?label_keys,
            "Registered collector"
        );
        vecs.insert(name.to_string(), created.clone());
        Ok(created)
    }

    /// Counter for `name`
    pub fn counter(&self, name: &str, label_keys: &[String]) -> MetricsResult<CounterVec> {
        match self.get_or_create(name, label_keys, KindOpts::Counter)? {
            MetricVec::Counter(v) => Ok(v),
            other => Err(kind_mismatch(name, &other, MetricKind::Counter)),
        }
    }

    /// Gauge for `name`
    pub fn gauge(&self, name: &str, label_keys: &[String]) -> MetricsResult<GaugeVec> {
        match self.get_or_create(name, label_keys, KindOpts::Gauge)? {
            MetricVec::Gauge(v) => Ok(v),
            other => Err(kind_mismatch(name, &other, MetricKind::Gauge)),
        }
    }

    /// Histogram for `name`; `buckets` only apply on creation
    pub fn histogram(
        &self,
        name: &str,
        label_keys: &[String],
        buckets: &[f64],
    ) -> MetricsResult<HistogramVec> {
        match self.get_or_create(name, label_keys, KindOpts::Histogram(buckets))? {
            MetricVec::Histogram(v) => Ok(v),
            other => Err(kind_mismatch(name, &other, MetricKind::Histogram)),
        }
    }

    /// Summary for `name`; `opts` only apply on creation
    pub fn summary(
        &self,
        name: &str,
        label_keys: &[String],
        opts: &SummaryOpts,
    ) -> MetricsResult<SummaryVec> {
        match self.get_or_create(name, label_keys, KindOpts::Summary(opts))? {
            MetricVec::Summary(v) => Ok(v),
            other => Err(kind_mismatch(name, &other, MetricKind::Summary)),
        }
    }

    /// Number of cached collectors
    pub fn len(&self) -> usize {
        self.vecs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been registered yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `name` is cached
    pub fn contains(&self, name: &str) -> bool {
        self.vecs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Kind `name` is cached under
    pub fn kind_of(&self, name: &str) -> Option<MetricKind> {
        self.vecs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(MetricVec::kind)
    }

    /// Constant labels attached to every collector
    pub fn const_labels(&self) -> &HashMap<String, String> {
        &self.const_labels
    }

    pub(crate) fn registerer(&self) -> &dyn Registerer {
        self.registerer.as_ref()
    }
}

fn kind_mismatch(name: &str, found: &MetricVec, wanted: MetricKind) -> MetricsError {
    MetricsError::registration_failed(
        name,
        format!("expected a {}, found a {}", wanted, found.kind()),
    )
}
