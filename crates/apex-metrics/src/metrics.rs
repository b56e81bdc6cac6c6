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
//! Instrumentation facade
//!
//! [`Metrics`] is the entry point for application code. Counters, gauges,
//! histograms and summaries are addressed by leaf name and created on first
//! use under `namespace`, the prefix chain and the separator the facade was
//! built with.
//!
//! Instrumentation calls never fail. A failure is counted in one of the
//! internal error counters (see [`InternalErrorMetrics`]) and logged, unless
//! `panic_on_error` is set, in which case it panics.
//!
//! # Example
//!
//! ```
//! use apex_metrics::{Metrics, MetricsOpts};
//!
//! let metrics = Metrics::new(
//!     MetricsOpts::default()
//!         .with_namespace("svc")
//!         .with_process_collector(false),
//! )
//! .unwrap();
//!
//! let http = metrics.with_prefix(&["http"]).with_labels(&["route"]);
//! http.counter_inc("requests_total", &["/home"]);
//!
//! assert!(metrics.render().unwrap().contains("svc_http_requests_total{route=\"/home\"} 1"));
//! ```

use prometheus::{Registry, TextEncoder};
use std::any::Any;
use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{MetricsOpts, ServerOpts};
use crate::error::{ErrorKind, MetricsError, MetricsResult};
use crate::internal::InternalErrorMetrics;
use crate::labels::align_values;
use crate::name::build_name;
use crate::registerer::Registerer;
use crate::server::MetricsServer;
use crate::store::Store;
use crate::timer::Timer;
use crate::types::SummaryOpts;
use crate::vec::{CounterVec, GaugeVec, HistogramVec, SummaryVec};

/// Dynamic instrumentation facade.
///
/// Cloning is cheap; clones and derived facades share the same store,
/// registry and internal error counters.
#[derive(Clone)]
pub struct Metrics {
    namespace: Arc<str>,
    prefix: Arc<[String]>,
    separator: char,
    label_keys: Arc<[String]>,
    panic_on_error: bool,
    histogram_buckets: Arc<[f64]>,
    summary_opts: Arc<SummaryOpts>,
    store: Arc<Store>,
    errors: Arc<InternalErrorMetrics>,
    registry: Registry,
}

impl Metrics {
    /// Create a facade over a fresh registry.
    ///
    /// # Errors
    /// Fails if `opts` is invalid or the internal error counters cannot be
    /// registered.
    pub fn new(opts: MetricsOpts) -> MetricsResult<Self> {
        Self::with_registry(opts, Registry::new())
    }

    /// Create a facade registering into `registry`
    pub fn with_registry(opts: MetricsOpts, registry: Registry) -> MetricsResult<Self> {
        let registerer: Arc<dyn Registerer> = Arc::new(registry.clone());
        Self::with_registerer(opts, registry, registerer)
    }

    /// Create a facade that registers through `registerer` and gathers from
    /// `registry`
    pub fn with_registerer(
        opts: MetricsOpts,
        registry: Registry,
        registerer: Arc<dyn Registerer>,
    ) -> MetricsResult<Self> {
        opts.validate()?;
        let const_labels = opts.const_labels()?;

        let store = Store::new(registerer, const_labels.as_map().clone());
        let errors =
            InternalErrorMetrics::register(&store, &opts.namespace, &opts.prefix, opts.separator)?;

        if opts.register_process_collector {
            register_process_collector(&store)?;
        }

        debug!(
            namespace = %opts.namespace,
            prefix = ?opts.prefix,
            "Metrics facade created"
        );

        Ok(Self {
            namespace: opts.namespace.as_str().into(),
            prefix: opts.prefix.clone().into(),
            separator: opts.separator,
            label_keys: Vec::new().into(),
            panic_on_error: opts.panic_on_error,
            histogram_buckets: opts.histogram_buckets.clone().into(),
            summary_opts: Arc::new(opts.summary.to_opts()),
            store: Arc::new(store),
            errors: Arc::new(errors),
            registry,
        })
    }

    /// Derive a facade whose prefix is extended by `segments`.
    ///
    /// The derived facade starts with no label keys.
    pub fn with_prefix<S: AsRef<str>>(&self, segments: &[S]) -> Metrics {
        let mut prefix = self.prefix.to_vec();
        prefix.extend(segments.iter().map(|s| s.as_ref().to_string()));

        Metrics {
            prefix: prefix.into(),
            label_keys: Vec::new().into(),
            ..self.clone()
        }
    }

    /// Derive a facade whose metrics declare `keys`, in this order
    pub fn with_labels<S: AsRef<str>>(&self, keys: &[S]) -> Metrics {
        Metrics {
            label_keys: keys.iter().map(|k| k.as_ref().to_string()).collect(),
            ..self.clone()
        }
    }

    /// Derive a facade creating histograms with `buckets`
    pub fn with_histogram_buckets(&self, buckets: Vec<f64>) -> Metrics {
        Metrics {
            histogram_buckets: buckets.into(),
            ..self.clone()
        }
    }

    /// Derive a facade creating summaries with `opts`
    pub fn with_summary_opts(&self, opts: SummaryOpts) -> Metrics {
        Metrics {
            summary_opts: Arc::new(opts.defaulted()),
            ..self.clone()
        }
    }

    /// Increment a counter by one
    pub fn counter_inc(&self, name: &str, label_values: &[&str]) {
        self.instrument("counter_inc", name, |q| {
            let counter = self.counter_for(q)?;
            counter.inc(&self.aligned(q, counter.label_keys(), label_values)?)
        });
    }

    /// Add `value` to a counter
    pub fn counter_add(&self, name: &str, value: f64, label_values: &[&str]) {
        self.instrument("counter_add", name, |q| {
            let counter = self.counter_for(q)?;
            counter.add(value, &self.aligned(q, counter.label_keys(), label_values)?)
        });
    }

    /// Set a gauge
    pub fn gauge_set(&self, name: &str, value: f64, label_values: &[&str]) {
        self.instrument("gauge_set", name, |q| {
            let gauge = self.gauge_for(q)?;
            gauge.set(value, &self.aligned(q, gauge.label_keys(), label_values)?)
        });
    }

    /// Increment a gauge by one
    pub fn gauge_inc(&self, name: &str, label_values: &[&str]) {
        self.instrument("gauge_inc", name, |q| {
            let gauge = self.gauge_for(q)?;
            gauge.inc(&self.aligned(q, gauge.label_keys(), label_values)?)
        });
    }

    /// Decrement a gauge by one
    pub fn gauge_dec(&self, name: &str, label_values: &[&str]) {
        self.instrument("gauge_dec", name, |q| {
            let gauge = self.gauge_for(q)?;
            gauge.dec(&self.aligned(q, gauge.label_keys(), label_values)?)
        });
    }

    /// Add `value` to a gauge
    pub fn gauge_add(&self, name: &str, value: f64, label_values: &[&str]) {
        self.instrument("gauge_add", name, |q| {
            let gauge = self.gauge_for(q)?;
            gauge.add(value, &self.aligned(q, gauge.label_keys(), label_values)?)
        });
    }

    /// Subtract `value` from a gauge
    pub fn gauge_sub(&self, name: &str, value: f64, label_values: &[&str]) {
        self.instrument("gauge_sub", name, |q| {
            let gauge = self.gauge_for(q)?;
            gauge.sub(value, &self.aligned(q, gauge.label_keys(), label_values)?)
        });
    }

    /// Record a histogram observation
    pub fn histogram_observe(&self, name: &str, value: f64, label_values: &[&str]) {
        self.instrument("histogram_observe", name, |q| {
            let histogram = self.histogram_for(q)?;
            histogram.observe(value, &self.aligned(q, histogram.label_keys(), label_values)?)
        });
    }

    /// Start a timer recording into a histogram.
    ///
    /// Returns a no-op timer if the histogram cannot be resolved.
    pub fn histogram_timer(&self, name: &str, label_values: &[&str]) -> Timer {
        self.instrument("histogram_timer", name, |q| {
            let histogram = self.histogram_for(q)?;
            histogram.start_timer(&self.aligned(q, histogram.label_keys(), label_values)?)
        })
        .unwrap_or_else(Timer::noop)
    }

    /// Record a summary observation
    pub fn summary_observe(&self, name: &str, value: f64, label_values: &[&str]) {
        self.instrument("summary_observe", name, |q| {
            let summary = self.summary_for(q)?;
            summary.observe(value, &self.aligned(q, summary.label_keys(), label_values)?)
        });
    }

    /// Start a timer recording into a summary.
    ///
    /// Returns a no-op timer if the summary cannot be resolved.
    pub fn summary_timer(&self, name: &str, label_values: &[&str]) -> Timer {
        self.instrument("summary_timer", name, |q| {
            let summary = self.summary_for(q)?;
            summary.start_timer(&self.aligned(q, summary.label_keys(), label_values)?)
        })
        .unwrap_or_else(Timer::noop)
    }

    /// Resolve the counter for `name` without recovery
    pub fn counter_vec(&self, name: &str) -> MetricsResult<CounterVec> {
        self.counter_for(&self.qualified_name(name)?)
    }

    /// Resolve the gauge for `name` without recovery
    pub fn gauge_vec(&self, name: &str) -> MetricsResult<GaugeVec> {
        self.gauge_for(&self.qualified_name(name)?)
    }

    /// Resolve the histogram for `name` without recovery
    pub fn histogram_vec(&self, name: &str) -> MetricsResult<HistogramVec> {
        self.histogram_for(&self.qualified_name(name)?)
    }

    /// Resolve the summary for `name` without recovery
    pub fn summary_vec(&self, name: &str) -> MetricsResult<SummaryVec> {
        self.summary_for(&self.qualified_name(name)?)
    }

    /// Fully qualified name `name` resolves to under this facade
    pub fn qualified_name(&self, name: &str) -> MetricsResult<String> {
        build_name(&self.namespace, &self.prefix[..], name, self.separator)
    }

    fn counter_for(&self, qualified: &str) -> MetricsResult<CounterVec> {
        self.store.counter(qualified, &self.label_keys)
    }

    fn gauge_for(&self, qualified: &str) -> MetricsResult<GaugeVec> {
        self.store.gauge(qualified, &self.label_keys)
    }

    fn histogram_for(&self, qualified: &str) -> MetricsResult<HistogramVec> {
        self.store
            .histogram(qualified, &self.label_keys, &self.histogram_buckets)
    }

    fn summary_for(&self, qualified: &str) -> MetricsResult<SummaryVec> {
        self.store
            .summary(qualified, &self.label_keys, &self.summary_opts)
    }

    /// Values in this facade's key order, rearranged to the order `pinned`
    /// when the metric was first registered.
    fn aligned<'b, 'v>(
        &self,
        qualified: &str,
        pinned: &[String],
        label_values: &'b [&'v str],
    ) -> MetricsResult<Cow<'b, [&'v str]>> {
        align_values(qualified, pinned, &self.label_keys, label_values)
    }

    /// Run `body` against the qualified name, recovering from errors and
    /// backend panics unless `panic_on_error` is set.
    fn instrument<T>(
        &self,
        operation: &'static str,
        name: &str,
        body: impl FnOnce(&str) -> MetricsResult<T>,
    ) -> Option<T> {
        let qualified = match self.qualified_name(name) {
            Ok(qualified) => qualified,
            Err(err) => {
                self.fail(operation, name, &err);
                return None;
            }
        };

        if self.panic_on_error {
            return match body(&qualified) {
                Ok(value) => Some(value),
                Err(err) => {
                    self.fail(operation, &qualified, &err);
                    None
                }
            };
        }

        match panic::catch_unwind(AssertUnwindSafe(|| body(&qualified))) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(err)) => {
                self.fail(operation, &qualified, &err);
                None
            }
            Err(payload) => {
                warn!(
                    metric = %qualified,
                    operation,
                    error = %panic_message(payload.as_ref()),
                    "Recovered panic in metrics call"
                );
                self.errors
                    .record(ErrorKind::PanicRecovery, &qualified, operation);
                None
            }
        }
    }

    fn fail(&self, operation: &'static str, metric: &str, err: &MetricsError) {
        if self.panic_on_error {
            panic!("{} on metric {:?} failed: {}", operation, metric, err);
        }

        warn!(metric, operation, error = %err, "Recovered metrics failure");
        self.errors.record(err.kind(), metric, operation);
    }

    /// Registry the collectors are gathered from
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current registry contents in text exposition format
    pub fn render(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }

    /// Exposition server for this facade's registry
    pub fn server(&self, opts: ServerOpts) -> MetricsServer {
        MetricsServer::new(self.registry.clone(), opts)
    }

    /// Serve the registry until `token` is cancelled
    pub async fn start_http_server(
        &self,
        token: CancellationToken,
        opts: ServerOpts,
    ) -> anyhow::Result<()> {
        opts.validate()?;
        self.server(opts).serve(token).await
    }

    /// Counters of recovered failures
    pub fn internal_errors(&self) -> &InternalErrorMetrics {
        &self.errors
    }

    /// Shared name to collector cache
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Namespace segment
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Prefix segments, outermost first
    pub fn prefix(&self) -> &[String] {
        &self.prefix
    }

    /// Label keys new metrics declare
    pub fn label_keys(&self) -> &[String] {
        &self.label_keys
    }

    /// Segment separator
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Bucket bounds for new histograms; empty means the backend defaults
    pub fn histogram_buckets(&self) -> &[f64] {
        &self.histogram_buckets
    }

    /// Options for new summaries
    pub fn summary_opts(&self) -> &SummaryOpts {
        &self.summary_opts
    }

    /// Whether failures panic instead of being recorded
    pub fn panic_on_error(&self) -> bool {
        self.panic_on_error
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(target_os = "linux")]
fn register_process_collector(store: &Store) -> MetricsResult<()> {
    let collector = prometheus::process_collector::ProcessCollector::for_self();
    match crate::registerer::register(store.registerer(), "process", Box::new(collector)) {
        Err(MetricsError::AlreadyRegistered(_)) => {
            debug!("Process collector already registered");
            Ok(())
        }
        result => result,
    }
}

#[cfg(not(target_os = "linux"))]
fn register_process_collector(_store: &Store) -> MetricsResult<()> {
    debug!("Process collector is only available on Linux");
    Ok(())
}
