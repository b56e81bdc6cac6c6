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
//! Summary collector for the Prometheus registry
//!
//! The `prometheus` crate ships counters, gauges and histograms but no
//! summary. [`SummaryCollector`] fills that gap: it implements
//! [`Collector`] and exposes one `summary` family whose series report
//! quantiles over a sliding window plus all-time `_sum` and `_count`.
//!
//! The window of `max_age` is split into `age_buckets` buckets. Each bucket
//! holds raw samples; the oldest bucket is dropped every `max_age /
//! age_buckets`. A full bucket is decimated to half its size so memory stays
//! bounded under heavy load.

use prometheus::core::{Collector, Desc};
use prometheus::proto::{
    LabelPair, Metric, MetricFamily, MetricType, Quantile, Summary as SummaryProto,
};
use protobuf::{EnumOrUnknown, MessageField};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::trace;

use crate::types::{Objective, SummaryOpts};

/// Samples kept per age bucket before decimation
const MAX_BUCKET_SAMPLES: usize = 4096;

/// Shortest rotation interval between age buckets
const MIN_STRIDE: Duration = Duration::from_millis(1);

/// Point-in-time view of one summary series
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySnapshot {
    /// Observations since creation
    pub count: u64,
    /// Sum of observations since creation
    pub sum: f64,
    /// `(quantile, value)` for each objective, over the current window
    pub quantiles: Vec<(f64, f64)>,
}

/// A single summary series (one label-value combination)
#[derive(Clone)]
pub struct Summary {
    state: Arc<Mutex<WindowState>>,
    objectives: Arc<[Objective]>,
}

struct WindowState {
    count: u64,
    sum: f64,
    buckets: VecDeque<Vec<f64>>,
    rotated_at: Instant,
    stride: Duration,
    age_buckets: usize,
}

impl WindowState {
    fn new(opts: &SummaryOpts, now: Instant) -> Self {
        let age_buckets = opts.age_buckets.max(1);
        let stride = (opts.max_age / age_buckets).max(MIN_STRIDE);
        let mut buckets = VecDeque::with_capacity(age_buckets as usize);
        buckets.push_front(Vec::new());

        Self {
            count: 0,
            sum: 0.0,
            buckets,
            rotated_at: now,
            stride,
            age_buckets: age_buckets as usize,
        }
    }

    /// Drop buckets that have aged out of the window
    fn rotate(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.rotated_at);
        if elapsed < self.stride {
            return;
        }

        let steps = elapsed.as_nanos() / self.stride.as_nanos();
        if steps >= self.age_buckets as u128 {
            self.buckets.clear();
            self.buckets.push_front(Vec::new());
            self.rotated_at = now;
            return;
        }

        for _ in 0..steps {
            self.buckets.push_front(Vec::new());
            if self.buckets.len() > self.age_buckets {
                self.buckets.pop_back();
            }
        }
        // steps < age_buckets, which came from a u32
        self.rotated_at += self.stride * steps as u32;
    }

    fn observe(&mut self, value: f64, now: Instant) {
        self.rotate(now);
        self.count += 1;
        self.sum += value;

        if let Some(head) = self.buckets.front_mut() {
            if head.len() >= MAX_BUCKET_SAMPLES {
                head.sort_by(f64::total_cmp);
                *head = head.iter().step_by(2).copied().collect();
            }
            head.push(value);
        }
    }

    fn snapshot(&mut self, objectives: &[Objective], now: Instant) -> SummarySnapshot {
        self.rotate(now);

        let mut window: Vec<f64> = self.buckets.iter().flatten().copied().collect();
        window.sort_by(f64::total_cmp);

        SummarySnapshot {
            count: self.count,
            sum: self.sum,
            quantiles: objectives
                .iter()
                .map(|o| (o.quantile, rank(&window, o.quantile)))
                .collect(),
        }
    }
}

/// Nearest-rank quantile of sorted samples; NaN when there are none
fn rank(sorted: &[f64], quantile: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let n = sorted.len();
    let idx = (quantile.clamp(0.0, 1.0) * n as f64).ceil() as usize;
    sorted[idx.saturating_sub(1).min(n - 1)]
}

impl Summary {
    fn new(opts: &SummaryOpts) -> Self {
        Self {
            state: Arc::new(Mutex::new(WindowState::new(opts, Instant::now()))),
            objectives: opts.objectives.clone().into(),
        }
    }

    /// Add a single observation
    pub fn observe(&self, value: f64) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .observe(value, Instant::now());
    }

    /// Current count, sum and quantiles
    pub fn snapshot(&self) -> SummarySnapshot {
        self.snapshot_at(Instant::now())
    }

    fn snapshot_at(&self, now: Instant) -> SummarySnapshot {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot(&self.objectives, now)
    }
}

/// Prometheus collector holding a family of summary series
#[derive(Clone)]
pub struct SummaryCollector {
    inner: Arc<CollectorInner>,
}

struct CollectorInner {
    desc: Desc,
    label_names: Vec<String>,
    const_pairs: Vec<(String, String)>,
    opts: SummaryOpts,
    series: RwLock<HashMap<Vec<String>, Summary>>,
}

impl SummaryCollector {
    /// Create a collector; the name and label names are validated by the backend.
    pub fn new(
        name: &str,
        help: &str,
        label_names: &[String],
        const_labels: &HashMap<String, String>,
        opts: SummaryOpts,
    ) -> prometheus::Result<Self> {
        let desc = Desc::new(
            name.to_string(),
            help.to_string(),
            label_names.to_vec(),
            const_labels.clone(),
        )?;

        let mut const_pairs: Vec<(String, String)> = const_labels
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        const_pairs.sort();

        Ok(Self {
            inner: Arc::new(CollectorInner {
                desc,
                label_names: label_names.to_vec(),
                const_pairs,
                opts: opts.defaulted(),
                series: RwLock::new(HashMap::new()),
            }),
        })
    }

    /// Number of declared variable labels
    pub fn label_count(&self) -> usize {
        self.inner.label_names.len()
    }

    /// Options the collector was created with
    pub fn opts(&self) -> &SummaryOpts {
        &self.inner.opts
    }

    /// Fetch or create the series for `values`.
    ///
    /// Returns `None` when the number of values does not match the declared
    /// label names.
    pub fn with_label_values(&self, values: &[&str]) -> Option<Summary> {
        if values.len() != self.inner.label_names.len() {
            return None;
        }

        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        if let Some(series) = self
            .inner
            .series
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Some(series.clone());
        }

        let mut series = self
            .inner
            .series
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Some(
            series
                .entry(key)
                .or_insert_with(|| Summary::new(&self.inner.opts))
                .clone(),
        )
    }

    fn label_pairs(&self, values: &[String]) -> Vec<LabelPair> {
        let mut pairs: Vec<(&str, &str)> = self
            .inner
            .const_pairs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(
                self.inner
                    .label_names
                    .iter()
                    .map(String::as_str)
                    .zip(values.iter().map(String::as_str)),
            )
            .collect();
        pairs.sort();

        pairs
            .into_iter()
            .map(|(name, value)| LabelPair {
                name: Some(name.to_string()),
                value: Some(value.to_string()),
                ..Default::default()
            })
            .collect()
    }
}

impl Collector for SummaryCollector {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.inner.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        trace!("Collecting summary {}", self.inner.desc.fq_name);

        let now = Instant::now();
        let series = self
            .inner
            .series
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let mut metrics = Vec::with_capacity(series.len());
        for (values, summary) in series.iter() {
            let snapshot = summary.snapshot_at(now);

            let proto = SummaryProto {
                sample_count: Some(snapshot.count),
                sample_sum: Some(snapshot.sum),
                quantile: snapshot
                    .quantiles
                    .iter()
                    .map(|(q, v)| Quantile {
                        quantile: Some(*q),
                        value: Some(*v),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            };

            metrics.push(Metric {
                label: self.label_pairs(values),
                summary: MessageField::some(proto),
                ..Default::default()
            });
        }

        vec![MetricFamily {
            name: Some(self.inner.desc.fq_name.clone()),
            help: Some(self.inner.desc.help.clone()),
            type_: Some(EnumOrUnknown::new(MetricType::SUMMARY)),
            metric: metrics,
            ..Default::default()
        }]
    }
}
