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

//! Integration tests for apex-metrics
//!
//! Exercises the public facade: lazy registration, naming, label handling,
//! failure recovery and the exposition format.

use apex_metrics::{
    build_name, ErrorKind, Labels, Metrics, MetricsError, MetricsOpts, Registerer, Registry,
    SummaryOpts,
};
use prometheus::core::Collector;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Internal error counters registered by every root facade
const INTERNAL_COUNTERS: usize = 4;

struct CountingRegisterer {
    registry: Registry,
    calls: AtomicUsize,
}

impl Registerer for CountingRegisterer {
    fn register(&self, collector: Box<dyn Collector>) -> prometheus::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.registry.register(collector)
    }
}

fn opts() -> MetricsOpts {
    MetricsOpts::default().with_process_collector(false)
}

fn counting_metrics() -> (Metrics, Arc<CountingRegisterer>) {
    let registry = Registry::new();
    let registerer = Arc::new(CountingRegisterer {
        registry: registry.clone(),
        calls: AtomicUsize::new(0),
    });
    let dyn_registerer: Arc<dyn Registerer> = Arc::clone(&registerer) as Arc<dyn Registerer>;
    let metrics = Metrics::with_registerer(opts(), registry, dyn_registerer).unwrap();
    (metrics, registerer)
}

#[test]
fn test_name_builder() {
    assert_eq!(build_name("ns", &["a", "", "b"], "c", '_').unwrap(), "ns_a_b_c");
    assert_eq!(build_name("", &[] as &[&str], "c", '_').unwrap(), "c");
    assert_eq!(
        build_name("ns", &["a"], "", '_'),
        Err(MetricsError::InvalidMetricName)
    );
}

#[test]
fn test_counter_round_trip() {
    let metrics = Metrics::new(opts()).unwrap().with_labels(&["a"]);

    metrics.counter_inc("requests_total", &["1"]);
    metrics.counter_add("requests_total", 5.0, &["1"]);
    metrics.counter_inc("requests_total", &["2"]);

    let counter = metrics.counter_vec("requests_total").unwrap();
    assert_eq!(counter.value(&["1"]).unwrap(), 6.0);
    assert_eq!(counter.value(&["2"]).unwrap(), 1.0);
}

#[test]
fn test_get_or_create_idempotence() {
    let (metrics, registerer) = counting_metrics();
    assert_eq!(registerer.calls.load(Ordering::SeqCst), INTERNAL_COUNTERS);

    metrics.counter_inc("hits_total", &[]);
    metrics.counter_inc("hits_total", &[]);

    assert_eq!(registerer.calls.load(Ordering::SeqCst), INTERNAL_COUNTERS + 1);
    assert_eq!(metrics.store().len(), 1);
    assert_eq!(
        metrics.counter_vec("hits_total").unwrap().value(&[]).unwrap(),
        2.0
    );
}

#[test]
fn test_label_cardinality_mismatch_is_recovered() {
    let metrics = Metrics::new(opts()).unwrap().with_labels(&["a", "b"]);

    metrics.counter_inc("mismatch_total", &["1"]);

    assert_eq!(
        metrics.internal_errors().count(
            ErrorKind::PanicRecovery,
            "mismatch_total",
            "counter_inc"
        ),
        1.0
    );
}

#[test]
#[should_panic]
fn test_label_cardinality_mismatch_panics_when_configured() {
    let metrics = Metrics::new(opts().with_panic_on_error(true))
        .unwrap()
        .with_labels(&["a", "b"]);

    metrics.counter_inc("mismatch_total", &["1"]);
}

#[test]
fn test_prefix_composition() {
    let root = Metrics::new(opts()).unwrap();
    let app = root.with_prefix(&["app", "sub"]);

    app.counter_inc("total", &[]);
    app.with_prefix(&["leaf"]).counter_inc("total", &[]);
    root.counter_inc("total", &[]);

    let store = root.store();
    assert!(store.contains("app_sub_total"));
    assert!(store.contains("app_sub_leaf_total"));
    assert!(store.contains("total"));
    assert_eq!(root.counter_vec("total").unwrap().value(&[]).unwrap(), 1.0);
    assert_eq!(app.counter_vec("total").unwrap().value(&[]).unwrap(), 1.0);
}

#[test]
fn test_histogram_and_summary_defaults() {
    let metrics = Metrics::new(opts()).unwrap();
    metrics.histogram_observe("latency", 0.3, &[]);
    metrics.summary_observe("size", 2.0, &[]);

    assert_eq!(
        metrics.histogram_vec("latency").unwrap().buckets(),
        &prometheus::DEFAULT_BUCKETS[..]
    );
    assert_eq!(metrics.summary_vec("size").unwrap().opts(), &SummaryOpts::default());
}

#[test]
fn test_concurrent_first_use() {
    let (metrics, registerer) = counting_metrics();
    let threads = 16;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let metrics = metrics.clone();
            thread::spawn(move || metrics.counter_inc("raced_total", &[]))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registerer.calls.load(Ordering::SeqCst), INTERNAL_COUNTERS + 1);
    assert_eq!(
        metrics.counter_vec("raced_total").unwrap().value(&[]).unwrap(),
        threads as f64
    );
}

#[test]
fn test_concurrent_mutation_across_names() {
    let metrics = Metrics::new(opts()).unwrap().with_labels(&["worker"]);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let metrics = metrics.clone();
            thread::spawn(move || {
                let worker = i.to_string();
                for _ in 0..250 {
                    metrics.counter_inc("jobs_total", &[&worker]);
                    metrics.gauge_inc("in_flight", &[&worker]);
                    metrics.gauge_dec("in_flight", &[&worker]);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let jobs = metrics.counter_vec("jobs_total").unwrap();
    let in_flight = metrics.gauge_vec("in_flight").unwrap();
    for i in 0..4 {
        let worker = i.to_string();
        assert_eq!(jobs.value(&[&worker]).unwrap(), 250.0);
        assert_eq!(in_flight.value(&[&worker]).unwrap(), 0.0);
    }
}

#[test]
fn test_keyed_label_resolution() {
    let metrics = Metrics::new(opts()).unwrap().with_labels(&["method", "route"]);
    metrics.counter_inc("requests_total", &["GET", "/"]);

    let counter = metrics.counter_vec("requests_total").unwrap();
    let labels = Labels::new().with("route", "/").with("method", "GET");
    counter.inc_labels(&labels).unwrap();

    assert_eq!(counter.value(&["GET", "/"]).unwrap(), 2.0);
}

#[test]
fn test_reordered_label_keys_hit_the_same_series() {
    let metrics = Metrics::new(opts()).unwrap();
    metrics.with_labels(&["a", "b"]).counter_inc("x_total", &["1", "2"]);
    metrics.with_labels(&["b", "a"]).counter_inc("x_total", &["2", "1"]);

    metrics.with_labels(&["a", "b"]).gauge_set("depth", 3.0, &["1", "2"]);
    metrics.with_labels(&["b", "a"]).gauge_sub("depth", 1.0, &["2", "1"]);

    let counter = metrics.counter_vec("x_total").unwrap();
    assert_eq!(counter.value(&["1", "2"]).unwrap(), 2.0);
    assert_eq!(metrics.gauge_vec("depth").unwrap().value(&["1", "2"]).unwrap(), 2.0);

    let output = metrics.render().unwrap();
    assert!(output.contains("x_total{a=\"1\",b=\"2\"} 2"));
    assert!(!output.contains("x_total{a=\"2\",b=\"1\"}"));
}

#[test]
fn test_foreign_label_key_is_recovered() {
    let metrics = Metrics::new(opts()).unwrap();
    metrics.with_labels(&["a", "b"]).counter_inc("x_total", &["1", "2"]);
    metrics.with_labels(&["a", "zzz"]).counter_inc("x_total", &["1", "9"]);
    metrics.with_labels(&["b"]).counter_inc("x_total", &["2"]);

    assert_eq!(
        metrics
            .internal_errors()
            .count(ErrorKind::PanicRecovery, "x_total", "counter_inc"),
        2.0
    );

    let output = metrics.render().unwrap();
    assert!(output.contains("x_total{a=\"1\",b=\"2\"} 1"));
    assert!(!output.contains("b=\"9\""));
}

#[test]
fn test_unsorted_histogram_buckets_fail_registration() {
    let metrics = Metrics::new(opts()).unwrap().with_histogram_buckets(vec![1.0, 0.5]);
    metrics.histogram_observe("h", 0.7, &[]);
    let mut timer = metrics.histogram_timer("h", &[]);
    assert!(timer.stop().is_none());

    let errors = metrics.internal_errors();
    assert_eq!(
        errors.count(ErrorKind::RegistrationFailed, "h", "histogram_observe"),
        1.0
    );
    assert_eq!(
        errors.count(ErrorKind::RegistrationFailed, "h", "histogram_timer"),
        1.0
    );
    assert_eq!(
        errors.count(ErrorKind::PanicRecovery, "h", "histogram_observe"),
        0.0
    );
    assert!(!metrics.store().contains("h"));
    assert!(!metrics.render().unwrap().contains("# TYPE h histogram"));
}

#[test]
fn test_exposition_format() {
    let metrics = Metrics::new(opts().with_namespace("apex")).unwrap();
    let example = metrics.with_prefix(&["example"]);

    example.with_labels(&["func"]).counter_inc("calls_total", &["main"]);
    example.histogram_observe("latency", 0.3, &[]);
    example.summary_observe("payload", 2.0, &[]);

    let output = metrics.render().unwrap();

    assert!(output.contains("# HELP apex_example_calls_total created automagically by apex"));
    assert!(output.contains("# TYPE apex_example_calls_total counter"));
    assert!(output.contains("apex_example_calls_total{func=\"main\"} 1"));

    assert!(output.contains("# TYPE apex_example_latency histogram"));
    assert!(output.contains("apex_example_latency_bucket{le=\"0.25\"} 0"));
    assert!(output.contains("apex_example_latency_bucket{le=\"0.5\"} 1"));
    assert!(output.contains("apex_example_latency_bucket{le=\"+Inf\"} 1"));
    assert!(output.contains("apex_example_latency_sum 0.3"));
    assert!(output.contains("apex_example_latency_count 1"));

    assert!(output.contains("# TYPE apex_example_payload summary"));
    assert!(output.contains("apex_example_payload{quantile=\"0.5\"} 2"));
    assert!(output.contains("apex_example_payload{quantile=\"0.99\"} 2"));
    assert!(output.contains("apex_example_payload_sum 2"));
    assert!(output.contains("apex_example_payload_count 1"));
}

#[test]
fn test_internal_errors_are_exposed() {
    let metrics = Metrics::new(opts().with_namespace("svc")).unwrap();
    metrics.counter_inc("", &[]);

    let output = metrics.render().unwrap();
    assert!(output.contains(
        "svc_apex_error_invalid_metric_name{name=\"\",operation=\"counter_inc\"} 1"
    ));
}

#[test]
fn test_external_collision_is_already_registered() {
    let registry = Registry::new();
    let taken = prometheus::Counter::new("taken_total", "registered elsewhere").unwrap();
    registry.register(Box::new(taken)).unwrap();

    let metrics = Metrics::with_registry(opts(), registry).unwrap();
    metrics.counter_inc("taken_total", &[]);
    metrics.counter_inc("taken_total", &[]);

    assert_eq!(
        metrics.internal_errors().count(
            ErrorKind::AlreadyRegistered,
            "taken_total",
            "counter_inc"
        ),
        2.0
    );
    assert!(!metrics.store().contains("taken_total"));
}
