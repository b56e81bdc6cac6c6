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
//! Apex: lazily registered Prometheus metrics addressed by name
//!
//! This crate wraps the `prometheus` client so application code can emit
//! metrics without declaring collectors up front:
//! - Counters, gauges, histograms and summaries created on first use
//! - Hierarchical names built from a namespace and prefix chain
//! - Label keys pinned at first registration
//! - Failures counted in internal error metrics instead of crashing the host
//! - An HTTP/HTTPS exposition endpoint with graceful shutdown
//!
//! # Example
//!
//! ```ignore
//! use apex_metrics::{Metrics, MetricsOpts, ServerOpts};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let metrics = Metrics::new(MetricsOpts::default().with_namespace("svc"))?;
//!
//!     let token = CancellationToken::new();
//!     let server = metrics.clone();
//!     let shutdown = token.clone();
//!     tokio::spawn(async move {
//!         server.start_http_server(shutdown, ServerOpts::with_port(9090)).await
//!     });
//!
//!     let http = metrics.with_prefix(&["http"]).with_labels(&["route"]);
//!     http.counter_inc("requests_total", &["/home"]);
//!     let _timer = http.histogram_timer("request_seconds", &["/home"]);
//!
//!     token.cancel();
//!     Ok(())
//! }
//! ```

pub mod buckets;
pub mod collector;
pub mod config;
pub mod error;
pub mod internal;
pub mod labels;
pub mod metrics;
pub mod name;
pub mod registerer;
pub mod server;
pub mod store;
pub mod timer;
pub mod types;
pub mod vec;

pub use collector::{Summary, SummaryCollector, SummarySnapshot};
pub use config::{ApexConfig, LoggingOpts, MetricsOpts, ServerOpts, SummaryConfig, TlsOpts, TlsVersion};
pub use error::{ErrorKind, MetricsError, MetricsResult};
pub use internal::InternalErrorMetrics;
pub use labels::{align_values, pairs_to_map, Labels};
pub use metrics::Metrics;
pub use name::build_name;
pub use registerer::Registerer;
pub use server::MetricsServer;
pub use store::{KindOpts, MetricVec, Store};
pub use timer::Timer;
pub use types::{MetricKind, Objective, SummaryOpts, DEFAULT_HELP, DEFAULT_OBJECTIVES};
pub use vec::{CounterVec, GaugeVec, HistogramVec, SummaryVec};

// Re-export prometheus types for convenience
pub use prometheus::{Encoder, Registry, TextEncoder};
