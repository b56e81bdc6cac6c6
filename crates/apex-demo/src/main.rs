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
//! apex-demo: a synthetic workload exercising every metric kind.
//!
//! Serves the results on `/metrics` until Ctrl-C.

use anyhow::{Context, Result};
use apex_metrics::{ApexConfig, LoggingOpts, Metrics, MetricsOpts, SummaryConfig, TlsOpts};
use apex_observability::{init_tracing_with_config, LogConfig, LogFormat};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "apex-demo")]
#[command(version, about = "Synthetic workload instrumented with apex-metrics")]
struct Cli {
    /// TOML configuration file; built-in demo settings are used when absent
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Port for the exposition server
    #[arg(short, long)]
    port: Option<u16>,

    /// Address for the exposition server
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// PEM certificate; serves HTTPS together with --key
    #[arg(long, value_name = "PATH", requires = "key")]
    cert: Option<PathBuf>,

    /// PEM private key
    #[arg(long, value_name = "PATH", requires = "cert")]
    key: Option<PathBuf>,

    /// Log format (pretty|compact|json)
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ApexConfig::load_file(path)
            .await
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => demo_config(),
    };
    apply_overrides(&mut config, &cli);
    config.validate()?;

    init_tracing_with_config(log_config(&config.logging)?)?;

    let metrics = Metrics::new(config.metrics.clone())?.with_prefix(&["apex", "example"]);

    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutting down"),
                Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
            }
            token.cancel();
        }
    });

    let server = tokio::spawn({
        let metrics = metrics.clone();
        let token = token.clone();
        let opts = config.server.clone();
        async move { metrics.start_http_server(token, opts).await }
    });

    let workload = tokio::spawn(run_loop(metrics, token.clone()));

    let served = server.await?;
    if served.is_err() {
        // No endpoint to scrape; stop the workload too.
        token.cancel();
    }
    workload.await?;
    served
}

/// Settings matching the upstream example program
fn demo_config() -> ApexConfig {
    ApexConfig {
        metrics: MetricsOpts::default()
            .with_separator(':')
            .with_panic_on_error(true)
            .with_constant_labels(["role", "server"])
            .with_histogram_buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5])
            .with_summary(SummaryConfig::default()),
        ..Default::default()
    }
}

fn apply_overrides(config: &mut ApexConfig, cli: &Cli) {
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(bind) = &cli.bind {
        config.server.bind_address = bind.clone();
    }
    if let (Some(cert), Some(key)) = (&cli.cert, &cli.key) {
        config.server.tls = Some(TlsOpts::new(cert, key));
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }
}

fn log_config(logging: &LoggingOpts) -> Result<LogConfig> {
    let format: LogFormat = logging.format.parse()?;
    let mut config = LogConfig::new()
        .with_format(format)
        .with_color(logging.color)
        .with_timestamps(logging.timestamps)
        .with_directive("hyper=warn");
    if let Some(level) = &logging.level {
        config = config.with_level(level);
    }
    Ok(config)
}

async fn run_loop(metrics: Metrics, token: CancellationToken) {
    let mut rng = StdRng::from_entropy();
    let runonce = metrics.with_prefix(&["runonce"]);

    while !token.is_cancelled() {
        metrics.counter_inc("loop_total", &[]);
        run_once(&runonce, &mut rng, &token).await;
    }
}

async fn run_once(metrics: &Metrics, rng: &mut StdRng, token: &CancellationToken) {
    let _timer = metrics.histogram_timer("latency", &[]);

    let n = metrics.with_prefix(&["func"]).with_labels(&["label"]);
    n.counter_inc("test_counter", &["value1"]);
    n.counter_add("test_counter", 5.0, &["value1"]);

    n.gauge_inc("test_gauge", &["value2"]);
    n.gauge_set("test_gauge", rng.gen_range(1.0..100.0), &["value2"]);
    n.gauge_add("test_gauge", 2.0, &["value2"]);
    n.gauge_sub("test_gauge", 1.0, &["value2"]);

    n.summary_observe("test_summary", rng.gen_range(0.0..10.0), &["value3"]);

    let delay = Duration::from_millis(rng.gen_range(1..1500));
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = token.cancelled() => {}
    }
}
