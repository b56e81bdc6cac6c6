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

//! End-to-end tests for the exposition server over real sockets

use apex_metrics::{Metrics, MetricsOpts, ServerOpts, TlsOpts, TlsVersion};
use axum_server::Handle;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

fn metrics() -> Metrics {
    Metrics::new(
        MetricsOpts::default()
            .with_namespace("e2e")
            .with_process_collector(false),
    )
    .unwrap()
}

fn local_opts() -> ServerOpts {
    ServerOpts::with_port(0).with_bind_address("127.0.0.1")
}

async fn spawn_server(
    metrics: &Metrics,
    opts: ServerOpts,
) -> (SocketAddr, CancellationToken, JoinHandle<anyhow::Result<()>>) {
    let token = CancellationToken::new();
    let handle = Handle::new();
    let task = tokio::spawn(
        metrics
            .server(opts)
            .serve_with_handle(token.clone(), handle.clone()),
    );
    let addr = handle.listening().await.expect("server should bind");
    (addr, token, task)
}

async fn stop(token: CancellationToken, task: JoinHandle<anyhow::Result<()>>) {
    token.cancel();
    tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("server should stop within the grace period")
        .unwrap()
        .unwrap();
}

fn write_self_signed(dir: &Path) -> TlsOpts {
    let names = vec!["localhost".to_string(), "127.0.0.1".to_string()];
    let certified = rcgen::generate_simple_self_signed(names).unwrap();
    let cert_path = dir.join("cert.pem");
    let key_path = dir.join("key.pem");
    std::fs::write(&cert_path, certified.cert.pem()).unwrap();
    std::fs::write(&key_path, certified.key_pair.serialize_pem()).unwrap();
    TlsOpts::new(cert_path, key_path)
}

fn insecure_client() -> reqwest::Client {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_http_metrics_and_health() {
    let metrics = metrics();
    metrics
        .with_prefix(&["api"])
        .with_labels(&["route"])
        .counter_inc("requests_total", &["/home"]);

    let (addr, token, task) = spawn_server(&metrics, local_opts()).await;

    let response = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();
    assert!(response.status().is_success());
    let body = response.text().await.unwrap();
    assert!(body.contains("e2e_api_requests_total{route=\"/home\"} 1"));

    let health = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert!(health.status().is_success());
    assert_eq!(health.text().await.unwrap(), "OK");

    stop(token, task).await;
}

#[tokio::test]
async fn test_http_custom_path() {
    let metrics = metrics();
    metrics.gauge_set("temperature", 21.5, &[]);

    let (addr, token, task) = spawn_server(&metrics, local_opts().with_path("/stats")).await;

    let body = reqwest::get(format!("http://{}/stats", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("e2e_temperature 21.5"));

    let missing = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    stop(token, task).await;
}

#[tokio::test]
async fn test_http_reflects_updates_between_scrapes() {
    let metrics = metrics();
    let (addr, token, task) = spawn_server(&metrics, local_opts()).await;
    let url = format!("http://{}/metrics", addr);

    metrics.counter_inc("scrapes_total", &[]);
    let first = reqwest::get(&url).await.unwrap().text().await.unwrap();
    assert!(first.contains("e2e_scrapes_total 1"));

    metrics.counter_add("scrapes_total", 2.0, &[]);
    let second = reqwest::get(&url).await.unwrap().text().await.unwrap();
    assert!(second.contains("e2e_scrapes_total 3"));

    stop(token, task).await;
}

#[tokio::test]
async fn test_https_metrics() {
    let dir = TempDir::new().unwrap();
    let tls = write_self_signed(dir.path());

    let metrics = metrics();
    metrics.counter_inc("secure_total", &[]);

    let (addr, token, task) = spawn_server(&metrics, local_opts().with_tls(tls)).await;

    let client = insecure_client();
    let body = client
        .get(format!("https://{}/metrics", addr))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("e2e_secure_total 1"));
    drop(client);

    stop(token, task).await;
}

#[tokio::test]
async fn test_https_tls12_minimum() {
    let dir = TempDir::new().unwrap();
    let tls = write_self_signed(dir.path()).with_min_version(TlsVersion::Tls12);

    let metrics = metrics();
    let (addr, token, task) = spawn_server(&metrics, local_opts().with_tls(tls)).await;

    let response = insecure_client()
        .get(format!("https://{}/health", addr))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    stop(token, task).await;
}

#[tokio::test]
async fn test_plain_http_rejected_by_tls_server() {
    let dir = TempDir::new().unwrap();
    let tls = write_self_signed(dir.path());

    let metrics = metrics();
    let (addr, token, task) = spawn_server(&metrics, local_opts().with_tls(tls)).await;

    let result = reqwest::get(format!("http://{}/metrics", addr)).await;
    assert!(result.is_err());

    stop(token, task).await;
}

#[tokio::test]
async fn test_bind_conflict_is_reported() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let opts = ServerOpts::with_port(port).with_bind_address("127.0.0.1");
    let result = metrics()
        .start_http_server(CancellationToken::new(), opts)
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_start_rejects_invalid_opts() {
    let metrics = metrics();
    let result = metrics
        .start_http_server(CancellationToken::new(), local_opts().with_path("metrics"))
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_cancel_before_first_request() {
    let metrics = metrics();
    let (_, token, task) = spawn_server(&metrics, local_opts()).await;

    stop(token, task).await;
}
