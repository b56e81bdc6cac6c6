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
//! HTTP server for the Prometheus exposition endpoint
//!
//! Serves the registry in text exposition format on a configurable path
//! (`/metrics` by default) and a `/health` check, over HTTP or HTTPS.
//! The server runs until its [`CancellationToken`] is cancelled, then gives
//! in-flight requests the configured grace period.

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use prometheus::{Encoder, Registry, TextEncoder};
use rustls::pki_types::CertificateDer;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{debug, error, info};

use crate::config::{ServerOpts, TlsOpts, TlsVersion};

/// HTTP server for Prometheus metrics
#[derive(Clone)]
pub struct MetricsServer {
    registry: Registry,
    opts: ServerOpts,
}

impl MetricsServer {
    /// Create a server exposing `registry`
    pub fn new(registry: Registry, opts: ServerOpts) -> Self {
        Self { registry, opts }
    }

    /// Get the bind address for the server
    pub fn bind_address(&self) -> String {
        self.opts.socket_addr()
    }

    /// Routes served, with the request timeout applied
    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.opts.path, get(metrics_handler))
            .route("/health", get(health_handler))
            .layer(TimeoutLayer::new(self.opts.request_timeout()))
            .layer(TraceLayer::new_for_http())
            .with_state(self.registry.clone())
    }

    /// Serve until `token` is cancelled.
    ///
    /// Returns immediately when the server is disabled. Bind and TLS setup
    /// failures are returned as errors, without retry.
    pub async fn serve(self, token: CancellationToken) -> anyhow::Result<()> {
        self.serve_with_handle(token, Handle::new()).await
    }

    /// [`MetricsServer::serve`] with a caller-supplied handle, mainly to learn
    /// the bound address through [`Handle::listening`].
    pub async fn serve_with_handle(
        self,
        token: CancellationToken,
        handle: Handle,
    ) -> anyhow::Result<()> {
        if !self.opts.enabled {
            info!("Metrics server disabled");
            return Ok(());
        }

        let bind = self.opts.socket_addr();
        let addr = tokio::net::lookup_host(bind.as_str())
            .await
            .with_context(|| format!("Failed to resolve metrics address {}", bind))?
            .next()
            .with_context(|| format!("No address found for {}", bind))?;

        let tls_config = match &self.opts.tls {
            Some(tls) => Some(load_rustls_config(tls).await?),
            None => None,
        };

        let grace = self.opts.shutdown_grace_period();
        let shutdown = {
            let handle = handle.clone();
            let token = token.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                info!("Shutting down metrics server, grace period {:?}", grace);
                handle.graceful_shutdown(Some(grace));
            })
        };

        let app = self.router();
        let result = match tls_config {
            Some(config) => {
                info!("Starting metrics server on https://{}{}", addr, self.opts.path);
                axum_server::bind_rustls(addr, config)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await
            }
            None => {
                info!("Starting metrics server on http://{}{}", addr, self.opts.path);
                axum_server::bind(addr)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await
            }
        };
        shutdown.abort();

        result.map_err(|e| {
            error!("Metrics server error: {}", e);
            anyhow::anyhow!("Metrics server error: {}", e)
        })?;

        info!("Metrics server stopped");
        Ok(())
    }
}

/// Build the rustls server configuration from PEM files
async fn load_rustls_config(tls: &TlsOpts) -> anyhow::Result<RustlsConfig> {
    let cert_pem = tokio::fs::read(&tls.cert_file)
        .await
        .with_context(|| format!("Failed to read certificate {}", tls.cert_file.display()))?;
    let key_pem = tokio::fs::read(&tls.key_file)
        .await
        .with_context(|| format!("Failed to read private key {}", tls.key_file.display()))?;

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut &cert_pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!("Failed to parse certificate: {}", e))?;
    if certs.is_empty() {
        anyhow::bail!("No certificate found in {}", tls.cert_file.display());
    }

    let key = rustls_pemfile::private_key(&mut &key_pem[..])
        .map_err(|e| anyhow::anyhow!("Failed to parse private key: {}", e))?
        .ok_or_else(|| anyhow::anyhow!("No private key found in {}", tls.key_file.display()))?;

    let versions: &[&'static rustls::SupportedProtocolVersion] = match tls.min_version {
        TlsVersion::Tls12 => &[&rustls::version::TLS13, &rustls::version::TLS12],
        TlsVersion::Tls13 => &[&rustls::version::TLS13],
    };

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(versions)
        .map_err(|e| anyhow::anyhow!("Failed to select TLS versions: {}", e))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| anyhow::anyhow!("Failed to build TLS config: {}", e))?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    debug!("Loaded TLS certificate {}", tls.cert_file.display());
    Ok(RustlsConfig::from_config(Arc::new(config)))
}

/// Handler for the exposition path
async fn metrics_handler(State(registry): State<Registry>) -> Response {
    debug!("Serving metrics");

    let metric_families = registry.gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => {
            debug!("Successfully encoded {} metric families", metric_families.len());
            (
                StatusCode::OK,
                [("content-type", encoder.format_type())],
                buffer,
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

/// Handler for `/health` endpoint
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use prometheus::{Counter, Opts};
    use tower::ServiceExt;

    fn registry_with_counter() -> Registry {
        let registry = Registry::new();
        let counter = Counter::with_opts(Opts::new("served_total", "help")).unwrap();
        counter.inc();
        registry.register(Box::new(counter)).unwrap();
        registry
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_bind_address() {
        let server = MetricsServer::new(Registry::new(), ServerOpts::with_port(9191));
        assert_eq!(server.bind_address(), "0.0.0.0:9191");
    }

    #[tokio::test]
    async fn test_metrics_route() {
        let server = MetricsServer::new(registry_with_counter(), ServerOpts::default());
        let response = server
            .router()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/plain"));
        assert!(body_text(response).await.contains("served_total 1"));
    }

    #[tokio::test]
    async fn test_custom_path() {
        let opts = ServerOpts::default().with_path("/stats");
        let router = MetricsServer::new(registry_with_counter(), opts).router();

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_route() {
        let server = MetricsServer::new(Registry::new(), ServerOpts::default());
        let response = server
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn test_disabled_server() {
        let opts = ServerOpts::default().with_enabled(false);
        let server = MetricsServer::new(Registry::new(), opts);

        // Returns without waiting for cancellation.
        assert!(server.serve(CancellationToken::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_tls_files() {
        let opts = ServerOpts::with_port(0)
            .with_bind_address("127.0.0.1")
            .with_tls(TlsOpts::new("/nonexistent/cert.pem", "/nonexistent/key.pem"));
        let server = MetricsServer::new(Registry::new(), opts);

        let err = server.serve(CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read certificate"));
    }
}
