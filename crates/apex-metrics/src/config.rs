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
//! Configuration for the facade, the exposition server and logging
//!
//! Every section has working defaults, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! [metrics]
//! namespace = "svc"
//! prefix = ["http"]
//! constant_labels = ["role", "server"]
//! histogram_buckets = [0.01, 0.1, 1.0]
//!
//! [metrics.summary]
//! max_age_secs = 300
//!
//! [server]
//! port = 9100
//!
//! [server.tls]
//! cert_file = "/etc/apex/cert.pem"
//! key_file = "/etc/apex/key.pem"
//! min_version = "1.2"
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{MetricsError, MetricsResult};
use crate::labels::{pairs_to_map, Labels};
use crate::types::{Objective, SummaryOpts, DEFAULT_AGE_BUCKETS, DEFAULT_MAX_AGE};

/// Instrumentation settings for a root [`crate::Metrics`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsOpts {
    /// First segment of every metric name; empty for none
    pub namespace: String,
    /// Segments placed between the namespace and the leaf name
    pub prefix: Vec<String>,
    /// Character joining name segments
    pub separator: char,
    /// Flat `key, value, key, value` list attached to every collector
    pub constant_labels: Vec<String>,
    /// Bucket upper bounds for new histograms; empty selects the backend defaults
    pub histogram_buckets: Vec<f64>,
    /// Settings for new summaries
    pub summary: SummaryConfig,
    /// Panic on failures instead of recording them
    pub panic_on_error: bool,
    /// Register the process collector (Linux only)
    pub register_process_collector: bool,
}

impl Default for MetricsOpts {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            prefix: Vec::new(),
            separator: '_',
            constant_labels: Vec::new(),
            histogram_buckets: Vec::new(),
            summary: SummaryConfig::default(),
            panic_on_error: false,
            register_process_collector: true,
        }
    }
}

impl MetricsOpts {
    /// Set the namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the prefix segments
    pub fn with_prefix<S: Into<String>>(mut self, prefix: impl IntoIterator<Item = S>) -> Self {
        self.prefix = prefix.into_iter().map(Into::into).collect();
        self
    }

    /// Set the separator
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Set the constant labels from a flat pair list
    pub fn with_constant_labels<S: Into<String>>(
        mut self,
        pairs: impl IntoIterator<Item = S>,
    ) -> Self {
        self.constant_labels = pairs.into_iter().map(Into::into).collect();
        self
    }

    /// Set the default histogram buckets
    pub fn with_histogram_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.histogram_buckets = buckets;
        self
    }

    /// Set the default summary settings
    pub fn with_summary(mut self, summary: SummaryConfig) -> Self {
        self.summary = summary;
        self
    }

    /// Panic on failures instead of recording them
    pub fn with_panic_on_error(mut self, panic_on_error: bool) -> Self {
        self.panic_on_error = panic_on_error;
        self
    }

    /// Enable or disable the process collector
    pub fn with_process_collector(mut self, enabled: bool) -> Self {
        self.register_process_collector = enabled;
        self
    }

    /// Decoded constant labels
    pub fn const_labels(&self) -> MetricsResult<Labels> {
        pairs_to_map(&self.constant_labels)
    }

    /// Check the settings before they are used
    pub fn validate(&self) -> MetricsResult<()> {
        if self.separator.is_whitespace() {
            return Err(MetricsError::InvalidConfig(
                "separator must not be whitespace".to_string(),
            ));
        }

        self.const_labels()?;

        if self.histogram_buckets.iter().any(|b| b.is_nan()) {
            return Err(MetricsError::InvalidConfig(
                "histogram buckets must not contain NaN".to_string(),
            ));
        }
        if let Some(pair) = self
            .histogram_buckets
            .windows(2)
            .find(|pair| pair[0] >= pair[1])
        {
            return Err(MetricsError::InvalidConfig(format!(
                "histogram buckets must be strictly increasing, found {} before {}",
                pair[0], pair[1]
            )));
        }

        self.summary.validate()
    }
}

/// File form of [`SummaryOpts`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Quantiles to report; empty selects the defaults
    pub objectives: Vec<Objective>,
    /// Window length in seconds
    pub max_age_secs: u64,
    /// Number of rotating buckets in the window
    pub age_buckets: u32,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            objectives: Vec::new(),
            max_age_secs: DEFAULT_MAX_AGE.as_secs(),
            age_buckets: DEFAULT_AGE_BUCKETS,
        }
    }
}

impl SummaryConfig {
    /// Runtime options, with empty or zero fields defaulted
    pub fn to_opts(&self) -> SummaryOpts {
        SummaryOpts {
            objectives: self.objectives.clone(),
            max_age: Duration::from_secs(self.max_age_secs),
            age_buckets: self.age_buckets,
        }
        .defaulted()
    }

    fn validate(&self) -> MetricsResult<()> {
        for objective in &self.objectives {
            if !(0.0..=1.0).contains(&objective.quantile) {
                return Err(MetricsError::InvalidConfig(format!(
                    "summary quantile {} is outside [0, 1]",
                    objective.quantile
                )));
            }
            if objective.error < 0.0 {
                return Err(MetricsError::InvalidConfig(format!(
                    "summary objective error {} is negative",
                    objective.error
                )));
            }
        }
        Ok(())
    }
}

/// Minimum TLS protocol version accepted by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TlsVersion {
    /// TLS 1.2 and 1.3
    #[serde(rename = "1.2")]
    Tls12,
    /// TLS 1.3 only
    #[default]
    #[serde(rename = "1.3")]
    Tls13,
}

/// Certificate and key for serving over HTTPS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsOpts {
    /// PEM certificate chain
    pub cert_file: PathBuf,
    /// PEM private key
    pub key_file: PathBuf,
    /// Lowest protocol version negotiated
    #[serde(default)]
    pub min_version: TlsVersion,
}

impl TlsOpts {
    /// TLS from a certificate and key, TLS 1.3 only
    pub fn new(cert_file: impl Into<PathBuf>, key_file: impl Into<PathBuf>) -> Self {
        Self {
            cert_file: cert_file.into(),
            key_file: key_file.into(),
            min_version: TlsVersion::default(),
        }
    }

    /// Set the minimum protocol version
    pub fn with_min_version(mut self, min_version: TlsVersion) -> Self {
        self.min_version = min_version;
        self
    }
}

/// Exposition server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerOpts {
    /// Whether the server runs at all
    pub enabled: bool,
    /// Address to bind
    pub bind_address: String,
    /// Port to bind
    pub port: u16,
    /// Path serving the exposition text
    pub path: String,
    /// Serve HTTPS when set
    pub tls: Option<TlsOpts>,
    /// Upper bound on a single request, in seconds
    pub request_timeout_secs: u64,
    /// Time in-flight requests get after shutdown starts, in seconds
    pub shutdown_grace_period_secs: u64,
}

impl Default for ServerOpts {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0".to_string(),
            port: 9090,
            path: "/metrics".to_string(),
            tls: None,
            request_timeout_secs: 5,
            shutdown_grace_period_secs: 5,
        }
    }
}

impl ServerOpts {
    /// Default settings on `port`
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn with_bind_address(mut self, bind_address: impl Into<String>) -> Self {
        self.bind_address = bind_address.into();
        self
    }

    /// Set the exposition path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Serve over HTTPS
    pub fn with_tls(mut self, tls: TlsOpts) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Enable or disable the server
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the shutdown grace period
    pub fn with_shutdown_grace_period(mut self, grace: Duration) -> Self {
        self.shutdown_grace_period_secs = grace.as_secs();
        self
    }

    /// `address:port` string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Grace period as a duration
    pub fn shutdown_grace_period(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_period_secs)
    }

    /// Check the settings before they are used
    pub fn validate(&self) -> MetricsResult<()> {
        if !self.path.starts_with('/') {
            return Err(MetricsError::InvalidConfig(format!(
                "server path must start with '/', got {:?}",
                self.path
            )));
        }
        if self.path == "/health" {
            return Err(MetricsError::InvalidConfig(
                "server path /health is reserved".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(MetricsError::InvalidConfig(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging settings, applied by binaries when they install a subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOpts {
    /// Filter directive; `RUST_LOG` is used when unset
    pub level: Option<String>,
    /// `pretty`, `compact` or `json`
    pub format: String,
    /// Colored output
    pub color: bool,
    /// Timestamps on each line
    pub timestamps: bool,
}

impl Default for LoggingOpts {
    fn default() -> Self {
        Self {
            level: None,
            format: "pretty".to_string(),
            color: true,
            timestamps: true,
        }
    }
}

/// Complete configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApexConfig {
    /// Instrumentation settings
    pub metrics: MetricsOpts,
    /// Exposition server settings
    pub server: ServerOpts,
    /// Logging settings
    pub logging: LoggingOpts,
}

impl ApexConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> MetricsResult<Self> {
        let config: ApexConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub async fn load_file<P: AsRef<Path>>(path: P) -> MetricsResult<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&content)?;

        info!("Loaded configuration file: {}", path.display());
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> MetricsResult<()> {
        self.metrics.validate()?;
        self.server.validate()
    }
}
