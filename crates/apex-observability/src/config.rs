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
//! Logging configuration.
//!
//! Output format, filter directives and destination for the subscriber
//! installed by [`crate::init_tracing_with_config`].

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Filter used when neither the config nor `RUST_LOG` set one
pub const DEFAULT_FILTER: &str = "info";

/// Errors raised while installing the subscriber
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LogError {
    /// Unknown output format name
    #[error("Unknown log format: {0}. Expected one of: pretty, compact, json")]
    UnknownFormat(String),

    /// Filter directive that `EnvFilter` rejected
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter {
        /// Directive as given
        filter: String,
        /// Parser message
        reason: String,
    },

    /// A global subscriber is already set
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,
}

/// Output format for logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-readable
    #[default]
    Pretty,

    /// Single line per event
    Compact,

    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(LogError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        };
        f.write_str(name)
    }
}

/// Log output destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogOutput {
    /// Standard error
    #[default]
    Stderr,

    /// Standard output
    Stdout,
}

/// Configuration for logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Output format
    pub format: LogFormat,

    /// Filter directive (e.g. "info", "apex_metrics=debug").
    /// Falls back to `RUST_LOG`, then [`DEFAULT_FILTER`].
    pub level: Option<String>,

    /// Extra directives appended after the level, such as `hyper=warn`
    pub directives: Vec<String>,

    /// ANSI colors (ignored for JSON)
    pub use_color: bool,

    /// Timestamp on each event
    pub use_timestamps: bool,

    /// Thread IDs on each event
    pub include_thread_ids: bool,

    /// Target module names on each event
    pub include_targets: bool,

    /// Destination
    pub output: LogOutput,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Pretty,
            level: None,
            directives: Vec::new(),
            use_color: true,
            use_timestamps: true,
            include_thread_ids: false,
            include_targets: true,
            output: LogOutput::Stderr,
        }
    }
}

impl LogConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the filter directive
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Append one filter directive
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Enable or disable color output
    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    /// Enable or disable timestamps
    pub fn with_timestamps(mut self, use_timestamps: bool) -> Self {
        self.use_timestamps = use_timestamps;
        self
    }

    /// Enable or disable thread IDs
    pub fn with_thread_ids(mut self, include_thread_ids: bool) -> Self {
        self.include_thread_ids = include_thread_ids;
        self
    }

    /// Enable or disable target module names
    pub fn with_targets(mut self, include_targets: bool) -> Self {
        self.include_targets = include_targets;
        self
    }

    /// Set the output destination
    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Full filter string, reading `RUST_LOG` when no level is configured
    pub fn effective_filter(&self) -> String {
        self.resolve_filter(std::env::var("RUST_LOG").ok())
    }

    pub(crate) fn resolve_filter(&self, env: Option<String>) -> String {
        let base = [self.level.clone(), env]
            .into_iter()
            .flatten()
            .find(|filter| !filter.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        std::iter::once(base)
            .chain(self.directives.iter().cloned())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(
            "xml".parse::<LogFormat>(),
            Err(LogError::UnknownFormat("xml".to_string()))
        );
    }

    #[test]
    fn test_log_format_case_insensitive() {
        assert_eq!("PRETTY".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("Json".parse::<LogFormat>().unwrap(), LogFormat::Json);
    }

    #[test]
    fn test_log_format_display_round_trips() {
        for format in [LogFormat::Pretty, LogFormat::Compact, LogFormat::Json] {
            assert_eq!(format.to_string().parse::<LogFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_log_config_builder() {
        let config = LogConfig::new()
            .with_format(LogFormat::Json)
            .with_level("debug")
            .with_color(false)
            .with_timestamps(false)
            .with_thread_ids(true)
            .with_targets(false)
            .with_output(LogOutput::Stdout);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, Some("debug".to_string()));
        assert!(!config.use_color);
        assert!(!config.use_timestamps);
        assert!(config.include_thread_ids);
        assert!(!config.include_targets);
        assert_eq!(config.output, LogOutput::Stdout);
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.output, LogOutput::Stderr);
        assert!(config.use_color);
        assert!(config.use_timestamps);
    }

    #[test]
    fn test_level_overrides_env() {
        let config = LogConfig::new().with_level("warn");
        assert_eq!(config.resolve_filter(Some("trace".to_string())), "warn");
    }

    #[test]
    fn test_env_fallback() {
        let config = LogConfig::new();
        assert_eq!(config.resolve_filter(Some("trace".to_string())), "trace");
        assert_eq!(config.resolve_filter(Some("  ".to_string())), DEFAULT_FILTER);
        assert_eq!(config.resolve_filter(None), DEFAULT_FILTER);
    }

    #[test]
    fn test_directives_are_appended() {
        let config = LogConfig::new()
            .with_level("debug")
            .with_directive("hyper=warn")
            .with_directive("h2=warn");
        assert_eq!(config.resolve_filter(None), "debug,hyper=warn,h2=warn");
    }
}
