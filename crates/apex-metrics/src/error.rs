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
//! Error types for metric naming, registration and mutation.

use thiserror::Error;

/// Errors raised while resolving, registering or mutating a metric.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("Invalid metric name: the leaf name must not be empty")]
    InvalidMetricName,

    #[error("Unable to register collector {name}: {reason}")]
    RegistrationFailed { name: String, reason: String },

    #[error("Metric {0} is already registered")]
    AlreadyRegistered(String),

    #[error("Label cardinality mismatch for {name}: expected {expected} values, got {got}")]
    LabelCardinalityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Counter {name} cannot decrease: got delta {delta}")]
    NegativeCounterDelta { name: String, delta: f64 },

    #[error("Label {key} is declared by {name} but was not supplied")]
    MissingLabel { name: String, key: String },

    #[error("Label pairs must have an even length, got {0} values")]
    OddLabelPairs(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error reading configuration file: {0}")]
    ConfigIo(String),

    #[error("Failed to parse TOML configuration: {0}")]
    ConfigParse(String),
}

impl MetricsError {
    /// Build a [`MetricsError::RegistrationFailed`] for `name`.
    pub fn registration_failed(name: impl Into<String>, reason: impl ToString) -> Self {
        MetricsError::RegistrationFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// The internal error counter this error is recorded under.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetricsError::InvalidMetricName => ErrorKind::InvalidMetricName,
            MetricsError::AlreadyRegistered(_) => ErrorKind::AlreadyRegistered,
            MetricsError::LabelCardinalityMismatch { .. }
            | MetricsError::MissingLabel { .. }
            | MetricsError::OddLabelPairs(_)
            | MetricsError::NegativeCounterDelta { .. } => ErrorKind::PanicRecovery,
            MetricsError::RegistrationFailed { .. }
            | MetricsError::InvalidConfig(_)
            | MetricsError::ConfigIo(_)
            | MetricsError::ConfigParse(_) => ErrorKind::RegistrationFailed,
        }
    }
}

impl From<std::io::Error> for MetricsError {
    fn from(err: std::io::Error) -> Self {
        MetricsError::ConfigIo(err.to_string())
    }
}

impl From<toml::de::Error> for MetricsError {
    fn from(err: toml::de::Error) -> Self {
        MetricsError::ConfigParse(err.to_string())
    }
}

/// Result alias used across the crate.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Categories of faults tracked by the internal error counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A backend fatal condition was contained at the facade boundary
    PanicRecovery,
    /// The metric name could not be built
    InvalidMetricName,
    /// The backend rejected the collector
    RegistrationFailed,
    /// The backend already holds an identical collector
    AlreadyRegistered,
}

impl ErrorKind {
    /// All kinds, in registration order.
    pub const ALL: [ErrorKind; 4] = [
        ErrorKind::PanicRecovery,
        ErrorKind::InvalidMetricName,
        ErrorKind::RegistrationFailed,
        ErrorKind::AlreadyRegistered,
    ];

    /// Leaf name of the internal counter for this kind
    pub fn as_label(&self) -> &'static str {
        match self {
            ErrorKind::PanicRecovery => "panic_recovery",
            ErrorKind::InvalidMetricName => "invalid_metric_name",
            ErrorKind::RegistrationFailed => "registration_failed",
            ErrorKind::AlreadyRegistered => "already_registered",
        }
    }
}
