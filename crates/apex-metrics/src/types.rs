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
//! Common types shared by the collectors and the facade

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Help string attached to every collector created by the facade
pub const DEFAULT_HELP: &str = "created automagically by apex";

/// Default window over which summary observations stay relevant
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(10 * 60);

/// Default number of rotating age buckets in a summary window
pub const DEFAULT_AGE_BUCKETS: u32 = 5;

/// Metric kinds managed by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonic counter
    Counter,
    /// Arbitrary up/down value
    Gauge,
    /// Bucketed distribution
    Histogram,
    /// Windowed quantile distribution
    Summary,
}

impl MetricKind {
    /// Type name used in the exposition format
    pub fn as_label(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

/// A target quantile and its tolerated absolute error
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    /// Quantile rank in `[0, 1]`
    pub quantile: f64,
    /// Allowed absolute error on the rank
    pub error: f64,
}

impl Objective {
    /// Create an objective
    pub const fn new(quantile: f64, error: f64) -> Self {
        Self { quantile, error }
    }
}

/// Objectives used when a summary is created without explicit ones
pub const DEFAULT_OBJECTIVES: [Objective; 3] = [
    Objective::new(0.5, 0.05),
    Objective::new(0.9, 0.01),
    Objective::new(0.99, 0.001),
];

/// Options applied to summaries when they are first created
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOpts {
    /// Quantiles to report
    pub objectives: Vec<Objective>,
    /// How long an observation stays in the quantile window
    pub max_age: Duration,
    /// Number of buckets the window is split into
    pub age_buckets: u32,
}

impl Default for SummaryOpts {
    fn default() -> Self {
        Self {
            objectives: DEFAULT_OBJECTIVES.to_vec(),
            max_age: DEFAULT_MAX_AGE,
            age_buckets: DEFAULT_AGE_BUCKETS,
        }
    }
}

impl SummaryOpts {
    /// Replace zero or empty settings with their defaults
    pub fn defaulted(mut self) -> Self {
        if self.objectives.is_empty() {
            self.objectives = DEFAULT_OBJECTIVES.to_vec();
        }
        if self.max_age.is_zero() {
            self.max_age = DEFAULT_MAX_AGE;
        }
        if self.age_buckets == 0 {
            self.age_buckets = DEFAULT_AGE_BUCKETS;
        }
        self
    }

    /// Set the objectives
    pub fn with_objectives(mut self, objectives: Vec<Objective>) -> Self {
        self.objectives = objectives;
        self
    }

    /// Set the window length
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set the number of age buckets
    pub fn with_age_buckets(mut self, age_buckets: u32) -> Self {
        self.age_buckets = age_buckets;
        self
    }
}
