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
//! Backend registration seam

use prometheus::{core::Collector, Registry};

use crate::error::{MetricsError, MetricsResult};

/// Something collectors can be registered with.
///
/// Implemented for [`prometheus::Registry`]. Every store and collector
/// constructor receives one explicitly; there is no process-wide default.
pub trait Registerer: Send + Sync {
    /// Register a collector with the backend
    fn register(&self, collector: Box<dyn Collector>) -> prometheus::Result<()>;
}

impl Registerer for Registry {
    fn register(&self, collector: Box<dyn Collector>) -> prometheus::Result<()> {
        Registry::register(self, collector)
    }
}

/// Register `collector` and classify the backend error.
pub(crate) fn register(
    registerer: &dyn Registerer,
    name: &str,
    collector: Box<dyn Collector>,
) -> MetricsResult<()> {
    match registerer.register(collector) {
        Ok(()) => Ok(()),
        Err(prometheus::Error::AlreadyReg) => Err(MetricsError::AlreadyRegistered(name.to_string())),
        Err(e) => Err(MetricsError::registration_failed(name, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Counter, Gauge, Opts};

    #[test]
    fn test_register_classifies_duplicates() {
        let registry = Registry::new();
        let first = Counter::new("dup_total", "help").unwrap();
        let second = Counter::new("dup_total", "help").unwrap();

        assert!(register(&registry, "dup_total", Box::new(first)).is_ok());
        assert_eq!(
            register(&registry, "dup_total", Box::new(second)),
            Err(MetricsError::AlreadyRegistered("dup_total".into()))
        );
    }

    #[test]
    fn test_register_classifies_conflicting_shape() {
        let registry = Registry::new();
        // Same name, different constant label names.
        let first = Gauge::new("shape", "help").unwrap();
        let second = Gauge::with_opts(Opts::new("shape", "help").const_label("zone", "a")).unwrap();

        assert!(register(&registry, "shape", Box::new(first)).is_ok());
        let err = register(&registry, "shape", Box::new(second)).unwrap_err();
        assert!(matches!(err, MetricsError::RegistrationFailed { .. }));
    }
}
