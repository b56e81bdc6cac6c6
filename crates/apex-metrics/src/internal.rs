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
//! Counters recording failures the facade recovered from

use crate::error::{ErrorKind, MetricsResult};
use crate::name::build_name;
use crate::store::Store;
use crate::vec::CounterVec;

/// Label keys on every internal error counter
pub const ERROR_LABELS: [&str; 2] = ["name", "operation"];

/// One counter per [`ErrorKind`], labelled by metric name and operation
pub struct InternalErrorMetrics {
    panic_recovery: CounterVec,
    invalid_metric_name: CounterVec,
    registration_failed: CounterVec,
    already_registered: CounterVec,
}

impl InternalErrorMetrics {
    /// Register the four counters under `<namespace>_<prefix…>_apex_error_<kind>`.
    ///
    /// They go straight to the store's registerer and are not cached by it.
    pub fn register<S: AsRef<str>>(
        store: &Store,
        namespace: &str,
        prefix: &[S],
        separator: char,
    ) -> MetricsResult<Self> {
        let mut segments: Vec<&str> = prefix.iter().map(|s| s.as_ref()).collect();
        segments.extend(["apex", "error"]);
        let keys: Vec<String> = ERROR_LABELS.iter().map(|k| k.to_string()).collect();

        let create = |kind: ErrorKind| -> MetricsResult<CounterVec> {
            let name = build_name(namespace, &segments, kind.as_label(), separator)?;
            CounterVec::create(store.registerer(), &name, &keys, store.const_labels())
        };

        Ok(Self {
            panic_recovery: create(ErrorKind::PanicRecovery)?,
            invalid_metric_name: create(ErrorKind::InvalidMetricName)?,
            registration_failed: create(ErrorKind::RegistrationFailed)?,
            already_registered: create(ErrorKind::AlreadyRegistered)?,
        })
    }

    fn counter(&self, kind: ErrorKind) -> &CounterVec {
        match kind {
            ErrorKind::PanicRecovery => &self.panic_recovery,
            ErrorKind::InvalidMetricName => &self.invalid_metric_name,
            ErrorKind::RegistrationFailed => &self.registration_failed,
            ErrorKind::AlreadyRegistered => &self.already_registered,
        }
    }

    /// Count one failure of `operation` on `metric`
    pub fn record(&self, kind: ErrorKind, metric: &str, operation: &str) {
        // Two values for two declared keys: cannot fail.
        let _ = self.counter(kind).inc(&[metric, operation]);
    }

    /// Failures recorded so far for `(metric, operation)`
    pub fn count(&self, kind: ErrorKind, metric: &str, operation: &str) -> f64 {
        self.counter(kind).value(&[metric, operation]).unwrap_or(0.0)
    }

    /// Qualified name of the counter for `kind`
    pub fn name(&self, kind: ErrorKind) -> &str {
        self.counter(kind).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricsError;
    use prometheus::Registry;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn store() -> Store {
        Store::new(Arc::new(Registry::new()), HashMap::new())
    }

    #[test]
    fn test_internal_metric_names() {
        let store = store();
        let errors = InternalErrorMetrics::register(&store, "ns", &["app"], '_').unwrap();

        assert_eq!(
            errors.name(ErrorKind::PanicRecovery),
            "ns_app_apex_error_panic_recovery"
        );
        assert_eq!(
            errors.name(ErrorKind::AlreadyRegistered),
            "ns_app_apex_error_already_registered"
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_internal_metric_names_without_namespace() {
        let errors = InternalErrorMetrics::register(&store(), "", &[] as &[&str], '_').unwrap();
        assert_eq!(
            errors.name(ErrorKind::InvalidMetricName),
            "apex_error_invalid_metric_name"
        );
    }

    #[test]
    fn test_record_and_count() {
        let errors = InternalErrorMetrics::register(&store(), "", &[] as &[&str], '_').unwrap();

        errors.record(ErrorKind::RegistrationFailed, "m", "counter_inc");
        errors.record(ErrorKind::RegistrationFailed, "m", "counter_inc");
        errors.record(ErrorKind::RegistrationFailed, "m", "gauge_set");

        assert_eq!(errors.count(ErrorKind::RegistrationFailed, "m", "counter_inc"), 2.0);
        assert_eq!(errors.count(ErrorKind::RegistrationFailed, "m", "gauge_set"), 1.0);
        assert_eq!(errors.count(ErrorKind::PanicRecovery, "m", "counter_inc"), 0.0);
    }

    #[test]
    fn test_second_registration_fails() {
        let registry = Arc::new(Registry::new());
        let first = Store::new(registry.clone(), HashMap::new());
        let second = Store::new(registry, HashMap::new());

        InternalErrorMetrics::register(&first, "", &[] as &[&str], '_').unwrap();
        let err = InternalErrorMetrics::register(&second, "", &[] as &[&str], '_')
            .err()
            .unwrap();
        assert!(matches!(err, MetricsError::AlreadyRegistered(_)));
    }
}
