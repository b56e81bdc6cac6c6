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
//! Elapsed-time measurement recorded into a histogram or summary series
//!
//! A [`Timer`] records exactly once: on the first [`Timer::stop`], or when it
//! is dropped without being stopped. [`Timer::discard`] disarms it.

use prometheus::Histogram;
use std::time::{Duration, Instant};

use crate::collector::Summary;

enum Observer {
    Histogram(Histogram),
    Summary(Summary),
}

impl Observer {
    fn observe(&self, seconds: f64) {
        match self {
            Observer::Histogram(h) => h.observe(seconds),
            Observer::Summary(s) => s.observe(seconds),
        }
    }
}

/// Measures wall-clock time from creation until stopped or dropped
#[must_use = "a timer records when it is stopped or dropped"]
pub struct Timer {
    observer: Option<Observer>,
    start: Instant,
}

impl Timer {
    pub(crate) fn histogram(histogram: Histogram) -> Self {
        Self::armed(Observer::Histogram(histogram))
    }

    pub(crate) fn summary(summary: Summary) -> Self {
        Self::armed(Observer::Summary(summary))
    }

    fn armed(observer: Observer) -> Self {
        Self {
            observer: Some(observer),
            start: Instant::now(),
        }
    }

    /// A timer that never records anything
    pub fn noop() -> Self {
        Self {
            observer: None,
            start: Instant::now(),
        }
    }

    /// Record the elapsed seconds and return them.
    ///
    /// Returns `None` if the timer already recorded, was discarded, or is a
    /// no-op timer.
    pub fn stop(&mut self) -> Option<f64> {
        let observer = self.observer.take()?;
        let seconds = self.start.elapsed().as_secs_f64();
        observer.observe(seconds);
        Some(seconds)
    }

    /// Disarm the timer without recording
    pub fn discard(mut self) {
        self.observer = None;
    }

    /// Time since the timer started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Whether a later `stop` or drop would record
    pub fn is_armed(&self) -> bool {
        self.observer.is_some()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("armed", &self.is_armed())
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::HistogramOpts;

    fn histogram() -> Histogram {
        Histogram::with_opts(HistogramOpts::new("t", "help")).unwrap()
    }

    #[test]
    fn test_stop_is_one_shot() {
        let h = histogram();
        let mut timer = Timer::histogram(h.clone());

        let first = timer.stop();
        assert!(first.is_some());
        assert!(first.unwrap() >= 0.0);
        assert_eq!(timer.stop(), None);
        drop(timer);

        assert_eq!(h.get_sample_count(), 1);
    }

    #[test]
    fn test_drop_records_once() {
        let h = histogram();
        {
            let _timer = Timer::histogram(h.clone());
        }
        assert_eq!(h.get_sample_count(), 1);
    }

    #[test]
    fn test_discard_records_nothing() {
        let h = histogram();
        let timer = Timer::histogram(h.clone());
        assert!(timer.is_armed());
        timer.discard();
        assert_eq!(h.get_sample_count(), 0);
    }

    #[test]
    fn test_noop_timer() {
        let mut timer = Timer::noop();
        assert!(!timer.is_armed());
        assert_eq!(timer.stop(), None);
    }
}
