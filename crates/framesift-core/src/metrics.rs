//! Search timing metrics with rolling averages.
//!
//! Lightweight in-memory collector for per-phase search timings
//! (`search.retrieve`, `search.fuse`, `search.rerank`, `search.total`).
//! Metrics are inherently global state: every search records to the same
//! collector, so access goes through [`global_metrics`].

use once_cell::sync::Lazy;
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Window for rolling averages. Searches are user-paced, so five minutes
/// captures a meaningful sample without unbounded growth.
const WINDOW: Duration = Duration::from_secs(300);

/// Maximum samples retained per metric.
const MAX_SAMPLES: usize = 1000;

/// A single timing sample with its recording time.
#[derive(Clone, Debug)]
struct TimingSample {
    timestamp: Instant,
    duration_ms: f64,
}

/// Rolling statistics for one metric.
#[derive(Debug, Default)]
struct MetricData {
    samples: VecDeque<TimingSample>,
    total_count: u64,
}

impl MetricData {
    fn record(&mut self, duration_ms: f64) {
        self.total_count += 1;
        self.samples.push_back(TimingSample {
            timestamp: Instant::now(),
            duration_ms,
        });
        while self.samples.len() > MAX_SAMPLES {
            self.samples.pop_front();
        }
    }

    fn prune(&mut self) {
        let Some(cutoff) = Instant::now().checked_sub(WINDOW) else {
            return;
        };
        while let Some(front) = self.samples.front() {
            if front.timestamp < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn rolling_average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f64 = self.samples.iter().map(|s| s.duration_ms).sum();
        Some(sum / self.samples.len() as f64)
    }
}

/// Thread-safe collector of named timing metrics.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: RwLock<HashMap<&'static str, MetricData>>,
}

impl MetricsCollector {
    /// Records one timing sample for `metric`.
    pub fn record(&self, metric: &'static str, duration_ms: f64) {
        if let Ok(mut metrics) = self.metrics.write() {
            metrics.entry(metric).or_default().record(duration_ms);
        }
    }

    /// Rolling average over the window, or `None` if nothing was recorded
    /// recently.
    pub fn rolling_average(&self, metric: &str) -> Option<f64> {
        let mut metrics = self.metrics.write().ok()?;
        let data = metrics.get_mut(metric)?;
        data.prune();
        data.rolling_average()
    }

    /// Lifetime sample count for `metric`.
    pub fn count(&self, metric: &str) -> u64 {
        self.metrics
            .read()
            .ok()
            .and_then(|m| m.get(metric).map(|d| d.total_count))
            .unwrap_or(0)
    }
}

static GLOBAL_METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::default);

/// The process-wide metrics collector.
pub fn global_metrics() -> &'static MetricsCollector {
    &GLOBAL_METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_average() {
        let collector = MetricsCollector::default();
        collector.record("phase", 10.0);
        collector.record("phase", 30.0);

        assert_eq!(collector.count("phase"), 2);
        let avg = collector.rolling_average("phase").unwrap();
        assert!((avg - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_metric_is_none() {
        let collector = MetricsCollector::default();
        assert_eq!(collector.rolling_average("nope"), None);
        assert_eq!(collector.count("nope"), 0);
    }

    #[test]
    fn test_sample_cap() {
        let collector = MetricsCollector::default();
        for i in 0..(MAX_SAMPLES + 50) {
            collector.record("busy", i as f64);
        }
        assert_eq!(collector.count("busy"), (MAX_SAMPLES + 50) as u64);
        // Average reflects only retained samples; all retained values are > 49
        assert!(collector.rolling_average("busy").unwrap() > 49.0);
    }
}
