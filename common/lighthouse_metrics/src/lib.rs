//! A wrapper around the `prometheus` crate that provides a global, `lazy_static` metrics registry
//! and functions to add and use the following components (more info at
//! [Prometheus docs](https://prometheus.io/docs/concepts/metric_types/)):
//!
//! - `Histogram`: used with `start_timer(..)` and `stop_timer(..)` to record durations.
//! - `IntCounter`: used to represent an ideally ever-growing, never-shrinking integer.
//! - `IntGauge`: used to represent an varying integer (e.g., number of subscriptions).
//!
//! ## Important
//!
//! Metrics will fail if two items have the same `name`. All metrics must have a unique `name`.
//! Because we use a global registry there is no namespace per crate, it's one big global space.
//!
//! Functions which create metrics return `Result`s. The functions which use metrics accept
//! `&Result` so a metric which failed to register (e.g., a duplicate name) is silently ignored
//! instead of panicking at runtime.
//!
//! ## Example
//!
//! ```rust
//! #[macro_use]
//! extern crate lazy_static;
//! use lighthouse_metrics::*;
//!
//! lazy_static! {
//!     pub static ref RUN_COUNT: Result<IntCounter> = try_create_int_counter(
//!         "runs_total",
//!         "Total number of runs"
//!     );
//! }
//!
//! fn main() {
//!     inc_counter(&RUN_COUNT);
//! }
//! ```

use prometheus::{HistogramOpts, Opts};

pub use prometheus::{
    Encoder, Gauge, Histogram, HistogramTimer, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Result, TextEncoder,
};

/// Collect all the metrics for reporting.
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    prometheus::gather()
}

/// Attempts to create an `IntCounter`, returning `Err` if the registry does not accept the counter
/// (potentially due to naming conflict).
pub fn try_create_int_counter(name: &str, help: &str) -> Result<IntCounter> {
    let opts = Opts::new(name, help);
    let counter = IntCounter::with_opts(opts)?;
    prometheus::register(Box::new(counter.clone()))?;
    Ok(counter)
}

/// Attempts to create an `IntGauge`, returning `Err` if the registry does not accept the gauge
/// (potentially due to naming conflict).
pub fn try_create_int_gauge(name: &str, help: &str) -> Result<IntGauge> {
    let opts = Opts::new(name, help);
    let gauge = IntGauge::with_opts(opts)?;
    prometheus::register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// Attempts to create a `Histogram`, returning `Err` if the registry does not accept the histogram
/// (potentially due to naming conflict).
pub fn try_create_histogram(name: &str, help: &str) -> Result<Histogram> {
    let opts = HistogramOpts::new(name, help);
    let histogram = Histogram::with_opts(opts)?;
    prometheus::register(Box::new(histogram.clone()))?;
    Ok(histogram)
}

/// Attempts to create an `IntCounterVec`, returning `Err` if the registry does not accept the
/// counter (potentially due to naming conflict).
pub fn try_create_int_counter_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<IntCounterVec> {
    let opts = Opts::new(name, help);
    let counter_vec = IntCounterVec::new(opts, label_names)?;
    prometheus::register(Box::new(counter_vec.clone()))?;
    Ok(counter_vec)
}

/// Starts a timer for the given `Histogram`, stopping when it gets dropped or given to `stop_timer(..)`.
pub fn start_timer(histogram: &Result<Histogram>) -> Option<HistogramTimer> {
    if let Ok(histogram) = histogram {
        Some(histogram.start_timer())
    } else {
        None
    }
}

/// Stops a timer created with `start_timer(..)`.
pub fn stop_timer(timer: Option<HistogramTimer>) {
    if let Some(t) = timer {
        t.observe_duration()
    }
}

pub fn inc_counter(counter: &Result<IntCounter>) {
    if let Ok(counter) = counter {
        counter.inc();
    }
}

pub fn inc_counter_by(counter: &Result<IntCounter>, value: u64) {
    if let Ok(counter) = counter {
        counter.inc_by(value);
    }
}

/// Increments the `IntCounterVec` entry with the given `name`, if it exists.
pub fn inc_counter_vec(int_counter_vec: &Result<IntCounterVec>, name: &[&str]) {
    if let Ok(counter_vec) = int_counter_vec {
        if let Ok(counter) = counter_vec.get_metric_with_label_values(name) {
            counter.inc()
        }
    }
}

/// Increments the `IntCounterVec` entry with the given `name`, if it exists, by `amount`.
pub fn inc_counter_vec_by(int_counter_vec: &Result<IntCounterVec>, name: &[&str], amount: u64) {
    if let Ok(counter_vec) = int_counter_vec {
        if let Ok(counter) = counter_vec.get_metric_with_label_values(name) {
            counter.inc_by(amount);
        }
    }
}

pub fn set_gauge(gauge: &Result<IntGauge>, value: i64) {
    if let Ok(gauge) = gauge {
        gauge.set(value);
    }
}

pub fn inc_gauge(gauge: &Result<IntGauge>) {
    if let Ok(gauge) = gauge {
        gauge.inc();
    }
}

pub fn dec_gauge(gauge: &Result<IntGauge>) {
    if let Ok(gauge) = gauge {
        gauge.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_rejected_without_panicking() {
        let first = try_create_int_counter("lighthouse_metrics_test_duplicate", "first");
        let second = try_create_int_counter("lighthouse_metrics_test_duplicate", "second");

        assert!(first.is_ok());
        assert!(second.is_err());

        // Using a metric which failed to register is a no-op.
        inc_counter(&second);
        inc_counter(&first);
        assert_eq!(first.as_ref().map(|c| c.get()).ok(), Some(1));
    }

    #[test]
    fn gauges_move_both_ways() {
        let gauge = try_create_int_gauge("lighthouse_metrics_test_gauge", "gauge");
        inc_gauge(&gauge);
        inc_gauge(&gauge);
        dec_gauge(&gauge);
        assert_eq!(gauge.as_ref().map(|g| g.get()).ok(), Some(1));
        set_gauge(&gauge, 42);
        assert_eq!(gauge.as_ref().map(|g| g.get()).ok(), Some(42));
    }
}
