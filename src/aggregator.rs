//! Fixed-window latency aggregation.
//!
//! Workers push [`Sample`]s onto a channel. The aggregator runs two tasks
//! that share one lock-guarded [`Window`]: a drain task that folds each
//! incoming sample into the window, and a tick task that closes the window
//! every `window_duration`, publishing its average latency and request rate.

use prometheus::Gauge;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Capacity of the worker-to-aggregator sample channel.
pub const SAMPLE_CHANNEL_CAPACITY: usize = 1024;

/// One observed request round trip, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Sample(u64);

impl Sample {
    pub fn from_micros(micros: u64) -> Self {
        Sample(micros)
    }

    pub fn from_duration(elapsed: Duration) -> Self {
        Sample(u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX))
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }
}

/// Statistics of one closed window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSummary {
    pub sample_count: usize,
    /// Mean latency in microseconds, 0 when the window was empty.
    pub average_latency_us: f64,
    pub requests_per_second: f64,
}

/// Samples accumulated since the last window boundary.
#[derive(Debug, Default)]
pub struct Window {
    samples: Vec<Sample>,
}

impl Window {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Summarizes the accumulated samples and starts a new, empty window.
    pub fn close(&mut self, duration: Duration) -> WindowSummary {
        let samples = std::mem::take(&mut self.samples);
        summarize(&samples, duration)
    }
}

/// Computes the average latency and request rate of `samples` over `duration`.
///
/// An empty sample set, or a zero duration, reports zeros instead of dividing by zero.
pub fn summarize(samples: &[Sample], duration: Duration) -> WindowSummary {
    let sample_count = samples.len();
    if sample_count == 0 {
        return WindowSummary {
            sample_count,
            average_latency_us: 0.0,
            requests_per_second: 0.0,
        };
    }

    let total: f64 = samples.iter().map(|s| s.as_micros() as f64).sum();
    let secs = duration.as_secs_f64();

    WindowSummary {
        sample_count,
        average_latency_us: total / sample_count as f64,
        requests_per_second: if secs > 0.0 {
            sample_count as f64 / secs
        } else {
            0.0
        },
    }
}

/// The two gauges written at every window boundary.
#[derive(Clone)]
pub struct WindowGauges {
    pub latency_per_request: Gauge,
    pub requests_per_second: Gauge,
}

impl WindowGauges {
    fn publish(&self, summary: &WindowSummary) {
        self.latency_per_request.set(summary.average_latency_us);
        self.requests_per_second.set(summary.requests_per_second);
    }
}

/// Handles to the aggregator's two background tasks.
pub struct AggregatorHandle {
    pub drain: JoinHandle<()>,
    pub ticker: JoinHandle<()>,
}

pub struct LatencyAggregator {
    window_duration: Duration,
    gauges: WindowGauges,
    window: Arc<Mutex<Window>>,
}

impl LatencyAggregator {
    pub fn new(window_duration: Duration, gauges: WindowGauges) -> Self {
        Self {
            window_duration,
            gauges,
            window: Arc::new(Mutex::new(Window::new())),
        }
    }

    /// Shared window, exposed so callers can inspect what has been drained.
    pub fn window(&self) -> Arc<Mutex<Window>> {
        self.window.clone()
    }

    /// Starts the drain and tick tasks.
    pub fn spawn(self, samples: mpsc::Receiver<Sample>) -> AggregatorHandle {
        let drain = tokio::spawn(drain_samples(samples, self.window.clone()));
        let ticker = tokio::spawn(tick_windows(
            self.window_duration,
            self.window,
            self.gauges,
        ));
        AggregatorHandle { drain, ticker }
    }
}

/// Folds every received sample into the shared window, one receive per sample.
///
/// Returns once every sender is gone.
pub async fn drain_samples(mut samples: mpsc::Receiver<Sample>, window: Arc<Mutex<Window>>) {
    while let Some(sample) = samples.recv().await {
        window.lock().await.push(sample);
    }
    debug!("Sample channel closed, drain task stopping");
}

async fn tick_windows(window_duration: Duration, window: Arc<Mutex<Window>>, gauges: WindowGauges) {
    // First boundary is one full window after start.
    let mut ticker = time::interval_at(Instant::now() + window_duration, window_duration);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let summary = window.lock().await.close(window_duration);
        gauges.publish(&summary);

        info!(
            samples = summary.sample_count,
            avg_latency_us = summary.average_latency_us,
            requests_per_second = summary.requests_per_second,
            "Window closed"
        );
    }
}
