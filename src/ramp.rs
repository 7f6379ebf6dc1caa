use prometheus::Gauge;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::info;

/// Grows the worker pool by a fixed increment on a fixed schedule.
///
/// The pool never shrinks and spawned workers are not tracked: the total is
/// the only state kept, published through the client-count gauge.
pub struct RampController {
    increment: usize,
    interval: Duration,
    total: usize,
    client_count: Gauge,
}

impl RampController {
    pub fn new(increment: usize, interval: Duration, client_count: Gauge) -> Self {
        Self {
            increment,
            interval,
            total: 0,
            client_count,
        }
    }

    /// Number of workers spawned so far.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Spawns one batch of `increment` workers, ids continuing from the
    /// current total, and publishes the new total.
    pub fn ramp_once<F>(&mut self, spawn_worker: &mut F)
    where
        F: FnMut(usize),
    {
        for worker_id in self.total..self.total + self.increment {
            spawn_worker(worker_id);
        }
        self.total += self.increment;
        self.client_count.set(self.total as f64);

        info!(
            added = self.increment,
            total_clients = self.total,
            next_ramp_secs = self.interval.as_secs(),
            "Ramped up clients"
        );
    }

    /// Ramps immediately, then once every interval. Never returns.
    pub async fn run<F>(mut self, mut spawn_worker: F)
    where
        F: FnMut(usize),
    {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.ramp_once(&mut spawn_worker);
        }
    }
}
