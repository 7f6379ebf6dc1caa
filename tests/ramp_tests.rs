use prometheus::Gauge;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

use towd_bench::ramp::RampController;

const INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::test(start_paused = true)]
async fn client_count_grows_by_ten_every_interval() {
    let gauge = Gauge::new("test_client_count", "test").unwrap();
    let spawned = Arc::new(AtomicUsize::new(0));

    let controller = RampController::new(10, INTERVAL, gauge.clone());
    let counter = spawned.clone();
    tokio::spawn(controller.run(move |_worker_id| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    // Initial batch is spawned immediately.
    sleep(Duration::from_millis(1)).await;
    assert_eq!(gauge.get(), 10.0);
    assert_eq!(spawned.load(Ordering::SeqCst), 10);

    for t in 1..=5 {
        sleep(INTERVAL).await;
        let expected = 10 + 10 * t;
        assert_eq!(gauge.get(), expected as f64, "after {} intervals", t);
        assert_eq!(spawned.load(Ordering::SeqCst), expected);
    }
}

#[tokio::test(start_paused = true)]
async fn no_ramp_before_interval_elapses() {
    let gauge = Gauge::new("test_client_count", "test").unwrap();
    let controller = RampController::new(10, INTERVAL, gauge.clone());
    tokio::spawn(controller.run(|_| {}));

    sleep(INTERVAL - Duration::from_secs(1)).await;
    assert_eq!(gauge.get(), 10.0);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(gauge.get(), 20.0);
}

#[tokio::test(start_paused = true)]
async fn worker_ids_never_repeat() {
    let gauge = Gauge::new("test_client_count", "test").unwrap();
    let ids = Arc::new(std::sync::Mutex::new(Vec::new()));

    let controller = RampController::new(4, Duration::from_secs(60), gauge);
    let sink = ids.clone();
    tokio::spawn(controller.run(move |id| sink.lock().unwrap().push(id)));

    sleep(Duration::from_secs(150)).await;
    let ids = ids.lock().unwrap().clone();
    assert_eq!(ids, (0..12).collect::<Vec<_>>());
}
