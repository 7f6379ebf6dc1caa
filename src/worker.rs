use hyper::body::Bytes;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{debug, error};

use crate::aggregator::Sample;
use crate::errors::ErrorCategory;
use crate::metrics::REQUEST_ERRORS_TOTAL;

/// Configuration for a worker task.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: usize,
    pub endpoint: String,
    pub body: Bytes,
}

/// Sends one POST and reads the whole response body.
///
/// Returns the time from just before sending to just after the last body
/// chunk was read. Any HTTP status counts as a completed round trip.
pub async fn issue_request(
    client: &reqwest::Client,
    endpoint: &str,
    body: Bytes,
) -> Result<Duration, reqwest::Error> {
    let start = Instant::now();

    let mut response = client.post(endpoint).body(body).send().await?;
    let status = response.status();

    // Stream and discard the body instead of buffering it.
    while response.chunk().await?.is_some() {}

    let elapsed = start.elapsed();
    if !status.is_success() {
        debug!(status_code = status.as_u16(), "Non-success response");
    }
    Ok(elapsed)
}

/// Runs a worker that posts the payload back to back, forever.
///
/// Every completed round trip becomes one [`Sample`]. Failures are logged
/// and retried immediately without producing a sample. The loop only ends
/// if the sample channel has been closed.
pub async fn run_worker(
    client: reqwest::Client,
    config: WorkerConfig,
    samples: mpsc::Sender<Sample>,
) {
    debug!(
        worker_id = config.worker_id,
        endpoint = %config.endpoint,
        "Worker starting"
    );

    loop {
        match issue_request(&client, &config.endpoint, config.body.clone()).await {
            Ok(elapsed) => {
                if samples.send(Sample::from_duration(elapsed)).await.is_err() {
                    debug!(worker_id = config.worker_id, "Sample channel closed, worker stopping");
                    return;
                }
            }
            Err(e) => {
                let category = ErrorCategory::from_reqwest_error(&e);
                REQUEST_ERRORS_TOTAL
                    .with_label_values(&[category.label()])
                    .inc();

                error!(
                    worker_id = config.worker_id,
                    error = %e,
                    error_category = %category,
                    "Request failed"
                );

                if samples.is_closed() {
                    return;
                }
                // Retry right away, after letting other tasks run.
                tokio::task::yield_now().await;
            }
        }
    }
}
