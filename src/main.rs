use tokio::sync::mpsc;
use tokio::task::JoinError;

use towd_bench::aggregator::{
    AggregatorHandle, LatencyAggregator, WindowGauges, SAMPLE_CHANNEL_CAPACITY,
};
use towd_bench::client::build_client;
use towd_bench::config::Config;
use towd_bench::errors::BenchError;
use towd_bench::logging::init_tracing;
use towd_bench::metrics::{
    bind_metrics_listener, register_metrics, serve_metrics, CLIENT_COUNT, LATENCY_PER_REQUEST,
    REQUESTS_PER_SECOND,
};
use towd_bench::payload::KanbanTable;
use towd_bench::ramp::RampController;
use towd_bench::worker::{run_worker, WorkerConfig};
use tracing::{error, info};

/// Prints helpful configuration documentation.
fn print_config_help() {
    eprintln!("Required environment variables:");
    eprintln!("  SERVER_BASE_URL  - Base URL of the server under test (http:// or https://)");
    eprintln!("  SESSION_SECRET   - Value of the session-secret cookie");
    eprintln!();
    eprintln!("Optional environment variables:");
    eprintln!("  RAMP_INCREMENT   - Workers added per ramp step (default: 10)");
    eprintln!("  RAMP_INTERVAL    - Time between ramp steps: 30s, 10m, 1h (default: 10m)");
    eprintln!("  WINDOW_DURATION  - Latency aggregation window (default: 5s)");
    eprintln!("  METRICS_PORT     - Port serving /metrics (default: 2112)");
    eprintln!("  LOG_FORMAT       - text or json (default: text)");
    eprintln!("  RUST_LOG         - Log filter (default: info)");
}

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}\n", e);
            print_config_help();
            std::process::exit(1);
        }
    };

    init_tracing(config.log_format);

    if let Err(e) = run(config).await {
        error!(error = %e, "Benchmark aborted");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), BenchError> {
    config.log_summary();

    let registry = prometheus::default_registry().clone();
    register_metrics(&registry)?;
    // Must be bound before the ramp spawns any worker.
    let metrics_listener = bind_metrics_listener(config.metrics_port)?;

    let body = KanbanTable::random().to_body()?;
    let client = build_client(&config.session_secret)?;
    let endpoint = config.endpoint();

    let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);

    let aggregator = LatencyAggregator::new(
        config.window_duration,
        WindowGauges {
            latency_per_request: LATENCY_PER_REQUEST.clone(),
            requests_per_second: REQUESTS_PER_SECOND.clone(),
        },
    );
    let AggregatorHandle { drain, ticker } = aggregator.spawn(sample_rx);

    let ramp = RampController::new(
        config.ramp_increment,
        config.ramp_interval,
        CLIENT_COUNT.clone(),
    );
    let ramp = tokio::spawn(ramp.run(move |worker_id| {
        let worker_config = WorkerConfig {
            worker_id,
            endpoint: endpoint.clone(),
            body: body.clone(),
        };
        tokio::spawn(run_worker(client.clone(), worker_config, sample_tx.clone()));
    }));

    tokio::select! {
        result = serve_metrics(metrics_listener, registry) => result,
        result = drain => Err(task_stopped("sample drain", result)),
        result = ticker => Err(task_stopped("window ticker", result)),
        result = ramp => Err(task_stopped("ramp controller", result)),
        signal = shutdown_signal() => {
            info!(signal, "Received shutdown signal, exiting");
            Ok(())
        }
    }
}

fn task_stopped(task: &'static str, result: Result<(), JoinError>) -> BenchError {
    match result {
        Ok(()) => BenchError::TaskStopped {
            task,
            reason: "returned".to_string(),
        },
        Err(e) => BenchError::TaskStopped {
            task,
            reason: e.to_string(),
        },
    }
}

/// Resolves on Ctrl-C, or on SIGTERM where available.
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn panicked_task_is_reported_as_stopped() {
        let handle = tokio::spawn(async { panic!("ticker blew up") });
        let err = task_stopped("window ticker", handle.await);

        let message = err.to_string();
        assert!(message.starts_with("window ticker task stopped:"), "{}", message);
        assert!(message.contains("panicked"), "{}", message);
    }

    #[tokio::test]
    async fn returned_task_is_reported_as_stopped() {
        let handle = tokio::spawn(async {});
        let err = task_stopped("sample drain", handle.await);
        assert_eq!(err.to_string(), "sample drain task stopped: returned");
    }
}
