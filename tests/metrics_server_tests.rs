use prometheus::Registry;
use tokio::time::{sleep, Duration};

use towd_bench::errors::BenchError;
use towd_bench::metrics::{
    bind_metrics_listener, register_metrics, render_metrics, serve_metrics, CLIENT_COUNT, LATENCY_PER_REQUEST,
    REQUESTS_PER_SECOND,
};

async fn start_server() -> String {
    let registry = Registry::new();
    register_metrics(&registry).unwrap();

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_metrics(listener, registry));
    sleep(Duration::from_millis(50)).await;
    format!("http://{}", addr)
}

#[tokio::test]
async fn metrics_endpoint_serves_current_gauges() {
    let base = start_server().await;

    CLIENT_COUNT.set(30.0);
    LATENCY_PER_REQUEST.set(1250.5);
    REQUESTS_PER_SECOND.set(42.0);

    let response = reqwest::get(format!("{}/metrics", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"), "got {}", content_type);

    let body = response.text().await.unwrap();
    assert!(body.contains("towd_bench_client_count 30"), "{}", body);
    assert!(body.contains("towd_bench_latency_per_request 1250.5"), "{}", body);
    assert!(body.contains("towd_bench_requests_per_second 42"), "{}", body);
    assert!(body.contains("# TYPE towd_bench_client_count gauge"), "{}", body);
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let base = start_server().await;
    let response = reqwest::get(format!("{}/other", base)).await.unwrap();
    assert_eq!(response.status(), 404);
}

#[test]
fn registering_twice_fails() {
    let registry = Registry::new();
    register_metrics(&registry).unwrap();
    assert!(register_metrics(&registry).is_err());
}

#[test]
fn render_includes_help_text() {
    let registry = Registry::new();
    register_metrics(&registry).unwrap();
    let text = render_metrics(&registry);
    assert!(text.contains("# HELP towd_bench_requests_per_second Requests per second"));
}

#[test]
fn binding_a_taken_port_fails() {
    let held = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let port = held.local_addr().unwrap().port();

    let err = bind_metrics_listener(port).unwrap_err();
    assert!(matches!(err, BenchError::Io(_)), "got {}", err);
}
