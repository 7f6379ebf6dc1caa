use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use prometheus::{Encoder, Gauge, IntCounterVec, Opts, Registry, TextEncoder};
use std::net::{SocketAddr, TcpListener};
use tracing::{error, info};

use crate::errors::BenchError;

lazy_static::lazy_static! {
    pub static ref CLIENT_COUNT: Gauge =
        Gauge::with_opts(
            Opts::new("towd_bench_client_count", "Number of client connections")
        ).unwrap();

    pub static ref LATENCY_PER_REQUEST: Gauge =
        Gauge::with_opts(
            Opts::new("towd_bench_latency_per_request", "Latency per request")
        ).unwrap();

    pub static ref REQUESTS_PER_SECOND: Gauge =
        Gauge::with_opts(
            Opts::new("towd_bench_requests_per_second", "Requests per second")
        ).unwrap();

    pub static ref REQUEST_ERRORS_TOTAL: IntCounterVec =
        IntCounterVec::new(
            Opts::new("towd_bench_request_errors_total", "Number of failed benchmark requests by category"),
            &["category"]
        ).unwrap();
}

/// Registers all benchmark metrics with `registry`.
pub fn register_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(CLIENT_COUNT.clone()))?;
    registry.register(Box::new(LATENCY_PER_REQUEST.clone()))?;
    registry.register(Box::new(REQUESTS_PER_SECOND.clone()))?;
    registry.register(Box::new(REQUEST_ERRORS_TOTAL.clone()))?;
    Ok(())
}

/// Encodes the current state of `registry` in the Prometheus text format.
pub fn render_metrics(registry: &Registry) -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_else(|e| {
        error!(error = %e, "Metrics output is not valid UTF-8");
        String::from("# ERROR ENCODING METRICS TO UTF-8")
    })
}

/// HTTP handler for the metrics endpoint.
pub async fn metrics_handler(
    req: Request<Body>,
    registry: Registry,
) -> Result<Response<Body>, hyper::Error> {
    let mut response = Response::new(Body::empty());

    if req.method() != Method::GET || req.uri().path() != "/metrics" {
        *response.status_mut() = StatusCode::NOT_FOUND;
        return Ok(response);
    }

    *response.body_mut() = Body::from(render_metrics(&registry));
    if let Ok(content_type) = TextEncoder::new().format_type().parse() {
        response
            .headers_mut()
            .insert(hyper::header::CONTENT_TYPE, content_type);
    }
    Ok(response)
}

/// Serves `GET /metrics` on an already bound listener until the server fails.
pub async fn serve_metrics(listener: TcpListener, registry: Registry) -> Result<(), BenchError> {
    listener.set_nonblocking(true)?;
    let addr = listener.local_addr().ok();

    let make_svc = make_service_fn(move |_conn| {
        let registry = registry.clone();
        async move {
            Ok::<_, hyper::Error>(service_fn(move |req| {
                metrics_handler(req, registry.clone())
            }))
        }
    });

    let server = Server::from_tcp(listener)?.serve(make_svc);
    info!(addr = ?addr, "Metrics server listening");

    server.await?;
    Ok(())
}

/// Binds the metrics port on all interfaces.
pub fn bind_metrics_listener(port: u16) -> Result<TcpListener, BenchError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    Ok(TcpListener::bind(addr)?)
}
