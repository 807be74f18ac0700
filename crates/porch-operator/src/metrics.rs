//! Prometheus metrics and health endpoints for the PackageRevision operator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;
use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, TextEncoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::crds::Condition;

/// Register `metric` with the default registry.
fn registered<M: Collector + Clone + 'static>(metric: prometheus::Result<M>) -> M {
    let metric = metric.expect("metric can be created");
    prometheus::register(Box::new(metric.clone())).expect("metric can be registered");
    metric
}

static RECONCILIATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    registered(IntCounterVec::new(
        Opts::new(
            "porch_operator_reconciliations_total",
            "PackageRevision reconciliations by outcome",
        ),
        &["outcome"],
    ))
});

static RECONCILE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    registered(Histogram::with_opts(
        HistogramOpts::new(
            "porch_operator_reconciliation_duration_seconds",
            "Time spent reconciling one PackageRevision",
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
    ))
});

static CONDITION_WRITES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    registered(IntCounterVec::new(
        Opts::new(
            "porch_operator_condition_writes_total",
            "Status condition writes by type, status and reason",
        ),
        &["type", "status", "reason"],
    ))
});

static EVENTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    registered(IntCounterVec::new(
        Opts::new(
            "porch_operator_events_total",
            "Kubernetes events emitted by reason and publish result",
        ),
        &["reason", "result"],
    ))
});

static LEADER: LazyLock<IntGauge> = LazyLock::new(|| {
    registered(IntGauge::new(
        "porch_operator_leader",
        "Whether this instance is the leader (1=leader, 0=standby)",
    ))
});

/// Set once the controller has started watching.
static READY: AtomicBool = AtomicBool::new(false);

/// How a reconciliation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Success,
    /// The object disappeared while being reconciled.
    NotFound,
    Error,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Success => "success",
            ReconcileOutcome::NotFound => "not_found",
            ReconcileOutcome::Error => "error",
        }
    }
}

pub fn record_reconciliation(outcome: ReconcileOutcome, elapsed: Duration) {
    RECONCILIATIONS.with_label_values(&[outcome.as_str()]).inc();
    RECONCILE_DURATION.observe(elapsed.as_secs_f64());
}

/// Count a condition written to a PackageRevision status.
pub fn record_condition_write(condition: &Condition) {
    CONDITION_WRITES
        .with_label_values(&[
            condition.type_.as_str(),
            condition.status.as_str(),
            condition.reason.as_str(),
        ])
        .inc();
}

pub fn record_event(reason: &str, published: bool) {
    let result = if published { "published" } else { "failed" };
    EVENTS.with_label_values(&[reason, result]).inc();
}

pub fn set_leader(is_leader: bool) {
    LEADER.set(i64::from(is_leader));
}

/// Flip the `/readyz` answer.
pub fn set_ready(ready: bool) {
    READY.store(ready, Ordering::Relaxed);
}

pub fn is_ready() -> bool {
    READY.load(Ordering::Relaxed)
}

fn encode_metrics() -> prometheus::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(buffer)
}

/// Resolve a request path to (status line, content type, body).
fn route(path: &str) -> (&'static str, &'static str, Vec<u8>) {
    match path {
        "/metrics" => match encode_metrics() {
            Ok(data) => ("200 OK", "text/plain; version=0.0.4; charset=utf-8", data),
            Err(e) => (
                "500 Internal Server Error",
                "text/plain",
                format!("failed to encode metrics: {e}").into_bytes(),
            ),
        },
        "/healthz" => ("200 OK", "text/plain", b"ok".to_vec()),
        "/readyz" if is_ready() => ("200 OK", "text/plain", b"ok".to_vec()),
        "/readyz" => ("503 Service Unavailable", "text/plain", b"controller not started".to_vec()),
        _ => ("404 Not Found", "text/plain", b"not found".to_vec()),
    }
}

/// Answer one health check or scrape request and close the connection.
async fn handle(mut stream: TcpStream) -> std::io::Result<()> {
    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");

    let (status, content_type, body) = route(path);
    let header = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(header.as_bytes()).await?;
    stream.write_all(&body).await
}

/// Serve `/metrics`, `/healthz` and `/readyz` on `addr`.
///
/// `/readyz` answers 503 until the controller has started.
pub async fn serve(addr: String) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Metrics server listening on {addr}");

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tokio::spawn(async move {
                    if let Err(e) = handle(stream).await {
                        debug!(%peer, "Metrics request failed: {e}");
                    }
                });
            }
            Err(e) => error!("Failed to accept metrics connection: {e}"),
        }
    }
}
