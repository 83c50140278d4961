//! Prometheus metrics and the probe endpoint.

use crate::error::ControllerError;
use crate::reconciler::ChangeKind;
use crate::telemetry::Severity;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Operator metrics, registered in their own registry
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    reports: IntCounterVec,
    events: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let reports = IntCounterVec::new(
            Opts::new(
                "grafana_config_reports_total",
                "Reports emitted by the operator, by severity and operation",
            ),
            &["severity", "operation"],
        )?;
        let events = IntCounterVec::new(
            Opts::new(
                "grafana_config_events_total",
                "ConfigMap change events dispatched to the reconciler",
            ),
            &["change"],
        )?;

        registry.register(Box::new(reports.clone()))?;
        registry.register(Box::new(events.clone()))?;

        Ok(Self {
            registry,
            reports,
            events,
        })
    }

    pub fn record_report(&self, severity: Severity, operation: &str) {
        self.reports
            .with_label_values(&[severity.as_str(), operation])
            .inc();
    }

    pub fn record_event(&self, change: ChangeKind) {
        self.events.with_label_values(&[change.as_str()]).inc();
    }

    #[cfg(test)]
    pub fn report_count(&self, severity: Severity, operation: &str) -> u64 {
        self.reports
            .with_label_values(&[severity.as_str(), operation])
            .get()
    }

    #[cfg(test)]
    pub fn event_count(&self, change: ChangeKind) -> u64 {
        self.events.with_label_values(&[change.as_str()]).get()
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    match metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

pub fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(metrics)
}

/// Serve `/metrics` and `/healthz` until the task is aborted
pub async fn serve(address: SocketAddr, metrics: Arc<Metrics>) -> Result<(), ControllerError> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|e| ControllerError::Metrics(format!("failed to bind {address}: {e}")))?;
    info!("Serving metrics on http://{}/metrics", address);
    axum::serve(listener, router(metrics))
        .await
        .map_err(|e| ControllerError::Metrics(e.to_string()))
}
