//! Prometheus metrics infrastructure.
//!
//! Metrics are recorded through the `metrics` facade across the workspace and
//! rendered by the `metrics-exporter-prometheus` recorder:
//!
//! - `coffeeshop_http_requests_total`, `coffeeshop_http_request_duration_seconds`
//! - `coffeeshop_storage_query_duration_seconds`, `coffeeshop_storage_query_timeout_total`
//! - `coffeeshop_auth_denials_total`

use std::sync::Arc;

use axum::{extract::State, http::header::CONTENT_TYPE, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Shared state containing the Prometheus handle for metrics rendering.
#[derive(Clone)]
pub struct MetricsState {
    handle: Arc<PrometheusHandle>,
}

impl MetricsState {
    pub fn new(handle: PrometheusHandle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Renders the current metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Error type for metrics initialization.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to install Prometheus recorder: recorder already installed")]
    AlreadyInstalled,
}

/// Installs the global Prometheus recorder.
///
/// Must be called once at startup, before anything is recorded.
pub fn init_metrics() -> Result<MetricsState, MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|_| MetricsError::AlreadyInstalled)?;

    describe_metrics();

    Ok(MetricsState::new(handle))
}

fn describe_metrics() {
    metrics::describe_counter!(
        "coffeeshop_http_requests_total",
        "Total number of HTTP requests by method, route and status"
    );
    metrics::describe_histogram!(
        "coffeeshop_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    metrics::describe_histogram!(
        "coffeeshop_storage_query_duration_seconds",
        "Storage query duration in seconds by operation, backend and status"
    );
    metrics::describe_counter!(
        "coffeeshop_storage_query_timeout_total",
        "Total number of storage query timeouts by operation and backend"
    );
    metrics::describe_counter!(
        "coffeeshop_auth_denials_total",
        "Total number of rejected bearer tokens by reason code"
    );
}

/// Prometheus exposition format content type.
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Handler for the metrics endpoint.
pub async fn metrics_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], state.render())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests build a local recorder; installing the global one is left to main.

    #[test]
    fn test_render_includes_recorded_metrics() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let state = MetricsState::new(recorder.handle());

        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("coffeeshop_auth_denials_total", "code" => "token_expired")
                .increment(2);
        });

        let output = state.render();
        assert!(output.contains("coffeeshop_auth_denials_total"));
        assert!(output.contains("token_expired"));
    }
}
