//! Observability infrastructure: structured logging and Prometheus metrics.

mod logging;
mod metrics;

pub use logging::{create_json_layer, init_logging, parse_level, LoggingConfig};
pub use metrics::{init_metrics, metrics_handler, MetricsError, MetricsState};
