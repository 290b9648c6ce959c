//! Query timeout enforcement shared by the SQL backends.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::{StorageError, StorageResult};

/// Runs `future` under `timeout`, recording duration and timeout metrics.
///
/// # Metrics
/// - `coffeeshop_storage_query_duration_seconds` - Histogram of query durations
/// - `coffeeshop_storage_query_timeout_total` - Counter of timeout events
pub(crate) async fn execute_with_timeout<T, F>(
    backend: &'static str,
    operation: &str,
    timeout: Duration,
    future: F,
) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    let start = Instant::now();
    let result = tokio::time::timeout(timeout, future).await;
    let duration = start.elapsed().as_secs_f64();

    let (status, final_result) = match result {
        Ok(Ok(value)) => ("success", Ok(value)),
        Ok(Err(e)) => ("error", Err(e)),
        Err(_elapsed) => (
            "timeout",
            Err(StorageError::QueryTimeout {
                operation: operation.to_string(),
                timeout,
            }),
        ),
    };

    metrics::histogram!(
        "coffeeshop_storage_query_duration_seconds",
        "operation" => operation.to_string(),
        "backend" => backend,
        "status" => status
    )
    .record(duration);

    if status == "timeout" {
        metrics::counter!(
            "coffeeshop_storage_query_timeout_total",
            "operation" => operation.to_string(),
            "backend" => backend
        )
        .increment(1);
    }

    final_result
}
