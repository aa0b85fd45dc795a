//! Prometheus metrics for tasklist-service.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// Recorder behind the HTTP middleware's `metrics` macros.
///
/// `None` when another recorder was installed first (e.g. several apps in one
/// test binary); HTTP series are then simply absent from the output.
static HTTP_RECORDER: Lazy<Option<PrometheusHandle>> =
    Lazy::new(|| PrometheusBuilder::new().install_recorder().ok());

/// Histogram for database query duration by operation.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "tasklist_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Counter for task operations by operation and outcome.
pub static TASK_OPERATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tasklist_task_operations_total",
        "Total number of task operations",
        &["operation", "status"]
    )
    .expect("Failed to register TASK_OPERATIONS")
});

/// Counter for login attempts by outcome.
pub static LOGIN_ATTEMPTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tasklist_login_attempts_total",
        "Total number of login attempts",
        &["status"]
    )
    .expect("Failed to register LOGIN_ATTEMPTS")
});

/// Counter for errors.
pub static ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tasklist_errors_total",
        "Total number of errors",
        &["error_type"]
    )
    .expect("Failed to register ERRORS")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_RECORDER);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&TASK_OPERATIONS);
    Lazy::force(&LOGIN_ATTEMPTS);
    Lazy::force(&ERRORS);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = HTTP_RECORDER
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode prometheus metrics");
    }
    output.push_str(&String::from_utf8_lossy(&buffer));

    output
}

/// Record a task operation.
pub fn record_task_operation(operation: &str, status: &str) {
    TASK_OPERATIONS
        .with_label_values(&[operation, status])
        .inc();
}

/// Record a login attempt.
pub fn record_login(status: &str) {
    LOGIN_ATTEMPTS.with_label_values(&[status]).inc();
}

/// Record an error.
pub fn record_error(error_type: &str) {
    ERRORS.with_label_values(&[error_type]).inc();
}
