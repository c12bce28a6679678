/// Metrics and telemetry for Courier
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Queue depth and message throughput per worker
/// - Side-effect handler latencies and failures
/// - Scheduler registrations and fired tasks
/// - Resource lock contention
/// - Status edits

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge,
    register_int_gauge_vec, Encoder, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec,
    TextEncoder,
};

lazy_static! {
    // ========== Worker Metrics ==========

    /// Pending messages per queue
    pub static ref QUEUE_DEPTH: IntGaugeVec = register_int_gauge_vec!(
        "courier_queue_depth",
        "Number of messages waiting in a worker queue",
        &["queue"]
    )
    .unwrap();

    /// Messages handled by worker, activity, object and outcome
    pub static ref MESSAGES_PROCESSED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "courier_messages_processed_total",
        "Total number of messages handled by workers",
        &["worker", "activity", "object", "status"]
    )
    .unwrap();

    /// Handler duration in seconds
    pub static ref HANDLER_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "courier_handler_duration_seconds",
        "Side-effect handler latencies in seconds",
        &["worker"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // ========== Scheduler Metrics ==========

    /// Tasks currently waiting to fire
    pub static ref SCHEDULER_PENDING_TASKS: IntGauge = register_int_gauge!(
        "courier_scheduler_pending_tasks",
        "Number of scheduled tasks waiting to fire"
    )
    .unwrap();

    /// Fired tasks by kind
    pub static ref SCHEDULER_TASKS_FIRED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "courier_scheduler_tasks_fired_total",
        "Total number of scheduled tasks fired",
        &["kind"]
    )
    .unwrap();

    // ========== Lock Metrics ==========

    /// Time spent waiting for a resource lock
    pub static ref LOCK_WAIT_SECONDS: HistogramVec = register_histogram_vec!(
        "courier_lock_wait_seconds",
        "Time spent waiting to acquire a resource lock",
        &["contended"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]
    )
    .unwrap();

    // ========== Status Metrics ==========

    /// Status edits by outcome
    pub static ref STATUS_EDITS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "courier_status_edits_total",
        "Total number of status edit requests",
        &["outcome"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record one handled message
pub fn record_message(worker: &str, activity: &str, object: &str, success: bool, duration: f64) {
    MESSAGES_PROCESSED_TOTAL
        .with_label_values(&[worker, activity, object, if success { "success" } else { "failure" }])
        .inc();
    HANDLER_DURATION_SECONDS
        .with_label_values(&[worker])
        .observe(duration);
}

/// Record a fired scheduler task
pub fn record_task_fired(kind: &str) {
    SCHEDULER_TASKS_FIRED_TOTAL.with_label_values(&[kind]).inc();
}

/// Record time spent acquiring a resource lock
pub fn record_lock_wait(contended: bool, duration: f64) {
    LOCK_WAIT_SECONDS
        .with_label_values(&[if contended { "yes" } else { "no" }])
        .observe(duration);
}

/// Record the outcome of a status edit
pub fn record_status_edit(outcome: &str) {
    STATUS_EDITS_TOTAL.with_label_values(&[outcome]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_message() {
        record_message("client", "Create", "Note", true, 0.002);
        record_message("client", "Create", "Note", false, 0.004);
        let metrics = render_metrics();
        assert!(metrics.contains("courier_messages_processed_total"));
        assert!(metrics.contains("courier_handler_duration_seconds"));
    }

    #[test]
    fn test_record_scheduler_and_locks() {
        record_task_fired("close_poll");
        record_lock_wait(true, 0.01);
        let metrics = render_metrics();
        assert!(metrics.contains("courier_scheduler_tasks_fired_total"));
        assert!(metrics.contains("courier_lock_wait_seconds"));
    }

    #[test]
    fn test_record_status_edit() {
        record_status_edit("rejected_noop");
        let metrics = render_metrics();
        assert!(metrics.contains("courier_status_edits_total"));
    }
}
