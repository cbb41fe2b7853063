use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics exporter
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    init_metric_descriptions();

    Ok(handle)
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "Request duration in seconds"
    );
    describe_counter!(
        "metrics_samples_stored_total",
        "Total number of metric samples written to the store"
    );
    describe_counter!(
        "event_log_accepted_total",
        "Events admitted to the event log queue"
    );
    describe_counter!(
        "event_log_dropped_total",
        "Events rejected because the event log queue was full"
    );
    describe_counter!(
        "event_log_sink_failures_total",
        "Event log sink write/close failures"
    );
    describe_gauge!("metrics_service_info", "Service version information");

    gauge!("metrics_service_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record an HTTP request
pub fn record_request(method: &str, route: &str, status: u16, duration: Duration) {
    counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string(),
    )
    .record(duration.as_secs_f64());
}

pub fn record_sample_stored() {
    counter!("metrics_samples_stored_total").increment(1);
}

pub fn record_event_log_accepted() {
    counter!("event_log_accepted_total").increment(1);
}

pub fn record_event_log_dropped() {
    counter!("event_log_dropped_total").increment(1);
}

pub fn record_event_log_sink_failure(op: &'static str) {
    counter!("event_log_sink_failures_total", "op" => op).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_metrics() {
        init_metric_descriptions();

        record_request("GET", "/metrics/:limit/:offset", 200, Duration::from_millis(12));
        record_sample_stored();
        record_event_log_accepted();
        record_event_log_dropped();
        record_event_log_sink_failure("write");

        // Without an installed recorder these are no-ops; just verify nothing panics
    }
}
