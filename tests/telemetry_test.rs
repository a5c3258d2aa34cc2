//! Integration tests for telemetry initialization and span helpers.

use da4revit_rs::telemetry::work::{record_status, record_workitem_id, start_workitem_span};

#[test]
fn telemetry_initializes_without_endpoint() {
    // Note: tracing subscriber can only be set once per process.
    let config = da4revit_rs::telemetry::TelemetryConfig {
        endpoint: None,
        service_name: "da4revit-test".to_string(),
        log_level: "debug".to_string(),
    };
    // May return Err if a global subscriber was already set by another
    // test in this process; that is acceptable.
    if let Ok(guard) = da4revit_rs::telemetry::init_telemetry(config) {
        assert!(!guard.is_exporting());
        guard.force_flush();
    }
}

#[test]
fn workitem_span_records_id_and_status() {
    let span = start_workitem_span("submit", None);
    record_workitem_id(&span, "wi-1");
    record_status(&span, "Completed");
}

#[test]
fn workitem_span_with_known_id() {
    let span = start_workitem_span("callback", Some("wi-2"));
    record_status(&span, "Failed");
}

#[test]
fn metric_instruments_accept_measurements() {
    use da4revit_rs::telemetry::metrics;
    use opentelemetry::KeyValue;

    metrics::workitems_submitted().add(1, &[KeyValue::new("result", "ok")]);
    metrics::workitems_finalized().add(1, &[KeyValue::new("status", "Completed")]);
    metrics::callbacks_received().add(1, &[KeyValue::new("tracked", "true")]);
    metrics::aps_request_duration_ms().record(12.5, &[KeyValue::new("operation", "token")]);
}
