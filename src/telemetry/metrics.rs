//! Metric instrument factories for da4revit-rs.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"da4revit-rs"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("da4revit-rs")
}

/// Counter: Design Automation submissions.
/// Labels: `result` ("ok" | "error").
pub fn workitems_submitted() -> Counter<u64> {
    meter()
        .u64_counter("da4revit.workitem.submitted")
        .with_description("Number of work items submitted to Design Automation")
        .build()
}

/// Counter: work items that reached a terminal status.
/// Labels: `status`, `shape`.
pub fn workitems_finalized() -> Counter<u64> {
    meter()
        .u64_counter("da4revit.workitem.finalized")
        .with_description("Number of work items finalized")
        .build()
}

/// Counter: Design Automation callbacks received.
/// Labels: `tracked` ("true" | "false").
pub fn callbacks_received() -> Counter<u64> {
    meter()
        .u64_counter("da4revit.callback.received")
        .with_description("Number of Design Automation callbacks received")
        .build()
}

/// Histogram: APS request duration in milliseconds.
/// Labels: `operation`, `status`.
pub fn aps_request_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("da4revit.aps.request.duration_ms")
        .with_description("APS request duration in milliseconds")
        .with_unit("ms")
        .build()
}
