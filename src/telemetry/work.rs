//! Work item span helpers.
//!
//! Spans wrap each step of the work item lifecycle (submit, status, cancel,
//! callback finalization) so a single job can be followed across requests.

use tracing::Span;

/// Start a span for one work item operation.
///
/// `workitem.id` may be empty when the id is not yet known (submission);
/// fill it with [`record_workitem_id`]. `workitem.status` is filled by
/// [`record_status`].
pub fn start_workitem_span(operation: &str, workitem_id: Option<&str>) -> Span {
    let span = tracing::info_span!(
        "workitem",
        "workitem.operation" = operation,
        "workitem.id" = tracing::field::Empty,
        "workitem.status" = tracing::field::Empty,
    );
    if let Some(id) = workitem_id {
        record_workitem_id(&span, id);
    }
    span
}

pub fn record_workitem_id(span: &Span, workitem_id: &str) {
    span.record("workitem.id", workitem_id);
}

/// Record the status reported to listeners and emit it as an event on the span.
pub fn record_status(span: &Span, status: &str) {
    span.record("workitem.status", status);
    span.in_scope(|| {
        tracing::info!(status, "workitem status");
    });
}
