//! Completion callback handling.
//!
//! The callback is acknowledged before any of this runs, so failures here
//! only reach listeners as a `Failed` notification. Nothing is retried.

use opentelemetry::KeyValue;
use tracing::{Instrument, error, info, warn};

use super::Engine;
use crate::error::{Error, Result};
use crate::event::{WorkitemEvent, WorkitemStatus};
use crate::model::{CallbackPayload, FinalizeShape, ObjectRef, WorkItem};
use crate::telemetry::metrics;
use crate::telemetry::work::{record_status, start_workitem_span};

impl Engine {
    /// Resolve a work item from its terminal callback.
    ///
    /// The item is taken out of the tracker first, so a cancellation racing
    /// a successful callback cannot also notify. An unsuccessful callback
    /// always reports `Failed`, tracked or not. Returns the notification
    /// published, or `None` for a successful callback whose id is not tracked.
    pub async fn handle_callback(&self, payload: CallbackPayload) -> Option<WorkitemEvent> {
        let span = start_workitem_span("callback", Some(&payload.id));
        async {
            let Some(item) = self.tracker.remove(&payload.id) else {
                metrics::callbacks_received().add(1, &[KeyValue::new("tracked", "false")]);
                if payload.is_success() {
                    warn!(
                        workitem_id = %payload.id,
                        status = %payload.status,
                        "callback for a work item that is not tracked, dropped"
                    );
                    return None;
                }
                // Failures are reported whether or not the item is still tracked.
                warn!(
                    workitem_id = %payload.id,
                    status = %payload.status,
                    "untracked work item did not succeed"
                );
                let event = WorkitemEvent::new(payload.id.clone(), WorkitemStatus::Failed);
                record_status(&span, &event.status.to_string());
                self.events.publish(event.clone());
                return Some(event);
            };
            metrics::callbacks_received().add(1, &[KeyValue::new("tracked", "true")]);

            let shape = item.shape();
            let event = if payload.is_success() {
                self.finalize(item).await
            } else {
                warn!(
                    workitem_id = %payload.id,
                    status = %payload.status,
                    report_url = payload.report_url.as_deref().unwrap_or("-"),
                    "work item did not succeed"
                );
                WorkitemEvent::new(payload.id.clone(), WorkitemStatus::Failed)
            };

            record_status(&span, &event.status.to_string());
            metrics::workitems_finalized().add(
                1,
                &[
                    KeyValue::new("status", event.status.to_string()),
                    KeyValue::new("shape", shape.to_string()),
                ],
            );
            self.events.publish(event.clone());
            Some(event)
        }
        .instrument(span.clone())
        .await
    }

    async fn finalize(&self, item: WorkItem) -> WorkitemEvent {
        let shape = item.shape();
        let result = match shape {
            FinalizeShape::NewVersion => self.finalize_new_version(&item).await.map(|()| None),
            FinalizeShape::Artifact => self.finalize_artifact(&item).await.map(Some),
            FinalizeShape::Malformed => Err(Error::Other(
                "work item has neither version data nor upload info".to_string(),
            )),
        };

        match result {
            Ok(extra_info) => {
                let event = WorkitemEvent::new(item.workitem_id, WorkitemStatus::Completed);
                match extra_info {
                    Some(url) => event.with_extra_info(url),
                    None => event,
                }
            }
            Err(e) => {
                error!(workitem_id = %item.workitem_id, %shape, error = %e, "finalization failed");
                WorkitemEvent::new(item.workitem_id, WorkitemStatus::Failed)
            }
        }
    }

    /// Complete the output upload, then create a new version from it.
    async fn finalize_new_version(&self, item: &WorkItem) -> Result<()> {
        let (Some(info), Some(project_id), Some(data), Some(token)) = (
            &item.signed_s3_info,
            &item.project_id,
            &item.create_version_data,
            &item.access_token_3legged,
        ) else {
            return Err(Error::Other(
                "version work item is missing upload info, project or user token".to_string(),
            ));
        };

        self.collaborators
            .storage
            .complete_upload(info, token)
            .await?;
        info!(workitem_id = %item.workitem_id, "output model uploaded");

        self.collaborators
            .versions
            .create_version(project_id, data, token)
            .await?;
        info!(workitem_id = %item.workitem_id, project_id, "created a new version");
        Ok(())
    }

    /// Complete the output upload and return a download URL for it.
    async fn finalize_artifact(&self, item: &WorkItem) -> Result<String> {
        let (Some(info), Some(token)) = (&item.signed_s3_info, &item.access_token_2legged) else {
            return Err(Error::Other(
                "artifact work item is missing the application token".to_string(),
            ));
        };

        let details = self
            .collaborators
            .storage
            .complete_upload(info, token)
            .await?;
        let object = ObjectRef::new(details.bucket_key, details.object_key);
        let url = self
            .collaborators
            .storage
            .signed_download_url(&object, None, token)
            .await?;
        info!(workitem_id = %item.workitem_id, "output artifact ready for download");
        Ok(url)
    }
}
