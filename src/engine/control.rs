//! Submission, status queries and cancellation.

use opentelemetry::KeyValue;
use tracing::{Instrument, error, info, warn};

use super::{Engine, OUTPUT_BUCKET_POLICY, OUTPUT_OBJECT_NAME};
use crate::aps::DESIGN_AUTOMATION_SCOPES;
use crate::config::secrets::AccessToken;
use crate::error::{Error, Result};
use crate::event::{WorkitemEvent, WorkitemStatus};
use crate::model::{
    ExportInfo, JobSubmission, ObjectRef, OutputTarget, SignedS3Info, WorkItem, WorkItemRequest,
};
use crate::telemetry::metrics;
use crate::telemetry::work::{record_status, record_workitem_id, start_workitem_span};

impl Engine {
    /// Export DWGs from the Revit model stored at `storage_url`.
    ///
    /// The output archive lands in the service's transient bucket; the
    /// completion callback turns it into a download URL.
    pub async fn submit_export(
        &self,
        storage_url: &str,
        input_json: serde_json::Value,
        user_token: AccessToken,
    ) -> Result<ExportInfo> {
        if storage_url.trim().is_empty() || input_json.is_null() {
            return Err(Error::BadRequest(
                "make sure the input version id has correct value".to_string(),
            ));
        }

        let input = ObjectRef::from_storage_url(storage_url)?;
        let disposition = format!("attachment; filename={}", input.object_key);
        let input_url = self
            .collaborators
            .storage
            .signed_download_url(&input, Some(disposition), &user_token)
            .await
            .map_err(|e| match e {
                Error::NotFound(what) => Error::BadRequest(format!("failed to get {what}")),
                other => other,
            })?;

        self.submit(JobSubmission {
            input_url,
            input_json,
            output: OutputTarget::Artifact {
                bucket_key: self.settings.output_bucket_key.clone(),
                object_key: OUTPUT_OBJECT_NAME.to_string(),
            },
            user_token,
        })
        .await
    }

    /// Submit a work item to Design Automation and start tracking it.
    ///
    /// Failures after the application token is obtained are also broadcast
    /// as a `Failed` notification.
    pub async fn submit(&self, job: JobSubmission) -> Result<ExportInfo> {
        let span = start_workitem_span("submit", None);
        async {
            let app_token = self
                .collaborators
                .auth
                .two_legged_token(DESIGN_AUTOMATION_SCOPES)
                .await?;

            match self.submit_with_token(&job, &app_token).await {
                Ok(info) => {
                    record_workitem_id(&span, &info.workitem_id);
                    metrics::workitems_submitted().add(1, &[KeyValue::new("result", "ok")]);
                    info!(workitem_id = %info.workitem_id, status = %info.workitem_status, "submitted work item");
                    Ok(info)
                }
                Err(e) => {
                    metrics::workitems_submitted().add(1, &[KeyValue::new("result", "error")]);
                    error!(error = %e, "failed to submit work item");
                    record_status(&span, "Failed");
                    self.events.publish(WorkitemEvent::submission_failed());
                    Err(e)
                }
            }
        }
        .instrument(span.clone())
        .await
    }

    async fn submit_with_token(
        &self,
        job: &JobSubmission,
        app_token: &AccessToken,
    ) -> Result<ExportInfo> {
        let storage = &self.collaborators.storage;

        let (output_object, upload_token, output_argument) = match &job.output {
            OutputTarget::Artifact {
                bucket_key,
                object_key,
            } => {
                if let Err(e) = storage
                    .ensure_bucket(bucket_key, OUTPUT_BUCKET_POLICY, app_token)
                    .await
                {
                    warn!(bucket_key, error = %e, "could not create output bucket, continuing");
                }
                (ObjectRef::new(bucket_key, object_key), app_token, "outputZip")
            }
            OutputTarget::NewVersion {
                bucket_key,
                object_key,
                ..
            } => (
                ObjectRef::new(bucket_key, object_key),
                &job.user_token,
                "outputFile",
            ),
        };

        let upload = storage.signed_upload(&output_object, upload_token).await?;
        let output_url = upload
            .urls
            .first()
            .cloned()
            .ok_or_else(|| Error::Other("signed upload returned no urls".to_string()))?;

        let request = WorkItemRequest {
            activity_id: self.settings.activity_id.clone(),
            arguments: serde_json::json!({
                "inputFile": { "url": job.input_url },
                "inputJson": { "url": format!("data:application/json,{}", serde_json::to_string(&job.input_json)?) },
                output_argument: { "verb": "put", "url": output_url },
                "onComplete": { "verb": "post", "url": self.settings.callback_url },
            }),
        };

        let accepted = self
            .collaborators
            .automation
            .submit_workitem(&request, app_token)
            .await?;

        let mut item = WorkItem::new(accepted.id.clone())
            .signed_s3_info(SignedS3Info {
                bucket_key: output_object.bucket_key,
                object_key: output_object.object_key,
                upload_key: upload.upload_key,
            })
            .access_token_3legged(job.user_token.clone())
            .access_token_2legged(app_token.clone());
        if let OutputTarget::NewVersion {
            project_id,
            create_version_data,
            ..
        } = &job.output
        {
            item = item.new_version(project_id.clone(), create_version_data.clone());
        }
        self.tracker.register(item);

        Ok(ExportInfo {
            workitem_id: accepted.id,
            workitem_status: accepted.status,
            extra_info: None,
        })
    }

    /// Provider's raw status document for a work item.
    pub async fn workitem_status(&self, workitem_id: &str) -> Result<serde_json::Value> {
        require_id(workitem_id)?;
        let span = start_workitem_span("status", Some(workitem_id));
        async {
            let token = self
                .collaborators
                .auth
                .two_legged_token(DESIGN_AUTOMATION_SCOPES)
                .await?;
            self.collaborators
                .automation
                .workitem_status(workitem_id, &token)
                .await
        }
        .instrument(span)
        .await
    }

    /// Ask Design Automation to cancel, then stop tracking the work item.
    ///
    /// Best effort: local tracking is dropped even if the job still runs to
    /// completion. Returns whether the item was still tracked, in which case
    /// a `Cancelled` notification went out.
    pub async fn cancel(&self, workitem_id: &str) -> Result<bool> {
        require_id(workitem_id)?;
        let span = start_workitem_span("cancel", Some(workitem_id));
        async {
            let token = self
                .collaborators
                .auth
                .two_legged_token(DESIGN_AUTOMATION_SCOPES)
                .await?;
            self.collaborators
                .automation
                .cancel_workitem(workitem_id, &token)
                .await?;

            let Some(item) = self.tracker.remove(workitem_id) else {
                info!(workitem_id, "work item is not tracked, nothing to notify");
                return Ok(false);
            };

            info!(workitem_id, "work item cancelled");
            record_status(&span, "Cancelled");
            metrics::workitems_finalized().add(
                1,
                &[
                    KeyValue::new("status", WorkitemStatus::Cancelled.to_string()),
                    KeyValue::new("shape", item.shape().to_string()),
                ],
            );
            self.events
                .publish(WorkitemEvent::new(workitem_id, WorkitemStatus::Cancelled));
            Ok(true)
        }
        .instrument(span.clone())
        .await
    }
}

fn require_id(workitem_id: &str) -> Result<()> {
    if workitem_id.trim().is_empty() {
        return Err(Error::BadRequest("work item id is required".to_string()));
    }
    Ok(())
}
