//! Work item data model.
//!
//! A work item is one Design Automation job this service is waiting on. It
//! carries everything the completion callback needs to finish the job, since
//! the request that submitted it is long gone by then.

use serde::{Deserialize, Serialize};

use crate::config::secrets::AccessToken;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Work Item
// ---------------------------------------------------------------------------

/// An outstanding Revit processing job.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Identifier assigned by Design Automation.
    pub workitem_id: String,

    /// Target project, only for jobs that produce a new file version.
    pub project_id: Option<String>,

    /// JSON:API payload for the version to create once output is uploaded.
    pub create_version_data: Option<serde_json::Value>,

    /// Where the job uploads its output.
    pub signed_s3_info: Option<SignedS3Info>,

    /// Captured at submission; used to finish a version-producing job.
    pub access_token_3legged: Option<AccessToken>,

    /// Captured at submission; used to finish an artifact-producing job.
    pub access_token_2legged: Option<AccessToken>,
}

impl WorkItem {
    pub fn new(workitem_id: impl Into<String>) -> Self {
        Self {
            workitem_id: workitem_id.into(),
            project_id: None,
            create_version_data: None,
            signed_s3_info: None,
            access_token_3legged: None,
            access_token_2legged: None,
        }
    }

    pub fn new_version(mut self, project_id: impl Into<String>, data: serde_json::Value) -> Self {
        self.project_id = Some(project_id.into());
        self.create_version_data = Some(data);
        self
    }

    pub fn signed_s3_info(mut self, info: SignedS3Info) -> Self {
        self.signed_s3_info = Some(info);
        self
    }

    pub fn access_token_3legged(mut self, token: AccessToken) -> Self {
        self.access_token_3legged = Some(token);
        self
    }

    pub fn access_token_2legged(mut self, token: AccessToken) -> Self {
        self.access_token_2legged = Some(token);
        self
    }

    /// Which finalization branch a successful callback takes for this item.
    pub fn shape(&self) -> FinalizeShape {
        match (&self.create_version_data, &self.signed_s3_info) {
            (Some(_), _) => FinalizeShape::NewVersion,
            (None, Some(_)) => FinalizeShape::Artifact,
            (None, None) => FinalizeShape::Malformed,
        }
    }
}

/// The three mutually exclusive shapes of a tracked work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeShape {
    /// Complete the upload, then create a new version of the document.
    NewVersion,
    /// Complete the upload, then hand out a download URL for the artifact.
    Artifact,
    /// Nothing to finish with; always fails.
    Malformed,
}

impl std::fmt::Display for FinalizeShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FinalizeShape::NewVersion => "new_version",
            FinalizeShape::Artifact => "artifact",
            FinalizeShape::Malformed => "malformed",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Pending upload destination for a job's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignedS3Info {
    pub bucket_key: String,
    pub object_key: String,
    pub upload_key: String,
}

/// A bucket/object pair in APS object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket_key: String,
    pub object_key: String,
}

impl ObjectRef {
    pub fn new(bucket_key: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            bucket_key: bucket_key.into(),
            object_key: object_key.into(),
        }
    }

    /// Extract bucket and object keys from a storage URL such as
    /// `https://host/oss/v2/buckets/<bucket>/objects/<object>?x=y`.
    pub fn from_storage_url(url: &str) -> Result<Self> {
        let path = url.split('?').next().unwrap_or_default();

        let mut bucket_key = None;
        let mut object_key = None;
        let mut segments = path.split('/');
        while let Some(segment) = segments.next() {
            match segment {
                "buckets" => bucket_key = segments.next().filter(|s| !s.is_empty()),
                "objects" => object_key = segments.next().filter(|s| !s.is_empty()),
                _ => {}
            }
        }

        match (bucket_key, object_key) {
            (Some(bucket), Some(object)) => Ok(Self::new(bucket, object)),
            _ => Err(Error::BadRequest(
                "failed to get input bucket key and object key".to_string(),
            )),
        }
    }
}

/// Upload destination handed out by object storage.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUpload {
    pub upload_key: String,
    pub urls: Vec<String>,
}

/// Object metadata returned once an upload is completed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDetails {
    pub bucket_key: String,
    pub object_key: String,
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Where a submitted job's output goes and what happens to it afterwards.
#[derive(Debug, Clone)]
pub enum OutputTarget {
    /// Uploaded into the service's transient bucket with the 2-legged token;
    /// the callback hands out a download URL.
    Artifact {
        bucket_key: String,
        object_key: String,
    },
    /// Uploaded into the user's storage with the 3-legged token; the callback
    /// creates a new version of the document.
    NewVersion {
        project_id: String,
        create_version_data: serde_json::Value,
        bucket_key: String,
        object_key: String,
    },
}

/// Everything needed to submit one Design Automation work item.
#[derive(Debug, Clone)]
pub struct JobSubmission {
    /// Signed URL Design Automation downloads the Revit model from.
    pub input_url: String,
    /// Export configuration forwarded to the activity.
    pub input_json: serde_json::Value,
    pub output: OutputTarget,
    pub user_token: AccessToken,
}

/// Request body sent to Design Automation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemRequest {
    pub activity_id: String,
    pub arguments: serde_json::Value,
}

/// Design Automation's answer to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkItemAccepted {
    pub id: String,
    pub status: String,
}

/// Body returned to the browser after a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportInfo {
    #[serde(rename = "workItemId")]
    pub workitem_id: String,
    #[serde(rename = "workItemStatus")]
    pub workitem_status: String,
    #[serde(rename = "ExtraInfo")]
    pub extra_info: Option<String>,
}

// ---------------------------------------------------------------------------
// Callback
// ---------------------------------------------------------------------------

/// Terminal notification posted by Design Automation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub id: String,
    pub status: String,
    #[serde(rename = "reportUrl", default, skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
}

impl CallbackPayload {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}
