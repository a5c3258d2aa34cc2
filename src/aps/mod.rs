//! APS collaborator interfaces.
//!
//! One trait per external service the workflow talks to. [`ApsClient`]
//! implements all of them over the APS REST APIs; tests substitute the
//! `mockall`-generated mocks.
//!
//! All methods are async and fail with [`crate::error::Error`]; a non-success
//! HTTP status from APS surfaces as `Error::Aps`.

pub mod client;
pub mod oauth;

pub use client::ApsClient;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::config::secrets::AccessToken;
use crate::error::Result;
use crate::model::{
    ObjectDetails, ObjectRef, SignedS3Info, SignedUpload, WorkItemAccepted, WorkItemRequest,
};

/// Scopes requested for Design Automation and its transient storage.
pub const DESIGN_AUTOMATION_SCOPES: &str =
    "code:all data:write data:read bucket:create bucket:delete bucket:read";

/// Scopes handed to the browser viewer.
pub const VIEWER_SCOPES: &str = "viewables:read";

/// Issues application-scoped (2-legged) credentials.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// A token for the given space-separated scopes.
    async fn two_legged_token(&self, scopes: &str) -> Result<AccessToken>;
}

/// APS object storage (OSS).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Create the bucket unless it already exists.
    async fn ensure_bucket(
        &self,
        bucket_key: &str,
        policy_key: &str,
        token: &AccessToken,
    ) -> Result<()>;

    /// Signed S3 URL to download an object.
    async fn signed_download_url(
        &self,
        object: &ObjectRef,
        content_disposition: Option<String>,
        token: &AccessToken,
    ) -> Result<String>;

    /// Signed S3 URL to upload an object, plus the key needed to complete it.
    async fn signed_upload(&self, object: &ObjectRef, token: &AccessToken)
    -> Result<SignedUpload>;

    /// Finish an upload started with [`ObjectStorage::signed_upload`].
    async fn complete_upload(
        &self,
        info: &SignedS3Info,
        token: &AccessToken,
    ) -> Result<ObjectDetails>;
}

/// Design Automation work item endpoints.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DesignAutomation: Send + Sync {
    async fn submit_workitem(
        &self,
        request: &WorkItemRequest,
        token: &AccessToken,
    ) -> Result<WorkItemAccepted>;

    /// Raw status document as returned by Design Automation.
    async fn workitem_status(
        &self,
        workitem_id: &str,
        token: &AccessToken,
    ) -> Result<serde_json::Value>;

    async fn cancel_workitem(&self, workitem_id: &str, token: &AccessToken) -> Result<()>;
}

/// Data Management versions.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait VersionService: Send + Sync {
    /// Create a new version of a document in `project_id`.
    async fn create_version(
        &self,
        project_id: &str,
        create_version_data: &serde_json::Value,
        token: &AccessToken,
    ) -> Result<()>;
}

/// Profile of the signed-in user, as shown by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub picture: String,
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait UserProfileService: Send + Sync {
    async fn user_profile(&self, token: &AccessToken) -> Result<UserProfile>;
}
