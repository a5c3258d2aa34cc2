//! REST implementation of the APS collaborator traits.

use async_trait::async_trait;
use opentelemetry::KeyValue;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Instant;
use tracing::debug;

use super::oauth::{TokenCache, TokenResponse};
use super::{
    Authenticator, DesignAutomation, ObjectStorage, UserProfile, UserProfileService,
    VersionService,
};
use crate::config::Config;
use crate::config::secrets::AccessToken;
use crate::error::{Error, Result};
use crate::model::{
    ObjectDetails, ObjectRef, SignedS3Info, SignedUpload, WorkItemAccepted, WorkItemRequest,
};
use crate::telemetry::metrics;

const DESIGN_AUTOMATION_PATH: [&str; 3] = ["da", "us-east", "v3"];

/// HTTP client for the APS platform.
pub struct ApsClient {
    http: reqwest::Client,
    base_url: Url,
    userinfo_url: Url,
    client_id: String,
    client_secret: SecretString,
    tokens: TokenCache,
}

impl ApsClient {
    pub fn new(
        base_url: &str,
        userinfo_url: &str,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .user_agent(concat!("da4revit-rs/", env!("CARGO_PKG_VERSION")))
                .build()?,
            base_url: parse_url(base_url)?,
            userinfo_url: parse_url(userinfo_url)?,
            client_id: client_id.into(),
            client_secret,
            tokens: TokenCache::new(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.aps_base_url,
            &config.userinfo_url,
            config.client_id.clone(),
            SecretString::from(config.client_secret.expose_secret().to_owned()),
        )
    }

    /// `base_url` with the given path segments appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config(format!("APS base url {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn object_endpoint(&self, bucket_key: &str, object_key: &str, action: &str) -> Result<Url> {
        self.endpoint(&[
            "oss", "v2", "buckets", bucket_key, "objects", object_key, action,
        ])
    }

    fn workitem_endpoint(&self, workitem_id: Option<&str>) -> Result<Url> {
        let mut segments: Vec<&str> = DESIGN_AUTOMATION_PATH.to_vec();
        segments.push("workitems");
        segments.extend(workitem_id);
        self.endpoint(&segments)
    }

    fn request(&self, method: Method, url: Url, token: &AccessToken) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(token.expose())
    }

    async fn fetch_token(&self, scopes: &str) -> Result<AccessToken> {
        let url = self.endpoint(&["authentication", "v2", "token"])?;
        let request = self
            .http
            .post(url)
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .form(&[("grant_type", "client_credentials"), ("scope", scopes)]);

        let response = send("authentication.token", request).await?;
        let body: TokenResponse = response.json().await?;
        Ok(AccessToken::new(body.access_token, body.expires_in))
    }
}

/// Send a request, recording its duration and turning non-success statuses
/// into `Error::Aps`.
async fn send(operation: &'static str, request: RequestBuilder) -> Result<Response> {
    let start = Instant::now();
    let result = request.send().await;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let status_label = match &result {
        Ok(response) => response.status().as_u16().to_string(),
        Err(_) => "error".to_string(),
    };
    metrics::aps_request_duration_ms().record(
        elapsed_ms,
        &[
            KeyValue::new("operation", operation),
            KeyValue::new("status", status_label),
        ],
    );

    let response = result?;
    let status = response.status();
    debug!(operation, status = status.as_u16(), elapsed_ms, "APS request");
    if status.is_success() {
        return Ok(response);
    }

    let endpoint = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(Error::Aps {
        endpoint,
        status: status.as_u16(),
        body,
    })
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::Config(format!("invalid url {raw}: {e}")))
}

#[async_trait]
impl Authenticator for ApsClient {
    async fn two_legged_token(&self, scopes: &str) -> Result<AccessToken> {
        if let Some(token) = self.tokens.get(scopes) {
            return Ok(token);
        }
        let token = self.fetch_token(scopes).await?;
        self.tokens.put(scopes, token.clone());
        Ok(token)
    }
}

#[derive(Deserialize)]
struct SignedDownload {
    url: Option<String>,
}

#[async_trait]
impl ObjectStorage for ApsClient {
    async fn ensure_bucket(
        &self,
        bucket_key: &str,
        policy_key: &str,
        token: &AccessToken,
    ) -> Result<()> {
        let url = self.endpoint(&["oss", "v2", "buckets"])?;
        let request = self.request(Method::POST, url, token).json(&serde_json::json!({
            "bucketKey": bucket_key,
            "policyKey": policy_key,
        }));

        match send("oss.create_bucket", request).await {
            Ok(_) => Ok(()),
            Err(Error::Aps { status, .. }) if status == StatusCode::CONFLICT.as_u16() => {
                debug!(bucket_key, "bucket already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn signed_download_url(
        &self,
        object: &ObjectRef,
        content_disposition: Option<String>,
        token: &AccessToken,
    ) -> Result<String> {
        let url =
            self.object_endpoint(&object.bucket_key, &object.object_key, "signeds3download")?;
        let mut request = self.request(Method::GET, url, token);
        if let Some(disposition) = content_disposition {
            request = request.query(&[("response-content-disposition", disposition)]);
        }

        let body: SignedDownload = send("oss.signed_download", request).await?.json().await?;
        body.url.ok_or_else(|| {
            Error::NotFound(format!(
                "signed download url for {}/{}",
                object.bucket_key, object.object_key
            ))
        })
    }

    async fn signed_upload(
        &self,
        object: &ObjectRef,
        token: &AccessToken,
    ) -> Result<SignedUpload> {
        let url = self.object_endpoint(&object.bucket_key, &object.object_key, "signeds3upload")?;
        let request = self.request(Method::GET, url, token);
        Ok(send("oss.signed_upload", request).await?.json().await?)
    }

    async fn complete_upload(
        &self,
        info: &SignedS3Info,
        token: &AccessToken,
    ) -> Result<ObjectDetails> {
        let url = self.object_endpoint(&info.bucket_key, &info.object_key, "signeds3upload")?;
        let request = self
            .request(Method::POST, url, token)
            .json(&serde_json::json!({ "uploadKey": info.upload_key }));
        Ok(send("oss.complete_upload", request).await?.json().await?)
    }
}

#[async_trait]
impl DesignAutomation for ApsClient {
    async fn submit_workitem(
        &self,
        request: &WorkItemRequest,
        token: &AccessToken,
    ) -> Result<WorkItemAccepted> {
        let url = self.workitem_endpoint(None)?;
        let request = self.request(Method::POST, url, token).json(request);
        Ok(send("da.submit_workitem", request).await?.json().await?)
    }

    async fn workitem_status(
        &self,
        workitem_id: &str,
        token: &AccessToken,
    ) -> Result<serde_json::Value> {
        let url = self.workitem_endpoint(Some(workitem_id))?;
        let request = self.request(Method::GET, url, token);
        Ok(send("da.workitem_status", request).await?.json().await?)
    }

    async fn cancel_workitem(&self, workitem_id: &str, token: &AccessToken) -> Result<()> {
        let url = self.workitem_endpoint(Some(workitem_id))?;
        send("da.cancel_workitem", self.request(Method::DELETE, url, token)).await?;
        Ok(())
    }
}

#[async_trait]
impl VersionService for ApsClient {
    async fn create_version(
        &self,
        project_id: &str,
        create_version_data: &serde_json::Value,
        token: &AccessToken,
    ) -> Result<()> {
        let url = self.endpoint(&["data", "v1", "projects", project_id, "versions"])?;
        let request = self
            .request(Method::POST, url, token)
            .header(reqwest::header::CONTENT_TYPE, "application/vnd.api+json")
            .body(serde_json::to_vec(create_version_data)?);

        let response = send("dm.create_version", request).await?;
        // Any 2xx other than 201 means no version was created.
        if response.status() != StatusCode::CREATED {
            return Err(Error::Aps {
                endpoint: response.url().path().to_string(),
                status: response.status().as_u16(),
                body: "version was not created".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl UserProfileService for ApsClient {
    async fn user_profile(&self, token: &AccessToken) -> Result<UserProfile> {
        let request = self.request(Method::GET, self.userinfo_url.clone(), token);
        Ok(send("userprofile.userinfo", request).await?.json().await?)
    }
}
