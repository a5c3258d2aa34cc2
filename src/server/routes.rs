//! Route handlers.

use axum::extract::{FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tracing::Instrument;

use super::AppState;
use crate::aps::{UserProfile, VIEWER_SCOPES};
use crate::config::secrets::AccessToken;
use crate::error::{Error, Result};
use crate::model::{CallbackPayload, ExportInfo};

/// The signed-in user's token, taken from `Authorization: Bearer <token>`.
pub struct UserToken(pub AccessToken);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for UserToken {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Error::Unauthorized("missing Authorization header".to_string()))?;

        match header.split_once(' ').map(|(scheme, token)| (scheme, token.trim())) {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
                Ok(UserToken(AccessToken::new(token, 0)))
            }
            _ => Err(Error::Unauthorized(
                "Authorization header is not a bearer token".to_string(),
            )),
        }
    }
}

/// `POST /da4revit/v1/revit/{storage_url}/dwg`
pub async fn export_dwg(
    State(state): State<AppState>,
    Path(storage_url): Path<String>,
    UserToken(token): UserToken,
    Json(input_json): Json<serde_json::Value>,
) -> Result<Json<ExportInfo>> {
    let info = state
        .engine
        .submit_export(&storage_url, input_json, token)
        .await?;
    Ok(Json(info))
}

/// `GET /da4revit/v1/revit/{workitem_id}`
pub async fn workitem_status(
    State(state): State<AppState>,
    Path(workitem_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    Ok(Json(state.engine.workitem_status(&workitem_id).await?))
}

/// `DELETE /da4revit/v1/revit/{workitem_id}`
pub async fn cancel_workitem(
    State(state): State<AppState>,
    Path(workitem_id): Path<String>,
) -> Result<StatusCode> {
    state.engine.cancel(&workitem_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /callback/designautomation`
///
/// Acknowledged immediately; finalization continues on a spawned task.
pub async fn designautomation_callback(
    State(state): State<AppState>,
    Json(payload): Json<CallbackPayload>,
) -> StatusCode {
    let engine = state.engine.clone();
    tokio::spawn(
        async move {
            engine.handle_callback(payload).await;
        }
        .in_current_span(),
    );
    StatusCode::ACCEPTED
}

/// `GET /user/v1/profile`
pub async fn user_profile(
    State(state): State<AppState>,
    UserToken(token): UserToken,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.profiles.user_profile(&token).await?))
}

#[derive(Debug, Serialize)]
pub struct ViewerToken {
    pub access_token: String,
    pub expires_in: u64,
}

/// `GET /oauth/v1/token`
pub async fn viewer_token(State(state): State<AppState>) -> Result<Json<ViewerToken>> {
    let token = state.auth.two_legged_token(VIEWER_SCOPES).await?;
    Ok(Json(ViewerToken {
        access_token: token.expose().to_string(),
        expires_in: token.expires_in,
    }))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "tracked_workitems": state.engine.tracker().len(),
        "listeners": state.engine.events().subscriber_count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<UserToken> {
        let mut request = Request::builder();
        if let Some(value) = header {
            request = request.header(AUTHORIZATION, value);
        }
        let (mut parts, ()) = request.body(()).unwrap().into_parts();
        UserToken::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn bearer_token_is_trimmed() {
        let UserToken(token) = extract(Some("Bearer  abc.def ")).await.unwrap();
        assert_eq!(token.expose(), "abc.def");
    }

    #[tokio::test]
    async fn blank_or_foreign_credentials_are_unauthorized() {
        for header in [None, Some("Bearer    "), Some("Basic dXNlcjpwYXNz"), Some("Bearer")] {
            assert!(
                matches!(extract(header).await, Err(Error::Unauthorized(_))),
                "{header:?}"
            );
        }
    }
}
