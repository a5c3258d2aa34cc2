//! HTTP surface.
//!
//! Routes live under `/api/aps`, mirroring what the browser viewer calls.
//! `/ws` pushes work item notifications; `/health` reports liveness.

pub mod routes;
pub mod ws;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::aps::{Authenticator, UserProfileService};
use crate::engine::Engine;
use crate::error::{Error, Result};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    /// Issues the viewer's public token.
    pub auth: Arc<dyn Authenticator>,
    pub profiles: Arc<dyn UserProfileService>,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/da4revit/v1/revit/:id/dwg", post(routes::export_dwg))
        .route(
            "/da4revit/v1/revit/:id",
            get(routes::workitem_status).delete(routes::cancel_workitem),
        )
        .route(
            "/callback/designautomation",
            post(routes::designautomation_callback),
        )
        .route("/user/v1/profile", get(routes::user_profile))
        .route("/oauth/v1/token", get(routes::viewer_token));

    Router::new()
        .nest("/api/aps", api)
        .route("/ws", get(ws::notifications))
        .route("/health", get(routes::health))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    info!(addr = %listener.local_addr()?, "http server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("http server stopped");
    Ok(())
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if self.is_client_error() {
            warn!(error = %self, "request rejected");
        } else {
            error!(error = %self, "request failed");
        }
        (
            status,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
