//! HTTP surface tests against a server bound to an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use da4revit_rs::aps::{
    MockAuthenticator, MockDesignAutomation, MockObjectStorage, MockUserProfileService,
    MockVersionService, UserProfile,
};
use da4revit_rs::config::secrets::AccessToken;
use da4revit_rs::engine::{Collaborators, Engine, EngineSettings};
use da4revit_rs::event::{EventBus, WorkitemStatus};
use da4revit_rs::model::*;
use da4revit_rs::server::{self, AppState};
use da4revit_rs::tracker::WorkItemTracker;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Default)]
struct Mocks {
    auth: MockAuthenticator,
    storage: MockObjectStorage,
    automation: MockDesignAutomation,
    versions: MockVersionService,
    viewer_auth: MockAuthenticator,
    profiles: MockUserProfileService,
}

impl Mocks {
    fn with_app_token(mut self) -> Self {
        self.auth
            .expect_two_legged_token()
            .returning(|_| Ok(AccessToken::new("app-token", 3600)));
        self
    }

    fn into_state(self) -> AppState {
        let engine = Engine::new(
            Collaborators {
                auth: Arc::new(self.auth),
                storage: Arc::new(self.storage),
                automation: Arc::new(self.automation),
                versions: Arc::new(self.versions),
            },
            EngineSettings {
                activity_id: "nick.ExportToDwgsActivity+dev".to_string(),
                callback_url: "https://broker.example.com/api/aps/callback/designautomation"
                    .to_string(),
                output_bucket_key: "clientid_designautomation".to_string(),
            },
            Arc::new(WorkItemTracker::new()),
            EventBus::default(),
        );
        AppState {
            engine: Arc::new(engine),
            auth: Arc::new(self.viewer_auth),
            profiles: Arc::new(self.profiles),
        }
    }
}

async fn spawn_server(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, state, std::future::pending()));
    format!("http://{addr}")
}

fn malformed_item(id: &str) -> WorkItem {
    WorkItem::new(id)
}

#[tokio::test]
async fn health_reports_tracked_items() {
    let state = Mocks::default().into_state();
    state.engine.tracker().register(malformed_item("wi-1"));
    let base = spawn_server(state).await;

    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["tracked_workitems"], 1);
}

#[tokio::test]
async fn callback_is_acknowledged_and_finalized_in_background() {
    let state = Mocks::default().into_state();
    state.engine.tracker().register(malformed_item("wi-1"));
    let mut rx = state.engine.events().subscribe();
    let engine = state.engine.clone();
    let base = spawn_server(state).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/aps/callback/designautomation"))
        .json(&json!({"id": "wi-1", "status": "success"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("notification in time")
        .unwrap();
    assert_eq!(event.workitem_id.as_deref(), Some("wi-1"));
    assert_eq!(event.status, WorkitemStatus::Failed);
    assert!(engine.tracker().is_empty());
}

#[tokio::test]
async fn callback_for_unknown_id_is_still_acknowledged() {
    let base = spawn_server(Mocks::default().into_state()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/aps/callback/designautomation"))
        .json(&json!({"id": "nope", "status": "failedDownload"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn export_requires_bearer_token() {
    let base = spawn_server(Mocks::default().into_state()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/aps/da4revit/v1/revit/anything/dwg"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn export_with_unparseable_storage_url_is_bad_request() {
    let base = spawn_server(Mocks::default().into_state()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/aps/da4revit/v1/revit/no-buckets-here/dwg"))
        .bearer_auth("user-token")
        .json(&json!({"exportLayers": true}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn export_returns_work_item_info() {
    let mut mocks = Mocks::default().with_app_token();
    mocks
        .storage
        .expect_signed_download_url()
        .withf(|object, _, token| {
            *object == ObjectRef::new("wip.dm.prod", "model.rvt") && token.expose() == "user-token"
        })
        .returning(|_, _, _| Ok("https://s3.example.com/input.rvt".to_string()));
    mocks.storage.expect_ensure_bucket().returning(|_, _, _| Ok(()));
    mocks.storage.expect_signed_upload().returning(|_, _| {
        Ok(SignedUpload {
            upload_key: "upload-key".to_string(),
            urls: vec!["https://s3.example.com/output.zip".to_string()],
        })
    });
    mocks.automation.expect_submit_workitem().returning(|_, _| {
        Ok(WorkItemAccepted {
            id: "wi-9".to_string(),
            status: "pending".to_string(),
        })
    });
    let state = mocks.into_state();
    let engine = state.engine.clone();
    let base = spawn_server(state).await;

    let storage_url = "https%3A%2F%2Fdeveloper.api.autodesk.com%2Foss%2Fv2%2Fbuckets%2Fwip.dm.prod%2Fobjects%2Fmodel.rvt";
    let response = reqwest::Client::new()
        .post(format!("{base}/api/aps/da4revit/v1/revit/{storage_url}/dwg"))
        .bearer_auth("user-token")
        .json(&json!({"exportLayers": true}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["workItemId"], "wi-9");
    assert_eq!(body["workItemStatus"], "pending");
    assert!(engine.tracker().find("wi-9").is_some());
}

#[tokio::test]
async fn status_forwards_provider_document() {
    let mut mocks = Mocks::default().with_app_token();
    mocks
        .automation
        .expect_workitem_status()
        .withf(|id, _| id == "wi-1")
        .returning(|_, _| Ok(json!({"id": "wi-1", "status": "inprogress", "progress": "50%"})));
    let base = spawn_server(mocks.into_state()).await;

    let body: Value = reqwest::get(format!("{base}/api/aps/da4revit/v1/revit/wi-1"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "inprogress");
    assert_eq!(body["progress"], "50%");
}

#[tokio::test]
async fn cancel_returns_no_content_and_notifies() {
    let mut mocks = Mocks::default().with_app_token();
    mocks
        .automation
        .expect_cancel_workitem()
        .times(1)
        .returning(|_, _| Ok(()));
    let state = mocks.into_state();
    state.engine.tracker().register(malformed_item("wi-1"));
    let mut rx = state.engine.events().subscribe();
    let base = spawn_server(state).await;

    let response = reqwest::Client::new()
        .delete(format!("{base}/api/aps/da4revit/v1/revit/wi-1"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(rx.try_recv().unwrap().status, WorkitemStatus::Cancelled);
}

#[tokio::test]
async fn provider_failure_maps_to_server_error() {
    let mut mocks = Mocks::default().with_app_token();
    mocks.automation.expect_cancel_workitem().returning(|_, _| {
        Err(da4revit_rs::error::Error::Aps {
            endpoint: "/da/us-east/v3/workitems/wi-1".to_string(),
            status: 500,
            body: "boom".to_string(),
        })
    });
    let base = spawn_server(mocks.into_state()).await;

    let response = reqwest::Client::new()
        .delete(format!("{base}/api/aps/da4revit/v1/revit/wi-1"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn viewer_token_is_issued_with_viewer_scope() {
    let mut mocks = Mocks::default();
    mocks
        .viewer_auth
        .expect_two_legged_token()
        .withf(|scopes| scopes == "viewables:read")
        .returning(|_| Ok(AccessToken::new("viewer-token", 3599)));
    let base = spawn_server(mocks.into_state()).await;

    let body: Value = reqwest::get(format!("{base}/api/aps/oauth/v1/token"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body, json!({"access_token": "viewer-token", "expires_in": 3599}));
}

#[tokio::test]
async fn user_profile_uses_callers_token() {
    let mut mocks = Mocks::default();
    mocks
        .profiles
        .expect_user_profile()
        .withf(|token| token.expose() == "user-token")
        .returning(|_| {
            Ok(UserProfile {
                name: "Ada Lovelace".to_string(),
                picture: "https://example.com/ada.png".to_string(),
            })
        });
    let base = spawn_server(mocks.into_state()).await;

    let body: Value = reqwest::Client::new()
        .get(format!("{base}/api/aps/user/v1/profile"))
        .bearer_auth("user-token")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["name"], "Ada Lovelace");
}

#[tokio::test]
async fn websocket_listener_receives_notification() {
    use futures::StreamExt;

    let state = Mocks::default().into_state();
    state.engine.tracker().register(malformed_item("wi-ws"));
    let base = spawn_server(state).await;

    let ws_url = format!("{}/ws", base.replacen("http://", "ws://", 1));
    let (mut socket, _) = tokio_tungstenite::connect_async(ws_url).await.unwrap();

    let response = reqwest::Client::new()
        .post(format!("{base}/api/aps/callback/designautomation"))
        .json(&json!({"id": "wi-ws", "status": "success"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("frame in time")
        .expect("socket open")
        .unwrap();
    let body: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();

    assert_eq!(
        body,
        json!({
            "topic": "Workitem-Notification",
            "data": {"WorkitemId": "wi-ws", "Status": "Failed", "ExtraInfo": null}
        })
    );
}

#[tokio::test]
async fn blank_bearer_token_is_unauthorized() {
    let base = spawn_server(Mocks::default().into_state()).await;

    let response = reqwest::Client::new()
        .get(format!("{base}/api/aps/user/v1/profile"))
        .header("Authorization", "Bearer    ")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
