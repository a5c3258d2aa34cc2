//! Work item engine. The public API for submitting and resolving exports.
//!
//! The engine owns the tracker and the notification bus and drives the APS
//! collaborators. HTTP handlers and the CLI go through here.

pub mod control;
pub mod finalize;

use std::sync::Arc;

use crate::aps::{ApsClient, Authenticator, DesignAutomation, ObjectStorage, VersionService};
use crate::config::Config;
use crate::event::EventBus;
use crate::tracker::WorkItemTracker;

/// Name of the archive the export activity writes.
pub const OUTPUT_OBJECT_NAME: &str = "exportedDwgs.zip";

/// Retention policy of the output bucket.
pub const OUTPUT_BUCKET_POLICY: &str = "transient";

/// External services the engine calls.
#[derive(Clone)]
pub struct Collaborators {
    pub auth: Arc<dyn Authenticator>,
    pub storage: Arc<dyn ObjectStorage>,
    pub automation: Arc<dyn DesignAutomation>,
    pub versions: Arc<dyn VersionService>,
}

impl Collaborators {
    /// Every collaborator backed by the same APS client.
    pub fn from_client(client: Arc<ApsClient>) -> Self {
        Self {
            auth: client.clone(),
            storage: client.clone(),
            automation: client.clone(),
            versions: client,
        }
    }
}

/// Fixed parameters for submissions.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// `<nickname>.<activity>+<alias>` of the export activity.
    pub activity_id: String,
    /// URL Design Automation posts completion to.
    pub callback_url: String,
    /// Transient bucket for artifact output.
    pub output_bucket_key: String,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            activity_id: config.design_automation.activity_id(),
            callback_url: config.callback_url(),
            output_bucket_key: config.output_bucket_key(),
        }
    }
}

/// The work item engine.
pub struct Engine {
    tracker: Arc<WorkItemTracker>,
    events: EventBus,
    collaborators: Collaborators,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(
        collaborators: Collaborators,
        settings: EngineSettings,
        tracker: Arc<WorkItemTracker>,
        events: EventBus,
    ) -> Self {
        Self {
            tracker,
            events,
            collaborators,
            settings,
        }
    }

    pub fn tracker(&self) -> &WorkItemTracker {
        &self.tracker
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}
