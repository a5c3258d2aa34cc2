//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! The APS client secret is wrapped in secrecy::SecretString to prevent log leaks.

pub mod secrets;

use crate::error::{Error, Result};
use secrecy::SecretString;
use std::net::SocketAddr;

pub const DEFAULT_APS_BASE_URL: &str = "https://developer.api.autodesk.com";
pub const DEFAULT_USERINFO_URL: &str = "https://api.userprofile.autodesk.com/userinfo";
pub const DEFAULT_ACTIVITY_NAME: &str = "ExportToDwgsActivity";
pub const DEFAULT_ACTIVITY_ALIAS: &str = "dev";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Path the Design Automation `onComplete` callback is posted to.
pub const CALLBACK_ROUTE: &str = "/api/aps/callback/designautomation";

#[derive(Debug)]
pub struct Config {
    pub client_id: String,
    pub client_secret: SecretString,
    /// Public base URL this service is reachable at; Design Automation posts
    /// its completion callback here.
    pub webhook_url: String,
    pub aps_base_url: String,
    pub userinfo_url: String,
    pub design_automation: DesignAutomationConfig,
    pub bind_addr: SocketAddr,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

/// Identifies the Design Automation activity work items are submitted against.
#[derive(Debug, Clone)]
pub struct DesignAutomationConfig {
    pub nickname: String,
    pub activity_name: String,
    pub activity_alias: String,
}

impl DesignAutomationConfig {
    /// Fully-qualified activity id: `<nickname>.<activity>+<alias>`.
    pub fn activity_id(&self) -> String {
        format!(
            "{}.{}+{}",
            self.nickname, self.activity_name, self.activity_alias
        )
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let client_id = required_var("APS_CLIENT_ID")?;
        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e| Error::Config(format!("BIND_ADDR is not a socket address: {e}")))?;

        Ok(Self {
            client_secret: SecretString::from(required_var("APS_CLIENT_SECRET")?),
            webhook_url: required_var("APS_WEBHOOK_URL")?
                .trim_end_matches('/')
                .to_string(),
            aps_base_url: optional_var("APS_BASE_URL", DEFAULT_APS_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            userinfo_url: optional_var("APS_USERINFO_URL", DEFAULT_USERINFO_URL),
            design_automation: DesignAutomationConfig {
                nickname: optional_var("DESIGN_AUTOMATION_NICKNAME", &client_id),
                activity_name: optional_var(
                    "DESIGN_AUTOMATION_ACTIVITY_NAME",
                    DEFAULT_ACTIVITY_NAME,
                ),
                activity_alias: optional_var(
                    "DESIGN_AUTOMATION_ACTIVITY_ALIAS",
                    DEFAULT_ACTIVITY_ALIAS,
                ),
            },
            client_id,
            bind_addr,
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: optional_var("LOG_LEVEL", "info"),
        })
    }

    /// Full URL Design Automation posts work item completion to.
    pub fn callback_url(&self) -> String {
        format!("{}{CALLBACK_ROUTE}", self.webhook_url)
    }

    /// Transient bucket that receives Design Automation output.
    pub fn output_bucket_key(&self) -> String {
        format!("{}_designautomation", self.client_id.to_lowercase())
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("required environment variable {name} is not set")))
}

fn optional_var(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
