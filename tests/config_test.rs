use std::sync::Mutex;

use da4revit_rs::config::Config;
use secrecy::ExposeSecret;

// Tests in this file mutate the process environment.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: &[&str] = &[
    "APS_CLIENT_ID",
    "APS_CLIENT_SECRET",
    "APS_WEBHOOK_URL",
    "APS_BASE_URL",
    "DESIGN_AUTOMATION_NICKNAME",
    "DESIGN_AUTOMATION_ACTIVITY_NAME",
    "DESIGN_AUTOMATION_ACTIVITY_ALIAS",
    "BIND_ADDR",
];

fn clear_env() {
    for var in VARS {
        unsafe { std::env::remove_var(var) };
    }
}

fn set_required() {
    unsafe {
        std::env::set_var("APS_CLIENT_ID", "MyClientId");
        std::env::set_var("APS_CLIENT_SECRET", "s3cr3t");
        std::env::set_var("APS_WEBHOOK_URL", "https://broker.example.com/");
    }
}

#[test]
fn config_from_env_loads_required_fields() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env();
    set_required();

    let config = Config::from_env().unwrap();
    assert_eq!(config.client_id, "MyClientId");
    assert_eq!(config.client_secret.expose_secret(), "s3cr3t");
    assert!(!config.log_level.is_empty());
    assert_eq!(config.aps_base_url, "https://developer.api.autodesk.com");
    assert_eq!(config.bind_addr.port(), 3000);
    assert_eq!(
        config.callback_url(),
        "https://broker.example.com/api/aps/callback/designautomation"
    );
    assert_eq!(config.output_bucket_key(), "myclientid_designautomation");
    assert_eq!(
        config.design_automation.activity_id(),
        "MyClientId.ExportToDwgsActivity+dev"
    );

    clear_env();
}

#[test]
fn config_from_env_honours_overrides() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env();
    set_required();
    unsafe {
        std::env::set_var("DESIGN_AUTOMATION_NICKNAME", "revitdev");
        std::env::set_var("DESIGN_AUTOMATION_ACTIVITY_ALIAS", "prod");
        std::env::set_var("BIND_ADDR", "127.0.0.1:8080");
        // Empty means unset.
        std::env::set_var("APS_BASE_URL", "");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(
        config.design_automation.activity_id(),
        "revitdev.ExportToDwgsActivity+prod"
    );
    assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
    assert_eq!(config.aps_base_url, "https://developer.api.autodesk.com");

    unsafe { std::env::set_var("BIND_ADDR", "not an address") };
    assert!(Config::from_env().is_err());

    clear_env();
}

#[test]
fn config_from_env_fails_without_required() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env();

    assert!(Config::from_env().is_err());

    set_required();
    unsafe { std::env::remove_var("APS_WEBHOOK_URL") };
    assert!(Config::from_env().is_err());

    clear_env();
}

#[test]
fn config_debug_does_not_leak_secret() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env();
    set_required();

    let config = Config::from_env().unwrap();
    assert!(!format!("{config:?}").contains("s3cr3t"));

    clear_env();
}
