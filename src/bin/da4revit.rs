//! da4revit: runs the broker service and inspects work items.

use clap::{Parser, Subcommand};
use da4revit_rs::aps::ApsClient;
use da4revit_rs::config::Config;
use da4revit_rs::engine::{Collaborators, Engine, EngineSettings};
use da4revit_rs::event::EventBus;
use da4revit_rs::server::{self, AppState};
use da4revit_rs::telemetry::{TelemetryConfig, init_telemetry};
use da4revit_rs::tracker::WorkItemTracker;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "da4revit", about = "Design Automation for Revit broker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Address to listen on (overrides BIND_ADDR)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Print the Design Automation status of a work item
    Status {
        /// Work item id
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Serve { bind } => cmd_serve(config, bind).await,
        Command::Status { id } => cmd_status(config, id).await,
    }
}

fn build_engine(config: &Config, client: Arc<ApsClient>) -> Engine {
    Engine::new(
        Collaborators::from_client(client),
        EngineSettings::from_config(config),
        Arc::new(WorkItemTracker::new()),
        EventBus::default(),
    )
}

async fn cmd_serve(config: Config, bind: Option<SocketAddr>) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "da4revit".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let client = Arc::new(ApsClient::from_config(&config)?);
    let engine = Arc::new(build_engine(&config, client.clone()));
    tracing::info!(
        activity_id = %engine.settings().activity_id,
        callback_url = %engine.settings().callback_url,
        "engine ready"
    );

    let state = AppState {
        engine,
        auth: client.clone(),
        profiles: client,
    };

    let listener = tokio::net::TcpListener::bind(bind.unwrap_or(config.bind_addr)).await?;
    server::serve(listener, state, async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await?;
    Ok(())
}

async fn cmd_status(config: Config, id: String) -> anyhow::Result<()> {
    let client = Arc::new(ApsClient::from_config(&config)?);
    let engine = build_engine(&config, client);

    let status = engine.workitem_status(&id).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
