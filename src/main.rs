//! Robot companion - person tracking and navigation coordinator
//!
//! Runs the coordinator against the simulated gateway, with optional MQTT
//! remote control and status publishing.
//!
//! Module structure:
//! - `domain/` - Core robot types (Person, FollowState, GatewayEvent)
//! - `io/` - External interfaces (MQTT commands, MQTT status, simulated gateway)
//! - `services/` - Business logic (Coordinator, tracking, follow, places, interaction)
//! - `infra/` - Infrastructure (Config, Metrics)

use clap::Parser;
use robot_companion::infra::{Config, Metrics};
use robot_companion::io::{SimGateway, StatusPublisher, StatusSources};
use robot_companion::services::{create_remote_worker, Coordinator};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Robot companion - person tracking and navigation coordinator
#[derive(Parser, Debug)]
#[command(name = "robot-companion", version, about)]
struct Args {
    /// Path to TOML configuration file (defaults to $CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Structured logging, level via RUST_LOG (default: info)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false);
    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = %env!("CARGO_PKG_VERSION"), git_hash = %env!("GIT_HASH"), "robot-companion starting");

    let config_path = args.config.unwrap_or_else(Config::default_config_path);
    let config = Config::load_from_path(&config_path);

    info!(
        config_file = %config.config_file(),
        robot_id = %config.robot_id(),
        poll_interval_ms = %config.follow_poll_interval().as_millis(),
        lost_timeout_secs = %config.follow_lost_timeout_secs(),
        max_distance_m = %config.follow_max_distance_m(),
        mqtt_enabled = %config.mqtt_enabled(),
        mqtt_host = %config.mqtt_host(),
        mqtt_port = %config.mqtt_port(),
        sim_persons = %config.sim().persons.len(),
        sim_places = %config.sim().places.len(),
        "config_loaded"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let metrics = Arc::new(Metrics::new());

    // Gateway callback channel (bounded for backpressure)
    let (event_tx, event_rx) = mpsc::channel(1000);
    let gateway = Arc::new(SimGateway::new(&config, event_tx));
    let coordinator = Arc::new(Coordinator::new(config.clone(), gateway.clone(), metrics.clone()));

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    if config.mqtt_enabled() {
        // Remote command worker, fed by the MQTT listener
        let (cmd_tx, worker) = create_remote_worker(coordinator.clone(), metrics.clone(), 64);
        tokio::spawn(worker.run());

        let mqtt_config = config.clone();
        let mqtt_metrics = metrics.clone();
        let mqtt_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = robot_companion::io::mqtt::start_mqtt_client(
                &mqtt_config,
                cmd_tx,
                mqtt_metrics,
                mqtt_shutdown,
            )
            .await
            {
                tracing::error!(error = %e, "mqtt_client_error");
            }
        });

        let publisher = StatusPublisher::new(&config, StatusSources::from_coordinator(&coordinator));
        let publisher_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            publisher.run(publisher_shutdown).await;
        });
    }

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    gateway.connect();
    coordinator.track_persons(true);

    // Run coordinator - consumes gateway callbacks until shutdown
    coordinator.run(event_rx, shutdown_rx).await;

    metrics.report().log();
    info!("robot-companion shutdown complete");
    Ok(())
}
