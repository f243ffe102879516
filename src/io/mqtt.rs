//! MQTT client for receiving remote-control commands

use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::remote::RemoteCommand;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Build broker options for a client of this robot
pub(crate) fn mqtt_options(config: &Config, role: &str) -> MqttOptions {
    let client_id = format!("{}-{}-{}", config.robot_id(), role, std::process::id());
    let mut mqttoptions = MqttOptions::new(client_id, config.mqtt_host(), config.mqtt_port());
    mqttoptions.set_keep_alive(Duration::from_secs(30));
    mqttoptions.set_clean_session(true);

    // Set credentials if configured
    if let (Some(username), Some(password)) = (config.mqtt_username(), config.mqtt_password()) {
        mqttoptions.set_credentials(username, password);
    }
    mqttoptions
}

/// Start the MQTT client and send parsed commands to the channel
///
/// Commands are sent via try_send to avoid blocking the MQTT eventloop.
/// Unparseable payloads and dropped commands are logged.
pub async fn start_mqtt_client(
    config: &Config,
    cmd_tx: mpsc::Sender<RemoteCommand>,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let (client, mut eventloop) = AsyncClient::new(mqtt_options(config, "commands"), 100);
    client.subscribe(config.mqtt_command_topic(), QoS::AtMostOnce).await?;

    info!(
        topic = %config.mqtt_command_topic(),
        host = %config.mqtt_host(),
        port = %config.mqtt_port(),
        "mqtt_commands_subscribed"
    );

    // Rate-limit drop warnings to 1 per second
    let mut last_drop_warn = Instant::now() - Duration::from_secs(2);

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("mqtt_shutdown");
                    return Ok(());
                }
            }
            result = eventloop.poll() => {
                match result {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let payload = match std::str::from_utf8(&publish.payload) {
                            Ok(payload) => payload,
                            Err(e) => {
                                warn!(error = %e, "mqtt_payload_not_utf8");
                                continue;
                            }
                        };

                        let cmd = match RemoteCommand::parse(payload) {
                            Ok(cmd) => cmd,
                            Err(e) => {
                                warn!(topic = %publish.topic, payload = %payload, error = %e, "remote_command_unparseable");
                                continue;
                            }
                        };

                        debug!(command = %cmd.name(), "remote_command_parsed");
                        match cmd_tx.try_send(cmd) {
                            Ok(()) => {}
                            Err(TrySendError::Full(_)) => {
                                metrics.record_remote_command_dropped();
                                if last_drop_warn.elapsed() > Duration::from_secs(1) {
                                    warn!("remote_command_dropped: channel full");
                                    last_drop_warn = Instant::now();
                                }
                            }
                            Err(TrySendError::Closed(_)) => {
                                warn!("remote_command_channel_closed");
                                return Ok(());
                            }
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("mqtt_connected");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "mqtt_error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }
}
