//! MQTT publisher for robot status
//!
//! Publishes a JSON snapshot to the status topic (QoS 0) whenever the
//! follow state, face mood, interaction state or destination list changes.

use crate::domain::types::{FaceMood, FollowState, InteractionState};
use crate::infra::config::Config;
use crate::io::mqtt::mqtt_options;
use crate::services::coordinator::Coordinator;
use crate::services::places::PlacesSnapshot;
use rumqttc::{AsyncClient, Event, Packet, QoS};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Status message body
#[derive(Debug, Clone, Serialize)]
pub struct StatusPayload {
    pub robot: String,
    /// RFC 3339 UTC timestamp
    pub ts: String,
    pub follow: FollowState,
    pub mood: FaceMood,
    pub interaction: InteractionState,
    pub destinations: Vec<String>,
}

/// Watch receivers for every published piece of state
pub struct StatusSources {
    pub follow: watch::Receiver<FollowState>,
    pub mood: watch::Receiver<FaceMood>,
    pub interaction: watch::Receiver<InteractionState>,
    pub places: watch::Receiver<Arc<PlacesSnapshot>>,
}

impl StatusSources {
    pub fn from_coordinator(coordinator: &Coordinator) -> Self {
        Self {
            follow: coordinator.subscribe_follow_state(),
            mood: coordinator.subscribe_mood(),
            interaction: coordinator.subscribe_interaction(),
            places: coordinator.subscribe_places(),
        }
    }

    /// Build a payload from the latest values, marking them seen
    pub fn snapshot(&mut self, robot: &str) -> StatusPayload {
        StatusPayload {
            robot: robot.to_string(),
            ts: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            follow: *self.follow.borrow_and_update(),
            mood: *self.mood.borrow_and_update(),
            interaction: *self.interaction.borrow_and_update(),
            destinations: self.places.borrow_and_update().destinations.clone(),
        }
    }

    /// Wait until any source changes. Returns false once a source is closed.
    pub async fn changed(&mut self) -> bool {
        let result = tokio::select! {
            r = self.follow.changed() => r,
            r = self.mood.changed() => r,
            r = self.interaction.changed() => r,
            r = self.places.changed() => r,
        };
        result.is_ok()
    }
}

/// MQTT status publisher actor
pub struct StatusPublisher {
    client: AsyncClient,
    robot_id: String,
    topic: String,
    sources: StatusSources,
}

impl StatusPublisher {
    /// Create a new status publisher
    ///
    /// Connects to the broker at the configured MQTT host/port.
    pub fn new(config: &Config, sources: StatusSources) -> Self {
        let (client, eventloop) = AsyncClient::new(mqtt_options(config, "status"), 100);

        // Spawn the eventloop handler
        tokio::spawn(async move {
            let mut eventloop = eventloop;
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("mqtt_status_connected");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "mqtt_status_error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Self {
            client,
            robot_id: config.robot_id().to_string(),
            topic: config.mqtt_status_topic().to_string(),
            sources,
        }
    }

    /// Run the publisher loop until shutdown
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(topic = %self.topic, "mqtt_status_started");

        // Initial snapshot so subscribers see the state without waiting for a change
        self.publish().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("mqtt_status_shutdown");
                        return;
                    }
                }
                open = self.sources.changed() => {
                    if !open {
                        info!("mqtt_status_sources_closed");
                        return;
                    }
                    self.publish().await;
                }
            }
        }
    }

    async fn publish(&mut self) {
        let payload = self.sources.snapshot(&self.robot_id);
        let json = match serde_json::to_string(&payload) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "mqtt_status_serialize_failed");
                return;
            }
        };
        if let Err(e) = self.client.publish(&self.topic, QoS::AtMostOnce, false, json.as_bytes()).await
        {
            debug!(error = %e, "mqtt_status_publish_failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Place;

    fn sources() -> (
        StatusSources,
        watch::Sender<FollowState>,
        watch::Sender<FaceMood>,
        watch::Sender<InteractionState>,
        watch::Sender<Arc<PlacesSnapshot>>,
    ) {
        let (follow_tx, follow) = watch::channel(FollowState::NotFollowing);
        let (mood_tx, mood) = watch::channel(FaceMood::Neutral);
        let (interaction_tx, interaction) = watch::channel(InteractionState::Idle);
        let (places_tx, places) = watch::channel(Arc::new(PlacesSnapshot::default()));
        (StatusSources { follow, mood, interaction, places }, follow_tx, mood_tx, interaction_tx, places_tx)
    }

    #[test]
    fn test_snapshot_json() {
        let (mut sources, follow_tx, mood_tx, _interaction_tx, places_tx) = sources();
        follow_tx.send_replace(FollowState::OutOfRange);
        mood_tx.send_replace(FaceMood::Happy);
        places_tx.send_replace(Arc::new(PlacesSnapshot {
            places: vec![Place { x: 0.0, y: 0.0, theta: 0.0, name: "lab".into() }],
            destinations: vec!["lab".into()],
        }));

        let payload = sources.snapshot("robot-1");
        let json: serde_json::Value = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["robot"], "robot-1");
        assert_eq!(json["follow"], "out_of_range");
        assert_eq!(json["mood"], "happy");
        assert_eq!(json["interaction"], "idle");
        assert_eq!(json["destinations"][0], "lab");
        assert!(!payload.ts.is_empty());
    }

    #[tokio::test]
    async fn test_changed_wakes_on_any_source() {
        let (mut sources, _follow_tx, _mood_tx, interaction_tx, _places_tx) = sources();
        sources.snapshot("robot-1");

        interaction_tx.send_replace(InteractionState::Speaking);
        assert!(sources.changed().await);
        assert_eq!(sources.snapshot("robot-1").interaction, InteractionState::Speaking);
    }

    #[tokio::test]
    async fn test_changed_reports_closed_source() {
        let (mut sources, follow_tx, _mood_tx, _interaction_tx, _places_tx) = sources();
        drop(follow_tx);
        assert!(!sources.changed().await);
    }
}
