//! Simulated robot gateway
//!
//! Stands in for the vendor SDK so the coordinator can run on a desk. The
//! world (persons, places) is scripted from the `[sim]` config section and
//! can be changed at runtime with [`SimGateway::set_persons`]. Callbacks are
//! delivered on the event channel the gateway was built with.

use crate::domain::types::{
    FollowError, FollowStatus, GatewayEvent, NavigationStatus, Person, PersonId, Place,
    SpeechOutcome,
};
use crate::infra::config::Config;
use crate::services::gateway::{FollowParams, Motion, NavigationParams, RobotGateway};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

/// Navigation result code for a completed route
pub const NAVIGATION_RESULT_OK: i32 = 0;
/// Navigation result code for an unknown destination
pub const NAVIGATION_RESULT_UNKNOWN_PLACE: i32 = -1;

pub struct SimGateway {
    event_tx: mpsc::Sender<GatewayEvent>,
    persons: Mutex<Vec<Person>>,
    places: Vec<Place>,
    registered: Mutex<bool>,
    following: Arc<Mutex<Option<PersonId>>>,
    follow_delay: Duration,
    speech_ms_per_char: u64,
}

impl SimGateway {
    pub fn new(config: &Config, event_tx: mpsc::Sender<GatewayEvent>) -> Self {
        let sim = config.sim();
        Self {
            event_tx,
            persons: Mutex::new(sim.persons.clone()),
            places: sim.places.clone(),
            registered: Mutex::new(false),
            following: Arc::new(Mutex::new(None)),
            follow_delay: Duration::from_millis(sim.follow_delay_ms),
            speech_ms_per_char: sim.speech_ms_per_char,
        }
    }

    /// Report the API connection, as the vendor SDK does once at startup
    pub fn connect(&self) {
        self.emit(GatewayEvent::Connected);
    }

    /// Replace the visible persons; registered listeners are notified
    pub fn set_persons(&self, persons: Vec<Person>) {
        *self.persons.lock() = persons.clone();

        let mut following = self.following.lock();
        if let Some(target) = *following {
            if !persons.iter().any(|p| p.id == target) {
                *following = None;
                self.emit(GatewayEvent::FollowStatus(FollowStatus::GuestLost));
            }
        }
        drop(following);

        if *self.registered.lock() {
            self.emit(GatewayEvent::PersonsChanged(persons));
        }
    }

    pub fn following(&self) -> Option<PersonId> {
        *self.following.lock()
    }

    fn emit(&self, event: GatewayEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(event = ?event, "sim_event_dropped: channel full");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("sim_event_channel_closed");
            }
        }
    }

    /// Report success after the follow delay, unless the follow was stopped
    /// or retargeted in the meantime
    fn emit_follow_success(&self, target: PersonId) {
        let event_tx = self.event_tx.clone();
        let following = self.following.clone();
        let delay = self.follow_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let current = *following.lock();
            if current != Some(target) {
                debug!(target_id = %target, "sim_follow_success_cancelled");
                return;
            }
            let _ = event_tx.send(GatewayEvent::FollowStatus(FollowStatus::TrackSucceeded)).await;
        });
    }

    fn emit_later(&self, delay: Duration, events: Vec<GatewayEvent>) {
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            for event in events {
                if event_tx.send(event).await.is_err() {
                    return;
                }
            }
        });
    }
}

#[async_trait]
impl RobotGateway for SimGateway {
    async fn get_all_persons(&self) -> anyhow::Result<Vec<Person>> {
        Ok(self.persons.lock().clone())
    }

    fn start_follow(&self, target: PersonId, params: FollowParams) -> anyhow::Result<()> {
        let mut following = self.following.lock();
        if following.is_some() {
            self.emit(GatewayEvent::FollowError {
                error: FollowError::AlreadyRunning,
                message: Some("focus follow already running".to_string()),
            });
            return Ok(());
        }

        let visible = self.persons.lock().iter().any(|p| p.id == target && p.is_followable());
        if !visible {
            self.emit(GatewayEvent::FollowError {
                error: FollowError::TargetNotFound,
                message: Some(format!("person {} not in view", target)),
            });
            return Ok(());
        }

        *following = Some(target);
        info!(
            target_id = %target,
            lost_timeout_secs = %params.lost_timeout_secs,
            max_distance_m = %params.max_distance_m,
            "sim_follow_started"
        );
        self.emit_follow_success(target);
        Ok(())
    }

    fn stop_follow(&self) -> anyhow::Result<()> {
        if let Some(target) = self.following.lock().take() {
            info!(target_id = %target, "sim_follow_stopped");
        }
        Ok(())
    }

    fn register_person_listener(&self) -> anyhow::Result<()> {
        let mut registered = self.registered.lock();
        if *registered {
            anyhow::bail!("person listener already registered");
        }
        *registered = true;
        debug!("sim_person_listener_registered");
        Ok(())
    }

    fn unregister_person_listener(&self) -> anyhow::Result<()> {
        let mut registered = self.registered.lock();
        if !*registered {
            anyhow::bail!("person listener not registered");
        }
        *registered = false;
        debug!("sim_person_listener_unregistered");
        Ok(())
    }

    fn request_place_list(&self) -> anyhow::Result<()> {
        let raw = serde_json::to_string(&self.places)?;
        self.emit(GatewayEvent::PlaceList(raw));
        Ok(())
    }

    fn start_navigation(&self, destination: &str, params: NavigationParams) -> anyhow::Result<()> {
        if !self.places.iter().any(|p| p.name == destination) {
            self.emit(GatewayEvent::NavigationResult {
                status: NAVIGATION_RESULT_UNKNOWN_PLACE,
                message: Some(format!("unknown destination '{}'", destination)),
            });
            return Ok(());
        }

        info!(destination = %destination, timeout_ms = %params.timeout_ms, "sim_navigation_started");
        self.emit(GatewayEvent::NavigationStatus(NavigationStatus::NavigationStarted));
        self.emit_later(
            self.follow_delay,
            vec![GatewayEvent::NavigationResult {
                status: NAVIGATION_RESULT_OK,
                message: Some(destination.to_string()),
            }],
        );
        Ok(())
    }

    fn execute_motion(&self, motion: Motion) -> anyhow::Result<()> {
        info!(motion = ?motion, "sim_motion");
        Ok(())
    }

    async fn play_text(&self, utterance_id: &str, text: &str) -> anyhow::Result<SpeechOutcome> {
        let duration = Duration::from_millis(self.speech_ms_per_char * text.chars().count() as u64);
        debug!(utterance_id = %utterance_id, duration_ms = %duration.as_millis(), "sim_speech");
        tokio::time::sleep(duration).await;
        Ok(SpeechOutcome::Completed)
    }

    fn set_listening(&self, recognize_mode: bool, recognizable: bool) -> anyhow::Result<()> {
        debug!(recognize_mode = %recognize_mode, recognizable = %recognizable, "sim_listening");
        Ok(())
    }
}
