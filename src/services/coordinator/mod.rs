//! Robot coordinator
//!
//! The Coordinator is the composition root of the robot core. It owns:
//! - Focus-follow state (who the robot is following)
//! - The person tracking loop (target selection and retries)
//! - Navigation event fan-out to registered listeners
//! - The places catalog (selectable destinations)
//! - Listening/speech coordination and the face mood
//!
//! Gateway callbacks are consumed by [`Coordinator::run`], which is the single
//! callback context for the gateway. Observers read state through watch
//! receivers from any thread.

mod handlers;

use crate::domain::types::{
    FaceMood, FollowState, GatewayEvent, InteractionState, MotionCommand, SpeechOutcome,
};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::detection::PersonDetection;
use crate::services::dispatcher::{EventDispatcher, NavigationListener};
use crate::services::follow::FollowStateMachine;
use crate::services::gateway::{FollowParams, Motion, NavigationParams, RobotGateway};
use crate::services::interaction::InteractionOrchestrator;
use crate::services::places::{PlacesCatalog, PlacesSnapshot};
use crate::services::tracking::PersonTracker;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

pub use handlers::mood_after_detection;

pub struct Coordinator {
    config: Config,
    gateway: Arc<dyn RobotGateway>,
    dispatcher: EventDispatcher,
    follow: Arc<FollowStateMachine>,
    tracker: PersonTracker,
    places: PlacesCatalog,
    interaction: InteractionOrchestrator,
    mood: watch::Sender<FaceMood>,
}

impl Coordinator {
    /// Create a coordinator around an injected gateway
    pub fn new(config: Config, gateway: Arc<dyn RobotGateway>, metrics: Arc<Metrics>) -> Self {
        let detection = Arc::new(PersonDetection::new(gateway.clone()));
        let follow = Arc::new(FollowStateMachine::new(
            gateway.clone(),
            detection.clone(),
            FollowParams::from_config(&config),
            metrics.clone(),
        ));
        let tracker = PersonTracker::new(
            gateway.clone(),
            detection,
            follow.clone(),
            config.follow_poll_interval(),
            metrics.clone(),
        );
        let (mood, _) = watch::channel(FaceMood::Neutral);

        Self {
            dispatcher: EventDispatcher::new(metrics.clone()),
            places: PlacesCatalog::new(gateway.clone(), metrics.clone()),
            interaction: InteractionOrchestrator::new(gateway.clone(), metrics),
            follow,
            tracker,
            mood,
            gateway,
            config,
        }
    }

    /// Consume gateway callbacks until the channel closes or shutdown is signalled
    pub async fn run(
        &self,
        mut event_rx: mpsc::Receiver<GatewayEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("coordinator_started");
        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    match event {
                        Some(e) => self.process_event(e),
                        None => break, // Channel closed
                    }
                }
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        self.tracker.stop_tracking();
        info!("coordinator_stopped");
    }

    // Person tracking / follow

    pub fn track_persons(&self, start_fresh: bool) {
        self.tracker.track_persons(start_fresh);
    }

    pub fn stop_tracking(&self) {
        self.tracker.stop_tracking();
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.is_tracking()
    }

    /// Stop following without cancelling the tracking loop
    pub fn stop_follow(&self) {
        self.follow.stop_follow();
    }

    pub fn follow_state(&self) -> FollowState {
        self.follow.state()
    }

    pub fn subscribe_follow_state(&self) -> watch::Receiver<FollowState> {
        self.follow.subscribe()
    }

    // Navigation

    pub fn add_navigation_listener(&self, listener: Arc<dyn NavigationListener>) -> bool {
        self.dispatcher.add_listener(listener)
    }

    pub fn remove_navigation_listener(&self, listener: &Arc<dyn NavigationListener>) -> bool {
        self.dispatcher.remove_listener(listener)
    }

    /// Navigate to a named place
    pub fn go_to(&self, destination: &str) -> anyhow::Result<()> {
        let params = NavigationParams::from_config(&self.config);
        self.gateway.start_navigation(destination, params)?;
        info!(destination = %destination, timeout_ms = %params.timeout_ms, "navigation_requested");
        Ok(())
    }

    pub fn move_robot(&self, command: MotionCommand) -> anyhow::Result<()> {
        let motion = Motion::resolve(command, self.config.motion());
        self.gateway.execute_motion(motion)?;
        info!(command = %command.as_str(), "motion_requested");
        Ok(())
    }

    // Places

    pub fn request_places(&self) {
        self.places.request_places();
    }

    pub fn places(&self) -> Arc<PlacesSnapshot> {
        self.places.snapshot()
    }

    pub fn destinations(&self) -> Vec<String> {
        self.places.destinations()
    }

    pub fn subscribe_places(&self) -> watch::Receiver<Arc<PlacesSnapshot>> {
        self.places.subscribe()
    }

    // Interaction

    pub async fn speak<F>(&self, text: &str, listen_after: bool, on_complete: F) -> SpeechOutcome
    where
        F: FnOnce(SpeechOutcome) + Send,
    {
        self.interaction.speak(text, listen_after, on_complete).await
    }

    pub fn set_listening(&self, enabled: bool) {
        self.interaction.set_listening(enabled);
    }

    pub fn begin_thinking(&self) {
        self.interaction.begin_thinking();
    }

    pub fn interaction_state(&self) -> InteractionState {
        self.interaction.state()
    }

    pub fn subscribe_interaction(&self) -> watch::Receiver<InteractionState> {
        self.interaction.subscribe()
    }

    // Mood

    pub fn mood(&self) -> FaceMood {
        *self.mood.borrow()
    }

    pub fn set_mood(&self, mood: FaceMood) {
        let previous = self.mood.send_replace(mood);
        if previous != mood {
            info!(from = ?previous, to = ?mood, "mood_changed");
        }
    }

    pub fn subscribe_mood(&self) -> watch::Receiver<FaceMood> {
        self.mood.subscribe()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if self.tracker.is_tracking() {
            warn!("coordinator_dropped_while_tracking");
            self.tracker.stop_tracking();
        }
    }
}
