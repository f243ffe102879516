//! Listening and speech coordination
//!
//! Keeps listening and speaking mutually exclusive: listening is disabled
//! before playback starts and only re-enabled after playback ends, when the
//! caller asks for it.

use crate::domain::types::{InteractionState, SpeechOutcome};
use crate::infra::metrics::Metrics;
use crate::services::gateway::RobotGateway;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct InteractionOrchestrator {
    gateway: Arc<dyn RobotGateway>,
    state: watch::Sender<InteractionState>,
    /// Recognize mode stays on once enabled; disabling only clears "recognizable"
    recognize_mode: Mutex<bool>,
    /// One utterance at a time
    speech_turn: tokio::sync::Mutex<()>,
    metrics: Arc<Metrics>,
}

impl InteractionOrchestrator {
    pub fn new(gateway: Arc<dyn RobotGateway>, metrics: Arc<Metrics>) -> Self {
        let (state, _) = watch::channel(InteractionState::Idle);
        Self {
            gateway,
            state,
            recognize_mode: Mutex::new(false),
            speech_turn: tokio::sync::Mutex::new(()),
            metrics,
        }
    }

    pub fn state(&self) -> InteractionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<InteractionState> {
        self.state.subscribe()
    }

    /// Enable or disable speech recognition.
    ///
    /// Enabling sets recognize mode and recognizable; disabling clears only
    /// recognizable. Enabling is refused while speaking.
    pub fn set_listening(&self, enabled: bool) {
        if enabled && self.state() == InteractionState::Speaking {
            warn!("listening_refused_while_speaking");
            return;
        }

        let result = {
            let mut recognize_mode = self.recognize_mode.lock();
            if enabled {
                *recognize_mode = true;
            }
            self.gateway.set_listening(*recognize_mode, enabled)
        };
        if let Err(e) = result {
            warn!(enabled = %enabled, error = %e, "set_listening_failed");
            return;
        }

        self.state.send_if_modified(|state| match (enabled, *state) {
            (true, InteractionState::Listening) => false,
            (true, _) => {
                *state = InteractionState::Listening;
                true
            }
            (false, InteractionState::Listening) => {
                *state = InteractionState::Idle;
                true
            }
            (false, _) => false,
        });
        debug!(enabled = %enabled, "listening_set");
    }

    /// Mark the robot as waiting for a chat reply
    pub fn begin_thinking(&self) {
        // Close the microphone first so the gateway stops recognizing
        if self.state() == InteractionState::Listening {
            self.set_listening(false);
        }
        self.state.send_if_modified(|state| {
            if *state == InteractionState::Speaking || *state == InteractionState::Thinking {
                return false;
            }
            *state = InteractionState::Thinking;
            true
        });
    }

    /// Speak `text` and wait for playback to end.
    ///
    /// The state goes to `Speaking`, then back to `Idle` once the gateway
    /// reports the end of playback; `on_complete` runs exactly once after
    /// that, whatever the outcome. Listening is re-enabled afterwards only
    /// when `listen_after` is set.
    pub async fn speak<F>(&self, text: &str, listen_after: bool, on_complete: F) -> SpeechOutcome
    where
        F: FnOnce(SpeechOutcome) + Send,
    {
        let _turn = self.speech_turn.lock().await;

        self.set_listening(false);
        self.state.send_replace(InteractionState::Speaking);

        let utterance_id = Uuid::now_v7().to_string();
        self.metrics.record_utterance();
        info!(utterance_id = %utterance_id, chars = %text.chars().count(), listen_after = %listen_after, "speech_started");

        let outcome = match self.gateway.play_text(&utterance_id, text).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(utterance_id = %utterance_id, error = %e, "speech_failed");
                SpeechOutcome::Failed
            }
        };

        self.state.send_replace(InteractionState::Idle);
        info!(utterance_id = %utterance_id, outcome = ?outcome, "speech_finished");
        on_complete(outcome);

        if listen_after {
            self.set_listening(true);
        }
        outcome
    }
}
