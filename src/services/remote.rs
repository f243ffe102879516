//! Remote command worker - applies operator commands to the coordinator
//!
//! Commands arrive from the MQTT listener on an mpsc channel. The worker
//! runs them one at a time; speech is spawned so a long utterance does not
//! hold up motion commands queued behind it.

use crate::domain::types::{FaceMood, MotionCommand};
use crate::infra::metrics::Metrics;
use crate::services::coordinator::Coordinator;
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Operator command received over the remote-control channel
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCommand {
    Motion(MotionCommand),
    Track,
    StopTracking,
    RequestPlaces,
    VideoCall,
    EndCall,
    GoTo(String),
    Speak(String),
    Mood(FaceMood),
}

/// JSON form of a command: `{"event": "go_to", "message": "lab"}`
#[derive(Debug, Deserialize)]
struct EventPayload {
    event: String,
    #[serde(default)]
    message: String,
}

impl RemoteCommand {
    /// Parse a raw payload, either a plain token or an event object
    pub fn parse(payload: &str) -> anyhow::Result<Self> {
        let payload = payload.trim();
        if payload.starts_with('{') {
            let event: EventPayload =
                serde_json::from_str(payload).context("Invalid command object")?;
            return Self::from_event(&event.event, event.message);
        }

        Ok(match payload.to_ascii_lowercase().as_str() {
            "forward" => RemoteCommand::Motion(MotionCommand::Forward),
            "backward" => RemoteCommand::Motion(MotionCommand::Backward),
            "left" => RemoteCommand::Motion(MotionCommand::TurnLeft),
            "right" => RemoteCommand::Motion(MotionCommand::TurnRight),
            "stop" => RemoteCommand::Motion(MotionCommand::Stop),
            "head_up" => RemoteCommand::Motion(MotionCommand::HeadUp),
            "head_down" => RemoteCommand::Motion(MotionCommand::HeadDown),
            "head_reset" => RemoteCommand::Motion(MotionCommand::HeadReset),
            "track" => RemoteCommand::Track,
            "stop_tracking" => RemoteCommand::StopTracking,
            "places" => RemoteCommand::RequestPlaces,
            "video_call" => RemoteCommand::VideoCall,
            "end_call" => RemoteCommand::EndCall,
            other => anyhow::bail!("unknown command '{}'", other),
        })
    }

    fn from_event(event: &str, message: String) -> anyhow::Result<Self> {
        match event {
            "go_to" | "speak" if message.trim().is_empty() => {
                anyhow::bail!("event '{}' needs a message", event)
            }
            "go_to" => Ok(RemoteCommand::GoTo(message.trim().to_string())),
            "speak" => Ok(RemoteCommand::Speak(message)),
            "mood" => Ok(RemoteCommand::Mood(message.parse()?)),
            other => anyhow::bail!("unknown event '{}'", other),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RemoteCommand::Motion(command) => command.as_str(),
            RemoteCommand::Track => "track",
            RemoteCommand::StopTracking => "stop_tracking",
            RemoteCommand::RequestPlaces => "places",
            RemoteCommand::VideoCall => "video_call",
            RemoteCommand::EndCall => "end_call",
            RemoteCommand::GoTo(_) => "go_to",
            RemoteCommand::Speak(_) => "speak",
            RemoteCommand::Mood(_) => "mood",
        }
    }
}

/// Worker that applies remote commands until the channel closes
pub struct RemoteCommandWorker {
    coordinator: Arc<Coordinator>,
    cmd_rx: mpsc::Receiver<RemoteCommand>,
    metrics: Arc<Metrics>,
}

impl RemoteCommandWorker {
    pub fn new(
        coordinator: Arc<Coordinator>,
        cmd_rx: mpsc::Receiver<RemoteCommand>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { coordinator, cmd_rx, metrics }
    }

    pub async fn run(mut self) {
        info!("remote_command_worker_started");

        while let Some(cmd) = self.cmd_rx.recv().await {
            self.metrics.record_remote_command();
            debug!(command = %cmd.name(), "remote_command_received");
            if let Err(e) = self.apply(cmd) {
                warn!(error = %e, "remote_command_failed");
            }
        }

        info!("remote_command_worker_stopped");
    }

    fn apply(&self, cmd: RemoteCommand) -> anyhow::Result<()> {
        match cmd {
            RemoteCommand::Motion(command) => self.coordinator.move_robot(command)?,
            RemoteCommand::Track => self.coordinator.track_persons(true),
            RemoteCommand::StopTracking => self.coordinator.stop_tracking(),
            RemoteCommand::RequestPlaces => self.coordinator.request_places(),
            RemoteCommand::GoTo(destination) => self.coordinator.go_to(&destination)?,
            RemoteCommand::Mood(mood) => self.coordinator.set_mood(mood),
            RemoteCommand::Speak(text) => {
                let coordinator = self.coordinator.clone();
                tokio::spawn(async move {
                    coordinator
                        .speak(&text, false, |outcome| {
                            debug!(outcome = ?outcome, "remote_speech_done");
                        })
                        .await;
                });
            }
            call @ (RemoteCommand::VideoCall | RemoteCommand::EndCall) => {
                info!(command = %call.name(), "remote_call_request_ignored");
            }
        }
        Ok(())
    }
}

/// Create a remote command channel and worker
///
/// Returns the sender (for the MQTT listener) and the worker (to be spawned)
pub fn create_remote_worker(
    coordinator: Arc<Coordinator>,
    metrics: Arc<Metrics>,
    buffer_size: usize,
) -> (mpsc::Sender<RemoteCommand>, RemoteCommandWorker) {
    let (cmd_tx, cmd_rx) = mpsc::channel(buffer_size);
    let worker = RemoteCommandWorker::new(coordinator, cmd_rx, metrics);
    (cmd_tx, worker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_tokens() {
        assert_eq!(
            RemoteCommand::parse("left").unwrap(),
            RemoteCommand::Motion(MotionCommand::TurnLeft)
        );
        assert_eq!(
            RemoteCommand::parse(" HEAD_UP\n").unwrap(),
            RemoteCommand::Motion(MotionCommand::HeadUp)
        );
        assert_eq!(RemoteCommand::parse("track").unwrap(), RemoteCommand::Track);
        assert_eq!(RemoteCommand::parse("places").unwrap(), RemoteCommand::RequestPlaces);
        assert_eq!(RemoteCommand::parse("end_call").unwrap(), RemoteCommand::EndCall);
        assert!(RemoteCommand::parse("dance").is_err());
        assert!(RemoteCommand::parse("").is_err());
    }

    #[test]
    fn test_parse_events() {
        assert_eq!(
            RemoteCommand::parse(r#"{"event":"go_to","message":" lab "}"#).unwrap(),
            RemoteCommand::GoTo("lab".to_string())
        );
        assert_eq!(
            RemoteCommand::parse(r#"{"event":"speak","message":"hello"}"#).unwrap(),
            RemoteCommand::Speak("hello".to_string())
        );
        assert_eq!(
            RemoteCommand::parse(r#"{"event":"mood","message":"love"}"#).unwrap(),
            RemoteCommand::Mood(FaceMood::Love)
        );
    }

    #[test]
    fn test_parse_rejects_bad_events() {
        assert!(RemoteCommand::parse(r#"{"event":"go_to"}"#).is_err());
        assert!(RemoteCommand::parse(r#"{"event":"mood","message":"grumpy"}"#).is_err());
        assert!(RemoteCommand::parse(r#"{"event":"fly","message":"up"}"#).is_err());
        assert!(RemoteCommand::parse(r#"{"message":"no event"}"#).is_err());
        assert!(RemoteCommand::parse("{not json").is_err());
    }

    #[test]
    fn test_command_names() {
        assert_eq!(RemoteCommand::Motion(MotionCommand::Stop).name(), "stop");
        assert_eq!(RemoteCommand::GoTo("lab".into()).name(), "go_to");
    }
}
