//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use robot_companion::domain::types::{Person, PersonId, SpeechOutcome};
use robot_companion::infra::Config;
use robot_companion::services::gateway::{FollowParams, Motion, NavigationParams, RobotGateway};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Robot command as seen by the recording gateway
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    StartFollow(PersonId),
    StopFollow,
    RequestPlaces,
    Navigate(String),
    Motion(Motion),
    PlayText(String),
}

/// Gateway that records robot commands and answers person queries from a
/// fixed list. Listener registration and microphone calls are accepted
/// silently; the unit-test fake in the coordinator checks those.
pub struct RecordingGateway {
    persons: Mutex<Vec<Person>>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingGateway {
    pub fn new(persons: Vec<Person>) -> Self {
        Self { persons: Mutex::new(persons), calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl RobotGateway for RecordingGateway {
    async fn get_all_persons(&self) -> anyhow::Result<Vec<Person>> {
        Ok(self.persons.lock().clone())
    }

    fn start_follow(&self, target: PersonId, _params: FollowParams) -> anyhow::Result<()> {
        self.record(Call::StartFollow(target));
        Ok(())
    }

    fn stop_follow(&self) -> anyhow::Result<()> {
        self.record(Call::StopFollow);
        Ok(())
    }

    fn register_person_listener(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn unregister_person_listener(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn request_place_list(&self) -> anyhow::Result<()> {
        self.record(Call::RequestPlaces);
        Ok(())
    }

    fn start_navigation(&self, destination: &str, _params: NavigationParams) -> anyhow::Result<()> {
        self.record(Call::Navigate(destination.to_string()));
        Ok(())
    }

    fn execute_motion(&self, motion: Motion) -> anyhow::Result<()> {
        self.record(Call::Motion(motion));
        Ok(())
    }

    async fn play_text(&self, _utterance_id: &str, text: &str) -> anyhow::Result<SpeechOutcome> {
        self.record(Call::PlayText(text.to_string()));
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(SpeechOutcome::Completed)
    }

    fn set_listening(&self, _recognize_mode: bool, _recognizable: bool) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Write `content` to a temp file and load it as config.
/// The file handle is returned so it outlives the test body.
pub fn config_from_toml(content: &str) -> (Config, NamedTempFile) {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    let config = Config::from_file(temp_file.path()).unwrap();
    (config, temp_file)
}

/// Poll `condition` every 5ms for up to two seconds
pub async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
