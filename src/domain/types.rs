//! Shared types for the robot companion

use serde::{Deserialize, Serialize};

/// Newtype wrapper for person IDs reported by the robot gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PersonId(pub i32);

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Person snapshot from a single gateway query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub has_face: bool,
}

impl Person {
    #[inline]
    pub fn new(id: i32, has_face: bool) -> Self {
        Self { id: PersonId(id), has_face }
    }

    /// Only persons with a detected face can be followed
    #[inline]
    pub fn is_followable(&self) -> bool {
        self.has_face
    }
}

/// Focus-follow state of the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowState {
    #[default]
    NotFollowing,
    Following,
    /// Target lost; transient until the teardown completes
    Lost,
    /// Target still tracked but beyond the follow distance
    OutOfRange,
}

impl FollowState {
    /// True while a follow command is active on the gateway
    pub fn is_engaged(&self) -> bool {
        matches!(self, FollowState::Following | FollowState::OutOfRange)
    }

    pub fn as_str(&self) -> &str {
        match self {
            FollowState::NotFollowing => "not_following",
            FollowState::Following => "following",
            FollowState::Lost => "lost",
            FollowState::OutOfRange => "out_of_range",
        }
    }
}

/// Face shown on the robot screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceMood {
    #[default]
    Neutral,
    Happy,
    Bored,
    Mad,
    Sad,
    Love,
}

impl std::str::FromStr for FaceMood {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "neutral" => FaceMood::Neutral,
            "happy" => FaceMood::Happy,
            "bored" => FaceMood::Bored,
            "mad" => FaceMood::Mad,
            "sad" => FaceMood::Sad,
            "love" => FaceMood::Love,
            other => anyhow::bail!("unknown face mood '{}'", other),
        })
    }
}

/// What the robot is doing conversationally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionState {
    #[default]
    Idle,
    Thinking,
    Listening,
    Speaking,
}

/// Navigation events fanned out to registered listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationEvent {
    RouteBlocked,
    ObstacleCleared,
    NavigationStarted,
}

/// Named navigation target on the robot map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    pub name: String,
}

/// Movement primitives exposed by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionCommand {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
    Stop,
    HeadUp,
    HeadDown,
    HeadReset,
}

impl MotionCommand {
    pub fn as_str(&self) -> &str {
        match self {
            MotionCommand::Forward => "forward",
            MotionCommand::Backward => "backward",
            MotionCommand::TurnLeft => "turn_left",
            MotionCommand::TurnRight => "turn_right",
            MotionCommand::Stop => "stop",
            MotionCommand::HeadUp => "head_up",
            MotionCommand::HeadDown => "head_down",
            MotionCommand::HeadReset => "head_reset",
        }
    }
}

/// Status callbacks of a focus-follow command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowStatus {
    TrackSucceeded,
    GuestLost,
    GuestFaraway,
    GuestAppear,
    Other(i32),
}

/// Error callbacks of a focus-follow command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowError {
    SetTrackFailed,
    TargetNotFound,
    AlreadyRunning,
    Other(i32),
}

/// Status callbacks of a navigation command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationStatus {
    AvoidStarted,
    AvoidEnded,
    NavigationStarted,
    TrackSucceeded,
    GuestAppear,
    GuestLost,
    GuestFaraway,
    Other(i32),
}

/// How a text-to-speech playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    Completed,
    Stopped,
    Failed,
}

/// Asynchronous callbacks delivered by a gateway on its callback channel
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    /// Gateway API connection established
    Connected,
    FollowStatus(FollowStatus),
    FollowError { error: FollowError, message: Option<String> },
    NavigationStatus(NavigationStatus),
    /// Final result of a navigation command
    NavigationResult { status: i32, message: Option<String> },
    /// Raw place-list response (JSON array text)
    PlaceList(String),
    /// Person-change notification with the current person list
    PersonsChanged(Vec<Person>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engaged_states() {
        assert!(FollowState::Following.is_engaged());
        assert!(FollowState::OutOfRange.is_engaged());
        assert!(!FollowState::Lost.is_engaged());
        assert!(!FollowState::NotFollowing.is_engaged());
    }

    #[test]
    fn test_face_mood_from_str() {
        assert_eq!("Happy".parse::<FaceMood>().unwrap(), FaceMood::Happy);
        assert_eq!(" love ".parse::<FaceMood>().unwrap(), FaceMood::Love);
        assert!("grumpy".parse::<FaceMood>().is_err());
    }

    #[test]
    fn test_place_deserialize() {
        let place: Place =
            serde_json::from_str(r#"{"x":1.0,"y":2,"theta":0,"name":"lab","id":7}"#).unwrap();
        assert_eq!(place.name, "lab");
        assert_eq!(place.y, 2.0);
    }
}
