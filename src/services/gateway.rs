//! Robot gateway interface
//!
//! The vendor SDK sits behind this trait. Query calls are async and return
//! their result directly. Command calls return once the command is accepted;
//! their status callbacks arrive later as [`GatewayEvent`]s on the channel the
//! implementation was constructed with, one event at a time.
//!
//! [`GatewayEvent`]: crate::domain::types::GatewayEvent

use crate::domain::types::{MotionCommand, Person, PersonId, SpeechOutcome};
use crate::infra::config::{Config, MotionConfig};
use async_trait::async_trait;

/// Parameters of a focus-follow command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowParams {
    pub lost_timeout_secs: u64,
    pub max_distance_m: f32,
}

impl FollowParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            lost_timeout_secs: config.follow_lost_timeout_secs(),
            max_distance_m: config.follow_max_distance_m(),
        }
    }
}

/// Parameters of a navigation command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationParams {
    pub coordinate_deviation: f64,
    pub timeout_ms: u64,
}

impl NavigationParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            coordinate_deviation: config.navigation_coordinate_deviation(),
            timeout_ms: config.navigation_timeout_ms(),
        }
    }
}

/// Movement primitive resolved against the motion configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    GoForward { speed: f32, distance_m: f32 },
    GoBackward { speed: f32 },
    TurnLeft { speed: f32 },
    TurnRight { speed: f32 },
    StopMove,
    MoveHead { horizontal: i32, vertical: i32 },
    ResetHead,
}

impl Motion {
    pub fn resolve(command: MotionCommand, motion: &MotionConfig) -> Self {
        match command {
            MotionCommand::Forward => Motion::GoForward {
                speed: motion.linear_speed,
                distance_m: motion.forward_distance_m,
            },
            MotionCommand::Backward => Motion::GoBackward { speed: motion.linear_speed },
            MotionCommand::TurnLeft => Motion::TurnLeft { speed: motion.turn_left_speed },
            MotionCommand::TurnRight => Motion::TurnRight { speed: motion.turn_right_speed },
            MotionCommand::Stop => Motion::StopMove,
            MotionCommand::HeadUp => Motion::MoveHead {
                horizontal: motion.head_horizontal,
                vertical: motion.head_up_vertical,
            },
            MotionCommand::HeadDown => Motion::MoveHead {
                horizontal: motion.head_horizontal,
                vertical: motion.head_down_vertical,
            },
            MotionCommand::HeadReset => Motion::ResetHead,
        }
    }
}

/// Boundary to the vendor robot SDK
#[async_trait]
pub trait RobotGateway: Send + Sync {
    /// Current person snapshot
    async fn get_all_persons(&self) -> anyhow::Result<Vec<Person>>;

    /// Start following `target`; status arrives as follow status/error events
    fn start_follow(&self, target: PersonId, params: FollowParams) -> anyhow::Result<()>;

    fn stop_follow(&self) -> anyhow::Result<()>;

    /// Subscribe to person-change events. Registering twice is an error.
    fn register_person_listener(&self) -> anyhow::Result<()>;

    fn unregister_person_listener(&self) -> anyhow::Result<()>;

    /// Request the place list; the raw response arrives as a place-list event
    fn request_place_list(&self) -> anyhow::Result<()>;

    fn start_navigation(&self, destination: &str, params: NavigationParams) -> anyhow::Result<()>;

    fn execute_motion(&self, motion: Motion) -> anyhow::Result<()>;

    /// Play `text` and resolve once playback ends
    async fn play_text(&self, utterance_id: &str, text: &str) -> anyhow::Result<SpeechOutcome>;

    fn set_listening(&self, recognize_mode: bool, recognizable: bool) -> anyhow::Result<()>;
}
