//! Domain models - core robot types
//!
//! This module contains the canonical data types used throughout the system:
//! - `Person` - person snapshot reported by the gateway
//! - `FollowState` / `FaceMood` / `InteractionState` - observable robot state
//! - `NavigationEvent` - events fanned out to navigation listeners
//! - `Place` - named navigation target
//! - `GatewayEvent` - asynchronous gateway callbacks

pub mod types;

// Re-export commonly used types at module level
pub use types::{
    FaceMood, FollowError, FollowState, FollowStatus, GatewayEvent, InteractionState,
    MotionCommand, NavigationEvent, NavigationStatus, Person, PersonId, Place, SpeechOutcome,
};
