//! Focus-follow state machine
//!
//! Maps the gateway's follow status and error callbacks onto [`FollowState`]
//! and publishes every change on a watch channel.

use crate::domain::types::{FollowError, FollowState, FollowStatus, PersonId};
use crate::infra::metrics::Metrics;
use crate::services::detection::PersonDetection;
use crate::services::gateway::{FollowParams, RobotGateway};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Side effect of a follow status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowEffect {
    /// Publish the new state even when it did not change
    Notify,
    /// Tear the follow session down
    StopFollow,
    LogOnly,
}

/// Follow status transition table.
///
/// `OutOfRange` is a degraded `Following`: the gateway still holds the
/// target, so [`FollowState::is_engaged`] covers both and the tracking loop
/// issues no new follow command from either.
const FOLLOW_TRANSITIONS: [(FollowStatus, FollowState, FollowEffect); 4] = [
    (FollowStatus::TrackSucceeded, FollowState::Following, FollowEffect::Notify),
    (FollowStatus::GuestLost, FollowState::Lost, FollowEffect::StopFollow),
    (FollowStatus::GuestFaraway, FollowState::OutOfRange, FollowEffect::LogOnly),
    (FollowStatus::GuestAppear, FollowState::Following, FollowEffect::Notify),
];

/// Look up the transition for a gateway status; unknown codes have none
pub fn follow_transition(status: FollowStatus) -> Option<(FollowState, FollowEffect)> {
    FOLLOW_TRANSITIONS
        .iter()
        .find(|(s, _, _)| *s == status)
        .map(|(_, state, effect)| (*state, *effect))
}

pub struct FollowStateMachine {
    gateway: Arc<dyn RobotGateway>,
    detection: Arc<PersonDetection>,
    params: FollowParams,
    state: watch::Sender<FollowState>,
    /// Set while a follow command is outstanding, cleared by `stop_follow`
    active: AtomicBool,
    metrics: Arc<Metrics>,
}

impl FollowStateMachine {
    pub fn new(
        gateway: Arc<dyn RobotGateway>,
        detection: Arc<PersonDetection>,
        params: FollowParams,
        metrics: Arc<Metrics>,
    ) -> Self {
        let (state, _) = watch::channel(FollowState::NotFollowing);
        Self { gateway, detection, params, state, active: AtomicBool::new(false), metrics }
    }

    pub fn state(&self) -> FollowState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<FollowState> {
        self.state.subscribe()
    }

    /// True between a successful `start_follow` and the next `stop_follow`
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Issue a follow command for `target`
    pub fn start_follow(&self, target: PersonId) -> anyhow::Result<()> {
        // Raised before the command so an early success callback is accepted
        self.active.store(true, Ordering::SeqCst);
        if let Err(e) = self.gateway.start_follow(target, self.params) {
            self.active.store(false, Ordering::SeqCst);
            return Err(e);
        }
        self.metrics.record_follow_command();
        info!(
            target_id = %target,
            lost_timeout_secs = %self.params.lost_timeout_secs,
            max_distance_m = %self.params.max_distance_m,
            "follow_started"
        );
        Ok(())
    }

    /// Unregister detection and stop following, whatever the current state
    pub fn stop_follow(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.detection.unregister();
        if let Err(e) = self.gateway.stop_follow() {
            warn!(error = %e, "follow_stop_command_failed");
        }
        self.state.send_if_modified(|state| {
            let changed = *state != FollowState::NotFollowing;
            *state = FollowState::NotFollowing;
            changed
        });
        self.metrics.record_follow_stop();
        info!("follow_stopped");
    }

    /// Apply a follow status callback
    pub fn handle_status(&self, status: FollowStatus) {
        self.metrics.record_follow_callback();
        let Some((next, effect)) = follow_transition(status) else {
            debug!(status = ?status, "follow_status_ignored");
            return;
        };

        // Late callbacks from a follow that was already stopped
        if effect != FollowEffect::StopFollow && !self.is_active() {
            debug!(status = ?status, "follow_status_stale");
            return;
        }

        let previous = self.state();
        match effect {
            FollowEffect::Notify => {
                self.state.send_replace(next);
                info!(status = ?status, from = %previous.as_str(), to = %next.as_str(), "follow_state_changed");
            }
            FollowEffect::LogOnly => {
                self.state.send_if_modified(|state| {
                    let changed = *state != next;
                    *state = next;
                    changed
                });
                info!(status = ?status, from = %previous.as_str(), to = %next.as_str(), "follow_target_far");
            }
            FollowEffect::StopFollow => {
                self.state.send_replace(next);
                info!(status = ?status, from = %previous.as_str(), "follow_target_lost");
                self.stop_follow();
            }
        }
    }

    /// Apply a follow error callback. Errors never change state; the
    /// tracking loop owns retries.
    pub fn handle_error(&self, error: FollowError, message: Option<&str>) {
        self.metrics.record_follow_callback();
        let message = message.unwrap_or("");
        match error {
            FollowError::SetTrackFailed => {
                warn!(message = %message, "follow_set_track_failed");
            }
            FollowError::TargetNotFound => {
                warn!(message = %message, "follow_target_not_found");
            }
            FollowError::AlreadyRunning => {
                debug!(message = %message, "follow_already_running");
            }
            FollowError::Other(code) => {
                warn!(code = %code, message = %message, "follow_error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        assert_eq!(
            follow_transition(FollowStatus::TrackSucceeded),
            Some((FollowState::Following, FollowEffect::Notify))
        );
        assert_eq!(
            follow_transition(FollowStatus::GuestLost),
            Some((FollowState::Lost, FollowEffect::StopFollow))
        );
        assert_eq!(
            follow_transition(FollowStatus::GuestFaraway),
            Some((FollowState::OutOfRange, FollowEffect::LogOnly))
        );
        assert_eq!(
            follow_transition(FollowStatus::GuestAppear),
            Some((FollowState::Following, FollowEffect::Notify))
        );
        assert_eq!(follow_transition(FollowStatus::Other(1033)), None);
    }

    #[test]
    fn test_far_target_stays_engaged() {
        let (state, _) = follow_transition(FollowStatus::GuestFaraway).unwrap();
        assert!(state.is_engaged());
    }
}
