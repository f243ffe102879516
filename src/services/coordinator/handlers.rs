//! Gateway callback handlers for the Coordinator

use super::Coordinator;
use crate::domain::types::{FaceMood, GatewayEvent, NavigationStatus, Person};
use tracing::{debug, info};

/// Mood after a person-change notification: anyone in view cheers the robot
/// up, unless it is mad.
pub fn mood_after_detection(current: FaceMood, persons: &[Person]) -> Option<FaceMood> {
    if persons.is_empty() || current == FaceMood::Mad {
        return None;
    }
    Some(FaceMood::Happy)
}

impl Coordinator {
    /// Process a single gateway callback
    pub fn process_event(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::Connected => {
                info!("gateway_connected");
                self.places.request_places();
            }
            GatewayEvent::FollowStatus(status) => {
                self.follow.handle_status(status);
            }
            GatewayEvent::FollowError { error, message } => {
                self.follow.handle_error(error, message.as_deref());
            }
            GatewayEvent::NavigationStatus(status) => {
                self.handle_navigation_status(status);
            }
            GatewayEvent::NavigationResult { status, message } => {
                info!(status = %status, message = %message.unwrap_or_default(), "navigation_result");
            }
            GatewayEvent::PlaceList(raw) => {
                self.places.on_places_response(&raw);
            }
            GatewayEvent::PersonsChanged(persons) => {
                self.handle_persons_changed(&persons);
            }
        }
    }

    fn handle_navigation_status(&self, status: NavigationStatus) {
        match status {
            // Tracking statuses can echo on the navigation channel; follow
            // state is driven only by the follow command's own callbacks
            NavigationStatus::TrackSucceeded
            | NavigationStatus::GuestAppear
            | NavigationStatus::GuestLost
            | NavigationStatus::GuestFaraway => {
                debug!(status = ?status, "navigation_tracking_status");
            }
            _ => {
                self.dispatcher.dispatch_status(status);
            }
        }
    }

    fn handle_persons_changed(&self, persons: &[Person]) {
        debug!(persons = %persons.len(), "persons_changed");
        if let Some(mood) = mood_after_detection(self.mood(), persons) {
            self.set_mood(mood);
        }
    }
}
