//! Person-change listener registration
//!
//! The gateway rejects a second registration, so the registration state
//! lives behind one mutex shared by the tracking loop and the follow
//! teardown path.

use crate::services::gateway::RobotGateway;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct PersonDetection {
    gateway: Arc<dyn RobotGateway>,
    registered: Mutex<bool>,
}

impl PersonDetection {
    pub fn new(gateway: Arc<dyn RobotGateway>) -> Self {
        Self { gateway, registered: Mutex::new(false) }
    }

    /// Drop any active registration and register again
    pub fn reregister(&self) -> anyhow::Result<()> {
        let mut registered = self.registered.lock();
        if *registered {
            if let Err(e) = self.gateway.unregister_person_listener() {
                warn!(error = %e, "person_listener_unregister_failed");
            }
            *registered = false;
        }
        self.gateway.register_person_listener()?;
        *registered = true;
        debug!("person_listener_reregistered");
        Ok(())
    }

    /// Unregister if registered. Safe to call any number of times.
    pub fn unregister(&self) {
        let mut registered = self.registered.lock();
        if !*registered {
            return;
        }
        // The registration is considered gone even if the gateway call fails
        *registered = false;
        match self.gateway.unregister_person_listener() {
            Ok(()) => debug!("person_listener_unregistered"),
            Err(e) => warn!(error = %e, "person_listener_unregister_failed"),
        }
    }
}
