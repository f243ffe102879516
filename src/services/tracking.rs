//! Person tracking loop
//!
//! One cancellable background task polls the gateway for persons at a fixed
//! interval, picks a follow target and retries forever when nobody with a
//! face is visible. Each iteration completes before the next one starts.
//!
//! Every gateway side effect of the loop (registration, follow command) is
//! issued while holding the session lock after checking that the loop still
//! owns the current session, so a concurrent `stop_tracking` can never be
//! followed by a stray command from a stale iteration.

use crate::domain::types::Person;
use crate::infra::metrics::Metrics;
use crate::services::detection::PersonDetection;
use crate::services::follow::FollowStateMachine;
use crate::services::gateway::RobotGateway;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Pick the follow target: the last person with a face, in gateway order
pub fn select_target(persons: &[Person]) -> Option<Person> {
    persons.iter().rev().find(|p| p.is_followable()).copied()
}

struct TrackingSession {
    generation: u64,
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TrackingSession {
    fn cancel(self) {
        let _ = self.cancel.send(true);
        self.handle.abort();
    }
}

type SessionSlot = Arc<Mutex<Option<TrackingSession>>>;

pub struct PersonTracker {
    gateway: Arc<dyn RobotGateway>,
    detection: Arc<PersonDetection>,
    follow: Arc<FollowStateMachine>,
    interval: Duration,
    metrics: Arc<Metrics>,
    session: SessionSlot,
    generations: AtomicU64,
}

impl PersonTracker {
    pub fn new(
        gateway: Arc<dyn RobotGateway>,
        detection: Arc<PersonDetection>,
        follow: Arc<FollowStateMachine>,
        interval: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            gateway,
            detection,
            follow,
            interval,
            metrics,
            session: Arc::new(Mutex::new(None)),
            generations: AtomicU64::new(0),
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Start the tracking loop, replacing any loop already running.
    ///
    /// `first_call` registers the person-change listener on the first
    /// iteration. Must be called from within a Tokio runtime.
    pub fn track_persons(&self, first_call: bool) {
        let mut slot = self.session.lock();
        if let Some(previous) = slot.take() {
            debug!(generation = %previous.generation, "tracking_loop_replaced");
            previous.cancel();
        }

        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let worker = TrackingWorker {
            generation,
            gateway: self.gateway.clone(),
            detection: self.detection.clone(),
            follow: self.follow.clone(),
            interval: self.interval,
            metrics: self.metrics.clone(),
            session: self.session.clone(),
        };
        let handle = tokio::spawn(worker.run(first_call, cancel_rx));
        *slot = Some(TrackingSession { generation, cancel: cancel_tx, handle });

        info!(generation = %generation, first_call = %first_call, "tracking_started");
    }

    /// Cancel the loop, then unregister detection and stop following.
    ///
    /// Once this returns the loop issues no further gateway commands.
    pub fn stop_tracking(&self) {
        let session = self.session.lock().take();
        if let Some(session) = session {
            info!(generation = %session.generation, "tracking_stopped");
            session.cancel();
        }
        self.follow.stop_follow();
    }
}

struct TrackingWorker {
    generation: u64,
    gateway: Arc<dyn RobotGateway>,
    detection: Arc<PersonDetection>,
    follow: Arc<FollowStateMachine>,
    interval: Duration,
    metrics: Arc<Metrics>,
    session: SessionSlot,
}

impl TrackingWorker {
    fn owns(&self, slot: &Option<TrackingSession>) -> bool {
        slot.as_ref().is_some_and(|s| s.generation == self.generation)
    }

    async fn run(self, mut first_call: bool, mut cancel: watch::Receiver<bool>) {
        debug!(generation = %self.generation, "tracking_loop_running");

        loop {
            if first_call {
                let slot = self.session.lock();
                if !self.owns(&slot) {
                    break;
                }
                if let Err(e) = self.detection.reregister() {
                    warn!(error = %e, "person_listener_register_failed");
                }
            }

            let persons = self.gateway.get_all_persons().await;
            self.metrics.record_tracking_iteration();

            {
                let slot = self.session.lock();
                if !self.owns(&slot) {
                    break;
                }
                first_call = self.decide(persons);
            }

            tokio::select! {
                _ = cancel.changed() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        debug!(generation = %self.generation, "tracking_loop_exited");
    }

    /// Act on one person snapshot; returns the `first_call` flag for the next iteration
    fn decide(&self, persons: anyhow::Result<Vec<Person>>) -> bool {
        let persons = match persons {
            Ok(persons) => persons,
            Err(e) => {
                self.metrics.record_tracking_retry();
                warn!(error = %e, "person_query_failed");
                return true;
            }
        };

        let Some(target) = select_target(&persons) else {
            self.metrics.record_tracking_retry();
            debug!(persons = %persons.len(), "no_followable_person");
            return true;
        };

        let state = self.follow.state();
        if state.is_engaged() {
            debug!(target_id = %target.id, state = %state.as_str(), "follow_already_engaged");
        } else if let Err(e) = self.follow.start_follow(target.id) {
            warn!(target_id = %target.id, error = %e, "follow_start_failed");
        }
        false
    }
}
