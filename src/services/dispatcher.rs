//! Navigation event fan-out
//!
//! Listeners are held in a copy-on-write list: `dispatch` snapshots the
//! current list, so registrations made while a dispatch is running only
//! affect later dispatches.

use crate::domain::types::{NavigationEvent, NavigationStatus};
use crate::infra::metrics::Metrics;
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Observer of navigation events
pub trait NavigationListener: Send + Sync {
    fn on_navigation_event(&self, event: NavigationEvent) -> anyhow::Result<()>;
}

/// Navigation status to event mapping. Statuses not listed produce no event.
const NAVIGATION_EVENTS: [(NavigationStatus, NavigationEvent); 3] = [
    (NavigationStatus::AvoidStarted, NavigationEvent::RouteBlocked),
    (NavigationStatus::AvoidEnded, NavigationEvent::ObstacleCleared),
    (NavigationStatus::NavigationStarted, NavigationEvent::NavigationStarted),
];

/// Map a gateway navigation status to the event listeners see
pub fn navigation_event_for(status: NavigationStatus) -> Option<NavigationEvent> {
    NAVIGATION_EVENTS.iter().find(|(s, _)| *s == status).map(|(_, event)| *event)
}

fn same_listener(a: &Arc<dyn NavigationListener>, b: &Arc<dyn NavigationListener>) -> bool {
    // Compare data pointers only; vtable pointers may differ across codegen units
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

pub struct EventDispatcher {
    listeners: RwLock<Arc<Vec<Arc<dyn NavigationListener>>>>,
    metrics: Arc<Metrics>,
}

impl EventDispatcher {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { listeners: RwLock::new(Arc::new(Vec::new())), metrics }
    }

    /// Register a listener. Returns false if this listener is already registered.
    pub fn add_listener(&self, listener: Arc<dyn NavigationListener>) -> bool {
        let mut guard = self.listeners.write();
        if guard.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(listener);
        *guard = Arc::new(next);
        true
    }

    /// Unregister a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, listener: &Arc<dyn NavigationListener>) -> bool {
        let mut guard = self.listeners.write();
        if !guard.iter().any(|l| same_listener(l, listener)) {
            return false;
        }
        let next: Vec<_> = guard.iter().filter(|l| !same_listener(l, listener)).cloned().collect();
        *guard = Arc::new(next);
        true
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Deliver `event` to every registered listener in registration order.
    ///
    /// A listener that errors or panics is logged and skipped. Returns the
    /// number of listeners that handled the event successfully.
    pub fn dispatch(&self, event: NavigationEvent) -> usize {
        let snapshot = Arc::clone(&*self.listeners.read());
        let mut delivered = 0;

        for (index, listener) in snapshot.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| listener.on_navigation_event(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    self.metrics.record_listener_failure();
                    warn!(event = ?event, listener = %index, error = %e, "navigation_listener_failed");
                }
                Err(_) => {
                    self.metrics.record_listener_failure();
                    warn!(event = ?event, listener = %index, "navigation_listener_panicked");
                }
            }
        }

        self.metrics.record_navigation_event();
        debug!(event = ?event, listeners = %snapshot.len(), delivered = %delivered, "navigation_event_dispatched");
        delivered
    }

    /// Map a gateway status and dispatch the resulting event, if any
    pub fn dispatch_status(&self, status: NavigationStatus) -> Option<usize> {
        match navigation_event_for(status) {
            Some(event) => Some(self.dispatch(event)),
            None => {
                debug!(status = ?status, "navigation_status_ignored");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<NavigationEvent>>,
    }

    impl NavigationListener for Recorder {
        fn on_navigation_event(&self, event: NavigationEvent) -> anyhow::Result<()> {
            self.events.lock().push(event);
            Ok(())
        }
    }

    struct Failing;

    impl NavigationListener for Failing {
        fn on_navigation_event(&self, _event: NavigationEvent) -> anyhow::Result<()> {
            anyhow::bail!("listener broke")
        }
    }

    struct Panicking;

    impl NavigationListener for Panicking {
        fn on_navigation_event(&self, _event: NavigationEvent) -> anyhow::Result<()> {
            panic!("listener panicked")
        }
    }

    /// Registers another listener the first time it is called
    struct Registering {
        dispatcher: Arc<EventDispatcher>,
        late: Arc<Recorder>,
        done: Mutex<bool>,
    }

    impl NavigationListener for Registering {
        fn on_navigation_event(&self, _event: NavigationEvent) -> anyhow::Result<()> {
            let mut done = self.done.lock();
            if !*done {
                *done = true;
                self.dispatcher.add_listener(self.late.clone());
            }
            Ok(())
        }
    }

    fn dispatcher() -> EventDispatcher {
        EventDispatcher::new(Arc::new(Metrics::new()))
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            navigation_event_for(NavigationStatus::AvoidStarted),
            Some(NavigationEvent::RouteBlocked)
        );
        assert_eq!(
            navigation_event_for(NavigationStatus::AvoidEnded),
            Some(NavigationEvent::ObstacleCleared)
        );
        assert_eq!(
            navigation_event_for(NavigationStatus::NavigationStarted),
            Some(NavigationEvent::NavigationStarted)
        );
        assert_eq!(navigation_event_for(NavigationStatus::GuestLost), None);
        assert_eq!(navigation_event_for(NavigationStatus::Other(42)), None);
    }

    #[test]
    fn test_no_duplicate_registration() {
        let dispatcher = dispatcher();
        let recorder = Arc::new(Recorder::default());
        assert!(dispatcher.add_listener(recorder.clone()));
        assert!(!dispatcher.add_listener(recorder.clone()));
        assert_eq!(dispatcher.listener_count(), 1);

        dispatcher.dispatch(NavigationEvent::RouteBlocked);
        assert_eq!(recorder.events.lock().len(), 1);
    }

    #[test]
    fn test_remove_listener() {
        let dispatcher = dispatcher();
        let recorder = Arc::new(Recorder::default());
        let as_dyn: Arc<dyn NavigationListener> = recorder.clone();
        dispatcher.add_listener(as_dyn.clone());
        assert!(dispatcher.remove_listener(&as_dyn));
        assert!(!dispatcher.remove_listener(&as_dyn));

        assert_eq!(dispatcher.dispatch(NavigationEvent::NavigationStarted), 0);
        assert!(recorder.events.lock().is_empty());
    }

    #[test]
    fn test_failing_listeners_are_isolated() {
        let metrics = Arc::new(Metrics::new());
        let dispatcher = EventDispatcher::new(metrics.clone());
        let first = Arc::new(Recorder::default());
        let last = Arc::new(Recorder::default());
        dispatcher.add_listener(first.clone());
        dispatcher.add_listener(Arc::new(Failing));
        dispatcher.add_listener(Arc::new(Panicking));
        dispatcher.add_listener(last.clone());

        let delivered = dispatcher.dispatch(NavigationEvent::ObstacleCleared);

        assert_eq!(delivered, 2);
        assert_eq!(*first.events.lock(), vec![NavigationEvent::ObstacleCleared]);
        assert_eq!(*last.events.lock(), vec![NavigationEvent::ObstacleCleared]);
        assert_eq!(metrics.listener_failures(), 2);
    }

    #[test]
    fn test_registration_during_dispatch_applies_next_time() {
        let dispatcher = Arc::new(dispatcher());
        let late = Arc::new(Recorder::default());
        dispatcher.add_listener(Arc::new(Registering {
            dispatcher: dispatcher.clone(),
            late: late.clone(),
            done: Mutex::new(false),
        }));

        assert_eq!(dispatcher.dispatch(NavigationEvent::RouteBlocked), 1);
        assert!(late.events.lock().is_empty());

        assert_eq!(dispatcher.dispatch(NavigationEvent::ObstacleCleared), 2);
        assert_eq!(*late.events.lock(), vec![NavigationEvent::ObstacleCleared]);
    }

    #[test]
    fn test_dispatch_status_ignores_tracking_codes() {
        let dispatcher = dispatcher();
        let recorder = Arc::new(Recorder::default());
        dispatcher.add_listener(recorder.clone());

        assert_eq!(dispatcher.dispatch_status(NavigationStatus::GuestAppear), None);
        assert_eq!(dispatcher.dispatch_status(NavigationStatus::AvoidStarted), Some(1));
        assert_eq!(*recorder.events.lock(), vec![NavigationEvent::RouteBlocked]);
    }
}
