//! Places catalog
//!
//! Accumulates places from the gateway's place-list responses. The catalog
//! is published as an immutable snapshot: every response builds a new
//! snapshot and swaps it into a watch channel, so readers never see a
//! partially applied response.
//!
//! Repeated responses append again; entries are not deduplicated by name.

use crate::domain::types::Place;
use crate::infra::metrics::Metrics;
use crate::services::gateway::RobotGateway;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Catalog contents at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlacesSnapshot {
    pub places: Vec<Place>,
    /// Place names, in catalog order
    pub destinations: Vec<String>,
}

/// Result of parsing one place-list response
#[derive(Debug, Default)]
pub struct ParsedPlaces {
    pub places: Vec<Place>,
    pub skipped: usize,
}

/// Parse a raw place-list response, skipping malformed entries individually
pub fn parse_places(raw: &str) -> anyhow::Result<ParsedPlaces> {
    let entries: Vec<Value> = serde_json::from_str(raw)?;
    let mut parsed = ParsedPlaces::default();

    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<Place>(entry) {
            Ok(place) => parsed.places.push(place),
            Err(e) => {
                parsed.skipped += 1;
                warn!(index = %index, error = %e, "place_entry_skipped");
            }
        }
    }

    Ok(parsed)
}

pub struct PlacesCatalog {
    gateway: Arc<dyn RobotGateway>,
    snapshot: watch::Sender<Arc<PlacesSnapshot>>,
    metrics: Arc<Metrics>,
}

impl PlacesCatalog {
    pub fn new(gateway: Arc<dyn RobotGateway>, metrics: Arc<Metrics>) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(PlacesSnapshot::default()));
        Self { gateway, snapshot, metrics }
    }

    /// Ask the gateway for its place list; the response arrives asynchronously
    pub fn request_places(&self) {
        match self.gateway.request_place_list() {
            Ok(()) => debug!("place_list_requested"),
            Err(e) => warn!(error = %e, "place_list_request_failed"),
        }
    }

    /// Append the well-formed entries of a place-list response.
    /// Returns the number of places appended.
    pub fn on_places_response(&self, raw: &str) -> usize {
        let parsed = match parse_places(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(error = %e, "place_list_unparseable");
                return 0;
            }
        };

        let added = parsed.places.len();
        self.metrics.record_places(added as u64, parsed.skipped as u64);
        if added == 0 {
            debug!(skipped = %parsed.skipped, "place_list_empty");
            return 0;
        }

        self.snapshot.send_modify(|current| {
            let mut next = (**current).clone();
            for place in parsed.places {
                next.destinations.push(place.name.clone());
                next.places.push(place);
            }
            *current = Arc::new(next);
        });

        info!(
            added = %added,
            skipped = %parsed.skipped,
            total = %self.snapshot.borrow().places.len(),
            "places_updated"
        );
        added
    }

    pub fn snapshot(&self) -> Arc<PlacesSnapshot> {
        self.snapshot.borrow().clone()
    }

    pub fn destinations(&self) -> Vec<String> {
        self.snapshot.borrow().destinations.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PlacesSnapshot>> {
        self.snapshot.subscribe()
    }
}
