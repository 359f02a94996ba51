//! Ingestion coordinator: persists inbound events and kicks off local
//! harvesting and forwarding in the background.

use crate::event::CoverageEvent;
use crate::forward::EventForwarder;
use crate::harvest::CoverageHarvester;
use crate::result::{TrackerError, TrackerResult};
use crate::store::ActionStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Coordinator behavior switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Run the harvester after every successful ingestion
    pub harvest_on_ingest: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            harvest_on_ingest: true,
        }
    }
}

/// Glue between inbound events, the store, the harvester and the forwarder.
///
/// The store is the durable sink and its errors reach the caller. The
/// harvest-and-forward step runs on its own task after the event is
/// stored; its outcome is only logged.
#[derive(Debug)]
pub struct IngestionCoordinator {
    store: Arc<ActionStore>,
    harvester: Arc<CoverageHarvester>,
    forwarder: Arc<EventForwarder>,
    config: CoordinatorConfig,
    background: Mutex<JoinSet<()>>,
    closing: AtomicBool,
}

impl IngestionCoordinator {
    /// Wire the coordinator to its collaborators
    #[must_use]
    pub fn new(
        store: Arc<ActionStore>,
        harvester: CoverageHarvester,
        forwarder: Arc<EventForwarder>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            harvester: Arc::new(harvester),
            forwarder,
            config,
            background: Mutex::new(JoinSet::new()),
            closing: AtomicBool::new(false),
        }
    }

    /// Shared store handle
    #[must_use]
    pub fn store(&self) -> &Arc<ActionStore> {
        &self.store
    }

    /// Shared forwarder handle
    #[must_use]
    pub fn forwarder(&self) -> &Arc<EventForwarder> {
        &self.forwarder
    }

    /// Decode, persist, and schedule background harvesting for one inbound event.
    ///
    /// Malformed input is rejected before anything is written.
    pub async fn ingest(&self, body: &[u8]) -> TrackerResult<CoverageEvent> {
        let event = CoverageEvent::from_json_slice(body)?;
        info!(
            event = %event.event,
            venture_reference = %event.venture_reference,
            "incoming"
        );

        let store = Arc::clone(&self.store);
        let stored = event.clone();
        tokio::task::spawn_blocking(move || store.append(&stored))
            .await
            .map_err(TrackerError::persistence)??;

        if self.config.harvest_on_ingest {
            self.spawn_harvest();
        }
        Ok(event)
    }

    /// Every stored event, in insertion order
    pub async fn all_events(&self) -> TrackerResult<Vec<CoverageEvent>> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.scan_all())
            .await
            .map_err(TrackerError::query)?
    }

    fn spawn_harvest(&self) {
        if self.closing.load(Ordering::SeqCst) {
            debug!("shutting down, harvest skipped");
            return;
        }
        let harvester = Arc::clone(&self.harvester);
        let forwarder = Arc::clone(&self.forwarder);
        let task = async move {
            let Some(event) = harvester.harvest().await else {
                debug!("harvest produced no result");
                return;
            };
            if let Err(err) = forwarder.submit(&event).await {
                warn!(error = %err, "could not queue harvested event");
            }
        };

        match self.background.lock() {
            Ok(mut tasks) => {
                // Reap finished runs so the set only holds live ones.
                while tasks.try_join_next().is_some() {}
                tasks.spawn(task);
            }
            Err(_) => {
                tokio::spawn(task);
            }
        }
    }

    /// Number of background harvest runs that have not been reaped yet
    #[must_use]
    pub fn pending_harvests(&self) -> usize {
        self.background.lock().map_or(0, |tasks| tasks.len())
    }

    /// Wait for in-flight harvest runs, then drain and stop the forwarder.
    ///
    /// Events ingested after this point are still stored but not harvested.
    pub async fn shutdown(&self) {
        self.closing.store(true, Ordering::SeqCst);
        let mut tasks = match self.background.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(_) => JoinSet::new(),
        };
        let pending = tasks.len();
        if pending > 0 {
            info!(pending, "waiting for background harvests");
        }
        while let Some(result) = tasks.join_next().await {
            if let Err(err) = result {
                warn!(error = %err, "background harvest failed");
            }
        }
        let attempts = self.forwarder.shutdown().await;
        info!(attempts, "ingestion coordinator stopped");
    }
}
