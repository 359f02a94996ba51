//! Coverage Tracker: ingestion and persistence of test-coverage events
//!
//! Events arrive from CI webhooks or are harvested from local test runs.
//! Every inbound event is appended to a SQLite store; each ingestion also
//! runs the local test suite in the background and forwards the harvested
//! result to a remote collector.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   Coverage Tracker Pipeline                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   inbound JSON                                                  │
//! │        │                                                        │
//! │        ▼                                                        │
//! │   ┌─────────────┐  append   ┌─────────────┐                     │
//! │   │ Ingestion   │──────────►│ ActionStore │  (SQLite, append-   │
//! │   │ Coordinator │           └─────────────┘   only)             │
//! │   └──────┬──────┘                                               │
//! │          │ spawn                                                │
//! │          ▼                                                      │
//! │   ┌─────────────┐  submit   ┌─────────────┐  POST               │
//! │   │ Coverage    │──────────►│ Event       │─────────► collector │
//! │   │ Harvester   │           │ Forwarder   │                     │
//! │   └─────────────┘           └─────────────┘                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod coordinator;
pub mod event;
pub mod forward;
pub mod harvest;
mod result;
pub mod store;

pub use coordinator::{CoordinatorConfig, IngestionCoordinator};
pub use event::{CoverageEvent, Payload, TRACK_TEST_COVERAGE_EVENT};
pub use forward::{EventForwarder, EventSink, HttpSink, QUEUE_CAPACITY};
pub use harvest::{
    parse_coverage_line, parse_output, CoverageHarvester, CoverageLine, HarvestConfig,
    HARVESTER_SERVICE_NAME,
};
pub use result::{TrackerError, TrackerResult};
pub use store::ActionStore;
