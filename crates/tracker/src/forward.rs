//! Event forwarding to a remote collector.
//!
//! ```text
//!  producers ──submit──► [ bounded queue (16) ] ──► worker ──deliver──► EventSink
//!                             FIFO, awaits              one in-flight send
//!                             when full                 failures logged, skipped
//! ```
//!
//! Exactly one worker drains the queue, so delivery attempts happen in
//! enqueue order and never overlap. Shutdown closes the queue, lets the
//! worker flush whatever was already accepted, and then joins it.

use crate::event::CoverageEvent;
use crate::result::{TrackerError, TrackerResult};
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default queue capacity
pub const QUEUE_CAPACITY: usize = 16;

/// Destination for serialized events
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    /// Deliver one JSON payload. Errors are logged by the worker and not retried.
    async fn deliver(&self, payload: String) -> TrackerResult<()>;
}

/// Posts events as JSON to an HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpSink {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSink {
    /// Create a sink for `endpoint`. A bare `host:port/path` gets an `http://` scheme.
    #[must_use]
    pub fn new(endpoint: impl AsRef<str>) -> Self {
        Self {
            endpoint: normalize_endpoint(endpoint.as_ref()),
            client: reqwest::Client::new(),
        }
    }

    /// Normalized endpoint URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EventSink for HttpSink {
    async fn deliver(&self, payload: String) -> TrackerResult<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|err| TrackerError::delivery(&self.endpoint, err))?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint = %self.endpoint, status = status.as_u16(), "collector rejected event");
        }
        Ok(())
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}

/// Bounded single-consumer queue in front of an [`EventSink`].
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
#[derive(Debug)]
pub struct EventForwarder {
    sender: Mutex<Option<mpsc::Sender<String>>>,
    worker: Mutex<Option<JoinHandle<usize>>>,
}

impl EventForwarder {
    /// Spawn the worker and return the submission handle.
    ///
    /// Must be called inside a tokio runtime. A capacity of zero is raised to one.
    pub fn start<S: EventSink>(sink: S, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(sink, rx));
        info!(capacity = capacity.max(1), "event forwarder started");
        Self {
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Serialize `event` and enqueue it, waiting while the queue is full.
    ///
    /// Fails with [`TrackerError::ForwarderClosed`] once shutdown has begun.
    pub async fn submit(&self, event: &CoverageEvent) -> TrackerResult<()> {
        let payload = event.to_json()?;
        self.submit_raw(payload).await
    }

    /// Enqueue an already serialized payload
    pub async fn submit_raw(&self, payload: String) -> TrackerResult<()> {
        let sender = self
            .sender
            .lock()
            .map_err(|_| TrackerError::ForwarderClosed)?
            .clone()
            .ok_or(TrackerError::ForwarderClosed)?;
        sender
            .send(payload)
            .await
            .map_err(|_| TrackerError::ForwarderClosed)
    }

    /// True once [`EventForwarder::shutdown`] has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.lock().map_or(true, |sender| sender.is_none())
    }

    /// Stop accepting submissions, drain the queue, and join the worker.
    ///
    /// Returns the number of delivery attempts the worker made. Calling it
    /// again after the worker has been joined returns zero.
    pub async fn shutdown(&self) -> usize {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        let worker = self.worker.lock().ok().and_then(|mut worker| worker.take());
        match worker {
            Some(handle) => match handle.await {
                Ok(attempts) => attempts,
                Err(err) => {
                    warn!(error = %err, "event forwarder worker failed");
                    0
                }
            },
            None => 0,
        }
    }
}

async fn run_worker<S: EventSink>(sink: S, mut rx: mpsc::Receiver<String>) -> usize {
    let mut attempts = 0;
    while let Some(payload) = rx.recv().await {
        attempts += 1;
        debug!(event = %payload, "sending event");
        match sink.deliver(payload).await {
            Ok(()) => debug!("event sent"),
            Err(err) => warn!(error = %err, "error posting event"),
        }
    }
    info!(attempts, "event forwarder done");
    attempts
}
