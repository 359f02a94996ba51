//! HTTP surface of the tracker
//!
//! ```text
//! POST /action      ingest one coverage event
//! GET  /api/stats   all events as JSON
//! GET  /stats       all events as an HTML table
//! GET  /style.css   configured stylesheet
//! *                 logged, 404
//! ```

use crate::config::TrackerConfig;
use crate::error::{CliError, CliResult};
use crate::render::{render_stats_html, STYLE_SHEET_ROUTE};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use coverage_tracker::{
    ActionStore, CoverageHarvester, EventForwarder, HttpSink, IngestionCoordinator,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Largest accepted request body (1 MiB)
pub const MAX_BODY_BYTES: usize = 1_048_576;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Ingestion pipeline
    pub coordinator: Arc<IngestionCoordinator>,
    /// Stylesheet file served at `/style.css`
    pub style_sheet: PathBuf,
}

impl AppState {
    /// Open the store and start the forwarder described by `config`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn from_config(config: &TrackerConfig) -> CliResult<Self> {
        let store = Arc::new(ActionStore::open(&config.db_name)?);
        let forwarder = Arc::new(EventForwarder::start(
            HttpSink::new(&config.dest_endpoint),
            config.queue_capacity,
        ));
        let coordinator = IngestionCoordinator::new(
            store,
            CoverageHarvester::new(config.harvest_config()?),
            forwarder,
            config.coordinator_config(),
        );
        Ok(Self {
            coordinator: Arc::new(coordinator),
            style_sheet: config.style_sheet.clone(),
        })
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/action", post(action))
        .route("/api/stats", get(stats_api))
        .route("/stats", get(stats_web))
        .route_service(STYLE_SHEET_ROUTE, ServeFile::new(&state.style_sheet))
        .fallback(default_path)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn action(State(state): State<AppState>, body: Bytes) -> StatusCode {
    match state.coordinator.ingest(&body).await {
        Ok(_) => StatusCode::OK,
        Err(err) if err.is_client_error() => {
            info!(error = %err, body = %String::from_utf8_lossy(&body), "error unmarshalling");
            StatusCode::BAD_REQUEST
        }
        Err(err) => {
            error!(error = %err, "error saving");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn stats_api(State(state): State<AppState>) -> Response {
    match state.coordinator.all_events().await {
        Ok(events) => Json(events).into_response(),
        Err(err) => {
            error!(error = %err, "error reading events");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn stats_web(State(state): State<AppState>) -> Response {
    match state.coordinator.all_events().await {
        Ok(events) => Html(render_stats_html(&events)).into_response(),
        Err(err) => {
            error!(error = %err, "error reading events");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn default_path(uri: Uri, body: Bytes) -> StatusCode {
    info!(endpoint = %uri.path(), body = %String::from_utf8_lossy(&body), "default path");
    StatusCode::NOT_FOUND
}

/// Serve on `listener` until `signal` resolves, then drain the pipeline.
pub async fn serve<F>(listener: TcpListener, state: AppState, signal: F) -> CliResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let coordinator = Arc::clone(&state.coordinator);
    let addr = listener.local_addr()?;
    info!(%addr, "tracker listening");

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(signal)
        .await;

    info!("http server stopped, draining event queue");
    coordinator.shutdown().await;
    served.map_err(|e| CliError::server(e.to_string()))
}

/// Bind the configured address and serve until Ctrl-C or SIGTERM
pub async fn run(config: &TrackerConfig) -> CliResult<()> {
    let state = AppState::from_config(config)?;
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| CliError::server(format!("cannot bind {addr}: {e}")))?;
    serve(listener, state, shutdown_signal()).await
}

/// Resolves on the first Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("received an interrupt signal, gracefully shutting down");
}
