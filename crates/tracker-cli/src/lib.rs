//! Tracker CLI Library
//!
//! Configuration, logging, and the HTTP surface around the
//! `coverage-tracker` ingestion pipeline.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
pub mod logging;
pub mod render;
pub mod server;

pub use commands::{Cli, Commands, HarvestArgs, LogFormatArg, ServeArgs, StatsArgs};
pub use config::{LogFormat, TrackerConfig, DEFAULT_CONFIG_FILE};
pub use error::{CliError, CliResult};
pub use render::render_stats_html;
pub use server::{router, serve, AppState, MAX_BODY_BYTES};
