//! CLI command definitions using clap

use crate::config::{LogFormat, TrackerConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Tracker: records test-coverage events from CI webhooks and local test runs
#[derive(Parser, Debug)]
#[command(name = "tracker")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// YAML config file (default: ./tracker.yaml when present)
    #[arg(short, long, global = true, env = "TRACKER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, env = "TRACKER_LOG_FORMAT")]
    pub log_format: Option<LogFormatArg>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log filter implied by `-v`/`-q`, if any
    #[must_use]
    pub fn log_level_override(&self) -> Option<&'static str> {
        if self.quiet {
            return Some("warn");
        }
        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }

    /// Apply global flags on top of a loaded config
    #[must_use]
    pub fn apply_to(&self, mut config: TrackerConfig) -> TrackerConfig {
        if let Some(level) = self.log_level_override() {
            config.log_level = level.to_string();
        }
        if let Some(format) = self.log_format {
            config.log_format = format.into();
        }
        config
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the tracker HTTP server
    Serve(ServeArgs),

    /// Run the test suite once and print the harvested event
    Harvest(HarvestArgs),

    /// Print every stored event as JSON
    Stats(StatsArgs),
}

/// Arguments for the serve command
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, env = "TRACKER_PORT")]
    pub port: Option<u16>,

    /// Host IP to listen on; empty listens on all IPs
    #[arg(long, env = "TRACKER_HOST")]
    pub host: Option<String>,

    /// Test statistics database
    #[arg(long = "db-name", env = "TRACKER_DB_NAME")]
    pub db_name: Option<PathBuf>,

    /// Endpoint for local test action events
    #[arg(long = "dest-endpoint", env = "TRACKER_DEST_ENDPOINT")]
    pub dest_endpoint: Option<String>,

    /// Web cascading style sheet
    #[arg(long = "style-sheet", env = "TRACKER_STYLE_SHEET")]
    pub style_sheet: Option<PathBuf>,

    /// Forwarder queue capacity
    #[arg(long = "queue-capacity", env = "TRACKER_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// Test command run after each ingestion
    #[arg(long = "test-command", env = "TRACKER_TEST_COMMAND")]
    pub test_command: Option<String>,

    /// Do not run the local test suite after ingesting an event
    #[arg(long = "no-harvest")]
    pub no_harvest: bool,
}

impl ServeArgs {
    /// Override config values with the flags that were given
    #[must_use]
    pub fn apply_to(&self, mut config: TrackerConfig) -> TrackerConfig {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(db_name) = &self.db_name {
            config.db_name.clone_from(db_name);
        }
        if let Some(endpoint) = &self.dest_endpoint {
            config.dest_endpoint.clone_from(endpoint);
        }
        if let Some(style_sheet) = &self.style_sheet {
            config.style_sheet.clone_from(style_sheet);
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if let Some(command) = &self.test_command {
            config.test_command.clone_from(command);
        }
        if self.no_harvest {
            config.harvest_on_ingest = false;
        }
        config
    }
}

/// Arguments for the harvest command
#[derive(Args, Debug, Default)]
pub struct HarvestArgs {
    /// Test command to run
    #[arg(long = "test-command", env = "TRACKER_TEST_COMMAND")]
    pub test_command: Option<String>,

    /// Directory to run the test command in
    #[arg(short = 'd', long = "dir")]
    pub directory: Option<PathBuf>,

    /// Also forward the event to the configured endpoint
    #[arg(long)]
    pub forward: bool,
}

/// Arguments for the stats command
#[derive(Args, Debug, Default)]
pub struct StatsArgs {
    /// Test statistics database
    #[arg(long = "db-name", env = "TRACKER_DB_NAME")]
    pub db_name: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormatArg {
    /// JSON lines
    Json,
    /// Human-readable
    Pretty,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Json => Self::Json,
            LogFormatArg::Pretty => Self::Pretty,
        }
    }
}
