//! Tracker configuration
//!
//! Values are layered: built-in defaults, then an optional YAML file
//! (`tracker.yaml` in the working directory unless `--config` names one),
//! then command-line flags and their `TRACKER_*` environment variables.

use crate::error::{CliError, CliResult};
use coverage_tracker::{CoordinatorConfig, HarvestConfig, QUEUE_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "tracker.yaml";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable output
    Pretty,
}

/// Startup parameters for the tracker service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Host IP to listen on; empty listens on all interfaces
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Test statistics database
    pub db_name: PathBuf,
    /// Endpoint harvested events are forwarded to
    pub dest_endpoint: String,
    /// Stylesheet served at `/style.css`
    pub style_sheet: PathBuf,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Run the local test suite after each ingestion
    pub harvest_on_ingest: bool,
    /// Forwarder queue capacity
    pub queue_capacity: usize,
    /// Test command run by the harvester
    pub test_command: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 8080,
            db_name: PathBuf::from("./stats.db"),
            dest_endpoint: "localhost:8080/action".to_string(),
            style_sheet: PathBuf::from("./style.css"),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            harvest_on_ingest: true,
            queue_capacity: QUEUE_CAPACITY,
            test_command: HarvestConfig::default().command_line(),
        }
    }
}

impl TrackerConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `tracker.yaml` is read
    /// when present and defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse a YAML config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&text)
            .map_err(|e| CliError::config(format!("{}: {e}", path.display())))
    }

    /// Parse YAML text; missing keys keep their defaults
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml_ng::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(text)
    }

    /// Set the port
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the host
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the database location
    #[must_use]
    pub fn with_db_name(mut self, db_name: impl Into<PathBuf>) -> Self {
        self.db_name = db_name.into();
        self
    }

    /// Set the forwarding endpoint
    #[must_use]
    pub fn with_dest_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.dest_endpoint = endpoint.into();
        self
    }

    /// Enable or disable harvesting after ingestion
    #[must_use]
    pub const fn with_harvest_on_ingest(mut self, enabled: bool) -> Self {
        self.harvest_on_ingest = enabled;
        self
    }

    /// Address to bind, `host:port`
    #[must_use]
    pub fn listen_addr(&self) -> String {
        let host = if self.host.trim().is_empty() {
            "0.0.0.0"
        } else {
            self.host.trim()
        };
        format!("{host}:{}", self.port)
    }

    /// Harvester command derived from `test_command`
    pub fn harvest_config(&self) -> CliResult<HarvestConfig> {
        HarvestConfig::from_command_line(&self.test_command)
            .ok_or_else(|| CliError::config("test_command is empty"))
    }

    /// Coordinator switches derived from this config
    #[must_use]
    pub const fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            harvest_on_ingest: self.harvest_on_ingest,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_original_flags() {
        let config = TrackerConfig::new();
        assert_eq!(config.port, 8080);
        assert_eq!(config.db_name, PathBuf::from("./stats.db"));
        assert_eq!(config.dest_endpoint, "localhost:8080/action");
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.test_command, "go test -cover ./...");
    }

    #[test]
    fn test_listen_addr_empty_host_binds_all() {
        assert_eq!(TrackerConfig::new().listen_addr(), "0.0.0.0:8080");
        let config = TrackerConfig::new().with_host("127.0.0.1").with_port(9000);
        assert_eq!(config.listen_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = TrackerConfig::from_yaml("port: 9090\nlog_format: pretty\n").unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.db_name, PathBuf::from("./stats.db"));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(TrackerConfig::from_yaml("  \n").unwrap(), TrackerConfig::default());
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(TrackerConfig::from_yaml("port: [not a port]").is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "db_name: /tmp/other.db\nharvest_on_ingest: false\n").unwrap();
        let config = TrackerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.db_name, PathBuf::from("/tmp/other.db"));
        assert!(!config.harvest_on_ingest);
        assert!(!config.coordinator_config().harvest_on_ingest);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = TrackerConfig::load(Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
    }

    #[test]
    fn test_harvest_config_from_test_command() {
        let mut config = TrackerConfig::new();
        config.test_command = "cargo test".to_string();
        let harvest = config.harvest_config().unwrap();
        assert_eq!(harvest.program, "cargo");
        config.test_command = String::new();
        assert!(config.harvest_config().is_err());
    }
}
