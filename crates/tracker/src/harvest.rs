//! Local coverage harvesting.
//!
//! Runs the project's test suite with coverage enabled and turns the first
//! `ok` line that reports a percentage into a [`CoverageEvent`]. Harvesting
//! is best-effort: a command that cannot start, exits unsuccessfully, or
//! prints nothing usable yields `None` rather than an error.
//!
//! ```text
//! ok  \tringier/pkg/statsdb\t(cached)\tcoverage: 63.3% of statements
//! ^^       ^^^^^^^^^^^^^^^^^^                   ^^^^
//! status   package                              percentage
//! ```

use crate::event::{CoverageEvent, Payload, TRACK_TEST_COVERAGE_EVENT};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Service name stamped on harvested events
pub const HARVESTER_SERVICE_NAME: &str = "tracker";
/// Locale stamped on harvested events
pub const HARVESTER_CULTURE: &str = "en_EN";
/// Action type stamped on harvested events
pub const HARVESTER_ACTION_TYPE: &str = "api";
/// Version stamped on harvested events
pub const HARVESTER_VERSION: &str = "1.0.0";

const COVERAGE_MARKER: &str = "coverage";

/// One parsed coverage line
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageLine {
    /// Package or action identifier from the second field
    pub action: String,
    /// Parsed percentage
    pub coverage: f64,
}

impl CoverageLine {
    /// Build the event reported for this line
    #[must_use]
    pub fn into_event(self) -> CoverageEvent {
        CoverageEvent::synthesized(TRACK_TEST_COVERAGE_EVENT)
            .with_culture(HARVESTER_CULTURE)
            .with_action_type(HARVESTER_ACTION_TYPE)
            .with_action_reference(self.action)
            .with_version(HARVESTER_VERSION)
            .with_payload(Payload::new(HARVESTER_SERVICE_NAME, self.coverage))
    }
}

/// Parse a single line of test-runner output.
///
/// The line must have more than three tab-separated fields and a first
/// field of `ok`. The number starts one character past the `coverage`
/// marker in the fourth field and ends at the next `%`.
#[must_use]
pub fn parse_coverage_line(line: &str) -> Option<CoverageLine> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() <= 3 || fields[0].trim() != "ok" {
        return None;
    }

    let summary = fields[3];
    let begin = summary.find(COVERAGE_MARKER)? + COVERAGE_MARKER.len() + 1;
    let rest = summary.get(begin..)?;
    let end = rest.find('%')?;
    let number = rest[..end].trim();

    match number.parse::<f64>() {
        Ok(coverage) => {
            let action = fields[1].trim().to_string();
            debug!(action = %action, coverage, "coverage line");
            Some(CoverageLine { action, coverage })
        }
        Err(err) => {
            debug!(value = number, error = %err, "could not convert coverage");
            None
        }
    }
}

/// First qualifying coverage line in `output`, scanning in order
#[must_use]
pub fn parse_output(output: &str) -> Option<CoverageLine> {
    output.lines().find_map(parse_coverage_line)
}

/// Test command configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    /// Executable to run
    pub program: String,
    /// Arguments passed to the executable
    pub args: Vec<String>,
    /// Working directory, defaults to the process's own
    pub working_dir: Option<PathBuf>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            program: "go".to_string(),
            args: vec!["test".to_string(), "-cover".to_string(), "./...".to_string()],
            working_dir: None,
        }
    }
}

impl HarvestConfig {
    /// Build from a whitespace-separated command line such as `go test -cover ./...`
    #[must_use]
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            working_dir: None,
        })
    }

    /// Set the working directory
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Command line as a single display string
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs the test suite and extracts one coverage event
#[derive(Debug, Clone, Default)]
pub struct CoverageHarvester {
    config: HarvestConfig,
}

impl CoverageHarvester {
    /// Create a harvester for the given command
    #[must_use]
    pub fn new(config: HarvestConfig) -> Self {
        Self { config }
    }

    /// Run the test command to completion and parse its stdout.
    ///
    /// Returns `None` when the command cannot be started, exits with a
    /// failure status, or reports no parsable coverage line.
    pub async fn harvest(&self) -> Option<CoverageEvent> {
        info!(command = %self.config.command_line(), "running test command");

        let mut command = Command::new(&self.config.program);
        command.args(&self.config.args);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        let output = match command.output().await {
            Ok(output) => output,
            Err(err) => {
                warn!(error = %err, "error running test command");
                return None;
            }
        };
        if !output.status.success() {
            warn!(status = %output.status, "test command did not exit cleanly");
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = parse_output(&stdout);
        if line.is_none() {
            debug!("no coverage line in test output");
        }
        line.map(CoverageLine::into_event)
    }
}
