//! Structured logging setup

use crate::config::LogFormat;
use crate::error::{CliError, CliResult};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Build the log filter: `RUST_LOG` wins, then `level`
pub fn env_filter(level: &str) -> CliResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| CliError::config(format!("invalid log level {level:?}: {e}"))),
    }
}

/// Install the global subscriber, writing to `writer`.
///
/// The server logs to stdout; commands that print data on stdout pass
/// `std::io::stderr`. Fails if a subscriber is already installed.
pub fn init<W>(level: &str, format: LogFormat, writer: W) -> CliResult<()>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = env_filter(level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_file(true)
        .with_line_number(true);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    result.map_err(|e| CliError::config(format!("logging already initialized: {e}")))
}
