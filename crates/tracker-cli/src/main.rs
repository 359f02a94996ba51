//! Tracker CLI: records test-coverage events
//!
//! ## Usage
//!
//! ```bash
//! tracker serve --port 8080 --db-name ./stats.db   # Run the HTTP server
//! tracker harvest --dir ../service                 # Harvest local coverage once
//! tracker stats --pretty                           # Dump stored events
//! ```

use clap::Parser;
use coverage_tracker::{ActionStore, CoverageHarvester, EventForwarder, HttpSink};
use std::process::ExitCode;
use tracker_cli::{
    logging, server, Cli, CliError, CliResult, Commands, HarvestArgs, StatsArgs,
    TrackerConfig,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = cli.apply_to(TrackerConfig::load(cli.config.as_deref())?);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::server(format!("Failed to create runtime: {e}")))?;

    match &cli.command {
        Commands::Serve(args) => {
            let config = args.apply_to(config);
            logging::init(&config.log_level, config.log_format, std::io::stdout)?;
            tracing::info!(?config, "configs loaded");
            rt.block_on(server::run(&config))
        }
        Commands::Harvest(args) => {
            logging::init(&config.log_level, config.log_format, std::io::stderr)?;
            rt.block_on(run_harvest(config, args))
        }
        Commands::Stats(args) => run_stats(config, args),
    }
}

async fn run_harvest(mut config: TrackerConfig, args: &HarvestArgs) -> CliResult<()> {
    if let Some(command) = &args.test_command {
        config.test_command.clone_from(command);
    }
    let mut harvest = config.harvest_config()?;
    if let Some(dir) = &args.directory {
        harvest = harvest.with_working_dir(dir);
    }

    let Some(event) = CoverageHarvester::new(harvest).harvest().await else {
        return Err(CliError::harvest(format!(
            "`{}` produced no coverage result",
            config.test_command
        )));
    };
    println!("{}", serde_json::to_string_pretty(&event)?);

    if args.forward {
        let forwarder = EventForwarder::start(
            HttpSink::new(&config.dest_endpoint),
            config.queue_capacity,
        );
        forwarder.submit(&event).await?;
        forwarder.shutdown().await;
    }
    Ok(())
}

fn run_stats(config: TrackerConfig, args: &StatsArgs) -> CliResult<()> {
    let db_name = args.db_name.clone().unwrap_or(config.db_name);
    if !db_name.is_file() {
        return Err(CliError::config(format!(
            "database {} does not exist",
            db_name.display()
        )));
    }
    let events = ActionStore::open(&db_name)?.scan_all()?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&events)?
    } else {
        serde_json::to_string(&events)?
    };
    println!("{json}");
    Ok(())
}
