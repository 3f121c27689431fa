//! mapsnatch - recover original sources from a deployed site's sourcemap.
//!
//! CLI entry point.

use clap::Parser;
use mapsnatch::discovery::HttpFetcher;
use mapsnatch::notify::ConsoleOutput;
use mapsnatch::{Config, Pipeline};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Set up logging
    let filter = if config.debug {
        EnvFilter::new("mapsnatch=debug,info")
    } else {
        EnvFilter::new("mapsnatch=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let base_url = match config.base_url() {
        Ok(url) => url,
        Err(e) => {
            error!("Invalid target {:?}: {}", config.url, e);
            return ExitCode::FAILURE;
        }
    };

    let fetcher = match HttpFetcher::new(config.http_config()) {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = Pipeline::new(fetcher, &config.output, ConsoleOutput::new(config.debug));

    match pipeline.run(&base_url).await {
        Ok(outcome) => {
            pipeline
                .console()
                .print_summary(&outcome.report, &outcome.report_path);
            info!(
                "Recovered {} of {} sources into {}",
                outcome.report.written_sources,
                outcome.report.total_sources,
                pipeline.output_dir().display()
            );
            ExitCode::SUCCESS
        }
        Err(failure) => {
            pipeline.console().print_failure(&failure);
            error!("Run aborted at stage '{}'", failure.stage);
            ExitCode::FAILURE
        }
    }
}
