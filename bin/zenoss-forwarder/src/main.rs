//! Zenoss forwarder.
//!
//! Reads a batch of telegraf-style JSON measurements, translates them into Zenoss metrics and models, and sends both
//! to the Zenoss data receiver service.

#![deny(warnings)]
#![deny(missing_docs)]

use std::path::Path;

use anyhow::Context as _;
use clap::Parser as _;
use tracing::{error, info};
use zenoss_config::{ConfigurationLoader, GenericConfiguration};
use zenoss_output::ZenossOutput;

mod config;
use self::config::{Action, Cli, RunConfig};

mod input;
use self::input::read_measurements;

mod logging;
use self::logging::{initialize_logging, LoggingConfiguration};

type GenericError = anyhow::Error;

const ENV_PREFIX: &str = "zenoss";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.action {
        Action::SampleConfig => print!("{}", ZenossOutput::sample_configuration()),
        Action::Run(config) => {
            let configuration = load_configuration(&config.config)
                .unwrap_or_else(|e| fatal_and_exit(format!("failed to load configuration: {:?}", e)));

            let logging_config = LoggingConfiguration::from_configuration(&configuration)
                .unwrap_or_else(|e| fatal_and_exit(format!("failed to load logging configuration: {:?}", e)));
            if let Err(e) = initialize_logging(&logging_config) {
                fatal_and_exit(format!("failed to initialize logging: {}", e));
            }

            match run(config, configuration).await {
                Ok(()) => info!("Zenoss forwarder stopped."),
                Err(e) => {
                    error!("{:?}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Logs a message to standard error and exits the process with a non-zero exit code.
fn fatal_and_exit(message: String) -> ! {
    eprintln!("FATAL: {}", message);
    std::process::exit(1);
}

fn load_configuration(path: &Path) -> Result<GenericConfiguration, GenericError> {
    let configuration = ConfigurationLoader::default()
        .from_yaml(path)
        .with_context(|| format!("Failed to load configuration file '{}'.", path.display()))?
        .from_environment(ENV_PREFIX)
        .context("Failed to load configuration from environment.")?
        .into_generic();

    Ok(configuration)
}

async fn run(config: RunConfig, configuration: GenericConfiguration) -> Result<(), GenericError> {
    info!("Zenoss forwarder starting...");

    let mut output = ZenossOutput::from_configuration(&configuration).context("Failed to configure output.")?;

    let measurements = read_measurements(&config.input, config.timestamp_precision.into())?;
    info!(measurements = measurements.len(), "Read measurements.");

    output.connect().await.context("Failed to connect output.")?;
    let result = output.write(&measurements).await;
    output.close().await;

    let summary = result.context("Failed to write measurements.")?;
    info!(
        metrics_succeeded = summary.metrics.succeeded,
        metrics_failed = summary.metrics.failed,
        models_succeeded = summary.models.succeeded,
        models_failed = summary.models.failed,
        "Finished writing measurements."
    );

    Ok(())
}
