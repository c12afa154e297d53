//! Logging.

use anyhow::{anyhow, Context as _};
use serde::Deserialize;
use tracing::{level_filters::LevelFilter, Subscriber};
use tracing_subscriber::{layer::SubscriberExt as _, registry::LookupSpan, util::SubscriberInitExt as _, EnvFilter, Layer};
use zenoss_config::GenericConfiguration;

use crate::GenericError;

fn default_log_level() -> LogLevel {
    LogLevel(LevelFilter::INFO.to_string())
}

const fn default_false() -> bool {
    false
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
pub struct LoggingConfiguration {
    #[serde(default = "default_log_level")]
    log_level: LogLevel,

    #[serde(default = "default_false")]
    log_format_json: bool,
}

impl LoggingConfiguration {
    /// Creates a new `LoggingConfiguration` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the configuration cannot be deserialized as `LoggingConfiguration`, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        config
            .as_typed()
            .context("Failed to load logging configuration.")
    }
}

/// Filtering directives, validated on load.
#[derive(Debug, Deserialize)]
#[serde(try_from = "String")]
struct LogLevel(String);

impl LogLevel {
    fn as_env_filter(&self) -> EnvFilter {
        EnvFilter::builder().parse_lossy(&self.0)
    }
}

impl TryFrom<String> for LogLevel {
    type Error = GenericError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            return Err(anyhow!("Log level cannot be empty."));
        }

        EnvFilter::builder()
            .parse(&value)
            .context("Failed to parse valid log level.")?;
        Ok(Self(value))
    }
}

/// Initializes the logging subsystem for `tracing`.
///
/// Logs are written to standard error, either human-readable or as JSON, filtered by the configured level directives.
///
/// # Errors
///
/// If the logging subsystem was already initialized, an error is returned.
pub fn initialize_logging(config: &LoggingConfiguration) -> Result<(), GenericError> {
    let filter = config.log_level.as_env_filter();

    if config.log_format_json {
        tracing_subscriber::registry()
            .with(json_layer().with_filter(filter))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(pretty_layer().with_filter(filter))
            .try_init()?;
    }

    Ok(())
}

fn json_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::Layer::new()
        .json()
        .flatten_event(true)
        .with_target(true)
        .with_writer(std::io::stderr)
}

fn pretty_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::Layer::new()
        .with_target(false)
        .with_writer(std::io::stderr)
}
