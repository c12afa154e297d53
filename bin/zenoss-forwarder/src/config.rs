use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use zenoss_output::measurement::TimestampPrecision;

#[derive(Parser)]
#[command(about)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand)]
pub enum Action {
    /// Read a batch of measurements and forward it to Zenoss.
    #[command(name = "run")]
    Run(RunConfig),

    /// Print an annotated sample configuration.
    #[command(name = "sample-config")]
    SampleConfig,
}

/// Run configuration.
#[derive(Args, Clone, Debug)]
pub struct RunConfig {
    /// Path to the YAML configuration file.
    ///
    /// Values can be overridden with `ZENOSS_`-prefixed environment variables, such as `ZENOSS_API_KEY`.
    #[arg(short = 'c', long)]
    pub config: PathBuf,

    /// Path to a file of JSON measurements, one per line, or `-` for standard input.
    #[arg(short = 'i', long, default_value = "-")]
    pub input: String,

    /// Precision of the integer timestamps in the input.
    #[arg(long, value_enum, default_value_t = Precision::S)]
    pub timestamp_precision: Precision,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Precision {
    S,
    Ms,
    Us,
    Ns,
}

impl From<Precision> for TimestampPrecision {
    fn from(precision: Precision) -> Self {
        match precision {
            Precision::S => Self::Seconds,
            Precision::Ms => Self::Milliseconds,
            Precision::Us => Self::Microseconds,
            Precision::Ns => Self::Nanoseconds,
        }
    }
}
