//! Output lifecycle: connect, write, close.

use std::{sync::Arc, time::Instant};

use snafu::{ResultExt as _, Snafu};
use tonic::metadata::{Ascii, MetadataValue};
use tracing::debug;
use zenoss_config::GenericConfiguration;

use crate::{
    client::{ClientError, DataReceiverClient, GrpcClient, StdoutClient},
    config::{OutputConfiguration, OutputConfigurationError},
    delivery::{deliver, DeliveryError, DeliverySummary},
    measurement::Measurement,
};

const SAMPLE_CONFIGURATION: &str = r#"## Zenoss API key.
api_key: "secret-key" # required unless stdout_client is enabled

## Address of the Zenoss data receiver. Plain `host:port` addresses are reached over TLS.
#address: "api.zenoss.io:443"

## Write requests to standard output as JSON instead of sending them.
#stdout_client: false

## Deadline shared by the metrics and models calls of a single write.
#call_timeout_secs: 60

## Timeout for establishing a connection.
#connect_timeout_secs: 10

## Drop measurements without any dimension tag. When disabled, all tags of such measurements become dimensions.
#require_dimension_tags: true

## Names of measurements that are always dropped.
#excluded_measurements: []

## Metadata attached to metrics: `defaults` for the default metadata only, `merged` to include each measurement's own.
#metric_metadata: defaults

## Dimensions and metadata added to everything sent. Defaults to a `source` dimension derived from the hostname and a
## `source-type` metadata entry.
#default_dimensions:
#  source: "zenoss.telegraf.myhost"
#default_metadata:
#  source-type: "telegraf.output.zenoss"

## Tag key prefix marking explicit dimensions, and the tag key carrying the display name.
#dimension_tag_prefix: "zdim_"
#display_name_tag: "zname"

## Logging.
#log_level: info
#log_format_json: false
"#;

/// Output error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum OutputError {
    /// The output could not be configured.
    #[snafu(display("invalid output configuration: {}", source))]
    Configuration {
        /// Source of the error.
        source: OutputConfigurationError,
    },

    /// The client could not be created.
    #[snafu(display("failed to connect: {}", source))]
    Connect {
        /// Source of the error.
        source: ClientError,
    },

    /// Measurements were written before connecting, or after closing.
    #[snafu(display("output is not connected"))]
    NotConnected,

    /// Delivering a batch failed.
    #[snafu(display("{}", source))]
    Delivery {
        /// Source of the error.
        source: DeliveryError,
    },
}

/// Forwards batches of measurements to Zenoss.
pub struct ZenossOutput {
    config: OutputConfiguration,
    api_key: MetadataValue<Ascii>,
    client: Option<Arc<dyn DataReceiverClient>>,
}

impl ZenossOutput {
    /// Creates a new `ZenossOutput` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the output configuration is invalid, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, OutputError> {
        let config = OutputConfiguration::from_configuration(config).context(Configuration)?;
        Ok(Self::new(config))
    }

    /// Creates a new `ZenossOutput` with the given configuration.
    pub fn new(config: OutputConfiguration) -> Self {
        let api_key = config
            .api_key()
            .cloned()
            .unwrap_or_else(|| MetadataValue::from_static(""));

        Self {
            config,
            api_key,
            client: None,
        }
    }

    /// Returns the annotated sample configuration.
    pub fn sample_configuration() -> &'static str {
        SAMPLE_CONFIGURATION
    }

    /// Returns `true` if the output holds a client.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Connects the output using the given client instead of the configured one.
    pub fn connect_with(&mut self, client: Arc<dyn DataReceiverClient>) {
        self.client = Some(client);
    }

    /// Connects the output.
    ///
    /// The stdout client is used when enabled, and the gRPC client otherwise. The gRPC channel is established on the
    /// first write.
    ///
    /// # Errors
    ///
    /// If the client cannot be created, an error is returned.
    pub async fn connect(&mut self) -> Result<(), OutputError> {
        let start = Instant::now();

        let client: Arc<dyn DataReceiverClient> = if self.config.stdout_client() {
            Arc::new(StdoutClient::new())
        } else {
            Arc::new(GrpcClient::connect(self.config.address(), self.config.connect_timeout()).context(Connect)?)
        };
        self.client = Some(client);

        debug!(
            stdout_client = self.config.stdout_client(),
            address = self.config.address(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Connected output."
        );
        Ok(())
    }

    /// Writes a batch of measurements.
    ///
    /// The batch is translated into metrics and models, which are then delivered concurrently.
    ///
    /// # Errors
    ///
    /// If the output is not connected, or delivery fails, an error is returned. Items rejected individually by the
    /// service are reported in the summary instead.
    pub async fn write(&self, measurements: &[Measurement]) -> Result<DeliverySummary, OutputError> {
        let client = self.client.as_ref().map(Arc::clone).ok_or(OutputError::NotConnected)?;

        let translation = self.config.builder().translate(measurements);

        deliver(
            client,
            &self.api_key,
            self.config.call_timeout(),
            translation.metrics,
            translation.models,
        )
        .await
        .context(Delivery)
    }

    /// Closes the output, releasing its client.
    pub async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            client.close().await;
            debug!("Closed output.");
        }
    }
}
