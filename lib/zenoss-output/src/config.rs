//! Output configuration.

use std::{collections::HashMap, time::Duration};

use snafu::{ResultExt as _, Snafu};
use tonic::metadata::{errors::InvalidMetadataValue, Ascii, MetadataValue};
use zenoss_config::{ConfigurationError, GenericConfiguration};

use crate::{
    builder::{DataBuilder, MetricMetadata},
    naming::{default_dimensions, default_metadata, NamingConvention, DEFAULT_DIMENSION_TAG_PREFIX, DEFAULT_DISPLAY_NAME_TAG},
};

/// Default address of the data receiver service.
pub const DEFAULT_ADDRESS: &str = "api.zenoss.io:443";

const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Output configuration error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum OutputConfigurationError {
    /// A configuration value could not be read.
    #[snafu(display("{}", source))]
    Configuration {
        /// Source of the error.
        source: ConfigurationError,
    },

    /// No API key was configured, and one is required to reach the service.
    #[snafu(display("Missing API key. Try setting `api_key` or `ZENOSS_API_KEY`."))]
    MissingApiKey,

    /// The API key contains characters that cannot be sent as request metadata.
    #[snafu(display("API key must consist of visible ASCII characters only."))]
    InvalidApiKey,
}

impl From<InvalidMetadataValue> for OutputConfigurationError {
    fn from(_: InvalidMetadataValue) -> Self {
        Self::InvalidApiKey
    }
}

/// Output configuration.
///
/// Holds everything needed to translate and deliver measurements: the client selection and its settings, the call
/// deadline, and a configured [`DataBuilder`].
#[derive(Clone, Debug)]
pub struct OutputConfiguration {
    api_key: Option<MetadataValue<Ascii>>,
    address: String,
    stdout_client: bool,
    call_timeout: Duration,
    connect_timeout: Duration,
    builder: DataBuilder,
}

impl OutputConfiguration {
    /// Creates a new `OutputConfiguration` from the given configuration.
    ///
    /// # Errors
    ///
    /// If a value has the wrong type, if the API key is missing while the stdout client is not enabled, or if the API
    /// key is not visible ASCII, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, OutputConfigurationError> {
        let stdout_client = config.try_get_typed::<bool>("stdout_client").context(Configuration)?.unwrap_or(false);

        let api_key = match config.try_get_typed::<String>("api_key").context(Configuration)? {
            Some(api_key) => Some(parse_api_key(&api_key)?),
            None if stdout_client => None,
            None => return Err(OutputConfigurationError::MissingApiKey),
        };

        let address = config
            .try_get_typed::<String>("address")
            .context(Configuration)?
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

        let call_timeout = config
            .try_get_typed::<u64>("call_timeout_secs")
            .context(Configuration)?
            .unwrap_or(DEFAULT_CALL_TIMEOUT_SECS);
        let connect_timeout = config
            .try_get_typed::<u64>("connect_timeout_secs")
            .context(Configuration)?
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);

        let naming = NamingConvention::new(
            config
                .try_get_typed::<String>("dimension_tag_prefix")
                .context(Configuration)?
                .unwrap_or_else(|| DEFAULT_DIMENSION_TAG_PREFIX.to_string()),
            config
                .try_get_typed::<String>("display_name_tag")
                .context(Configuration)?
                .unwrap_or_else(|| DEFAULT_DISPLAY_NAME_TAG.to_string()),
        );

        let dimensions = config
            .try_get_typed::<HashMap<String, String>>("default_dimensions")
            .context(Configuration)?
            .unwrap_or_else(default_dimensions);
        let metadata = config
            .try_get_typed::<HashMap<String, String>>("default_metadata")
            .context(Configuration)?
            .unwrap_or_else(default_metadata);

        let builder = DataBuilder::new(dimensions, metadata)
            .with_naming(naming)
            .with_excluded_measurements(
                config
                    .try_get_typed::<Vec<String>>("excluded_measurements")
                    .context(Configuration)?
                    .unwrap_or_default(),
            )
            .with_require_dimension_tags(
                config
                    .try_get_typed::<bool>("require_dimension_tags")
                    .context(Configuration)?
                    .unwrap_or(true),
            )
            .with_metric_metadata(
                config
                    .try_get_typed::<MetricMetadata>("metric_metadata")
                    .context(Configuration)?
                    .unwrap_or_default(),
            );

        Ok(Self {
            api_key,
            address,
            stdout_client,
            call_timeout: Duration::from_secs(call_timeout),
            connect_timeout: Duration::from_secs(connect_timeout),
            builder,
        })
    }

    /// Returns the API key sent with every call, if one was configured.
    pub fn api_key(&self) -> Option<&MetadataValue<Ascii>> {
        self.api_key.as_ref()
    }

    /// Returns the address of the data receiver service.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns `true` if requests are written to standard output instead of being sent.
    pub fn stdout_client(&self) -> bool {
        self.stdout_client
    }

    /// Returns the deadline shared by the two calls of a write.
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Returns the timeout for establishing a connection.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the translation engine.
    pub fn builder(&self) -> &DataBuilder {
        &self.builder
    }
}

fn parse_api_key(api_key: &str) -> Result<MetadataValue<Ascii>, OutputConfigurationError> {
    if api_key.is_empty() || !api_key.chars().all(|c| c.is_ascii_graphic()) {
        return Err(OutputConfigurationError::InvalidApiKey);
    }

    Ok(MetadataValue::try_from(api_key)?)
}
