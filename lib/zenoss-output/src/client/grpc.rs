use std::time::Duration;

use async_trait::async_trait;
use snafu::{ResultExt as _, Snafu};
use tonic::{
    transport::{Channel, ClientTlsConfig, Endpoint},
    Request, Status,
};
use tracing::debug;
use zenoss_protos::{DataReceiverServiceClient, Metrics, ModelStatusResult, Models, StatusResult};

use super::DataReceiverClient;

/// Client connection error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ClientError {
    /// The address could not be parsed as an endpoint.
    #[snafu(display("invalid address '{}': {}", address, source))]
    InvalidAddress {
        /// Address as given.
        address: String,

        /// Source of the error.
        source: tonic::transport::Error,
    },

    /// TLS could not be configured for the endpoint.
    #[snafu(display("failed to configure TLS for '{}': {}", address, source))]
    Tls {
        /// Address as given.
        address: String,

        /// Source of the error.
        source: tonic::transport::Error,
    },
}

/// Normalizes an address into an endpoint URI.
///
/// Addresses without a scheme are assumed to be `host:port` and get `https://` prepended.
pub fn normalize_address(address: &str) -> String {
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("https://{}", address)
    }
}

/// A gRPC client of the data receiver service.
///
/// The channel connects lazily, on the first call, and transparently reconnects after failures. TLS is used for
/// `https` endpoints, verified against the platform's native root certificates.
#[derive(Clone)]
pub struct GrpcClient {
    inner: DataReceiverServiceClient<Channel>,
}

impl GrpcClient {
    /// Creates a new `GrpcClient` for the given address.
    ///
    /// # Errors
    ///
    /// If the address is not a valid endpoint, or TLS cannot be configured for it, an error is returned.
    pub fn connect(address: &str, connect_timeout: Duration) -> Result<Self, ClientError> {
        let uri = normalize_address(address);
        let mut endpoint = Endpoint::from_shared(uri.clone())
            .context(InvalidAddress { address })?
            .connect_timeout(connect_timeout);

        if uri.starts_with("https://") {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().with_native_roots())
                .context(Tls { address })?;
        }

        debug!(endpoint = %uri, "Created data receiver channel.");

        Ok(Self {
            inner: DataReceiverServiceClient::new(endpoint.connect_lazy()),
        })
    }
}

#[async_trait]
impl DataReceiverClient for GrpcClient {
    async fn put_metrics(&self, request: Request<Metrics>) -> Result<StatusResult, Status> {
        let mut client = self.inner.clone();
        client.put_metrics(request).await.map(|response| response.into_inner())
    }

    async fn put_models(&self, request: Request<Models>) -> Result<ModelStatusResult, Status> {
        let mut client = self.inner.clone();
        client.put_models(request).await.map(|response| response.into_inner())
    }
}
