use tonic::codegen::{http, Body, Bytes, StdError};
use tonic::GrpcMethod;

use crate::{Metrics, ModelStatusResult, Models, StatusResult, DATA_RECEIVER_SERVICE_NAME};

/// Client for the data receiver gRPC service.
#[derive(Clone, Debug)]
pub struct DataReceiverServiceClient<T> {
    inner: tonic::client::Grpc<T>,
}

impl<T> DataReceiverServiceClient<T>
where
    T: tonic::client::GrpcService<tonic::body::Body>,
    T::Error: Into<StdError>,
    T::ResponseBody: Body<Data = Bytes> + Send + 'static,
    <T::ResponseBody as Body>::Error: Into<StdError> + Send,
{
    /// Creates a new client over the given transport.
    pub fn new(inner: T) -> Self {
        Self {
            inner: tonic::client::Grpc::new(inner),
        }
    }

    /// Limits the maximum size of a decoded response message.
    pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
        self.inner = self.inner.max_decoding_message_size(limit);
        self
    }

    /// Limits the maximum size of an encoded request message.
    pub fn max_encoding_message_size(mut self, limit: usize) -> Self {
        self.inner = self.inner.max_encoding_message_size(limit);
        self
    }

    /// Sends a batch of metrics.
    ///
    /// # Errors
    ///
    /// If the transport is not ready, or the call fails, the corresponding status is returned.
    pub async fn put_metrics(
        &mut self, request: impl tonic::IntoRequest<Metrics>,
    ) -> Result<tonic::Response<StatusResult>, tonic::Status> {
        self.ready().await?;

        let mut request = request.into_request();
        request
            .extensions_mut()
            .insert(GrpcMethod::new(DATA_RECEIVER_SERVICE_NAME, "PutMetrics"));

        let path = http::uri::PathAndQuery::from_static("/zenoss.cloud.DataReceiverService/PutMetrics");
        let codec = tonic::codec::ProstCodec::default();
        self.inner.unary(request, path, codec).await
    }

    /// Sends a batch of models.
    ///
    /// # Errors
    ///
    /// If the transport is not ready, or the call fails, the corresponding status is returned.
    pub async fn put_models(
        &mut self, request: impl tonic::IntoRequest<Models>,
    ) -> Result<tonic::Response<ModelStatusResult>, tonic::Status> {
        self.ready().await?;

        let mut request = request.into_request();
        request
            .extensions_mut()
            .insert(GrpcMethod::new(DATA_RECEIVER_SERVICE_NAME, "PutModels"));

        let path = http::uri::PathAndQuery::from_static("/zenoss.cloud.DataReceiverService/PutModels");
        let codec = tonic::codec::ProstCodec::default();
        self.inner.unary(request, path, codec).await
    }

    async fn ready(&mut self) -> Result<(), tonic::Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| tonic::Status::unknown(format!("Service was not ready: {}", e.into())))
    }
}
