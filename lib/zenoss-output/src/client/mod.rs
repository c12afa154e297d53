//! Clients for the data receiver service.

use async_trait::async_trait;
use tonic::{Request, Status};
use zenoss_protos::{Metrics, ModelStatusResult, Models, StatusResult};

mod grpc;
pub use self::grpc::{normalize_address, ClientError, GrpcClient};

mod stdout;
pub use self::stdout::StdoutClient;

/// Metadata key carrying the API key on every call.
pub const API_KEY_HEADER: &str = "zenoss-api-key";

/// A client of the data receiver service.
///
/// Implementations must allow both calls to be in flight at the same time.
#[async_trait]
pub trait DataReceiverClient: Send + Sync {
    /// Sends a batch of metrics.
    async fn put_metrics(&self, request: Request<Metrics>) -> Result<StatusResult, Status>;

    /// Sends a batch of models.
    async fn put_models(&self, request: Request<Models>) -> Result<ModelStatusResult, Status>;

    /// Releases any resources held by the client.
    async fn close(&self) {}
}
