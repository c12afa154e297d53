//! Concurrent delivery of metrics and models.

use std::{future::Future, sync::Arc, time::Duration};

use snafu::Snafu;
use tokio::time::{timeout_at, Instant};
use tonic::{
    metadata::{Ascii, MetadataValue},
    Request, Status,
};
use tracing::{debug, error, info, Instrument as _};
use zenoss_protos::{Metric, Metrics, Model, Models};

use crate::client::{DataReceiverClient, API_KEY_HEADER};

// Deadline used when the configured timeout does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Error from a single call to the data receiver.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum CallError {
    /// The call failed at the transport or RPC level.
    #[snafu(display("{:?}({})", source.code(), status_message(source)))]
    Transport {
        /// Source of the error.
        source: Status,
    },

    /// The call did not complete before the shared deadline.
    #[snafu(display("deadline of {:?} exceeded", timeout))]
    DeadlineExceeded {
        /// Timeout shared by both calls.
        timeout: Duration,
    },

    /// The task driving the call panicked or was cancelled.
    #[snafu(display("call task failed: {}", source))]
    TaskFailed {
        /// Source of the error.
        source: tokio::task::JoinError,
    },
}

/// Delivery error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum DeliveryError {
    /// Sending metrics failed.
    #[snafu(display("unable to send {} metrics: {}", count, source))]
    SendMetrics {
        /// Number of metrics in the batch.
        count: usize,

        /// Source of the error.
        source: CallError,
    },

    /// Sending models failed.
    #[snafu(display("unable to send {} models: {}", count, source))]
    SendModels {
        /// Number of models in the batch.
        count: usize,

        /// Source of the error.
        source: CallError,
    },

    /// Sending both metrics and models failed.
    #[snafu(display(
        "unable to send {} metrics: {}; unable to send {} models: {}",
        metric_count,
        metrics,
        model_count,
        models
    ))]
    SendBoth {
        /// Number of metrics in the batch.
        metric_count: usize,

        /// Error from sending metrics.
        metrics: CallError,

        /// Number of models in the batch.
        model_count: usize,

        /// Error from sending models.
        models: CallError,
    },
}

/// Outcome of a call the service answered.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CallSummary {
    /// Number of items sent.
    pub sent: usize,

    /// Number of items the service accepted.
    pub succeeded: usize,

    /// Number of items the service rejected.
    pub failed: usize,

    /// Message returned by the service.
    pub message: String,
}

impl CallSummary {
    fn new(sent: usize, succeeded: i32, failed: i32, message: String) -> Self {
        Self {
            sent,
            succeeded: usize::try_from(succeeded).unwrap_or_default(),
            failed: usize::try_from(failed).unwrap_or_default(),
            message,
        }
    }
}

/// Outcome of delivering a batch when both calls were answered.
///
/// Individual items may still have been rejected: partial failures are reported here rather than as an error.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeliverySummary {
    /// Outcome of sending metrics.
    pub metrics: CallSummary,

    /// Outcome of sending models.
    pub models: CallSummary,
}

/// Delivers metrics and models to the data receiver.
///
/// Both calls run concurrently, carry `api_key` under the API key header, and share a single deadline `timeout` from
/// now. Delivery waits for both calls to finish before returning, even when one of them fails.
///
/// # Errors
///
/// If either call fails, or does not complete before the deadline, an error is returned. If both fail, the error
/// carries both causes.
pub async fn deliver(
    client: Arc<dyn DataReceiverClient>, api_key: &MetadataValue<Ascii>, timeout: Duration, metrics: Vec<Metric>,
    models: Vec<Model>,
) -> Result<DeliverySummary, DeliveryError> {
    let deadline = deadline_after(timeout);

    let metric_count = metrics.len();
    let metrics_request = build_request(
        Metrics {
            detailed_response: true,
            metrics,
        },
        api_key,
        timeout,
    );

    let metrics_client = Arc::clone(&client);
    let metrics_task = tokio::spawn(
        async move {
            let result = run_call("metrics", deadline, timeout, metrics_client.put_metrics(metrics_request))
                .await
                .map(|status| CallSummary::new(metric_count, status.succeeded, status.failed, status.message));
            log_outcome("metrics", metric_count, &result);
            result
        }
        .in_current_span(),
    );

    let model_count = models.len();
    let models_request = build_request(
        Models {
            detailed_response: true,
            models,
        },
        api_key,
        timeout,
    );
    let models_result = run_call("models", deadline, timeout, client.put_models(models_request))
        .await
        .map(|status| CallSummary::new(model_count, status.succeeded, status.failed, status.message));
    log_outcome("models", model_count, &models_result);

    let metrics_result = match metrics_task.await {
        Ok(result) => result,
        Err(e) => Err(CallError::TaskFailed { source: e }),
    };

    match (metrics_result, models_result) {
        (Ok(metrics), Ok(models)) => Ok(DeliverySummary { metrics, models }),
        (Err(source), Ok(_)) => Err(DeliveryError::SendMetrics {
            count: metric_count,
            source,
        }),
        (Ok(_), Err(source)) => Err(DeliveryError::SendModels {
            count: model_count,
            source,
        }),
        (Err(metrics), Err(models)) => Err(DeliveryError::SendBoth {
            metric_count,
            metrics,
            model_count,
            models,
        }),
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

fn status_message(status: &Status) -> &str {
    if status.message().is_empty() {
        status.code().description()
    } else {
        status.message()
    }
}

fn build_request<T>(message: T, api_key: &MetadataValue<Ascii>, timeout: Duration) -> Request<T> {
    let mut request = Request::new(message);
    request.metadata_mut().insert(API_KEY_HEADER, api_key.clone());
    request.set_timeout(timeout);
    request
}

async fn run_call<F, T>(kind: &str, deadline: Instant, timeout: Duration, call: F) -> Result<T, CallError>
where
    F: Future<Output = Result<T, Status>>,
{
    let start = Instant::now();
    let result = match timeout_at(deadline, call).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(status)) => Err(CallError::Transport { source: status }),
        Err(_) => Err(CallError::DeadlineExceeded { timeout }),
    };
    debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Finished sending {}.", kind);
    result
}

fn log_outcome(kind: &str, count: usize, result: &Result<CallSummary, CallError>) {
    match result {
        Ok(summary) => {
            if summary.failed > 0 {
                error!("Failed sending {} of {} {}.", summary.failed, count, kind);
            }
            info!("Sent {} {}.", summary.succeeded, kind);
        }
        Err(e) => error!(error = %e, "Unable to send {} {}.", count, kind),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use async_trait::async_trait;
    use tokio::sync::Barrier;
    use tonic::Code;
    use zenoss_protos::{ModelStatusResult, StatusResult};

    use super::*;

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed { failed: i32 },
        Fail(Code),
        Hang,
    }

    struct MockClient {
        metrics: Behavior,
        models: Behavior,
        barrier: Option<Barrier>,
        seen_api_keys: Mutex<Vec<String>>,
    }

    impl MockClient {
        fn new(metrics: Behavior, models: Behavior) -> Self {
            Self {
                metrics,
                models,
                barrier: None,
                seen_api_keys: Mutex::new(Vec::new()),
            }
        }

        fn with_rendezvous(mut self) -> Self {
            self.barrier = Some(Barrier::new(2));
            self
        }

        async fn respond<T>(&self, behavior: Behavior, request: &Request<T>, count: usize) -> Result<(i32, i32), Status> {
            let api_key = request
                .metadata()
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            self.seen_api_keys.lock().unwrap().push(api_key);

            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }

            match behavior {
                Behavior::Succeed { failed } => Ok((count as i32 - failed, failed)),
                Behavior::Fail(code) => Err(Status::new(code, "mock failure")),
                Behavior::Hang => std::future::pending().await,
            }
        }
    }

    #[async_trait]
    impl DataReceiverClient for MockClient {
        async fn put_metrics(&self, request: Request<Metrics>) -> Result<StatusResult, Status> {
            let count = request.get_ref().metrics.len();
            let (succeeded, failed) = self.respond(self.metrics, &request, count).await?;
            Ok(StatusResult {
                succeeded,
                failed,
                ..Default::default()
            })
        }

        async fn put_models(&self, request: Request<Models>) -> Result<ModelStatusResult, Status> {
            let count = request.get_ref().models.len();
            let (succeeded, failed) = self.respond(self.models, &request, count).await?;
            Ok(ModelStatusResult {
                succeeded,
                failed,
                ..Default::default()
            })
        }
    }

    fn api_key() -> MetadataValue<Ascii> {
        MetadataValue::from_static("secret-key")
    }

    fn metrics(n: usize) -> Vec<Metric> {
        (0..n)
            .map(|i| Metric {
                metric: format!("cpu.usage{}", i),
                timestamp: 1000,
                dimensions: HashMap::new(),
                metadata_fields: None,
                value: i as f64,
            })
            .collect()
    }

    fn models(n: usize) -> Vec<Model> {
        (0..n)
            .map(|i| Model {
                timestamp: 1000 + i as i64,
                dimensions: HashMap::new(),
                metadata_fields: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn both_succeed() {
        let client = Arc::new(MockClient::new(
            Behavior::Succeed { failed: 0 },
            Behavior::Succeed { failed: 0 },
        ));

        let summary = deliver(client.clone(), &api_key(), Duration::from_secs(60), metrics(3), models(2))
            .await
            .unwrap();
        assert_eq!(summary.metrics.sent, 3);
        assert_eq!(summary.metrics.succeeded, 3);
        assert_eq!(summary.models.succeeded, 2);

        let seen = client.seen_api_keys.lock().unwrap().clone();
        assert_eq!(seen, vec!["secret-key".to_string(), "secret-key".to_string()]);
    }

    #[tokio::test]
    async fn partial_failures_are_not_errors() {
        let client = Arc::new(MockClient::new(
            Behavior::Succeed { failed: 2 },
            Behavior::Succeed { failed: 1 },
        ));

        let summary = deliver(client, &api_key(), Duration::from_secs(60), metrics(5), models(1))
            .await
            .unwrap();
        assert_eq!(summary.metrics.succeeded, 3);
        assert_eq!(summary.metrics.failed, 2);
        assert_eq!(summary.models.succeeded, 0);
        assert_eq!(summary.models.failed, 1);
    }

    #[tokio::test]
    async fn metrics_failure() {
        let client = Arc::new(MockClient::new(
            Behavior::Fail(Code::Unavailable),
            Behavior::Succeed { failed: 0 },
        ));

        let error = deliver(client, &api_key(), Duration::from_secs(60), metrics(4), models(1))
            .await
            .unwrap_err();
        assert!(matches!(error, DeliveryError::SendMetrics { count: 4, .. }));
        assert_eq!(error.to_string(), "unable to send 4 metrics: Unavailable(mock failure)");
    }

    #[tokio::test]
    async fn models_failure() {
        let client = Arc::new(MockClient::new(
            Behavior::Succeed { failed: 0 },
            Behavior::Fail(Code::Unauthenticated),
        ));

        let error = deliver(client, &api_key(), Duration::from_secs(60), metrics(1), models(2))
            .await
            .unwrap_err();
        assert!(matches!(error, DeliveryError::SendModels { count: 2, .. }));
    }

    #[tokio::test]
    async fn both_fail() {
        let client = Arc::new(MockClient::new(
            Behavior::Fail(Code::Unavailable),
            Behavior::Fail(Code::Internal),
        ));

        let error = deliver(client, &api_key(), Duration::from_secs(60), metrics(1), models(1))
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "unable to send 1 metrics: Unavailable(mock failure); unable to send 1 models: Internal(mock failure)"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shared_deadline() {
        let client = Arc::new(MockClient::new(Behavior::Hang, Behavior::Succeed { failed: 0 }));

        let start = Instant::now();
        let error = deliver(client, &api_key(), Duration::from_secs(60), metrics(1), models(1))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            DeliveryError::SendMetrics {
                source: CallError::DeadlineExceeded { .. },
                ..
            }
        ));
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn models_deadline() {
        let client = Arc::new(MockClient::new(Behavior::Succeed { failed: 0 }, Behavior::Hang));

        let error = deliver(client, &api_key(), Duration::from_secs(60), metrics(1), models(1))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            DeliveryError::SendModels {
                count: 1,
                source: CallError::DeadlineExceeded { .. },
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn both_calls_hit_the_same_deadline() {
        let client = Arc::new(MockClient::new(Behavior::Hang, Behavior::Hang));

        let start = Instant::now();
        let error = deliver(client, &api_key(), Duration::from_secs(60), metrics(1), models(1))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            DeliveryError::SendBoth {
                metrics: CallError::DeadlineExceeded { .. },
                models: CallError::DeadlineExceeded { .. },
                ..
            }
        ));

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(60));
        assert!(elapsed < Duration::from_secs(120));
    }

    #[tokio::test]
    async fn oversized_timeout_does_not_overflow() {
        let client = Arc::new(MockClient::new(
            Behavior::Succeed { failed: 0 },
            Behavior::Succeed { failed: 0 },
        ));

        let summary = deliver(client, &api_key(), Duration::from_secs(u64::MAX), metrics(2), models(1))
            .await
            .unwrap();
        assert_eq!(summary.metrics.succeeded, 2);
        assert_eq!(summary.models.succeeded, 1);
    }

    #[test]
    fn transport_error_display() {
        let error = CallError::Transport {
            source: Status::new(Code::DeadlineExceeded, ""),
        };
        assert_eq!(
            error.to_string(),
            "DeadlineExceeded(Deadline expired before operation could complete)"
        );

        let error = CallError::Transport {
            source: Status::unauthenticated("invalid api key"),
        };
        assert_eq!(error.to_string(), "Unauthenticated(invalid api key)");
    }

    #[tokio::test(start_paused = true)]
    async fn calls_are_concurrent() {
        // Each call waits for the other to start, so sequential calls would run into the deadline.
        let client = Arc::new(
            MockClient::new(Behavior::Succeed { failed: 0 }, Behavior::Succeed { failed: 0 }).with_rendezvous(),
        );

        let summary = deliver(client, &api_key(), Duration::from_secs(60), metrics(1), models(1)).await;
        assert!(summary.is_ok());
    }

    #[tokio::test]
    async fn empty_batches_are_still_sent() {
        let client = Arc::new(MockClient::new(
            Behavior::Succeed { failed: 0 },
            Behavior::Succeed { failed: 0 },
        ));

        let summary = deliver(client.clone(), &api_key(), Duration::from_secs(60), Vec::new(), Vec::new())
            .await
            .unwrap();
        assert_eq!(summary, DeliverySummary::default());
        assert_eq!(client.seen_api_keys.lock().unwrap().len(), 2);
    }
}
