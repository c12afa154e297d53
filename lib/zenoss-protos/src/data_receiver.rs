use std::collections::HashMap;

/// A single metric observation.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Metric {
    /// Fully-qualified metric name.
    #[prost(string, tag = "1")]
    pub metric: String,

    /// Observation time, in milliseconds since the Unix epoch.
    #[prost(int64, tag = "2")]
    pub timestamp: i64,

    /// Dimensions identifying the entity the metric belongs to.
    #[prost(map = "string, string", tag = "3")]
    pub dimensions: HashMap<String, String>,

    /// Descriptive metadata attached to the metric.
    #[prost(message, optional, tag = "4")]
    pub metadata_fields: Option<prost_types::Struct>,

    /// Observed value.
    #[prost(double, tag = "5")]
    pub value: f64,
}

/// A batch of metrics.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Metrics {
    /// Whether or not the receiver should report per-metric failures.
    #[prost(bool, tag = "1")]
    pub detailed_response: bool,

    #[prost(message, repeated, tag = "2")]
    #[allow(missing_docs)]
    pub metrics: Vec<Metric>,
}

/// A snapshot of a monitored entity.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Model {
    /// Snapshot time, in milliseconds since the Unix epoch.
    #[prost(int64, tag = "1")]
    pub timestamp: i64,

    /// Dimensions identifying the entity.
    #[prost(map = "string, string", tag = "2")]
    pub dimensions: HashMap<String, String>,

    /// Descriptive metadata attached to the entity.
    #[prost(message, optional, tag = "3")]
    pub metadata_fields: Option<prost_types::Struct>,
}

/// A batch of models.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Models {
    /// Whether or not the receiver should report per-model failures.
    #[prost(bool, tag = "1")]
    pub detailed_response: bool,

    #[prost(message, repeated, tag = "2")]
    #[allow(missing_docs)]
    pub models: Vec<Model>,
}

/// A metric the receiver rejected, along with the reason.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MetricError {
    #[prost(string, tag = "1")]
    #[allow(missing_docs)]
    pub error: String,

    #[prost(message, optional, tag = "2")]
    #[allow(missing_docs)]
    pub metric: Option<Metric>,
}

/// Outcome of a `PutMetrics` call.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StatusResult {
    /// Number of metrics the receiver rejected.
    #[prost(int32, tag = "1")]
    pub failed: i32,

    /// Number of metrics the receiver accepted.
    #[prost(int32, tag = "2")]
    pub succeeded: i32,

    #[prost(string, tag = "3")]
    #[allow(missing_docs)]
    pub message: String,

    /// Rejected metrics, when a detailed response was requested.
    #[prost(message, repeated, tag = "4")]
    pub failed_metrics: Vec<MetricError>,
}

/// A model the receiver rejected, along with the reason.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModelError {
    #[prost(string, tag = "1")]
    #[allow(missing_docs)]
    pub error: String,

    #[prost(message, optional, tag = "2")]
    #[allow(missing_docs)]
    pub model: Option<Model>,
}

/// Outcome of a `PutModels` call.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModelStatusResult {
    /// Number of models the receiver rejected.
    #[prost(int32, tag = "1")]
    pub failed: i32,

    /// Number of models the receiver accepted.
    #[prost(int32, tag = "2")]
    pub succeeded: i32,

    #[prost(string, tag = "3")]
    #[allow(missing_docs)]
    pub message: String,

    /// Rejected models, when a detailed response was requested.
    #[prost(message, repeated, tag = "4")]
    pub failed_models: Vec<ModelError>,
}
