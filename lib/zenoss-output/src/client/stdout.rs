use std::{
    io::{self, Write},
    sync::Mutex,
};

use async_trait::async_trait;
use serde_json::{json, Map, Value as JsonValue};
use tonic::{Request, Status};
use zenoss_protos::{Kind, Metric, Metrics, Model, ModelStatusResult, Models, StatusResult, Struct, Value};

use super::DataReceiverClient;

const STATUS_MESSAGE: &str = "all good";

/// A client that writes every request to a local writer as JSON, instead of sending it.
///
/// Each call writes one indented JSON document, using the camel-cased field names of the wire messages, and then
/// reports every item as having succeeded.
pub struct StdoutClient<W = io::Stdout> {
    writer: Mutex<W>,
}

impl StdoutClient {
    /// Creates a new `StdoutClient` writing to standard output.
    pub fn new() -> Self {
        Self::from_writer(io::stdout())
    }
}

impl<W> StdoutClient<W> {
    /// Creates a new `StdoutClient` writing to the given writer.
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the client, returning the underlying writer.
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write> StdoutClient<W> {
    fn write_document(&self, document: &JsonValue) -> Result<(), Status> {
        let rendered = serde_json::to_string_pretty(document)
            .map_err(|e| Status::internal(format!("failed to render request: {}", e)))?;

        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        writeln!(writer, "{}", rendered)
            .and_then(|()| writer.flush())
            .map_err(|e| Status::internal(format!("failed to write request: {}", e)))
    }
}

#[async_trait]
impl<W: Write + Send> DataReceiverClient for StdoutClient<W> {
    async fn put_metrics(&self, request: Request<Metrics>) -> Result<StatusResult, Status> {
        let metrics = request.into_inner();
        self.write_document(&render_metrics(&metrics))?;

        Ok(StatusResult {
            succeeded: metrics.metrics.len() as i32,
            message: STATUS_MESSAGE.to_string(),
            ..Default::default()
        })
    }

    async fn put_models(&self, request: Request<Models>) -> Result<ModelStatusResult, Status> {
        let models = request.into_inner();
        self.write_document(&render_models(&models))?;

        Ok(ModelStatusResult {
            succeeded: models.models.len() as i32,
            message: STATUS_MESSAGE.to_string(),
            ..Default::default()
        })
    }
}

fn render_metrics(metrics: &Metrics) -> JsonValue {
    json!({
        "detailedResponse": metrics.detailed_response,
        "metrics": metrics.metrics.iter().map(render_metric).collect::<Vec<_>>(),
    })
}

fn render_metric(metric: &Metric) -> JsonValue {
    json!({
        "metric": metric.metric,
        "timestamp": metric.timestamp.to_string(),
        "dimensions": metric.dimensions,
        "metadataFields": metric.metadata_fields.as_ref().map(render_struct),
        "value": metric.value,
    })
}

fn render_models(models: &Models) -> JsonValue {
    json!({
        "detailedResponse": models.detailed_response,
        "models": models.models.iter().map(render_model).collect::<Vec<_>>(),
    })
}

fn render_model(model: &Model) -> JsonValue {
    json!({
        "timestamp": model.timestamp.to_string(),
        "dimensions": model.dimensions,
        "metadataFields": model.metadata_fields.as_ref().map(render_struct),
    })
}

fn render_struct(s: &Struct) -> JsonValue {
    let fields = s
        .fields
        .iter()
        .map(|(key, value)| (key.clone(), render_value(value)))
        .collect::<Map<_, _>>();
    JsonValue::Object(fields)
}

fn render_value(value: &Value) -> JsonValue {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => JsonValue::Null,
        Some(Kind::NumberValue(n)) => json!(n),
        Some(Kind::StringValue(s)) => JsonValue::String(s.clone()),
        Some(Kind::BoolValue(b)) => JsonValue::Bool(*b),
        Some(Kind::StructValue(s)) => render_struct(s),
        Some(Kind::ListValue(list)) => JsonValue::Array(list.values.iter().map(render_value).collect()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::metadata::to_struct;

    fn metric(name: &str) -> Metric {
        Metric {
            metric: name.to_string(),
            timestamp: 1_700_000_000_000,
            dimensions: HashMap::from([("host".to_string(), "h1".to_string())]),
            metadata_fields: Some(to_struct(&HashMap::from([(
                "impactToDimensions".to_string(),
                "vm=vm-1".to_string(),
            )]))),
            value: 1.5,
        }
    }

    #[tokio::test]
    async fn metrics_are_written_and_acknowledged() {
        let client = StdoutClient::from_writer(Vec::new());
        let request = Request::new(Metrics {
            detailed_response: true,
            metrics: vec![metric("cpu.usage"), metric("cpu.idle")],
        });

        let status = client.put_metrics(request).await.unwrap();
        assert_eq!(status.succeeded, 2);
        assert_eq!(status.failed, 0);
        assert_eq!(status.message, "all good");

        let output = String::from_utf8(client.into_inner()).unwrap();
        let document: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(document["detailedResponse"], json!(true));
        assert_eq!(document["metrics"][0]["metric"], json!("cpu.usage"));
        assert_eq!(document["metrics"][1]["timestamp"], json!("1700000000000"));
        assert_eq!(document["metrics"][0]["dimensions"]["host"], json!("h1"));
        assert_eq!(
            document["metrics"][0]["metadataFields"]["impactToDimensions"],
            json!(["vm=vm-1"])
        );
    }

    #[tokio::test]
    async fn models_are_written_and_acknowledged() {
        let client = StdoutClient::from_writer(Vec::new());
        let request = Request::new(Models {
            detailed_response: true,
            models: vec![Model {
                timestamp: 1000,
                dimensions: HashMap::new(),
                metadata_fields: None,
            }],
        });

        let status = client.put_models(request).await.unwrap();
        assert_eq!(status.succeeded, 1);

        let output = String::from_utf8(client.into_inner()).unwrap();
        let document: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(document["models"][0]["metadataFields"], JsonValue::Null);
    }

    #[tokio::test]
    async fn empty_batch() {
        let client = StdoutClient::from_writer(Vec::new());
        let status = client
            .put_metrics(Request::new(Metrics {
                detailed_response: true,
                metrics: Vec::new(),
            }))
            .await
            .unwrap();
        assert_eq!(status.succeeded, 0);
    }
}
