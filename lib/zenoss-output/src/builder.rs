//! Translation of measurements into metrics and models.

use std::{
    collections::{HashMap, HashSet},
    time::Instant,
};

use serde::Deserialize;
use tracing::{debug, trace, warn};
use zenoss_protos::{Metric, Model};

use crate::{
    classify::{classify, has_dimension_tag},
    measurement::Measurement,
    metadata::to_struct,
    models::ModelBucket,
    naming::{default_dimensions, default_metadata, NamingConvention},
    value::coerce_to_f64,
};

/// Which metadata is attached to each metric.
///
/// Models always carry the merged metadata.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MetricMetadata {
    /// Only the default metadata.
    #[default]
    Defaults,

    /// The default metadata overlaid with the measurement's own metadata.
    Merged,
}

/// Reason a measurement was dropped before translation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterReason {
    /// The measurement name is on the exclusion list.
    Excluded,

    /// The measurement carries no explicit dimension tag, and those are required.
    MissingDimensions,
}

/// Result of translating a batch of measurements.
#[derive(Debug, Default)]
pub struct Translation {
    /// One metric per numeric field, in measurement order and then field order.
    pub metrics: Vec<Metric>,

    /// Distinct models, in no particular order.
    pub models: Vec<Model>,

    /// Number of measurements dropped by a filter.
    pub filtered_measurements: usize,

    /// Number of fields skipped because their value was not numeric.
    pub skipped_fields: usize,
}

/// Translates measurements into metrics and deduplicated models.
#[derive(Clone, Debug)]
pub struct DataBuilder {
    default_dimensions: HashMap<String, String>,
    default_metadata: HashMap<String, String>,
    naming: NamingConvention,
    excluded_measurements: HashSet<String>,
    require_dimension_tags: bool,
    metric_metadata: MetricMetadata,
}

impl DataBuilder {
    /// Creates a new `DataBuilder` with the given default dimensions and metadata.
    ///
    /// Defaults to the standard naming convention, no excluded measurements, requiring explicit dimension tags, and
    /// attaching only the default metadata to metrics.
    pub fn new(default_dimensions: HashMap<String, String>, default_metadata: HashMap<String, String>) -> Self {
        Self {
            default_dimensions,
            default_metadata,
            naming: NamingConvention::default(),
            excluded_measurements: HashSet::new(),
            require_dimension_tags: true,
            metric_metadata: MetricMetadata::default(),
        }
    }

    /// Sets the naming convention used to classify tags.
    pub fn with_naming(mut self, naming: NamingConvention) -> Self {
        self.naming = naming;
        self
    }

    /// Sets the names of measurements that are always dropped.
    pub fn with_excluded_measurements<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_measurements = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether measurements without any explicit dimension tag are dropped.
    ///
    /// When disabled, all plain tags of such measurements become dimensions instead.
    pub fn with_require_dimension_tags(mut self, require: bool) -> Self {
        self.require_dimension_tags = require;
        self
    }

    /// Sets which metadata is attached to each metric.
    pub fn with_metric_metadata(mut self, metric_metadata: MetricMetadata) -> Self {
        self.metric_metadata = metric_metadata;
        self
    }

    /// Returns the reason `measurement` would be dropped, if any.
    pub fn filter_reason(&self, measurement: &Measurement) -> Option<FilterReason> {
        if self.excluded_measurements.contains(measurement.name()) {
            return Some(FilterReason::Excluded);
        }

        if self.require_dimension_tags && !has_dimension_tag(measurement.tags(), &self.naming) {
            return Some(FilterReason::MissingDimensions);
        }

        None
    }

    /// Translates a batch of measurements.
    ///
    /// Each numeric field of each measurement produces one metric named `<measurement>.<field>`, and contributes one
    /// model, which is deduplicated across the whole batch. Non-numeric fields and filtered measurements are skipped
    /// and logged, never failing the batch.
    pub fn translate<'a, I>(&self, measurements: I) -> Translation
    where
        I: IntoIterator<Item = &'a Measurement>,
    {
        let start = Instant::now();

        let default_metadata = to_struct(&self.default_metadata);
        let mut translation = Translation::default();
        let mut bucket = ModelBucket::new();

        for measurement in measurements {
            match self.filter_reason(measurement) {
                Some(FilterReason::Excluded) => {
                    trace!(measurement = measurement.name(), "Dropping excluded measurement.");
                    translation.filtered_measurements += 1;
                    continue;
                }
                Some(FilterReason::MissingDimensions) => {
                    debug!(
                        measurement = measurement.name(),
                        tags = ?measurement.tags(),
                        "Dropping measurement without dimension tags."
                    );
                    translation.filtered_measurements += 1;
                    continue;
                }
                None => {}
            }

            let classification = classify(measurement.tags(), &self.naming);

            let mut dimensions = self.default_dimensions.clone();
            dimensions.extend(classification.dimensions);

            let mut metadata = self.default_metadata.clone();
            metadata.extend(classification.metadata);
            let metadata = to_struct(&metadata);

            let metric_metadata = match self.metric_metadata {
                MetricMetadata::Defaults => &default_metadata,
                MetricMetadata::Merged => &metadata,
            };

            let timestamp = measurement.timestamp_millis();
            for field in measurement.fields() {
                let value = match coerce_to_f64(&field.value) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(
                            measurement = measurement.name(),
                            field = %field.key,
                            error = %e,
                            "Skipping field with non-numeric value."
                        );
                        translation.skipped_fields += 1;
                        continue;
                    }
                };

                translation.metrics.push(Metric {
                    metric: format!("{}.{}", measurement.name(), field.key),
                    timestamp,
                    dimensions: dimensions.clone(),
                    metadata_fields: Some(metric_metadata.clone()),
                    value,
                });

                bucket.add(Model {
                    timestamp,
                    dimensions: dimensions.clone(),
                    metadata_fields: Some(metadata.clone()),
                });
            }
        }

        translation.models = bucket.models();

        debug!(
            metrics = translation.metrics.len(),
            models = translation.models.len(),
            filtered_measurements = translation.filtered_measurements,
            skipped_fields = translation.skipped_fields,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Translated measurements."
        );

        translation
    }
}

impl Default for DataBuilder {
    fn default() -> Self {
        Self::new(default_dimensions(), default_metadata())
    }
}
