//! Input measurements.

use std::{collections::HashMap, fmt};

use chrono::{DateTime, TimeZone as _, Utc};
use indexmap::IndexMap;
use serde::Deserialize;
use snafu::{OptionExt as _, ResultExt as _, Snafu};

/// A field value, as produced by the upstream collector.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    /// Signed integer.
    Int(i64),

    /// Unsigned integer.
    UInt(u64),

    /// Floating-point number.
    Float(f64),

    /// Boolean.
    Bool(bool),

    /// String.
    String(String),

    /// Opaque binary data.
    #[serde(skip_deserializing)]
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// Returns the name of the value's kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int64",
            Self::UInt(_) => "uint64",
            Self::Float(_) => "float64",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::UInt(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// A single named field of a measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// Field key.
    pub key: String,

    /// Field value.
    pub value: FieldValue,
}

/// A named, timestamped, tagged record carrying one or more fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    name: String,
    timestamp: DateTime<Utc>,
    tags: HashMap<String, String>,
    fields: Vec<Field>,
}

impl Measurement {
    /// Creates a new `Measurement` with no tags or fields.
    pub fn new<N>(name: N, timestamp: DateTime<Utc>) -> Self
    where
        N: Into<String>,
    {
        Self {
            name: name.into(),
            timestamp,
            tags: HashMap::new(),
            fields: Vec::new(),
        }
    }

    /// Sets a tag, replacing any existing value for the same key.
    pub fn with_tag<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Appends a field.
    ///
    /// Fields keep their insertion order.
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.push(Field {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Returns the measurement name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the measurement timestamp as milliseconds since the Unix epoch.
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// Returns the measurement tags.
    pub fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }

    /// Returns the measurement fields, in order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns `true` if any tag key starts with `prefix`.
    pub fn has_tag_prefix(&self, prefix: &str) -> bool {
        self.tags.keys().any(|key| key.starts_with(prefix))
    }

    /// Parses a single measurement from its JSON representation.
    ///
    /// The layout is `{"name": "...", "timestamp": <integer>, "tags": {...}, "fields": {...}}`, where the timestamp is
    /// interpreted in the given precision. Field order follows the order of the keys in the `fields` object.
    ///
    /// # Errors
    ///
    /// If the input is not a valid measurement, or the timestamp is out of range, an error is returned.
    pub fn from_json(input: &str, precision: TimestampPrecision) -> Result<Self, MeasurementParseError> {
        let raw: RawMeasurement = serde_json::from_str(input).context(InvalidJson)?;
        let timestamp = precision
            .to_datetime(raw.timestamp)
            .context(TimestampOutOfRange { timestamp: raw.timestamp })?;

        Ok(Self {
            name: raw.name,
            timestamp,
            tags: raw.tags,
            fields: raw
                .fields
                .into_iter()
                .map(|(key, value)| Field { key, value })
                .collect(),
        })
    }
}

/// Measurement parsing error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum MeasurementParseError {
    /// The input was not a valid JSON measurement.
    #[snafu(display("invalid measurement: {}", source))]
    InvalidJson {
        /// Error source.
        source: serde_json::Error,
    },

    /// The timestamp could not be represented.
    #[snafu(display("timestamp {} is out of range", timestamp))]
    TimestampOutOfRange {
        /// Raw timestamp value.
        timestamp: i64,
    },
}

#[derive(Deserialize)]
struct RawMeasurement {
    name: String,
    timestamp: i64,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    fields: IndexMap<String, FieldValue>,
}

/// Precision of integer timestamps in serialized measurements.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
pub enum TimestampPrecision {
    /// Seconds.
    #[default]
    #[serde(rename = "s")]
    Seconds,

    /// Milliseconds.
    #[serde(rename = "ms")]
    Milliseconds,

    /// Microseconds.
    #[serde(rename = "us")]
    Microseconds,

    /// Nanoseconds.
    #[serde(rename = "ns")]
    Nanoseconds,
}

impl TimestampPrecision {
    /// Converts a raw timestamp in this precision to a UTC datetime.
    ///
    /// Returns `None` if the timestamp cannot be represented.
    pub fn to_datetime(self, timestamp: i64) -> Option<DateTime<Utc>> {
        match self {
            Self::Seconds => Utc.timestamp_opt(timestamp, 0).single(),
            Self::Milliseconds => Utc.timestamp_millis_opt(timestamp).single(),
            Self::Microseconds => DateTime::from_timestamp_micros(timestamp),
            Self::Nanoseconds => Some(Utc.timestamp_nanos(timestamp)),
        }
    }
}
