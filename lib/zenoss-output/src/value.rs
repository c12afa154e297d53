//! Field value coercion.

use snafu::Snafu;

use crate::measurement::FieldValue;

/// Value coercion error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ValueError {
    /// The value is not a numeric kind.
    #[snafu(display("unsupported metric value: [{}] of type [{}]", value, kind))]
    UnsupportedValueType {
        /// Rendered value.
        value: String,

        /// Kind of the value.
        kind: &'static str,
    },
}

/// Coerces a field value into a 64-bit float.
///
/// Signed integers, unsigned integers, and floats are supported. Integers beyond 2^53 lose precision.
///
/// # Errors
///
/// If the value is not numeric, `ValueError::UnsupportedValueType` is returned.
pub fn coerce_to_f64(value: &FieldValue) -> Result<f64, ValueError> {
    match value {
        FieldValue::Int(v) => Ok(*v as f64),
        FieldValue::UInt(v) => Ok(*v as f64),
        FieldValue::Float(v) => Ok(*v),
        other => Err(ValueError::UnsupportedValueType {
            value: other.to_string(),
            kind: other.kind(),
        }),
    }
}
