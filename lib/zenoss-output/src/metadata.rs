//! Encoding of metadata maps into the wire `Struct` representation.

use std::collections::{BTreeMap, HashMap};

use zenoss_protos::{Kind, ListValue, Struct, Value};

use crate::naming::IMPACT_TO_DIMENSIONS_FIELD;

/// Converts a metadata map into a `Struct`.
///
/// Every value is encoded as a string, except for [`IMPACT_TO_DIMENSIONS_FIELD`], which is encoded as a single-element
/// list of strings.
pub fn to_struct(metadata: &HashMap<String, String>) -> Struct {
    let fields = metadata
        .iter()
        .map(|(key, value)| {
            let value = if key == IMPACT_TO_DIMENSIONS_FIELD {
                string_list_value(std::slice::from_ref(value))
            } else {
                string_value(value)
            };
            (key.clone(), value)
        })
        .collect::<BTreeMap<_, _>>();

    Struct { fields }
}

fn string_value(s: &str) -> Value {
    Value {
        kind: Some(Kind::StringValue(s.to_string())),
    }
}

fn string_list_value(values: &[String]) -> Value {
    Value {
        kind: Some(Kind::ListValue(ListValue {
            values: values.iter().map(|s| string_value(s)).collect(),
        })),
    }
}
