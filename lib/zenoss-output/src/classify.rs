//! Dimension/metadata classification of measurement tags.

use std::collections::HashMap;

use crate::naming::{NamingConvention, NAME_FIELD};

/// Tags of a measurement, split into identity-defining dimensions and descriptive metadata.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Classification {
    /// Dimensions identifying the entity.
    pub dimensions: HashMap<String, String>,

    /// Metadata describing the entity.
    pub metadata: HashMap<String, String>,
}

/// Returns `true` if any tag is an explicit dimension tag under the given naming convention.
pub fn has_dimension_tag(tags: &HashMap<String, String>, naming: &NamingConvention) -> bool {
    tags.keys().any(|key| naming.dimension_name(key).is_some())
}

/// Splits a tag set into dimensions and metadata.
///
/// Explicit dimension tags have their prefix stripped and become dimensions, and the display name tag is stored as
/// metadata under [`NAME_FIELD`]. What happens to the remaining tags depends on whether any explicit dimensions were
/// found: if so, they all become metadata; otherwise, they all become dimensions.
pub fn classify(tags: &HashMap<String, String>, naming: &NamingConvention) -> Classification {
    let mut dimensions = HashMap::new();
    let mut metadata = HashMap::new();
    let mut plain = HashMap::new();

    for (key, value) in tags {
        if let Some(name) = naming.dimension_name(key) {
            dimensions.insert(name.to_string(), value.clone());
        } else if key == naming.display_name_tag() {
            metadata.insert(NAME_FIELD.to_string(), value.clone());
        } else {
            plain.insert(key.clone(), value.clone());
        }
    }

    if dimensions.is_empty() {
        dimensions = plain;
    } else {
        // A plain tag named like the name field replaces the display name.
        metadata.extend(plain);
    }

    Classification { dimensions, metadata }
}
