//! Reserved tag and metadata names.

use std::collections::HashMap;

use tracing::debug;

/// Tag key prefix marking a tag as an explicit dimension.
pub const DEFAULT_DIMENSION_TAG_PREFIX: &str = "zdim_";

/// Tag key carrying the display name of the entity.
pub const DEFAULT_DISPLAY_NAME_TAG: &str = "zname";

/// Metadata key the display name is stored under.
pub const NAME_FIELD: &str = "name";

/// Metadata key that is always encoded as a list of strings.
pub const IMPACT_TO_DIMENSIONS_FIELD: &str = "impactToDimensions";

/// Default dimension key identifying the sender.
pub const SOURCE_FIELD: &str = "source";

/// Default metadata key identifying the kind of sender.
pub const SOURCE_TYPE_FIELD: &str = "source-type";

/// Value of [`SOURCE_TYPE_FIELD`] in the default metadata.
pub const SOURCE_TYPE: &str = "telegraf.output.zenoss";

/// Naming convention used to reclassify measurement tags.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NamingConvention {
    dimension_tag_prefix: String,
    display_name_tag: String,
}

impl NamingConvention {
    /// Creates a new `NamingConvention` with the given dimension tag prefix and display name tag.
    pub fn new<P, D>(dimension_tag_prefix: P, display_name_tag: D) -> Self
    where
        P: Into<String>,
        D: Into<String>,
    {
        Self {
            dimension_tag_prefix: dimension_tag_prefix.into(),
            display_name_tag: display_name_tag.into(),
        }
    }

    /// Returns the prefix marking explicit dimension tags.
    pub fn dimension_tag_prefix(&self) -> &str {
        &self.dimension_tag_prefix
    }

    /// Returns the tag key carrying the display name.
    pub fn display_name_tag(&self) -> &str {
        &self.display_name_tag
    }

    /// Returns the dimension name for `tag_key`, if it is an explicit dimension tag.
    ///
    /// A key consisting of only the prefix is not a dimension tag.
    pub fn dimension_name<'a>(&self, tag_key: &'a str) -> Option<&'a str> {
        tag_key
            .strip_prefix(self.dimension_tag_prefix.as_str())
            .filter(|name| !name.is_empty())
    }
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION_TAG_PREFIX, DEFAULT_DISPLAY_NAME_TAG)
    }
}

/// Returns the default dimensions: the sender's source, derived from the hostname.
pub fn default_dimensions() -> HashMap<String, String> {
    let hostname = match hostname::get() {
        Ok(hostname) => hostname.to_string_lossy().to_string(),
        Err(e) => {
            debug!(error = %e, "Failed to query hostname.");
            "unknown".to_string()
        }
    };

    HashMap::from([(SOURCE_FIELD.to_string(), format!("zenoss.telegraf.{}", hostname))])
}

/// Returns the default metadata: the sender's source type.
pub fn default_metadata() -> HashMap<String, String> {
    HashMap::from([(SOURCE_TYPE_FIELD.to_string(), SOURCE_TYPE.to_string())])
}
