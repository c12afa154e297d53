//! Configuration loading and querying.
//!
//! Configuration is layered from any number of sources (YAML files, JSON files, prefixed environment variables), with
//! sources added later taking precedence. The merged result can be deserialized wholesale into a typed value, or
//! queried key-by-key through [`GenericConfiguration`].
#![deny(warnings)]
#![deny(missing_docs)]

use std::{borrow::Cow, collections::HashSet, path::Path, sync::Arc};

use figment::{
    error::Kind,
    providers::{Env, Serialized},
    Figment, Provider,
};
use serde::Deserialize;
use snafu::Snafu;
use tracing::debug;

mod provider;
use self::provider::ResolvedProvider;

/// A configuration error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ConfigurationError {
    /// Environment variable prefix was empty.
    #[snafu(display("Environment variable prefix must not be empty."))]
    EmptyPrefix,

    /// Requested field was missing from the configuration.
    #[snafu(display("Missing field '{}' in configuration. {}", field, help_text))]
    MissingField {
        /// Text telling the user which keys (or environment variables) would satisfy the lookup.
        help_text: String,

        /// Name of the missing field.
        field: Cow<'static, str>,
    },

    /// Requested field held a value of a different type than the one requested.
    #[snafu(display(
        "Expected value for field '{}' to be '{}', got '{}' instead.",
        field,
        expected_ty,
        actual_ty
    ))]
    InvalidFieldType {
        /// Period-separated path to the field.
        field: String,

        /// Expected data type.
        expected_ty: String,

        /// Actual data type.
        actual_ty: String,
    },

    /// Any other failure while reading or extracting configuration.
    #[snafu(display("Failed to load configuration: {}", source))]
    Generic {
        /// Error source.
        source: figment::Error,
    },
}

impl From<figment::Error> for ConfigurationError {
    fn from(e: figment::Error) -> Self {
        from_figment_error(&HashSet::new(), e)
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
enum LookupSource {
    Environment { prefix: String },
}

impl LookupSource {
    fn transform_key(&self, key: &str) -> String {
        match self {
            // Prefix is stored uppercased with its trailing underscore.
            LookupSource::Environment { prefix } => format!("{}{}", prefix, key.replace('.', "_").to_uppercase()),
        }
    }
}

/// Loads configuration from a layered set of sources.
///
/// # Supported sources
///
/// - YAML file, or YAML text
/// - JSON file
/// - environment variables (must be prefixed; see [`from_environment`][Self::from_environment])
pub struct ConfigurationLoader {
    lookup_sources: HashSet<LookupSource>,
    figment: Figment,
}

impl Default for ConfigurationLoader {
    fn default() -> Self {
        Self {
            lookup_sources: HashSet::new(),
            figment: Figment::new(),
        }
    }
}

impl ConfigurationLoader {
    fn push<P>(mut self, provider: P) -> Self
    where
        P: Provider,
    {
        self.figment = self.figment.admerge(provider);
        self
    }

    /// Loads the given YAML configuration file.
    ///
    /// # Errors
    ///
    /// If the file could not be read, or if the file is not valid YAML, an error will be returned.
    pub fn from_yaml<P>(self, path: P) -> Result<Self, ConfigurationError>
    where
        P: AsRef<Path>,
    {
        let provider = ResolvedProvider::from_yaml(path)?;
        Ok(self.push(provider))
    }

    /// Attempts to load the given YAML configuration file, ignoring any errors.
    pub fn try_from_yaml<P>(self, path: P) -> Self
    where
        P: AsRef<Path>,
    {
        match ResolvedProvider::from_yaml(&path) {
            Ok(provider) => self.push(provider),
            Err(e) => {
                debug!(error = %e, file_path = %path.as_ref().display(), "Unable to read YAML configuration file. Ignoring.");
                self
            }
        }
    }

    /// Loads configuration from YAML text.
    ///
    /// # Errors
    ///
    /// If the text is not valid YAML, an error will be returned.
    pub fn from_yaml_str(self, contents: &str) -> Result<Self, ConfigurationError> {
        let provider = ResolvedProvider::from_yaml_str(contents)?;
        Ok(self.push(provider))
    }

    /// Loads the given JSON configuration file.
    ///
    /// # Errors
    ///
    /// If the file could not be read, or if the file is not valid JSON, an error will be returned.
    pub fn from_json<P>(self, path: P) -> Result<Self, ConfigurationError>
    where
        P: AsRef<Path>,
    {
        let provider = ResolvedProvider::from_json(path)?;
        Ok(self.push(provider))
    }

    /// Loads configuration from environment variables.
    ///
    /// An underscore is appended to the prefix if it does not already end with one, so a prefix of `zenoss` matches
    /// every variable starting with `ZENOSS_`. Matching is case-insensitive, and the prefix is stripped from the
    /// resulting keys.
    ///
    /// # Errors
    ///
    /// If the prefix is empty, or the environment cannot be read, an error will be returned.
    pub fn from_environment(mut self, prefix: &'static str) -> Result<Self, ConfigurationError> {
        if prefix.is_empty() {
            return Err(ConfigurationError::EmptyPrefix);
        }

        let prefix = if prefix.ends_with('_') {
            prefix.to_uppercase()
        } else {
            format!("{}_", prefix.to_uppercase())
        };

        // `Env` is not `Send`/`Sync` so the variables are snapshotted into a serialized provider instead.
        let values = Env::prefixed(&prefix).data()?;
        if let Some(default_dict) = values.get(&figment::Profile::Default) {
            self.lookup_sources.insert(LookupSource::Environment { prefix });
            self = self.push(Serialized::defaults(default_dict.clone()));
        }

        Ok(self)
    }

    /// Consumes the loader, deserializing the merged configuration as `T`.
    ///
    /// # Errors
    ///
    /// If the configuration could not be deserialized into `T`, an error will be returned.
    pub fn into_typed<'a, T>(self) -> Result<T, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        self.figment
            .extract()
            .map_err(|e| from_figment_error(&self.lookup_sources, e))
    }

    /// Consumes the loader and wraps the merged configuration in a [`GenericConfiguration`].
    pub fn into_generic(self) -> GenericConfiguration {
        GenericConfiguration {
            inner: Arc::new(Inner {
                figment: self.figment,
                lookup_sources: self.lookup_sources,
            }),
        }
    }
}

#[derive(Debug)]
struct Inner {
    figment: Figment,
    lookup_sources: HashSet<LookupSource>,
}

/// A merged, queryable configuration.
///
/// Keys take the form `a.b.c`, where each period denotes a nested lookup. Keys that are only present in the
/// environment, where nesting is flattened with underscores, are found as well: `a.b.c` falls back to `a_b_c`.
#[derive(Clone, Debug)]
pub struct GenericConfiguration {
    inner: Arc<Inner>,
}

impl GenericConfiguration {
    fn get<'a, T>(&self, key: &str) -> Result<T, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        let figment = &self.inner.figment;
        match figment.extract_inner(key) {
            Ok(value) => Ok(value),
            Err(e) if matches!(e.kind, Kind::MissingField(_)) && key.contains('.') => figment
                .extract_inner(&key.replace('.', "_"))
                .map_err(|e| from_figment_error(&self.inner.lookup_sources, e)),
            Err(e) => Err(from_figment_error(&self.inner.lookup_sources, e)),
        }
    }

    /// Gets a configuration value by key.
    ///
    /// # Errors
    ///
    /// If the key does not exist, or the value could not be deserialized into `T`, an error will be returned.
    pub fn get_typed<'a, T>(&self, key: &str) -> Result<T, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        self.get(key)
    }

    /// Gets a configuration value by key, falling back to `T::default()` on any error.
    pub fn get_typed_or_default<'a, T>(&self, key: &str) -> T
    where
        T: Default + Deserialize<'a>,
    {
        self.get(key).unwrap_or_default()
    }

    /// Gets a configuration value by key, if it exists.
    ///
    /// # Errors
    ///
    /// If the key exists but the value could not be deserialized into `T`, an error will be returned.
    pub fn try_get_typed<'a, T>(&self, key: &str) -> Result<Option<T>, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        match self.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(ConfigurationError::MissingField { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Deserializes the entire configuration as `T`.
    ///
    /// # Errors
    ///
    /// If the configuration could not be deserialized into `T`, an error will be returned.
    pub fn as_typed<'a, T>(&self) -> Result<T, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        self.inner
            .figment
            .extract()
            .map_err(|e| from_figment_error(&self.inner.lookup_sources, e))
    }
}

fn from_figment_error(lookup_sources: &HashSet<LookupSource>, e: figment::Error) -> ConfigurationError {
    match e.kind {
        Kind::MissingField(field) => {
            let mut valid_keys = lookup_sources
                .iter()
                .map(|source| source.transform_key(&field))
                .collect::<Vec<_>>();
            valid_keys.insert(0, field.to_string());

            let help_text = format!("Try setting `{}`.", valid_keys.join("` or `"));

            ConfigurationError::MissingField { help_text, field }
        }
        Kind::InvalidType(actual_ty, expected_ty) => ConfigurationError::InvalidFieldType {
            field: e.path.join("."),
            expected_ty,
            actual_ty: actual_ty.to_string(),
        },
        _ => ConfigurationError::Generic { source: e },
    }
}
