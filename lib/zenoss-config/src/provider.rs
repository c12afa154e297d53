use std::path::Path;

use figment::{
    providers::{Data, Format, Json, Yaml},
    value::{Dict, Map},
    Error, Metadata, Profile, Provider,
};

/// A provider whose data has already been read and parsed.
///
/// Files are read once, when the provider is created, so that later extractions never touch the filesystem and the
/// provider can be shared across threads.
pub struct ResolvedProvider {
    data: Map<Profile, Dict>,
    metadata: Metadata,
}

impl ResolvedProvider {
    pub fn from_yaml<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        Self::from_file::<Yaml, _>(path, "YAML file")
    }

    pub fn from_json<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        Self::from_file::<Json, _>(path, "JSON file")
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, Error> {
        let data = Data::<Yaml>::string(contents).data()?;

        Ok(Self {
            data,
            metadata: Metadata::named("YAML string"),
        })
    }

    fn from_file<F, P>(path: P, kind: &'static str) -> Result<Self, Error>
    where
        F: Format,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        let data = Data::<F>::string(&contents).data()?;

        Ok(Self {
            data,
            metadata: Metadata::from(kind, path),
        })
    }
}

impl Provider for ResolvedProvider {
    fn metadata(&self) -> Metadata {
        self.metadata.clone()
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        Ok(self.data.clone())
    }
}
