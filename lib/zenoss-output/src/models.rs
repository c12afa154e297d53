//! Content-addressed deduplication of models.

use std::{collections::HashMap, hash::Hasher as _};

use fnv::FnvHasher;
use zenoss_protos::Model;

/// Computes the identity hash of a model.
///
/// The hash covers the timestamp and every dimension pair, visited in ascending key order, so it does not depend on
/// the iteration order of `dimensions`. Strings are length-prefixed so that distinct pairs can never produce the same
/// byte stream.
pub fn identity_hash(timestamp: i64, dimensions: &HashMap<String, String>) -> u64 {
    let mut sorted = dimensions.iter().collect::<Vec<_>>();
    sorted.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut hasher = FnvHasher::default();
    hasher.write(&timestamp.to_le_bytes());
    for (key, value) in sorted {
        write_str(&mut hasher, key);
        write_str(&mut hasher, value);
    }
    hasher.finish()
}

fn write_str(hasher: &mut FnvHasher, s: &str) {
    hasher.write(&(s.len() as u64).to_le_bytes());
    hasher.write(s.as_bytes());
}

/// A set of models keyed by identity.
///
/// Adding a model with the same identity as one already held replaces it.
#[derive(Debug, Default)]
pub struct ModelBucket {
    models: HashMap<u64, Model>,
}

impl ModelBucket {
    /// Creates an empty `ModelBucket`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a model, replacing any model with the same identity.
    pub fn add(&mut self, model: Model) {
        let hash = identity_hash(model.timestamp, &model.dimensions);
        self.models.insert(hash, model);
    }

    /// Returns the number of distinct models held.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if no models are held.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Consumes the bucket, returning the distinct models held, in no particular order.
    pub fn models(self) -> Vec<Model> {
        self.models.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use proptest::{collection::vec as arb_vec, prelude::*};

    use super::*;

    fn model(timestamp: i64, pairs: &[(&str, &str)]) -> Model {
        Model {
            timestamp,
            dimensions: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            metadata_fields: None,
        }
    }

    #[test]
    fn identical_models_collapse() {
        let mut bucket = ModelBucket::new();
        bucket.add(model(1000, &[("host", "h1"), ("device", "sda")]));
        bucket.add(model(1000, &[("device", "sda"), ("host", "h1")]));
        assert_eq!(bucket.len(), 1);
    }

    #[test]
    fn distinct_identities_are_kept() {
        let mut bucket = ModelBucket::new();
        bucket.add(model(1000, &[("host", "h1")]));
        bucket.add(model(2000, &[("host", "h1")]));
        bucket.add(model(1000, &[("host", "h2")]));
        bucket.add(model(1000, &[("host", "h1"), ("device", "sda")]));
        bucket.add(model(1000, &[]));
        assert_eq!(bucket.len(), 5);
    }

    #[test]
    fn pair_boundaries_are_unambiguous() {
        let a = HashMap::from([("ab".to_string(), "c".to_string())]);
        let b = HashMap::from([("a".to_string(), "bc".to_string())]);
        assert_ne!(identity_hash(0, &a), identity_hash(0, &b));
    }

    #[test]
    fn metadata_does_not_affect_identity() {
        let mut bucket = ModelBucket::new();
        bucket.add(model(1000, &[("host", "h1")]));

        let mut last = model(1000, &[("host", "h1")]);
        last.metadata_fields = Some(crate::metadata::to_struct(&HashMap::from([(
            "name".to_string(),
            "last".to_string(),
        )])));
        bucket.add(last.clone());

        assert_eq!(bucket.models(), vec![last]);
    }

    #[test]
    fn stable_across_calls() {
        let dimensions = HashMap::from([
            ("vcenter".to_string(), "vc1".to_string()),
            ("dcname".to_string(), "dc1".to_string()),
        ]);
        assert_eq!(identity_hash(42, &dimensions), identity_hash(42, &dimensions.clone()));
    }

    proptest! {
        #[test]
        fn property_test_insertion_order_is_irrelevant(
            pairs in arb_vec(("[a-d]{1,2}", "[a-d]{0,2}"), 0..8),
            timestamp in any::<i64>(),
        ) {
            // Build the same dimension set twice, inserting the pairs in opposite orders into maps of different
            // capacities, and make sure both produce the same identity and collapse into a single model.
            let forward = pairs.into_iter().collect::<HashMap<String, String>>();
            let mut entries = forward.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Vec<_>>();
            entries.reverse();
            let mut reverse = HashMap::with_capacity(64);
            reverse.extend(entries);

            prop_assert_eq!(&forward, &reverse);
            prop_assert_eq!(identity_hash(timestamp, &forward), identity_hash(timestamp, &reverse));

            let mut bucket = ModelBucket::new();
            bucket.add(Model { timestamp, dimensions: forward, metadata_fields: None });
            bucket.add(Model { timestamp, dimensions: reverse, metadata_fields: None });
            prop_assert_eq!(bucket.len(), 1);
        }
    }
}
