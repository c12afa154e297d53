//! Translation and delivery of telemetry measurements to Zenoss.
//!
//! Measurements are translated into metrics, one per numeric field, and deduplicated models describing the entities
//! they belong to. Both are then sent concurrently to the Zenoss data receiver service, or written to standard output.
#![deny(warnings)]
#![deny(missing_docs)]

pub mod builder;
mod classify;
pub mod client;
pub mod config;
pub mod delivery;
pub mod measurement;
mod metadata;
mod models;
pub mod naming;
mod output;
mod value;

pub use self::classify::{classify, has_dimension_tag, Classification};
pub use self::metadata::to_struct;
pub use self::models::{identity_hash, ModelBucket};
pub use self::output::{OutputError, ZenossOutput};
pub use self::value::{coerce_to_f64, ValueError};
