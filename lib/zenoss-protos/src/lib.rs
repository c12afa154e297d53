//! Protocol Buffers definitions for the Zenoss Cloud data receiver service.
//!
//! The message and client definitions here mirror `zenoss/cloud/data_receiver.proto`, limited to the subset needed for
//! shipping metrics and models. They are written out by hand rather than generated at build time, which keeps `protoc`
//! out of the build for what is a handful of small messages.
#![deny(warnings)]
#![deny(missing_docs)]

mod client;
mod data_receiver;

pub use prost_types::{value::Kind, ListValue, Struct, Value};

pub use self::client::DataReceiverServiceClient;
pub use self::data_receiver::*;

/// Fully-qualified name of the data receiver gRPC service.
pub const DATA_RECEIVER_SERVICE_NAME: &str = "zenoss.cloud.DataReceiverService";
