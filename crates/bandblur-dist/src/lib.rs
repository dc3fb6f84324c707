#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// in-process local cluster of workers.
pub mod cluster;

/// point-to-point messaging between ranks.
pub mod comm;

/// configuration of a distributed run.
pub mod config;

/// Error types for the distribution module.
pub mod error;

/// row partitioning of the image across workers.
pub mod partition;

/// one rank of a distributed convolution.
pub mod worker;

pub use crate::cluster::LocalCluster;
pub use crate::comm::{Communicator, LocalCommunicator};
pub use crate::config::ClusterConfig;
pub use crate::error::DistError;
pub use crate::worker::Worker;
