//! An async client for a partitioned, replicated, append-only commit-log messaging system: the
//! wire codec and broker connection layer, cluster metadata/routing, consumer group coordination,
//! and three thin façades (`Producer`, `SingleConsumer`, `GroupedConsumer`) built on top of them.

pub mod backoff;
pub mod build_info;
pub mod client;
pub mod cluster;
pub mod compression;
pub mod connection;
pub mod coordinator_service;
pub mod error;
pub mod group;
pub mod offset;
pub mod protocol;
pub mod topic;

pub use client::{Client, ClientBuilder, GroupedConsumer, Producer, SingleConsumer};
pub use cluster::{PartitionError, PartitionResult};
pub use error::{ClientError, Result};
