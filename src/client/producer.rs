//! The `Producer` façade (spec.md §6): `produce(topic, value, key?) -> ack`, default JSON value
//! encoding, `close()`. Partition selection is a hash of the key when one is given, round-robin
//! otherwise — the engine itself (cluster routing, retry/backoff) does the rest.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::cluster::ClusterState;
use crate::compression::Compression;
use crate::error::{ClientError, Result};
use crate::protocol::messages::produce::{
    ProducePartitionRequest, ProduceRequest, ProduceTopicRequest,
};
use crate::protocol::record::{MAGIC_BYTE, Message, Record, RecordSet};

/// The outcome of a successful [`Producer::produce`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceAck {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// `-1`: wait for the full in-sync replica set to acknowledge, the most durable classic setting.
const ACKS_ALL_ISR: i16 = -1;
const PRODUCE_TIMEOUT_MS: i32 = 30_000;

#[derive(Debug)]
pub struct Producer {
    cluster: Arc<ClusterState>,
    round_robin: AtomicUsize,
}

impl Producer {
    pub(crate) fn new(cluster: Arc<ClusterState>) -> Self {
        Self { cluster, round_robin: AtomicUsize::new(0) }
    }

    /// Connects a standalone producer to `bootstrap_brokers` without going through [`crate::client::Client`].
    pub async fn connect(bootstrap_brokers: Vec<String>) -> Result<Self> {
        let client = super::ClientBuilder::new(bootstrap_brokers).build().await?;
        Ok(client.producer())
    }

    /// Serializes `value` as JSON and produces it to `topic`, routing to `key`'s partition (or
    /// the next round-robin partition when no key is given). `deadline`, when set, bounds the
    /// whole call (spec.md §5): once it elapses the in-flight attempt is abandoned and a
    /// [`crate::cluster::Error::TimedOut`] is returned instead of retrying further.
    pub async fn produce(
        &self,
        topic: &str,
        value: &impl Serialize,
        key: Option<&[u8]>,
        deadline: Option<Duration>,
    ) -> Result<ProduceAck> {
        let payload = serde_json::to_vec(value)?;
        self.produce_bytes(topic, &payload, key, deadline).await
    }

    /// The same operation without JSON encoding, for callers that already have a wire-ready
    /// payload.
    pub async fn produce_bytes(
        &self,
        topic: &str,
        value: &[u8],
        key: Option<&[u8]>,
        deadline: Option<Duration>,
    ) -> Result<ProduceAck> {
        let partitions = self.cluster.partitions_of(topic).ok_or_else(|| {
            ClientError::Configuration(format!("unknown topic '{topic}'"))
        })?;
        if partitions.is_empty() {
            return Err(ClientError::Configuration(format!("topic '{topic}' has no partitions")));
        }
        let partition = self.choose_partition(key, &partitions);

        let record_set = RecordSet(vec![Record {
            offset: 0,
            message: Message {
                magic: MAGIC_BYTE,
                compression: Compression::None,
                key: key.map(|k| k.to_vec()),
                value: Some(value.to_vec()),
            },
        }]);

        let topic_owned = topic.to_string();
        let response = self
            .cluster
            .send_to_leader(
                topic,
                partition,
                deadline,
                || ProduceRequest {
                    acks: ACKS_ALL_ISR,
                    timeout_ms: PRODUCE_TIMEOUT_MS,
                    topics: vec![ProduceTopicRequest {
                        name: topic_owned.clone(),
                        partitions: vec![ProducePartitionRequest {
                            partition_index: partition,
                            record_set: record_set.clone(),
                        }],
                    }],
                },
                |response| {
                    response
                        .topics
                        .iter()
                        .find(|t| t.name == topic_owned)
                        .and_then(|t| t.partitions.iter().find(|p| p.partition_index == partition))
                        .and_then(|p| p.error)
                },
            )
            .await?;

        let partition_response = response
            .topics
            .into_iter()
            .find(|t| t.name == topic)
            .and_then(|t| t.partitions.into_iter().find(|p| p.partition_index == partition))
            .ok_or_else(|| ClientError::Configuration(format!("broker returned no result for {topic}-{partition}")))?;

        Ok(ProduceAck { topic: topic.to_string(), partition, offset: partition_response.base_offset })
    }

    fn choose_partition(&self, key: Option<&[u8]>, partitions: &[i32]) -> i32 {
        let index = match key {
            Some(k) => crc32fast::hash(k) as usize % partitions.len(),
            None => self.round_robin.fetch_add(1, Ordering::Relaxed) % partitions.len(),
        };
        partitions[index]
    }

    /// No connections are owned directly by the façade, so there is nothing to flush; `deadline`
    /// is accepted for symmetry with spec.md §6's `Producer` interface.
    pub async fn close(&self, _deadline: Option<Duration>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_partition_choice_is_deterministic() {
        let partitions = [0, 1, 2, 3];
        let a = crc32fast::hash(b"user-42") as usize % partitions.len();
        let b = crc32fast::hash(b"user-42") as usize % partitions.len();
        assert_eq!(a, b);
    }
}
