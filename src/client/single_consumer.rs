//! The `SingleConsumer` façade (spec.md §6): manual offset tracking, no group membership.
//! `consume(topic, start=END)` fetches every partition of the topic and advances the in-memory
//! offset table as records are returned; `start` is honored only on first consumption of a
//! partition or after an `OffsetOutOfRange` error (spec.md S5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;

use crate::cluster::{ClusterState, PartitionResult};
use crate::error::Result;
use crate::offset::OffsetTable;
use crate::protocol::error::Error as BrokerError;
use crate::protocol::messages::fetch::{FetchRequest, FetchRequestPartition, FetchRequestTopic};
use crate::protocol::messages::list_offsets::{
    ListOffsetsRequest, ListOffsetsRequestPartition, ListOffsetsRequestTopic,
};

/// Where to start consuming a partition that has no stored offset yet.
#[derive(Debug, Clone, Copy)]
pub enum StartPosition {
    /// Tail: only records produced from now on.
    End,
    /// Head: the earliest retained record.
    Beginning,
    /// An absolute Unix-epoch-millisecond timestamp, resolved by the broker's `ListOffsets`
    /// handling (clock-skew-sensitive by nature, not a client bug — SPEC_FULL.md §9).
    Timestamp(i64),
    /// A duration before now, converted to an absolute timestamp at call time.
    Relative(Duration),
}

const LATEST_TIMESTAMP: i64 = -1;
const EARLIEST_TIMESTAMP: i64 = -2;
const DEFAULT_MAX_WAIT_MS: i32 = 500;
const DEFAULT_MIN_BYTES: i32 = 1;
const DEFAULT_PARTITION_MAX_BYTES: i32 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
}

impl ConsumedRecord {
    /// Deserializes [`Self::value`] as JSON, the default encoding spec.md §6 assumes.
    pub fn value_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.value)?)
    }
}

#[derive(Debug)]
pub struct SingleConsumer {
    topic: String,
    cluster: Arc<ClusterState>,
    offsets: OffsetTable,
}

impl SingleConsumer {
    pub(crate) fn new(topic: String, cluster: Arc<ClusterState>) -> Self {
        Self { topic, cluster, offsets: OffsetTable::new() }
    }

    pub async fn connect(bootstrap_brokers: Vec<String>, topic: impl Into<String>) -> Result<Self> {
        let client = super::ClientBuilder::new(bootstrap_brokers).build().await?;
        Ok(client.single_consumer(topic))
    }

    /// Fetches whatever is available from every partition of the topic, resolving `start` for
    /// any partition seen for the first time.
    ///
    /// Partitions are scattered across their leaders in parallel via [`ClusterState::dispatch`];
    /// one partition's broker error never discards another's records in the same call, and is
    /// instead returned as an entry in the result map (spec.md §7, S6). `deadline`, when set,
    /// bounds the whole call: partitions still outstanding when it elapses come back marked
    /// [`crate::cluster::PartitionError::TimedOut`].
    pub async fn consume(
        &self,
        start: StartPosition,
        deadline: Option<Duration>,
    ) -> Result<PartitionResult<Vec<ConsumedRecord>>> {
        let partitions = self.cluster.partitions_of(&self.topic).unwrap_or_default();
        let mut out: PartitionResult<Vec<ConsumedRecord>> = HashMap::new();
        if partitions.is_empty() {
            return Ok(out);
        }

        let mut fetch_offsets = Vec::with_capacity(partitions.len());
        for partition in partitions {
            let offset = match self.offsets.get(&self.topic, partition) {
                Some(offset) => offset,
                None => match self.resolve_start(partition, start, deadline).await {
                    Ok(resolved) => {
                        self.offsets.set(&self.topic, partition, resolved);
                        resolved
                    }
                    Err(err) => {
                        out.insert(partition, Err(err.into()));
                        continue;
                    }
                },
            };
            fetch_offsets.push((partition, offset));
        }

        if fetch_offsets.is_empty() {
            return Ok(out);
        }

        let fetched = self.fetch_partitions(&fetch_offsets, deadline).await?;
        for (partition, result) in fetched {
            match result {
                Err(crate::cluster::PartitionError::Broker(BrokerError::OffsetOutOfRange)) => {
                    // spec.md S5: re-apply the start hint, re-resolve via ListOffsets, and retry
                    // once with the corrected offset.
                    match self.resolve_start(partition, start, deadline).await {
                        Ok(resolved) => {
                            self.offsets.set(&self.topic, partition, resolved);
                            let retried = self.fetch_partitions(&[(partition, resolved)], deadline).await?;
                            out.extend(retried);
                        }
                        Err(err) => {
                            out.insert(partition, Err(err.into()));
                        }
                    }
                }
                other => {
                    out.insert(partition, other);
                }
            }
        }

        Ok(out)
    }

    /// Scatters a batch of `(partition, fetch_offset)` pairs across their leaders and gathers the
    /// parsed records back, advancing the local offset table on every successful partition.
    async fn fetch_partitions(
        &self,
        offsets: &[(i32, i64)],
        deadline: Option<Duration>,
    ) -> Result<PartitionResult<Vec<ConsumedRecord>>> {
        let offset_map: HashMap<i32, i64> = offsets.iter().copied().collect();
        let offset_map_for_build = offset_map.clone();
        let partitions: Vec<i32> = offsets.iter().map(|&(p, _)| p).collect();

        let raw = self
            .cluster
            .dispatch(
                &self.topic,
                &partitions,
                deadline,
                move |leader_partitions| FetchRequest {
                    replica_id: -1,
                    max_wait_ms: DEFAULT_MAX_WAIT_MS,
                    min_bytes: DEFAULT_MIN_BYTES,
                    topics: vec![FetchRequestTopic {
                        topic: self.topic.clone(),
                        partitions: leader_partitions
                            .iter()
                            .map(|&p| FetchRequestPartition {
                                partition: p,
                                fetch_offset: offset_map_for_build[&p],
                                partition_max_bytes: DEFAULT_PARTITION_MAX_BYTES,
                            })
                            .collect(),
                    }],
                },
                move |response| {
                    response
                        .responses
                        .into_iter()
                        .find(|t| t.topic == self.topic)
                        .map(|t| {
                            t.partitions
                                .into_iter()
                                .map(|p| (p.partition_index, p.error.map_or(Ok(p.record_set), Err)))
                                .collect::<Vec<_>>()
                        })
                        .unwrap_or_default()
                },
            )
            .await?;

        let mut out = HashMap::with_capacity(raw.len());
        for (partition, result) in raw {
            match result {
                Ok(record_set) => {
                    let base_offset = offset_map.get(&partition).copied().unwrap_or(0);
                    let mut next_offset = base_offset;
                    let records = record_set
                        .0
                        .into_iter()
                        .map(|record| {
                            next_offset = record.offset + 1;
                            ConsumedRecord {
                                topic: self.topic.clone(),
                                partition,
                                offset: record.offset,
                                key: record.message.key,
                                value: record.message.value.unwrap_or_default(),
                            }
                        })
                        .collect::<Vec<_>>();
                    self.offsets.advance(&self.topic, partition, next_offset);
                    out.insert(partition, Ok(records));
                }
                Err(err) => {
                    out.insert(partition, Err(err));
                }
            }
        }
        Ok(out)
    }

    async fn resolve_start(&self, partition: i32, start: StartPosition, deadline: Option<Duration>) -> Result<i64> {
        let timestamp = match start {
            StartPosition::End => LATEST_TIMESTAMP,
            StartPosition::Beginning => EARLIEST_TIMESTAMP,
            StartPosition::Timestamp(ts) => ts,
            StartPosition::Relative(duration) => {
                let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
                now.saturating_sub(duration).as_millis() as i64
            }
        };

        let topic = self.topic.clone();
        let response = self
            .cluster
            .send_to_leader(
                &self.topic,
                partition,
                deadline,
                || ListOffsetsRequest {
                    replica_id: -1,
                    topics: vec![ListOffsetsRequestTopic {
                        name: topic.clone(),
                        partitions: vec![ListOffsetsRequestPartition {
                            partition_index: partition,
                            timestamp,
                            max_num_offsets: 1,
                        }],
                    }],
                },
                |response| {
                    response
                        .topics
                        .iter()
                        .find(|t| t.name == topic)
                        .and_then(|t| t.partitions.iter().find(|p| p.partition_index == partition))
                        .and_then(|p| p.error)
                },
            )
            .await?;

        Ok(response
            .topics
            .into_iter()
            .find(|t| t.name == self.topic)
            .and_then(|t| t.partitions.into_iter().find(|p| p.partition_index == partition))
            .and_then(|p| p.offsets.first().copied())
            .unwrap_or(0))
    }

    /// No connections are owned directly by the façade; `deadline` is accepted for symmetry with
    /// spec.md §6's `close(deadline)` and is currently unused since there is nothing to drain.
    pub async fn close(&self, _deadline: Option<Duration>) -> Result<()> {
        Ok(())
    }
}
