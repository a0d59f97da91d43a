//! The `GroupedConsumer` façade (spec.md §6): a [`SingleConsumer`]-shaped `consume()` restricted
//! to this member's assignment, backed by [`GroupCoordinatorClient`] for membership and by remote
//! `OffsetCommit`/`OffsetFetch` instead of an in-memory table. Delivery is at-most-once across a
//! rebalance: a commit lost mid-flight can cause a duplicate on the next generation, never a gap.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cluster::{ClusterState, PartitionResult};
use crate::connection::BrokerConnector;
use crate::coordinator_service::{CoordinatorService, TcpCoordinatorService};
use crate::error::Result;
use crate::group::{Allocator, GroupCoordinatorClient};
use crate::offset;

use super::single_consumer::{ConsumedRecord, StartPosition};

const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_WAIT_MS: i32 = 500;
const DEFAULT_MIN_BYTES: i32 = 1;
const DEFAULT_PARTITION_MAX_BYTES: i32 = 1024 * 1024;

#[derive(Debug)]
pub struct GroupedConsumer {
    group_name: String,
    topics: Vec<String>,
    connector: Arc<BrokerConnector>,
    cluster: Arc<ClusterState>,
    group: Arc<GroupCoordinatorClient>,
    autocommit: bool,
    coordinator_service: Option<Arc<dyn CoordinatorService>>,
    heartbeat_task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl GroupedConsumer {
    pub(crate) fn new(
        group_name: String,
        topics: Vec<String>,
        autocommit: bool,
        connector: Arc<BrokerConnector>,
        cluster: Arc<ClusterState>,
    ) -> Self {
        let group = Arc::new(GroupCoordinatorClient::new(
            group_name.clone(),
            topics.clone(),
            Arc::clone(&connector),
            Arc::clone(&cluster),
            DEFAULT_SESSION_TIMEOUT,
            crate::group::allocator::round_robin as Allocator,
        ));
        Self {
            group_name,
            topics,
            connector,
            cluster,
            group,
            autocommit,
            coordinator_service: None,
            heartbeat_task: tokio::sync::Mutex::new(None),
        }
    }

    /// Registers this member under an external coordination service (spec.md §6's
    /// `coordinator_hosts`), used to publish membership as an ephemeral znode-like path so other
    /// systems can watch group liveness. Purely observational: correctness of the group's own
    /// rebalance cycle never depends on it (SPEC_FULL.md's resolution of the open question on
    /// coordinator-service hard-dependence).
    pub fn with_coordinator_hosts(mut self, hosts: Vec<String>) -> Self {
        if let Some(addr) = hosts.into_iter().next() {
            self.coordinator_service = Some(Arc::new(TcpCoordinatorService::new(addr)));
        }
        self
    }

    /// Overrides the default round-robin allocator. Must be called before [`Self::connect`].
    pub fn with_allocator(mut self, allocator: Allocator) -> Self {
        self.group = Arc::new(GroupCoordinatorClient::new(
            self.group_name.clone(),
            self.topics.clone(),
            Arc::clone(&self.connector),
            Arc::clone(&self.cluster),
            DEFAULT_SESSION_TIMEOUT,
            allocator,
        ));
        self
    }

    /// Joins the group and starts the background heartbeat loop.
    pub async fn connect(&self) -> Result<()> {
        self.group.join().await?;
        let group = Arc::clone(&self.group);
        let handle = tokio::spawn(async move { group.run_heartbeat_loop().await });
        *self.heartbeat_task.lock().await = Some(handle);

        if let Some(service) = &self.coordinator_service {
            let member_id = self.group.member_id().await;
            let path = format!("/groups/{}/members/{member_id}", self.group_name);
            if let Err(err) = service.create_ephemeral(&path, &[]).await {
                tracing::warn!(%err, "failed to register with coordinator service");
            }
        }

        Ok(())
    }

    pub async fn assignment(&self) -> BTreeMap<String, Vec<i32>> {
        self.group.assignment().await
    }

    /// Fetches from every partition currently assigned to this member, seeding each partition's
    /// starting offset from the group's remote offset store (falling back to `start` when the
    /// group has never committed one), and autocommitting on success when configured.
    ///
    /// Partitions belonging to the same topic are scattered across their leaders in parallel via
    /// [`ClusterState::dispatch`]; one partition's error never discards another's records from
    /// the same call (spec.md §7, S6). `deadline`, when set, bounds the whole call.
    pub async fn consume(
        &self,
        start: StartPosition,
        deadline: Option<Duration>,
    ) -> Result<PartitionResult<Vec<ConsumedRecord>>> {
        let assignment = self.group.assignment().await;
        let mut out: PartitionResult<Vec<ConsumedRecord>> = HashMap::new();

        for (topic, partitions) in assignment {
            if partitions.is_empty() {
                continue;
            }
            let per_topic = self.consume_topic(&topic, &partitions, start, deadline).await?;
            out.extend(per_topic);
        }

        Ok(out)
    }

    async fn consume_topic(
        &self,
        topic: &str,
        partitions: &[i32],
        start: StartPosition,
        deadline: Option<Duration>,
    ) -> Result<PartitionResult<Vec<ConsumedRecord>>> {
        let mut out: PartitionResult<Vec<ConsumedRecord>> = HashMap::new();
        let coordinator = self.group.coordinator_connection().await;

        let mut fetch_offsets = Vec::with_capacity(partitions.len());
        for &partition in partitions {
            let resolved: Result<i64> = async {
                let remote = match &coordinator {
                    Some(conn) => offset::fetch_remote(conn, self.group.group_id(), topic, partition).await?,
                    None => None,
                };
                match remote {
                    Some(offset) => Ok(offset),
                    None => self.resolve_start(topic, partition, start, deadline).await,
                }
            }
            .await;

            match resolved {
                Ok(offset) => fetch_offsets.push((partition, offset)),
                Err(err) => {
                    out.insert(partition, Err(err.into()));
                }
            }
        }

        if fetch_offsets.is_empty() {
            return Ok(out);
        }

        let fetched = self.fetch_partitions(topic, &fetch_offsets, deadline).await?;

        for (partition, result) in fetched {
            if self.autocommit {
                if let (Ok(records), Some(conn)) = (&result, &coordinator) {
                    if let Some(last) = records.last() {
                        if let Err(err) = offset::commit_remote(
                            conn,
                            self.group.group_id(),
                            self.group.generation_id().await,
                            &self.group.member_id().await,
                            topic,
                            partition,
                            last.offset + 1,
                        )
                        .await
                        {
                            tracing::warn!(%err, topic, partition, "autocommit failed");
                        }
                    }
                }
            }
            out.insert(partition, result);
        }

        Ok(out)
    }

    /// Scatters a batch of `(partition, fetch_offset)` pairs across their leaders and gathers the
    /// parsed records back.
    async fn fetch_partitions(
        &self,
        topic: &str,
        offsets: &[(i32, i64)],
        deadline: Option<Duration>,
    ) -> Result<PartitionResult<Vec<ConsumedRecord>>> {
        use crate::protocol::messages::fetch::{FetchRequest, FetchRequestPartition, FetchRequestTopic};

        let offset_map: HashMap<i32, i64> = offsets.iter().copied().collect();
        let partitions: Vec<i32> = offsets.iter().map(|&(p, _)| p).collect();
        let topic_for_build = topic.to_string();
        let topic_for_extract = topic.to_string();

        let raw = self
            .cluster
            .dispatch(
                topic,
                &partitions,
                deadline,
                move |leader_partitions| FetchRequest {
                    replica_id: -1,
                    max_wait_ms: DEFAULT_MAX_WAIT_MS,
                    min_bytes: DEFAULT_MIN_BYTES,
                    topics: vec![FetchRequestTopic {
                        topic: topic_for_build.clone(),
                        partitions: leader_partitions
                            .iter()
                            .map(|&p| FetchRequestPartition {
                                partition: p,
                                fetch_offset: offset_map[&p],
                                partition_max_bytes: DEFAULT_PARTITION_MAX_BYTES,
                            })
                            .collect(),
                    }],
                },
                move |response| {
                    response
                        .responses
                        .into_iter()
                        .find(|t| t.topic == topic_for_extract)
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
                    let records = record_set
                        .0
                        .into_iter()
                        .map(|record| ConsumedRecord {
                            topic: topic.to_string(),
                            partition,
                            offset: record.offset,
                            key: record.message.key,
                            value: record.message.value.unwrap_or_default(),
                        })
                        .collect::<Vec<_>>();
                    out.insert(partition, Ok(records));
                }
                Err(err) => {
                    out.insert(partition, Err(err));
                }
            }
        }
        Ok(out)
    }

    async fn resolve_start(
        &self,
        topic: &str,
        partition: i32,
        start: StartPosition,
        deadline: Option<Duration>,
    ) -> Result<i64> {
        use crate::protocol::messages::list_offsets::{
            ListOffsetsRequest, ListOffsetsRequestPartition, ListOffsetsRequestTopic,
        };

        let timestamp = match start {
            StartPosition::End => -1,
            StartPosition::Beginning => -2,
            StartPosition::Timestamp(ts) => ts,
            StartPosition::Relative(duration) => {
                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default();
                now.saturating_sub(duration).as_millis() as i64
            }
        };

        let topic_owned = topic.to_string();
        let response = self
            .cluster
            .send_to_leader(
                topic,
                partition,
                deadline,
                || ListOffsetsRequest {
                    replica_id: -1,
                    topics: vec![ListOffsetsRequestTopic {
                        name: topic_owned.clone(),
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
                        .find(|t| t.name == topic_owned)
                        .and_then(|t| t.partitions.iter().find(|p| p.partition_index == partition))
                        .and_then(|p| p.error)
                },
            )
            .await?;

        Ok(response
            .topics
            .into_iter()
            .find(|t| t.name == topic)
            .and_then(|t| t.partitions.into_iter().find(|p| p.partition_index == partition))
            .and_then(|p| p.offsets.first().copied())
            .unwrap_or(0))
    }

    /// Leaves the group, ending the heartbeat loop. `deadline` is accepted for symmetry with
    /// spec.md §6's `close(deadline)`; the leave/heartbeat-abort sequence itself is not currently
    /// bounded by it since leaving is a single best-effort request on an already-open connection.
    pub async fn close(&self, _deadline: Option<Duration>) -> Result<()> {
        self.group.leave().await?;
        if let Some(handle) = self.heartbeat_task.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }
}
