//! The topic/partition view derived from broker metadata, and the leader-routing logic spec.md
//! 4.D describes: route to the cached leader, refresh-and-retry on a stale one, retry in place
//! on a timeout, or scatter a multi-partition request across every leader it touches and gather
//! the per-partition results back into one map.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::backoff::Backoff;
use crate::connection::{BrokerConnector, Messenger};
use crate::protocol::error::Error as BrokerError;
use crate::protocol::messages::RequestBody;
use crate::protocol::traits::{ReadVersionedType, WriteVersionedType};
use crate::topic::{Partition, Topic};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Connection(#[from] crate::connection::Error),

    #[error("topic {0} does not exist")]
    UnknownTopic(String),

    #[error("partition {topic}-{partition} does not exist")]
    UnknownPartition { topic: String, partition: i32 },

    #[error("broker rejected the request: {0:?}")]
    Broker(BrokerError),

    #[error("no progress after exhausting the retry budget for {topic}-{partition}")]
    RetriesExhausted { topic: String, partition: i32 },

    #[error("deadline elapsed before {topic}-{partition} produced a result")]
    TimedOut { topic: String, partition: i32 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Per-partition outcome of a [`ClusterState::dispatch`] scatter/gather call. A partition's own
/// success or failure never blocks another partition's in the same response (spec.md §7): the
/// caller always gets one entry per partition it asked about.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum PartitionError {
    #[error("broker rejected the request: {0:?}")]
    Broker(BrokerError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("deadline elapsed before this partition's request completed")]
    TimedOut,
}

/// A partition-keyed result map, the shape every `dispatch` call returns.
pub type PartitionResult<T> = HashMap<i32, std::result::Result<T, PartitionError>>;

impl From<Error> for PartitionError {
    fn from(err: Error) -> Self {
        match err {
            Error::Broker(err) => Self::Broker(err),
            Error::TimedOut { .. } => Self::TimedOut,
            other => Self::Connection(other.to_string()),
        }
    }
}

#[derive(Debug, Default, Clone)]
struct Snapshot {
    topics: HashMap<String, Topic>,
}

/// The cluster-wide topic/partition map, replaced as a whole on every refresh so readers never
/// observe a partially-updated topic (SPEC_FULL.md 5).
#[derive(Debug)]
pub struct ClusterState {
    connector: Arc<BrokerConnector>,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl ClusterState {
    pub fn new(connector: Arc<BrokerConnector>) -> Self {
        Self {
            connector,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
        }
    }

    /// Fetches metadata for `topics` (or every topic known to the cluster when `None`) and
    /// merges the result into the cached snapshot.
    pub async fn refresh(&self, topics: Option<&[String]>) -> Result<()> {
        let response = self.connector.request_metadata(topics).await?;

        let mut merged = match topics {
            None => HashMap::new(),
            Some(_) => self.snapshot.read().topics.clone(),
        };

        for topic in response.topics {
            if let Some(err) = topic.error {
                tracing::warn!(topic = %topic.name, ?err, "metadata error for topic");
                merged.remove(&topic.name);
                continue;
            }

            let mut partitions = BTreeMap::new();
            for partition in topic.partitions {
                if let Some(err) = partition.error {
                    tracing::warn!(
                        topic = %topic.name,
                        partition = partition.partition_index,
                        ?err,
                        "metadata error for partition",
                    );
                    continue;
                }
                partitions.insert(
                    partition.partition_index,
                    Partition {
                        leader_id: partition.leader_id,
                        replica_nodes: partition.replica_nodes,
                        isr_nodes: partition.isr_nodes,
                    },
                );
            }

            merged.insert(topic.name.clone(), Topic { name: topic.name, partitions });
        }

        *self.snapshot.write() = Arc::new(Snapshot { topics: merged });
        Ok(())
    }

    pub fn topic_names(&self) -> Vec<String> {
        self.snapshot.read().topics.keys().cloned().collect()
    }

    pub fn topics(&self) -> Vec<Topic> {
        self.snapshot.read().topics.values().cloned().collect()
    }

    pub fn partitions_of(&self, topic: &str) -> Option<Vec<i32>> {
        self.snapshot
            .read()
            .topics
            .get(topic)
            .map(|t| t.partitions.keys().copied().collect())
    }

    fn leader_of(&self, topic: &str, partition: i32) -> Option<i32> {
        self.snapshot
            .read()
            .topics
            .get(topic)
            .and_then(|t| t.partitions.get(&partition))
            .map(|p| p.leader_id)
    }

    async fn leader_connection(&self, topic: &str, partition: i32) -> Result<Arc<Messenger>> {
        if self.leader_of(topic, partition).is_none() {
            self.refresh(Some(std::slice::from_ref(&topic.to_string()))).await?;
        }
        let leader_id = self.leader_of(topic, partition).ok_or_else(|| {
            Error::UnknownPartition { topic: topic.to_string(), partition }
        })?;
        Ok(self.connector.connection(leader_id).await?)
    }

    /// Sends a request built fresh on each attempt to the current leader of `(topic, partition)`,
    /// following the routing rules of spec.md 4.D:
    /// - leader unknown or the connection is dead: refresh metadata, retry.
    /// - the application-level response carries an error whose
    ///   [`BrokerError::requires_metadata_refresh`] is set: invalidate and refresh, retry.
    /// - a retriable-local error: retry without invalidating the cache.
    /// - anything else: surface immediately.
    ///
    /// `deadline`, when set, bounds the whole call (spec.md §5): once it elapses, the in-flight
    /// attempt is abandoned and [`Error::TimedOut`] is returned instead of retrying further.
    pub async fn send_to_leader<R>(
        &self,
        topic: &str,
        partition: i32,
        deadline: Option<Duration>,
        mut build: impl FnMut() -> R,
        error_of: impl Fn(&R::ResponseBody) -> Option<BrokerError>,
    ) -> Result<R::ResponseBody>
    where
        R: RequestBody + WriteVersionedType<Vec<u8>>,
        R::ResponseBody: ReadVersionedType<std::io::Cursor<Vec<u8>>>,
    {
        let mut backoff = Backoff::new(self.connector.backoff_config());
        let deadline = deadline.map(|d| tokio::time::Instant::now() + d);

        let timed_out = || Error::TimedOut { topic: topic.to_string(), partition };

        loop {
            let remaining = match deadline {
                Some(instant) => match instant.checked_duration_since(tokio::time::Instant::now()) {
                    Some(remaining) => Some(remaining),
                    None => return Err(timed_out()),
                },
                None => None,
            };

            let attempt = async {
                let conn = self.leader_connection(topic, partition).await?;
                let request = build();
                conn.request(&request).await.map_err(Error::from)
            };

            let outcome = match remaining {
                Some(remaining) => match tokio::time::timeout(remaining, attempt).await {
                    Ok(outcome) => outcome,
                    Err(_) => return Err(timed_out()),
                },
                None => attempt.await,
            };

            match outcome {
                Ok(response) => match error_of(&response) {
                    None => return Ok(response),
                    Some(err) if err.requires_metadata_refresh() => {
                        self.refresh(Some(std::slice::from_ref(&topic.to_string()))).await?;
                        match backoff.next() {
                            Some(delay) => tokio::time::sleep(delay).await,
                            None => {
                                return Err(Error::RetriesExhausted {
                                    topic: topic.to_string(),
                                    partition,
                                });
                            }
                        }
                    }
                    Some(err) if err.is_retriable_local() => match backoff.next() {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => {
                            return Err(Error::RetriesExhausted {
                                topic: topic.to_string(),
                                partition,
                            });
                        }
                    },
                    Some(err) => return Err(Error::Broker(err)),
                },
                Err(Error::Connection(crate::connection::Error::Disconnected)) => {
                    self.refresh(Some(std::slice::from_ref(&topic.to_string()))).await?;
                    match backoff.next() {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => {
                            return Err(Error::RetriesExhausted {
                                topic: topic.to_string(),
                                partition,
                            });
                        }
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Groups `partitions` by their current leader, issues one wire request per leader
    /// concurrently, and reassembles a per-partition result map (spec.md §4.D `dispatch`).
    ///
    /// Unlike [`Self::send_to_leader`], a partition-level broker error is never retried inside
    /// this call: it is handed back to the caller immediately alongside whichever partitions in
    /// the same leader group succeeded, and a metadata refresh is scheduled in the background
    /// when any returned error requires one (spec.md S6). `deadline` bounds the whole call;
    /// leaders that haven't answered by then have their outstanding partitions marked
    /// [`PartitionError::TimedOut`] rather than holding up the partitions that did answer.
    pub async fn dispatch<R, T>(
        &self,
        topic: &str,
        partitions: &[i32],
        deadline: Option<Duration>,
        build: impl Fn(&[i32]) -> R,
        extract: impl Fn(R::ResponseBody) -> Vec<(i32, std::result::Result<T, BrokerError>)>,
    ) -> Result<PartitionResult<T>>
    where
        R: RequestBody + WriteVersionedType<Vec<u8>>,
        R::ResponseBody: ReadVersionedType<std::io::Cursor<Vec<u8>>>,
    {
        if partitions.iter().any(|&p| self.leader_of(topic, p).is_none()) {
            self.refresh(Some(std::slice::from_ref(&topic.to_string()))).await?;
        }

        let mut by_leader: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
        for &partition in partitions {
            let leader = self.leader_of(topic, partition).ok_or_else(|| Error::UnknownPartition {
                topic: topic.to_string(),
                partition,
            })?;
            by_leader.entry(leader).or_default().push(partition);
        }

        let deadline = deadline.map(|d| tokio::time::Instant::now() + d);

        let groups = futures::future::join_all(by_leader.into_iter().map(|(leader_id, leader_partitions)| {
            self.dispatch_to_leader(leader_id, leader_partitions, deadline, &build, &extract)
        }))
        .await;

        let mut needs_refresh = false;
        let mut out = HashMap::with_capacity(partitions.len());
        for group in groups {
            for (partition, result) in group {
                if let Err(PartitionError::Broker(err)) = &result {
                    needs_refresh |= err.requires_metadata_refresh();
                }
                out.insert(partition, result);
            }
        }

        if needs_refresh {
            // Best-effort: a failed refresh here just means the next call re-triggers it.
            let _ = self.refresh(Some(std::slice::from_ref(&topic.to_string()))).await;
        }

        Ok(out)
    }

    /// One leader's share of a [`Self::dispatch`] call: a single request carrying every partition
    /// this leader owns, issued once, with no internal retry beyond the deadline-bounded wait for
    /// the response.
    async fn dispatch_to_leader<R, T>(
        &self,
        leader_id: i32,
        leader_partitions: Vec<i32>,
        deadline: Option<tokio::time::Instant>,
        build: &impl Fn(&[i32]) -> R,
        extract: &impl Fn(R::ResponseBody) -> Vec<(i32, std::result::Result<T, BrokerError>)>,
    ) -> Vec<(i32, std::result::Result<T, PartitionError>)>
    where
        R: RequestBody + WriteVersionedType<Vec<u8>>,
        R::ResponseBody: ReadVersionedType<std::io::Cursor<Vec<u8>>>,
    {
        let timed_out = || {
            leader_partitions
                .iter()
                .map(|&p| (p, Err(PartitionError::TimedOut)))
                .collect::<Vec<_>>()
        };

        let remaining = match deadline {
            Some(instant) => match instant.checked_duration_since(tokio::time::Instant::now()) {
                Some(remaining) => Some(remaining),
                None => return timed_out(),
            },
            None => None,
        };

        let request = build(&leader_partitions);
        let attempt = async {
            let conn = self.connector.connection(leader_id).await?;
            conn.request(&request).await
        };

        let response = match remaining {
            Some(remaining) => match tokio::time::timeout(remaining, attempt).await {
                Ok(outcome) => outcome,
                Err(_) => return timed_out(),
            },
            None => attempt.await,
        };

        match response {
            Ok(response) => extract(response)
                .into_iter()
                .map(|(p, r)| (p, r.map_err(PartitionError::Broker)))
                .collect(),
            Err(err) => {
                let message = err.to_string();
                leader_partitions
                    .into_iter()
                    .map(|p| (p, Err(PartitionError::Connection(message.clone()))))
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(partitions: &[(i32, i32)]) -> Topic {
        Topic {
            name: "t".to_string(),
            partitions: partitions
                .iter()
                .map(|&(idx, leader)| {
                    (idx, Partition { leader_id: leader, replica_nodes: vec![leader], isr_nodes: vec![leader] })
                })
                .collect(),
        }
    }

    #[test]
    fn snapshot_merge_keeps_untouched_topics() {
        let mut topics = HashMap::new();
        topics.insert("t".to_string(), topic(&[(0, 1)]));
        let snapshot = Snapshot { topics };
        assert_eq!(snapshot.topics["t"].partitions[&0].leader_id, 1);
    }

    #[test]
    fn groups_partitions_by_leader() {
        let t = topic(&[(0, 1), (1, 1), (2, 2)]);
        let mut by_leader: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
        for (&idx, p) in &t.partitions {
            by_leader.entry(p.leader_id).or_default().push(idx);
        }
        assert_eq!(by_leader.len(), 2);
        assert_eq!(by_leader[&1], vec![0, 1]);
        assert_eq!(by_leader[&2], vec![2]);
    }
}
