//! The consumer group coordination state machine (spec.md 4.F):
//! `Disconnected -> Discovering -> Joining -> AwaitingSync -> Stable <-> Rebalancing`, with a
//! terminal `Leaving`. A member heartbeats every `session_timeout / 3`; any heartbeat rejection
//! that signals a rebalance drives the client straight back through `Joining`/`AwaitingSync`.

pub mod allocator;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::cluster::ClusterState;
use crate::connection::{BrokerConnection, BrokerConnector, Messenger};
use crate::protocol::error::Error as BrokerError;
use crate::protocol::messages::assignment::{
    ConsumerGroupMemberAssignment, ConsumerGroupMemberMetadata, PartitionAssignment,
};
use crate::protocol::messages::group_coordinator::GroupCoordinatorRequest;
use crate::protocol::messages::heartbeat::HeartbeatRequest;
use crate::protocol::messages::join_group::{JoinGroupProtocol, JoinGroupRequest};
use crate::protocol::messages::leave_group::LeaveGroupRequest;
use crate::protocol::messages::sync_group::{SyncGroupRequest, SyncGroupRequestAssignment};

const PROTOCOL_TYPE: &str = "consumer";
const PROTOCOL_NAME: &str = "roundrobin";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Connection(#[from] crate::connection::Error),

    #[error(transparent)]
    Cluster(#[from] crate::cluster::Error),

    #[error(transparent)]
    Encode(#[from] crate::protocol::traits::WriteError),

    #[error("coordinator rejected the request: {0:?}")]
    Broker(BrokerError),

    #[error("the group has already been left")]
    AlreadyLeft,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The coarse-grained phase of the group membership state machine, for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStatus {
    Disconnected,
    Discovering,
    Joining,
    AwaitingSync,
    Stable,
    Rebalancing,
    Leaving,
}

#[derive(Debug)]
struct Inner {
    status: GroupStatus,
    coordinator: Option<Arc<Messenger>>,
    generation_id: i32,
    member_id: String,
    /// This member's slice of the assignment: `topic -> [partition_id]`.
    assignment: BTreeMap<String, Vec<i32>>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            status: GroupStatus::Disconnected,
            coordinator: None,
            generation_id: -1,
            member_id: String::new(),
            assignment: BTreeMap::new(),
        }
    }
}

pub type Allocator = fn(&[String], &BTreeMap<String, Vec<i32>>) -> allocator::Assignment;

/// One member's connection to a consumer group's coordinator.
#[derive(Debug)]
pub struct GroupCoordinatorClient {
    group_id: String,
    connector: Arc<BrokerConnector>,
    cluster: Arc<ClusterState>,
    topics: Vec<String>,
    session_timeout: Duration,
    allocator: Allocator,
    inner: Mutex<Inner>,
}

impl GroupCoordinatorClient {
    pub fn new(
        group_id: String,
        topics: Vec<String>,
        connector: Arc<BrokerConnector>,
        cluster: Arc<ClusterState>,
        session_timeout: Duration,
        allocator: Allocator,
    ) -> Self {
        Self {
            group_id,
            connector,
            cluster,
            topics,
            session_timeout,
            allocator,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub async fn status(&self) -> GroupStatus {
        self.inner.lock().await.status
    }

    pub async fn assignment(&self) -> BTreeMap<String, Vec<i32>> {
        self.inner.lock().await.assignment.clone()
    }

    pub async fn generation_id(&self) -> i32 {
        self.inner.lock().await.generation_id
    }

    pub async fn member_id(&self) -> String {
        self.inner.lock().await.member_id.clone()
    }

    /// The current coordinator connection, if one has been established. `OffsetCommit` and
    /// `OffsetFetch` for this group are served by the same broker as `JoinGroup`/`SyncGroup`, so
    /// callers managing remote offsets reuse this rather than discovering the coordinator again.
    pub async fn coordinator_connection(&self) -> Option<Arc<Messenger>> {
        self.inner.lock().await.coordinator.clone()
    }

    /// Joins or rejoins the group: `Discovering -> Joining -> AwaitingSync -> Stable`.
    pub async fn join(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.rejoin_locked(&mut inner).await
    }

    async fn discover_coordinator(&self) -> Result<Arc<Messenger>> {
        let conn = self.connector.get_arbitrary_broker().await?;
        let response = conn.request(&GroupCoordinatorRequest { group_id: self.group_id.clone() }).await?;
        if let Some(error) = response.error {
            return Err(Error::Broker(error));
        }

        let coordinator = BrokerConnection::new(
            format!("{}:{}", response.host, response.port),
            Arc::clone(self.connector.client_id()),
            self.connector.max_message_size(),
        );
        Ok(coordinator.get().await?)
    }

    async fn rejoin_locked(&self, inner: &mut Inner) -> Result<()> {
        inner.status = GroupStatus::Discovering;
        let coordinator = self.discover_coordinator().await?;
        inner.coordinator = Some(Arc::clone(&coordinator));

        inner.status = GroupStatus::Joining;
        let metadata = ConsumerGroupMemberMetadata {
            version: 0,
            topics: self.topics.clone(),
            user_data: vec![],
        };
        let join_request = JoinGroupRequest {
            group_id: self.group_id.clone(),
            session_timeout_ms: i32::try_from(self.session_timeout.as_millis()).unwrap_or(i32::MAX),
            member_id: inner.member_id.clone(),
            protocol_type: PROTOCOL_TYPE.to_string(),
            protocols: vec![JoinGroupProtocol {
                name: PROTOCOL_NAME.to_string(),
                metadata: metadata.encode()?,
            }],
        };

        let join_response = coordinator.request(&join_request).await?;
        if let Some(error) = join_response.error {
            if error == BrokerError::UnknownMemberId {
                inner.member_id.clear();
            }
            return Err(Error::Broker(error));
        }

        inner.generation_id = join_response.generation_id;
        inner.member_id = join_response.member_id.clone();

        inner.status = GroupStatus::AwaitingSync;
        let assignments = if join_response.leader == join_response.member_id {
            let mut topic_partitions = BTreeMap::new();
            for topic in &self.topics {
                topic_partitions.insert(topic.clone(), self.cluster.partitions_of(topic).unwrap_or_default());
            }

            let member_ids: Vec<String> = join_response.members.iter().map(|m| m.member_id.clone()).collect();
            let computed = (self.allocator)(&member_ids, &topic_partitions);

            join_response
                .members
                .iter()
                .map(|m| {
                    let topics = computed
                        .get(&m.member_id)
                        .cloned()
                        .unwrap_or_default()
                        .into_iter()
                        .map(|(topic, partitions)| PartitionAssignment { topic, partitions })
                        .collect();
                    let assignment = ConsumerGroupMemberAssignment { version: 0, topics, user_data: vec![] };
                    Ok(SyncGroupRequestAssignment {
                        member_id: m.member_id.clone(),
                        assignment: assignment.encode()?,
                    })
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            vec![]
        };

        let sync_request = SyncGroupRequest {
            group_id: self.group_id.clone(),
            generation_id: inner.generation_id,
            member_id: inner.member_id.clone(),
            assignments,
        };
        let sync_response = coordinator.request(&sync_request).await?;
        if let Some(error) = sync_response.error {
            return Err(Error::Broker(error));
        }

        inner.assignment = sync_response
            .assignment
            .topics
            .into_iter()
            .map(|t| (t.topic, t.partitions))
            .collect();
        inner.status = GroupStatus::Stable;
        Ok(())
    }

    /// Sends one heartbeat. On a rebalance signal, rejoins in place before returning, so the
    /// caller always sees either `Stable` (possibly with a refreshed assignment) or an error.
    pub async fn heartbeat(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.status == GroupStatus::Leaving {
            return Err(Error::AlreadyLeft);
        }

        let coordinator = match &inner.coordinator {
            Some(c) => Arc::clone(c),
            None => return self.rejoin_locked(&mut inner).await,
        };

        let request = HeartbeatRequest {
            group_id: self.group_id.clone(),
            generation_id: inner.generation_id,
            member_id: inner.member_id.clone(),
        };

        match coordinator.request(&request).await {
            Ok(response) => match response.error {
                None => Ok(()),
                Some(BrokerError::RebalanceInProgress)
                | Some(BrokerError::IllegalGeneration)
                | Some(BrokerError::UnknownMemberId) => {
                    inner.status = GroupStatus::Rebalancing;
                    self.rejoin_locked(&mut inner).await
                }
                Some(error) => Err(Error::Broker(error)),
            },
            Err(crate::connection::Error::Disconnected) => {
                inner.coordinator = None;
                self.rejoin_locked(&mut inner).await
            }
            Err(err) => Err(Error::Connection(err)),
        }
    }

    /// Runs the heartbeat loop at `session_timeout / 3` until the group is left or a
    /// non-recoverable error occurs.
    pub async fn run_heartbeat_loop(self: &Arc<Self>) {
        let mut interval = tokio::time::interval(self.session_timeout / 3);
        loop {
            interval.tick().await;
            if self.status().await == GroupStatus::Leaving {
                return;
            }
            if let Err(err) = self.heartbeat().await {
                tracing::warn!(group = %self.group_id, %err, "heartbeat failed");
            }
        }
    }

    /// Leaves the group. Terminal: no further `join`/`heartbeat` calls are valid afterwards.
    pub async fn leave(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(coordinator) = &inner.coordinator {
            let request = LeaveGroupRequest {
                group_id: self.group_id.clone(),
                member_id: inner.member_id.clone(),
            };
            let _ = coordinator.request(&request).await;
        }
        inner.status = GroupStatus::Leaving;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_inner_is_disconnected() {
        let inner = Inner::default();
        assert_eq!(inner.status, GroupStatus::Disconnected);
        assert_eq!(inner.generation_id, -1);
    }
}
