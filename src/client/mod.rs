//! Thin public façades over the engine (spec.md §6): `Producer`, `SingleConsumer`,
//! `GroupedConsumer`. Each supplies a topic name, a serialization/deserialization callable, and a
//! start position, then drives the produce/fetch/commit operations the lower layers expose.

pub mod grouped_consumer;
pub mod producer;
pub mod single_consumer;

pub use grouped_consumer::GroupedConsumer;
pub use producer::Producer;
pub use single_consumer::{SingleConsumer, StartPosition};

use std::sync::Arc;

use crate::backoff::BackoffConfig;
use crate::build_info::DEFAULT_CLIENT_ID;
use crate::cluster::ClusterState;
use crate::connection::{Broker, BrokerConnector};
use crate::error::{ClientError, Result};
use crate::protocol::messages::describe_groups::{DescribeGroupsRequest, DescribeGroupsResponseGroup};
use crate::protocol::messages::list_groups::{ListGroupsRequest, ListGroupsResponseGroup};
use crate::topic::Topic;

/// Builder shared by all three façades: bootstrap brokers, client id, frame size cap, and
/// backoff policy (SPEC_FULL.md §6). TLS/SOCKS5/SASL are explicit non-goals and carry no fields
/// here.
pub struct ClientBuilder {
    bootstrap_brokers: Vec<String>,
    client_id: Option<Arc<str>>,
    max_message_size: usize,
    backoff_config: Arc<BackoffConfig>,
}

impl ClientBuilder {
    pub fn new(bootstrap_brokers: Vec<String>) -> Self {
        Self {
            bootstrap_brokers,
            client_id: None,
            max_message_size: 100 * 1024 * 1024,
            backoff_config: Default::default(),
        }
    }

    pub fn client_id(mut self, client_id: impl Into<Arc<str>>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn backoff_config(mut self, backoff_config: BackoffConfig) -> Self {
        self.backoff_config = Arc::new(backoff_config);
        self
    }

    /// Connects to the bootstrap brokers and fetches the initial cluster snapshot. Mirrors the
    /// teacher's `ClientBuilder::build()` as the synchronous validation point spec.md §6 calls
    /// for (`ConfigurationError` on an empty broker list).
    pub async fn build(self) -> Result<Client> {
        if self.bootstrap_brokers.is_empty() {
            return Err(ClientError::Configuration("bootstrap_brokers must not be empty".to_string()));
        }

        let connector = Arc::new(BrokerConnector::new(
            self.bootstrap_brokers,
            self.client_id.unwrap_or_else(|| Arc::from(DEFAULT_CLIENT_ID)),
            self.max_message_size,
            Arc::clone(&self.backoff_config),
        ));
        connector.refresh_metadata().await?;

        let cluster = Arc::new(ClusterState::new(Arc::clone(&connector)));
        cluster.refresh(None).await?;

        Ok(Client { connector, cluster })
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder").finish_non_exhaustive()
    }
}

/// Top-level cluster-wide client. Constructs the thin façades; holds the shared connection pool
/// and cluster snapshot they all dispatch through.
#[derive(Debug)]
pub struct Client {
    connector: Arc<BrokerConnector>,
    cluster: Arc<ClusterState>,
}

impl Client {
    pub fn producer(&self) -> Producer {
        Producer::new(Arc::clone(&self.cluster))
    }

    pub fn single_consumer(&self, topic: impl Into<String>) -> SingleConsumer {
        SingleConsumer::new(topic.into(), Arc::clone(&self.cluster))
    }

    pub fn grouped_consumer(
        &self,
        group_name: String,
        topics: Vec<String>,
        autocommit: bool,
    ) -> GroupedConsumer {
        GroupedConsumer::new(
            group_name,
            topics,
            autocommit,
            Arc::clone(&self.connector),
            Arc::clone(&self.cluster),
        )
    }

    pub fn brokers(&self) -> Vec<Broker> {
        self.connector.topology.get_brokers()
    }

    /// Lists topics in the cluster. Always issues a fresh, unconstrained metadata request rather
    /// than serving the cached snapshot, so a topic created moments ago is visible immediately.
    pub async fn list_topics(&self) -> Result<Vec<Topic>> {
        self.cluster.refresh(None).await?;
        Ok(self.cluster.topics())
    }

    /// Lists every consumer group the cluster knows about, for monitoring/ops use rather than
    /// the `GroupedConsumer` data path itself.
    pub async fn list_groups(&self) -> Result<Vec<ListGroupsResponseGroup>> {
        let response = self
            .connector
            .retry(|conn| async move { conn.request(&ListGroupsRequest).await })
            .await?;
        if let Some(error) = response.error {
            return Err(ClientError::Broker(error));
        }
        Ok(response.groups)
    }

    /// Describes the named groups: state, protocol, and member list.
    pub async fn describe_groups(&self, groups: Vec<String>) -> Result<Vec<DescribeGroupsResponseGroup>> {
        let response = self
            .connector
            .retry(|conn| {
                let groups = groups.clone();
                async move { conn.request(&DescribeGroupsRequest { groups }).await }
            })
            .await?;
        Ok(response.groups)
    }
}
