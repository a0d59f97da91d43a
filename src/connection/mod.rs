//! The broker connection layer: a framed request/response channel to a single broker (4.C), and
//! the broker-discovery/connection-pool wrapper the cluster layer dispatches operations through.

pub mod topology;
pub mod transport;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{Mutex, RwLock, oneshot};

use crate::backoff::{Backoff, BackoffConfig};
use crate::protocol::messages::header::{RequestHeader, ResponseHeader};
use crate::protocol::messages::metadata::{MetadataRequest, MetadataRequestTopic, MetadataResponse};
use crate::protocol::messages::RequestBody;
use crate::protocol::traits::{ReadType, ReadVersionedType, WriteType, WriteVersionedType};

pub use topology::{Broker, BrokerTopology};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] transport::Error),

    #[error("protocol decode error: {0}")]
    Decode(#[from] crate::protocol::traits::ReadError),

    #[error("protocol encode error: {0}")]
    Encode(#[from] crate::protocol::traits::WriteError),

    #[error("connection is no longer usable")]
    Disconnected,

    #[error("frame of {size} bytes exceeds max_message_size of {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error("no brokers available")]
    NoBrokersAvailable,

    #[error("unknown broker id {0}")]
    UnknownBroker(i32),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A single TCP connection to one broker: in-order framing, a monotonic `correlation_id`, and an
/// in-flight correlation table. On any I/O error the connection transitions to a terminal failed
/// state: every pending request is completed with [`Error::Disconnected`] and further sends are
/// rejected, per spec.md 4.C — callers must obtain a fresh connection from the cluster layer.
#[derive(Debug)]
pub struct Messenger {
    writer: Mutex<WriteHalf<transport::Transport>>,
    pending: Arc<std::sync::Mutex<HashMap<i32, oneshot::Sender<Result<Vec<u8>>>>>>,
    correlation_id: AtomicI32,
    client_id: Arc<str>,
    max_message_size: usize,
    failed: Arc<std::sync::atomic::AtomicBool>,
}

impl Messenger {
    pub fn new(transport: transport::Transport, client_id: Arc<str>, max_message_size: usize) -> Arc<Self> {
        let (read_half, write_half) = tokio::io::split(transport);
        let pending = Arc::new(std::sync::Mutex::new(HashMap::new()));
        let failed = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let messenger = Arc::new(Self {
            writer: Mutex::new(write_half),
            pending: Arc::clone(&pending),
            correlation_id: AtomicI32::new(0),
            client_id,
            max_message_size,
            failed: Arc::clone(&failed),
        });

        tokio::spawn(Self::read_loop(read_half, pending, failed, max_message_size));

        messenger
    }

    async fn read_loop(
        mut reader: ReadHalf<transport::Transport>,
        pending: Arc<std::sync::Mutex<HashMap<i32, oneshot::Sender<Result<Vec<u8>>>>>>,
        failed: Arc<std::sync::atomic::AtomicBool>,
        max_message_size: usize,
    ) {
        let outcome = Self::read_frames(&mut reader, &pending, max_message_size).await;
        if let Err(err) = outcome {
            tracing::warn!(%err, "broker connection failed, draining in-flight requests");
        }
        failed.store(true, Ordering::SeqCst);
        for (_, tx) in pending.lock().expect("pending mutex poisoned").drain() {
            let _ = tx.send(Err(Error::Disconnected));
        }
    }

    async fn read_frames(
        reader: &mut ReadHalf<transport::Transport>,
        pending: &Arc<std::sync::Mutex<HashMap<i32, oneshot::Sender<Result<Vec<u8>>>>>>,
        max_message_size: usize,
    ) -> Result<()> {
        loop {
            let mut len_buf = [0u8; 4];
            reader.read_exact(&mut len_buf).await.map_err(transport::Error::IO)?;
            let len = i32::from_be_bytes(len_buf);
            let len = usize::try_from(len).map_err(|_| {
                Error::Decode(crate::protocol::traits::ReadError::Malformed(
                    "negative frame length".to_string().into(),
                ))
            })?;
            if len > max_message_size {
                return Err(Error::FrameTooLarge { size: len, max: max_message_size });
            }

            let mut body = vec![0u8; len];
            reader.read_exact(&mut body).await.map_err(transport::Error::IO)?;

            let mut cursor = std::io::Cursor::new(&body[..]);
            let header = ResponseHeader::read(&mut cursor)?;
            let remaining = cursor.position() as usize;
            let payload = body[remaining..].to_vec();

            if let Some(tx) = pending.lock().expect("pending mutex poisoned").remove(&header.correlation_id) {
                let _ = tx.send(Ok(payload));
            }
        }
    }

    /// Issues `body` and awaits its matching response. The response's position in the wire
    /// stream has no bearing on the order callers are woken up in: matching is purely by
    /// `correlation_id`, so concurrent callers race fairly.
    pub async fn request<R>(&self, body: &R) -> Result<R::ResponseBody>
    where
        R: RequestBody + WriteVersionedType<Vec<u8>>,
        R::ResponseBody: ReadVersionedType<std::io::Cursor<Vec<u8>>>,
    {
        if self.failed.load(Ordering::SeqCst) {
            return Err(Error::Disconnected);
        }

        let correlation_id = self.correlation_id.fetch_add(1, Ordering::SeqCst);
        let version = R::API_VERSION_RANGE.max();

        let header = RequestHeader {
            api_key: R::API_KEY,
            api_version: version,
            correlation_id,
            client_id: self.client_id.to_string(),
        };

        let mut frame = Vec::new();
        header.write(&mut frame)?;
        body.write_versioned(&mut frame, version)?;

        let mut framed = Vec::with_capacity(frame.len() + 4);
        let len = i32::try_from(frame.len()).map_err(|e| {
            Error::Encode(crate::protocol::traits::WriteError::Overflow(e))
        })?;
        len.write(&mut framed)?;
        framed.extend_from_slice(&frame);

        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .expect("pending mutex poisoned")
            .insert(correlation_id, tx);

        {
            let mut writer = self.writer.lock().await;
            if let Err(err) = writer.write_all(&framed).await {
                self.pending.lock().expect("pending mutex poisoned").remove(&correlation_id);
                return Err(Error::Transport(transport::Error::IO(err)));
            }
            writer.flush().await.map_err(transport::Error::IO)?;
        }

        // rx.await: Result<Result<Vec<u8>, Error>, RecvError>; first `?` maps the outer
        // RecvError (sender dropped) to Error::Disconnected, second unwraps the inner result.
        let payload = rx.await.map_err(|_| Error::Disconnected)??;
        let mut cursor = std::io::Cursor::new(payload);
        Ok(R::ResponseBody::read_versioned(&mut cursor, version)?)
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

/// A lazily-established, replace-on-failure connection to one broker address.
#[derive(Debug)]
pub struct BrokerConnection {
    addr: String,
    client_id: Arc<str>,
    max_message_size: usize,
    connect_timeout: std::time::Duration,
    messenger: RwLock<Option<Arc<Messenger>>>,
}

impl BrokerConnection {
    pub fn new(addr: String, client_id: Arc<str>, max_message_size: usize) -> Self {
        Self {
            addr,
            client_id,
            max_message_size,
            connect_timeout: std::time::Duration::from_secs(10),
            messenger: RwLock::new(None),
        }
    }

    /// Returns the live connection, establishing (or re-establishing, after a prior failure) it
    /// first.
    pub async fn get(&self) -> Result<Arc<Messenger>> {
        {
            let guard = self.messenger.read().await;
            if let Some(messenger) = guard.as_ref() {
                if !messenger.is_failed() {
                    return Ok(Arc::clone(messenger));
                }
            }
        }

        let mut guard = self.messenger.write().await;
        if let Some(messenger) = guard.as_ref() {
            if !messenger.is_failed() {
                return Ok(Arc::clone(messenger));
            }
        }

        let transport = transport::Transport::connect(&self.addr, Some(self.connect_timeout)).await?;
        let messenger = Messenger::new(transport, Arc::clone(&self.client_id), self.max_message_size);
        *guard = Some(Arc::clone(&messenger));
        Ok(messenger)
    }
}

/// Generic "give me a live connection" seam shared by every logical call site that needs `an
/// arbitrary broker` (Metadata, GroupCoordinator) rather than a specific partition leader.
#[async_trait::async_trait]
pub trait BrokerCache: std::fmt::Debug + Send + Sync {
    async fn get(&self) -> Result<Arc<Messenger>>;
    async fn invalidate(&self, reason: &'static str);
}

/// Owns bootstrap discovery, the broker topology cache, and one [`BrokerConnection`] per known
/// broker id. This is the seam the cluster model (routing, scatter/gather) dispatches through.
#[derive(Debug)]
pub struct BrokerConnector {
    bootstrap_brokers: Vec<String>,
    client_id: Arc<str>,
    max_message_size: usize,
    backoff_config: Arc<BackoffConfig>,
    pub topology: BrokerTopology,
    connections: RwLock<HashMap<i32, Arc<BrokerConnection>>>,
    lru: std::sync::Mutex<std::collections::VecDeque<i32>>,
}

impl BrokerConnector {
    pub fn new(
        bootstrap_brokers: Vec<String>,
        client_id: Arc<str>,
        max_message_size: usize,
        backoff_config: Arc<BackoffConfig>,
    ) -> Self {
        Self {
            bootstrap_brokers,
            client_id,
            max_message_size,
            backoff_config,
            topology: BrokerTopology::default(),
            connections: RwLock::new(HashMap::new()),
            lru: std::sync::Mutex::new(std::collections::VecDeque::new()),
        }
    }

    pub fn backoff_config(&self) -> &Arc<BackoffConfig> {
        &self.backoff_config
    }

    pub fn client_id(&self) -> &Arc<str> {
        &self.client_id
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Connects to each seed in turn until one answers a Metadata request, seeding
    /// [`BrokerTopology`]. Called once at client construction.
    pub async fn refresh_metadata(&self) -> Result<MetadataResponse> {
        if !self.topology.is_empty() {
            if let Ok(conn) = self.get_arbitrary_broker().await {
                if let Ok(response) = conn.request(&MetadataRequest { topics: None }).await {
                    self.topology.update(&response.brokers);
                    return Ok(response);
                }
            }
        }

        let mut last_err = None;
        for seed in &self.bootstrap_brokers {
            let conn = BrokerConnection::new(
                seed.clone(),
                Arc::clone(&self.client_id),
                self.max_message_size,
            );
            match conn.get().await {
                Ok(messenger) => match messenger.request(&MetadataRequest { topics: None }).await {
                    Ok(response) => {
                        self.topology.update(&response.brokers);
                        return Ok(response);
                    }
                    Err(err) => last_err = Some(err),
                },
                Err(err) => last_err = Some(err),
            }
        }

        Err(last_err.unwrap_or(Error::NoBrokersAvailable))
    }

    /// Requests metadata for specific topics (or all topics when `topics` is `None`) and merges
    /// the broker portion into the topology cache.
    pub async fn request_metadata(&self, topics: Option<&[String]>) -> Result<MetadataResponse> {
        let conn = self.get_arbitrary_broker().await?;
        let request = MetadataRequest {
            topics: topics.map(|ts| {
                ts.iter()
                    .map(|name| MetadataRequestTopic { name: name.clone() })
                    .collect()
            }),
        };
        let response = conn.request(&request).await?;
        self.topology.update(&response.brokers);
        Ok(response)
    }

    /// Returns a connection to the broker with the given id, opening it on first use.
    pub async fn connection(&self, broker_id: i32) -> Result<Arc<Messenger>> {
        {
            let guard = self.connections.read().await;
            if let Some(conn) = guard.get(&broker_id) {
                return conn.get().await;
            }
        }

        let broker = self
            .topology
            .get_broker(broker_id)
            .await
            .ok_or(Error::UnknownBroker(broker_id))?;

        let mut guard = self.connections.write().await;
        let conn = guard.entry(broker_id).or_insert_with(|| {
            Arc::new(BrokerConnection::new(
                broker.addr(),
                Arc::clone(&self.client_id),
                self.max_message_size,
            ))
        });
        conn.get().await
    }

    /// Returns a connection to some live broker, round-robining through the topology to spread
    /// load across metadata/coordinator lookups (spec.md 4.D's least-recently-used tie-break).
    pub async fn get_arbitrary_broker(&self) -> Result<Arc<Messenger>> {
        let brokers = self.topology.get_brokers();
        if brokers.is_empty() {
            return Err(Error::NoBrokersAvailable);
        }

        let ordered_id = {
            let mut lru = self.lru.lock().expect("lru mutex poisoned");
            let known: std::collections::HashSet<i32> = brokers.iter().map(|b| b.id).collect();
            lru.retain(|id| known.contains(id));
            for broker in &brokers {
                if !lru.contains(&broker.id) {
                    lru.push_back(broker.id);
                }
            }
            let id = *lru.front().expect("checked non-empty above");
            lru.rotate_left(1);
            id
        };

        self.connection(ordered_id).await
    }

    /// Retries `f` against (potentially different, on refresh) arbitrary brokers using the
    /// connector's backoff policy, refreshing metadata when the connection is unusable.
    pub async fn retry<T, F, Fut>(&self, mut f: F) -> Result<T>
    where
        F: FnMut(Arc<Messenger>) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut backoff = Backoff::new(&self.backoff_config);
        loop {
            let conn = match self.get_arbitrary_broker().await {
                Ok(conn) => conn,
                Err(_) => {
                    self.refresh_metadata().await?;
                    self.get_arbitrary_broker().await?
                }
            };

            match f(conn).await {
                Ok(value) => return Ok(value),
                Err(Error::Disconnected) => {
                    self.refresh_metadata().await?;
                    match backoff.next() {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => return Err(Error::Disconnected),
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}
