//! The top-level error taxonomy (spec.md §7): a thin `thiserror` enum over the layer-specific
//! errors every component defines for itself, the same shape the teacher's own
//! `client::error::Error` uses over `connection::Error`/`messenger::RequestError`.

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Malformed frames, unknown schema, CRC mismatch. Never retried.
    #[error("protocol error: {0}")]
    Protocol(#[from] crate::protocol::traits::ReadError),

    /// Socket errors, EOF, write failures, or the cluster layer giving up on a partition.
    #[error("connection error: {0}")]
    Connection(#[from] crate::connection::Error),

    #[error("cluster routing error: {0}")]
    Cluster(#[from] crate::cluster::Error),

    #[error("offset store error: {0}")]
    Offset(#[from] crate::offset::Error),

    /// A broker rejected a request with an application-level error code that isn't itself
    /// retriable or a leadership change (e.g. `TopicAuthorizationFailed`).
    #[error("broker error: {0:?}")]
    Broker(crate::protocol::error::Error),

    /// Invalid user input: empty broker list, conflicting options. Raised synchronously at
    /// construction/connect time.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("compression error: {0}")]
    UnsupportedCompression(#[from] crate::compression::Error),

    /// Coordinator-service loss beyond the retry budget; the group consumer transitions back to
    /// `Disconnected`.
    #[error("group coordination error: {0}")]
    Group(#[from] crate::group::Error),

    #[error("value serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Folds any top-level error into the per-partition error marker a `consume()` call returns for
/// the partition that triggered it (spec.md §7).
impl From<ClientError> for crate::cluster::PartitionError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Cluster(err) => err.into(),
            ClientError::Broker(err) => crate::cluster::PartitionError::Broker(err),
            other => crate::cluster::PartitionError::Connection(other.to_string()),
        }
    }
}
