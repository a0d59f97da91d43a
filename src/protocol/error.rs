//! Broker-reported error codes.
//!
//! Every response carries an `INT16` error code; `0` means success and is represented here as
//! `None`. Unrecognized codes fall back to `Unknown(i16)` rather than failing to decode — an
//! error taxonomy gap must never turn into a protocol parse failure.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("The requested offset is outside the range of offsets maintained by the server")]
    OffsetOutOfRange,

    #[error("Message contents does not match its CRC")]
    CorruptMessage,

    #[error("This topic or partition does not exist on this broker")]
    UnknownTopicOrPartition,

    #[error("The message has a negative size")]
    InvalidMessageSize,

    #[error("There is currently no leader for this partition")]
    LeaderNotAvailable,

    #[error("The client's metadata is out of date: this broker is not the partition leader")]
    NotLeaderForPartition,

    #[error("The request exceeded the user-specified time limit")]
    RequestTimedOut,

    #[error("The broker is not alive")]
    BrokerNotAvailable,

    #[error("The expected replica is not available on this broker")]
    ReplicaNotAvailable,

    #[error("The produced message is larger than the broker's configured maximum")]
    MessageSizeTooLarge,

    #[error("Internal error code for broker-to-broker communication")]
    StaleControllerEpoch,

    #[error("The offset metadata string is larger than the configured maximum")]
    OffsetMetadataTooLarge,

    #[error("The broker disconnected before a response was received")]
    NetworkException,

    #[error("The coordinator is still loading group/offset metadata")]
    GroupLoadInProgress,

    #[error("The offsets topic has not yet been created, or the coordinator is not active")]
    GroupCoordinatorNotAvailable,

    #[error("This broker is not the coordinator for the requested group")]
    NotCoordinatorForGroup,

    #[error("The requested topic name is invalid")]
    InvalidTopic,

    #[error("A message batch in the produce request exceeds the maximum segment size")]
    RecordListTooLarge,

    #[error("The number of in-sync replicas is lower than the configured minimum")]
    NotEnoughReplicas,

    #[error("The message was written, but with fewer in-sync replicas than required")]
    NotEnoughReplicasAfterAppend,

    #[error("The requested acks value is invalid")]
    InvalidRequiredAcks,

    #[error("The generation id provided in the request is not the current generation")]
    IllegalGeneration,

    #[error("The member's protocol type or protocol set is incompatible with the group")]
    InconsistentGroupProtocol,

    #[error("The group id is empty or null")]
    InvalidGroupId,

    #[error("The member id is not in the current generation")]
    UnknownMemberId,

    #[error("The requested session timeout is outside of the broker's allowed range")]
    InvalidSessionTimeout,

    #[error("The coordinator has begun rebalancing the group; the client should rejoin")]
    RebalanceInProgress,

    #[error("The offset commit was rejected because of oversized metadata")]
    InvalidCommitOffsetSize,

    #[error("The client is not authorized to access the requested topic")]
    TopicAuthorizationFailed,

    #[error("The client is not authorized to access the requested group")]
    GroupAuthorizationFailed,

    #[error("The client is not authorized to use an inter-broker or admin API")]
    ClusterAuthorizationFailed,

    #[error("The timestamp of the message is out of the acceptable range")]
    InvalidTimestamp,

    #[error("This broker is not the cluster controller")]
    NotController,

    #[error("Unknown broker error code {0}")]
    Unknown(i16),
}

impl Error {
    /// Maps a wire error code to an [`Error`]; a code of `0` means no error.
    pub fn new(code: i16) -> Option<Self> {
        match code {
            0 => None,
            1 => Some(Self::OffsetOutOfRange),
            2 => Some(Self::CorruptMessage),
            3 => Some(Self::UnknownTopicOrPartition),
            4 => Some(Self::InvalidMessageSize),
            5 => Some(Self::LeaderNotAvailable),
            6 => Some(Self::NotLeaderForPartition),
            7 => Some(Self::RequestTimedOut),
            8 => Some(Self::BrokerNotAvailable),
            9 => Some(Self::ReplicaNotAvailable),
            10 => Some(Self::MessageSizeTooLarge),
            11 => Some(Self::StaleControllerEpoch),
            12 => Some(Self::OffsetMetadataTooLarge),
            13 => Some(Self::NetworkException),
            14 => Some(Self::GroupLoadInProgress),
            15 => Some(Self::GroupCoordinatorNotAvailable),
            16 => Some(Self::NotCoordinatorForGroup),
            17 => Some(Self::InvalidTopic),
            18 => Some(Self::RecordListTooLarge),
            19 => Some(Self::NotEnoughReplicas),
            20 => Some(Self::NotEnoughReplicasAfterAppend),
            21 => Some(Self::InvalidRequiredAcks),
            22 => Some(Self::IllegalGeneration),
            23 => Some(Self::InconsistentGroupProtocol),
            24 => Some(Self::InvalidGroupId),
            25 => Some(Self::UnknownMemberId),
            26 => Some(Self::InvalidSessionTimeout),
            27 => Some(Self::RebalanceInProgress),
            28 => Some(Self::InvalidCommitOffsetSize),
            29 => Some(Self::TopicAuthorizationFailed),
            30 => Some(Self::GroupAuthorizationFailed),
            31 => Some(Self::ClusterAuthorizationFailed),
            32 => Some(Self::InvalidTimestamp),
            41 => Some(Self::NotController),
            other => Some(Self::Unknown(other)),
        }
    }

    /// The wire code for this error, the inverse of [`Error::new`].
    pub fn code(&self) -> i16 {
        match self {
            Self::OffsetOutOfRange => 1,
            Self::CorruptMessage => 2,
            Self::UnknownTopicOrPartition => 3,
            Self::InvalidMessageSize => 4,
            Self::LeaderNotAvailable => 5,
            Self::NotLeaderForPartition => 6,
            Self::RequestTimedOut => 7,
            Self::BrokerNotAvailable => 8,
            Self::ReplicaNotAvailable => 9,
            Self::MessageSizeTooLarge => 10,
            Self::StaleControllerEpoch => 11,
            Self::OffsetMetadataTooLarge => 12,
            Self::NetworkException => 13,
            Self::GroupLoadInProgress => 14,
            Self::GroupCoordinatorNotAvailable => 15,
            Self::NotCoordinatorForGroup => 16,
            Self::InvalidTopic => 17,
            Self::RecordListTooLarge => 18,
            Self::NotEnoughReplicas => 19,
            Self::NotEnoughReplicasAfterAppend => 20,
            Self::InvalidRequiredAcks => 21,
            Self::IllegalGeneration => 22,
            Self::InconsistentGroupProtocol => 23,
            Self::InvalidGroupId => 24,
            Self::UnknownMemberId => 25,
            Self::InvalidSessionTimeout => 26,
            Self::RebalanceInProgress => 27,
            Self::InvalidCommitOffsetSize => 28,
            Self::TopicAuthorizationFailed => 29,
            Self::GroupAuthorizationFailed => 30,
            Self::ClusterAuthorizationFailed => 31,
            Self::InvalidTimestamp => 32,
            Self::NotController => 41,
            Self::Unknown(code) => *code,
        }
    }

    /// Whether a client may simply retry the same request against the same broker without
    /// refreshing cluster metadata first. See spec.md's retry/backoff classification.
    pub fn is_retriable_local(&self) -> bool {
        matches!(
            self,
            Self::RequestTimedOut
                | Self::GroupLoadInProgress
                | Self::RebalanceInProgress
                | Self::NetworkException
        )
    }

    /// Whether the client's cached cluster metadata is stale and must be refreshed before
    /// retrying.
    pub fn requires_metadata_refresh(&self) -> bool {
        matches!(
            self,
            Self::LeaderNotAvailable
                | Self::NotLeaderForPartition
                | Self::UnknownTopicOrPartition
                | Self::NotCoordinatorForGroup
                | Self::GroupCoordinatorNotAvailable
                | Self::NotController
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_error_is_none() {
        assert_eq!(Error::new(0), None);
    }

    #[test]
    fn code_roundtrips() {
        for code in [1i16, 6, 15, 23, 27, 41] {
            let err = Error::new(code).unwrap();
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn unknown_code_does_not_fail_to_decode() {
        let err = Error::new(9999).unwrap();
        assert_eq!(err, Error::Unknown(9999));
    }

    #[test]
    fn unknown_topic_or_partition_requires_metadata_refresh() {
        assert!(Error::UnknownTopicOrPartition.requires_metadata_refresh());
    }
}
