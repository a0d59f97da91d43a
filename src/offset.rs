//! Per-partition offset tracking (spec.md 4.E): the "next offset to fetch" cursor kept locally
//! for an unmanaged consumer, and mirrored to the group coordinator via `OffsetCommit`/
//! `OffsetFetch` for a managed one. Autocommit scheduling (when a commit fires) lives with the
//! group state machine, which is the only layer that knows when a generation is `Stable`.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::connection::Messenger;
use crate::protocol::messages::offset_commit::{OffsetCommitRequest, PartitionCommit, TopicCommit};
use crate::protocol::messages::offset_fetch::{OffsetFetchRequest, OffsetFetchRequestTopic};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Connection(#[from] crate::connection::Error),

    #[error("broker rejected the offset commit for {topic}-{partition}: {error:?}")]
    CommitRejected {
        topic: String,
        partition: i32,
        error: crate::protocol::error::Error,
    },

    #[error("broker rejected the offset fetch for {topic}-{partition}: {error:?}")]
    FetchRejected {
        topic: String,
        partition: i32,
        error: crate::protocol::error::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// No committed offset exists for a partition: `OffsetFetch` reports this as `-1`.
const NO_COMMITTED_OFFSET: i64 = -1;

/// The next offset to read for each `(topic, partition)` this consumer has seen. A missing entry
/// means "use the caller-configured starting position" (the `start` parameter at subscribe time).
#[derive(Debug, Default)]
pub struct OffsetTable {
    offsets: RwLock<HashMap<(String, i32), i64>>,
}

impl OffsetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, topic: &str, partition: i32) -> Option<i64> {
        self.offsets.read().get(&(topic.to_string(), partition)).copied()
    }

    /// Records that offsets up to (but not including) `next_offset` have been delivered.
    /// Never moves the cursor backwards: a local consumer that re-delivers or replays a batch
    /// must not un-commit progress already reported to the caller.
    pub fn advance(&self, topic: &str, partition: i32, next_offset: i64) {
        let mut offsets = self.offsets.write();
        let entry = offsets.entry((topic.to_string(), partition)).or_insert(next_offset);
        if next_offset > *entry {
            *entry = next_offset;
        }
    }

    pub fn set(&self, topic: &str, partition: i32, offset: i64) {
        self.offsets.write().insert((topic.to_string(), partition), offset);
    }
}

/// Commits `offset` as the next offset to read for `(topic, partition)` on behalf of `group_id`
/// at the given generation/member. Returns [`Error::CommitRejected`] on a non-retriable broker
/// response; callers decide whether to retry a retriable one.
pub async fn commit_remote(
    conn: &Messenger,
    group_id: &str,
    generation_id: i32,
    member_id: &str,
    topic: &str,
    partition: i32,
    offset: i64,
) -> Result<()> {
    let request = OffsetCommitRequest {
        group_id: group_id.to_string(),
        generation_id,
        member_id: member_id.to_string(),
        topics: vec![TopicCommit {
            name: topic.to_string(),
            partitions: vec![PartitionCommit {
                partition_index: partition,
                committed_offset: offset,
                commit_timestamp: -1,
                committed_metadata: None,
            }],
        }],
    };

    let response = conn.request(&request).await?;
    for topic_result in response.topics {
        for partition_result in topic_result.partitions {
            if let Some(error) = partition_result.error {
                return Err(Error::CommitRejected {
                    topic: topic_result.name,
                    partition: partition_result.partition_index,
                    error,
                });
            }
        }
    }
    Ok(())
}

/// Fetches the last committed offset for `(topic, partition)` under `group_id`. Returns `None`
/// when the group has never committed an offset for this partition.
pub async fn fetch_remote(
    conn: &Messenger,
    group_id: &str,
    topic: &str,
    partition: i32,
) -> Result<Option<i64>> {
    let request = OffsetFetchRequest {
        group_id: group_id.to_string(),
        topics: vec![OffsetFetchRequestTopic {
            name: topic.to_string(),
            partition_indexes: vec![partition],
        }],
    };

    let response = conn.request(&request).await?;
    for topic_result in response.topics {
        for partition_result in topic_result.partitions {
            if let Some(error) = partition_result.error {
                return Err(Error::FetchRejected {
                    topic: topic_result.name,
                    partition: partition_result.partition_index,
                    error,
                });
            }
            if partition_result.partition_index == partition {
                return Ok(if partition_result.committed_offset == NO_COMMITTED_OFFSET {
                    None
                } else {
                    Some(partition_result.committed_offset)
                });
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_never_moves_backwards() {
        let table = OffsetTable::new();
        table.advance("t", 0, 10);
        table.advance("t", 0, 5);
        assert_eq!(table.get("t", 0), Some(10));
    }

    #[test]
    fn set_overrides_unconditionally() {
        let table = OffsetTable::new();
        table.advance("t", 0, 10);
        table.set("t", 0, 3);
        assert_eq!(table.get("t", 0), Some(3));
    }

    #[test]
    fn missing_partition_is_none() {
        let table = OffsetTable::new();
        assert_eq!(table.get("t", 0), None);
    }
}
