//! `OffsetCommit` request and response, version 0.

use std::io::{Read, Write};

use super::{RequestBody, read_versioned_array, write_versioned_array};
use crate::protocol::api_key::ApiKey;
use crate::protocol::api_version::{ApiVersion, ApiVersionRange};
use crate::protocol::error::Error;
use crate::protocol::traits::{
    ReadError, ReadType, ReadVersionedType, WriteError, WriteType, WriteVersionedType,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionCommit {
    pub partition_index: i32,
    pub committed_offset: i64,
    pub commit_timestamp: i64,
    pub committed_metadata: Option<String>,
}

impl<W: Write> WriteVersionedType<W> for PartitionCommit {
    fn write_versioned(&self, writer: &mut W, _version: ApiVersion) -> Result<(), WriteError> {
        self.partition_index.write(writer)?;
        self.committed_offset.write(writer)?;
        self.commit_timestamp.write(writer)?;
        self.committed_metadata.write(writer)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCommit {
    pub name: String,
    pub partitions: Vec<PartitionCommit>,
}

impl<W: Write> WriteVersionedType<W> for TopicCommit {
    fn write_versioned(&self, writer: &mut W, version: ApiVersion) -> Result<(), WriteError> {
        self.name.write(writer)?;
        write_versioned_array(writer, version, Some(&self.partitions))
    }
}

/// Generation/member id are carried in every version per spec.md's `GroupState`, even though the
/// upstream protocol only added them starting version 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetCommitRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    pub topics: Vec<TopicCommit>,
}

impl RequestBody for OffsetCommitRequest {
    type ResponseBody = OffsetCommitResponse;
    const API_KEY: ApiKey = ApiKey::OffsetCommit;
    const API_VERSION_RANGE: ApiVersionRange = ApiVersionRange::new(0, 0);
}

impl<W: Write> WriteVersionedType<W> for OffsetCommitRequest {
    fn write_versioned(&self, writer: &mut W, version: ApiVersion) -> Result<(), WriteError> {
        self.group_id.write(writer)?;
        self.generation_id.write(writer)?;
        self.member_id.write(writer)?;
        write_versioned_array(writer, version, Some(&self.topics))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionCommitResult {
    pub partition_index: i32,
    pub error: Option<Error>,
}

impl<R: Read> ReadVersionedType<R> for PartitionCommitResult {
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            partition_index: i32::read(reader)?,
            error: Error::new(i16::read(reader)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCommitResult {
    pub name: String,
    pub partitions: Vec<PartitionCommitResult>,
}

impl<R: Read> ReadVersionedType<R> for TopicCommitResult {
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            name: String::read(reader)?,
            partitions: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetCommitResponse {
    pub topics: Vec<TopicCommitResult>,
}

impl<R: Read> ReadVersionedType<R> for OffsetCommitResponse {
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            topics: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn request_with_topic() {
        let req = OffsetCommitRequest {
            group_id: "foobar".to_string(),
            generation_id: 0x1122,
            member_id: "cons".to_string(),
            topics: vec![TopicCommit {
                name: "topic".to_string(),
                partitions: vec![PartitionCommit {
                    partition_index: 0x5221,
                    committed_offset: 0xDEADBEEF,
                    commit_timestamp: -1,
                    committed_metadata: Some("metadata".into()),
                }],
            }],
        };
        let mut buf = vec![];
        req.write_versioned(&mut buf, ApiVersion(0)).unwrap();
        let want = vec![
            0x00, 0x06, b'f', b'o', b'o', b'b', b'a', b'r', // group
            0x00, 0x00, 0x11, 0x22, // generation id
            0x00, 0x04, b'c', b'o', b'n', b's', // member id
            0x00, 0x00, 0x00, 0x01, // topics
            0x00, 0x05, b't', b'o', b'p', b'i', b'c', // topic name
            0x00, 0x00, 0x00, 0x01, // partitions
            0x00, 0x00, 0x52, 0x21, // partition index
            0x00, 0x00, 0x00, 0x00, 0xDE, 0xAD, 0xBE, 0xEF, // offset
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // timestamp
            0x00, 0x08, b'm', b'e', b't', b'a', b'd', b'a', b't', b'a', // metadata
        ];
        assert_eq!(buf, want);
    }

    #[test]
    fn response_roundtrip() {
        let data = [
            0x00, 0x00, 0x00, 0x01, // 1 topic
            0x00, 0x05, b't', b'o', b'p', b'i', b'c',
            0x00, 0x00, 0x00, 0x01, // 1 partition
            0x00, 0x00, 0x52, 0x21,
            0x00, 0x00, // no error
        ];
        let resp = OffsetCommitResponse::read_versioned(&mut Cursor::new(data), ApiVersion(0)).unwrap();
        assert_eq!(resp.topics[0].partitions[0].partition_index, 0x5221);
        assert_eq!(resp.topics[0].partitions[0].error, None);
    }
}
