//! `OffsetFetch` request and response, version 0.

use std::io::{Read, Write};

use super::{RequestBody, read_versioned_array, write_versioned_array};
use crate::protocol::api_key::ApiKey;
use crate::protocol::api_version::{ApiVersion, ApiVersionRange};
use crate::protocol::error::Error;
use crate::protocol::traits::{
    ReadError, ReadType, ReadVersionedType, WriteError, WriteType, WriteVersionedType,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetFetchRequestTopic {
    pub name: String,
    pub partition_indexes: Vec<i32>,
}

impl<W: Write> WriteVersionedType<W> for OffsetFetchRequestTopic {
    fn write_versioned(&self, writer: &mut W, _version: ApiVersion) -> Result<(), WriteError> {
        self.name.write(writer)?;
        let len = i32::try_from(self.partition_indexes.len()).map_err(WriteError::Overflow)?;
        len.write(writer)?;
        for index in &self.partition_indexes {
            index.write(writer)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetFetchRequest {
    pub group_id: String,
    /// Empty means "fetch offsets for all topics known to the group".
    pub topics: Vec<OffsetFetchRequestTopic>,
}

impl RequestBody for OffsetFetchRequest {
    type ResponseBody = OffsetFetchResponse;
    const API_KEY: ApiKey = ApiKey::OffsetFetch;
    const API_VERSION_RANGE: ApiVersionRange = ApiVersionRange::new(0, 0);
}

impl<W: Write> WriteVersionedType<W> for OffsetFetchRequest {
    fn write_versioned(&self, writer: &mut W, version: ApiVersion) -> Result<(), WriteError> {
        self.group_id.write(writer)?;
        write_versioned_array(writer, version, Some(&self.topics))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetFetchResponseTopicPartition {
    pub partition_index: i32,
    pub committed_offset: i64,
    pub metadata: Option<String>,
    pub error: Option<Error>,
}

impl<R: Read> ReadVersionedType<R> for OffsetFetchResponseTopicPartition {
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            partition_index: i32::read(reader)?,
            committed_offset: i64::read(reader)?,
            metadata: Option::<String>::read(reader)?,
            error: Error::new(i16::read(reader)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetFetchResponseTopic {
    pub name: String,
    pub partitions: Vec<OffsetFetchResponseTopicPartition>,
}

impl<R: Read> ReadVersionedType<R> for OffsetFetchResponseTopic {
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            name: String::read(reader)?,
            partitions: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetFetchResponse {
    pub topics: Vec<OffsetFetchResponseTopic>,
}

impl<R: Read> ReadVersionedType<R> for OffsetFetchResponse {
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            topics: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn request_one_partition() {
        let req = OffsetFetchRequest {
            group_id: "blah".to_string(),
            topics: vec![OffsetFetchRequestTopic {
                name: "topicTheFirst".to_string(),
                partition_indexes: vec![0x4f4f4f4f],
            }],
        };
        let mut buf = vec![];
        req.write_versioned(&mut buf, ApiVersion(0)).unwrap();
        let want = [
            0x00, 0x04, b'b', b'l', b'a', b'h', 0x00, 0x00, 0x00, 0x01, 0x00, 0x0D, b't', b'o',
            b'p', b'i', b'c', b'T', b'h', b'e', b'F', b'i', b'r', b's', b't', 0x00, 0x00, 0x00,
            0x01, 0x4F, 0x4F, 0x4F, 0x4F,
        ];
        assert_eq!(buf, want);
    }

    #[test]
    fn response_empty() {
        let data = [0x00, 0x00, 0x00, 0x00];
        let resp = OffsetFetchResponse::read_versioned(&mut Cursor::new(data), ApiVersion(0)).unwrap();
        assert!(resp.topics.is_empty());
    }
}
