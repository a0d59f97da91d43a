//! `Fetch` request/response, version 0.

use std::io::{Read, Write};

use super::{RequestBody, read_versioned_array, write_versioned_array};
use crate::protocol::api_key::ApiKey;
use crate::protocol::api_version::{ApiVersion, ApiVersionRange};
use crate::protocol::error::Error;
use crate::protocol::record::RecordSet;
use crate::protocol::traits::{
    ReadError, ReadType, ReadVersionedType, WriteError, WriteType, WriteVersionedType,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequestPartition {
    pub partition: i32,
    pub fetch_offset: i64,
    pub partition_max_bytes: i32,
}

impl<W: Write> WriteVersionedType<W> for FetchRequestPartition {
    fn write_versioned(&self, writer: &mut W, _version: ApiVersion) -> Result<(), WriteError> {
        self.partition.write(writer)?;
        self.fetch_offset.write(writer)?;
        self.partition_max_bytes.write(writer)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequestTopic {
    pub topic: String,
    pub partitions: Vec<FetchRequestPartition>,
}

impl<W: Write> WriteVersionedType<W> for FetchRequestTopic {
    fn write_versioned(&self, writer: &mut W, version: ApiVersion) -> Result<(), WriteError> {
        self.topic.write(writer)?;
        write_versioned_array(writer, version, Some(&self.partitions))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Broker id of the follower, or `-1` for a consumer request.
    pub replica_id: i32,
    pub max_wait_ms: i32,
    pub min_bytes: i32,
    pub topics: Vec<FetchRequestTopic>,
}

impl RequestBody for FetchRequest {
    type ResponseBody = FetchResponse;
    const API_KEY: ApiKey = ApiKey::Fetch;
    const API_VERSION_RANGE: ApiVersionRange = ApiVersionRange::new(0, 0);
}

impl<W: Write> WriteVersionedType<W> for FetchRequest {
    fn write_versioned(&self, writer: &mut W, version: ApiVersion) -> Result<(), WriteError> {
        self.replica_id.write(writer)?;
        self.max_wait_ms.write(writer)?;
        self.min_bytes.write(writer)?;
        write_versioned_array(writer, version, Some(&self.topics))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponsePartition {
    pub partition_index: i32,
    pub error: Option<Error>,
    pub high_watermark: i64,
    pub record_set: RecordSet,
}

impl<R: Read> ReadVersionedType<R> for FetchResponsePartition {
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadError> {
        let partition_index = i32::read(reader)?;
        let error = Error::new(i16::read(reader)?);
        let high_watermark = i64::read(reader)?;
        let raw = Vec::<u8>::read(reader)?;
        let record_set = RecordSet::parse(&raw)?;
        Ok(Self {
            partition_index,
            error,
            high_watermark,
            record_set,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponseTopic {
    pub topic: String,
    pub partitions: Vec<FetchResponsePartition>,
}

impl<R: Read> ReadVersionedType<R> for FetchResponseTopic {
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            topic: String::read(reader)?,
            partitions: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub responses: Vec<FetchResponseTopic>,
}

impl<R: Read> ReadVersionedType<R> for FetchResponse {
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            responses: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn request_roundtrip_shape() {
        let req = FetchRequest {
            replica_id: -1,
            max_wait_ms: 100,
            min_bytes: 1,
            topics: vec![FetchRequestTopic {
                topic: "topic".to_string(),
                partitions: vec![FetchRequestPartition {
                    partition: 0x12,
                    fetch_offset: 0x34,
                    partition_max_bytes: 0x56,
                }],
            }],
        };
        let mut buf = vec![];
        req.write_versioned(&mut buf, ApiVersion(0)).unwrap();
        let want = [
            0xFF, 0xFF, 0xFF, 0xFF, // replica_id
            0x00, 0x00, 0x00, 0x64, // max_wait_ms
            0x00, 0x00, 0x00, 0x01, // min_bytes
            0x00, 0x00, 0x00, 0x01, // 1 topic
            0x00, 0x05, b't', b'o', b'p', b'i', b'c',
            0x00, 0x00, 0x00, 0x01, // 1 partition
            0x00, 0x00, 0x00, 0x12, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x34,
            0x00, 0x00, 0x00, 0x56,
        ];
        assert_eq!(buf, want);
    }

    #[test]
    fn response_with_empty_record_set() {
        let data = [
            0x00, 0x00, 0x00, 0x01, // 1 topic
            0x00, 0x05, b't', b'o', b'p', b'i', b'c', // topic
            0x00, 0x00, 0x00, 0x01, // 1 partition
            0x00, 0x00, 0x00, 0x05, // partition_index 5
            0x00, 0x00, // no error
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, // high_watermark
            0x00, 0x00, 0x00, 0x00, // record set size 0
        ];
        let resp = FetchResponse::read_versioned(&mut Cursor::new(data), ApiVersion(0)).unwrap();
        assert_eq!(resp.responses[0].partitions[0].partition_index, 5);
        assert_eq!(resp.responses[0].partitions[0].high_watermark, 0x10);
        assert!(resp.responses[0].partitions[0].record_set.0.is_empty());
    }
}
