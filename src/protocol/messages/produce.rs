//! `Produce` request/response, version 0.
//!
//! Unlike every other message in this module, there is no teacher equivalent to adapt: the
//! teacher's `Produce` carries the modern `RecordBatch` (v2) format. This body instead embeds the
//! classic [`RecordSet`](crate::protocol::record::RecordSet) per spec.md's MessageSet wire format.

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
pub struct ProducePartitionRequest {
    pub partition_index: i32,
    pub record_set: RecordSet,
}

impl<W: Write> WriteVersionedType<W> for ProducePartitionRequest {
    fn write_versioned(&self, writer: &mut W, _version: ApiVersion) -> Result<(), WriteError> {
        self.partition_index.write(writer)?;

        let mut body = vec![];
        self.record_set.write_uncompressed(&mut body)?;
        let len = i32::try_from(body.len()).map_err(WriteError::Overflow)?;
        len.write(writer)?;
        writer.write_all(&body)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceTopicRequest {
    pub name: String,
    pub partitions: Vec<ProducePartitionRequest>,
}

impl<W: Write> WriteVersionedType<W> for ProduceTopicRequest {
    fn write_versioned(&self, writer: &mut W, version: ApiVersion) -> Result<(), WriteError> {
        self.name.write(writer)?;
        write_versioned_array(writer, version, Some(&self.partitions))
    }
}

/// `acks`: `0` = fire-and-forget, `1` = leader ack, `-1` = all in-sync replicas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceRequest {
    pub acks: i16,
    pub timeout_ms: i32,
    pub topics: Vec<ProduceTopicRequest>,
}

impl RequestBody for ProduceRequest {
    type ResponseBody = ProduceResponse;
    const API_KEY: ApiKey = ApiKey::Produce;
    const API_VERSION_RANGE: ApiVersionRange = ApiVersionRange::new(0, 0);
}

impl<W: Write> WriteVersionedType<W> for ProduceRequest {
    fn write_versioned(&self, writer: &mut W, version: ApiVersion) -> Result<(), WriteError> {
        self.acks.write(writer)?;
        self.timeout_ms.write(writer)?;
        write_versioned_array(writer, version, Some(&self.topics))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducePartitionResponse {
    pub partition_index: i32,
    pub error: Option<Error>,
    pub base_offset: i64,
}

impl<R: Read> ReadVersionedType<R> for ProducePartitionResponse {
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            partition_index: i32::read(reader)?,
            error: Error::new(i16::read(reader)?),
            base_offset: i64::read(reader)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceTopicResponse {
    pub name: String,
    pub partitions: Vec<ProducePartitionResponse>,
}

impl<R: Read> ReadVersionedType<R> for ProduceTopicResponse {
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            name: String::read(reader)?,
            partitions: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceResponse {
    pub topics: Vec<ProduceTopicResponse>,
}

impl<R: Read> ReadVersionedType<R> for ProduceResponse {
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
    use crate::compression::Compression;
    use crate::protocol::record::{MAGIC_BYTE, Message, Record};

    fn sample_record_set() -> RecordSet {
        RecordSet(vec![Record {
            offset: 0,
            message: Message {
                magic: MAGIC_BYTE,
                compression: Compression::None,
                key: None,
                value: Some(b"hello".to_vec()),
            },
        }])
    }

    #[test]
    fn request_roundtrip_shape() {
        let req = ProduceRequest {
            acks: 1,
            timeout_ms: 1000,
            topics: vec![ProduceTopicRequest {
                name: "topic1".to_string(),
                partitions: vec![ProducePartitionRequest {
                    partition_index: 0,
                    record_set: sample_record_set(),
                }],
            }],
        };
        let mut buf = vec![];
        req.write_versioned(&mut buf, ApiVersion(0)).unwrap();

        assert_eq!(&buf[0..2], &[0x00, 0x01]); // acks
        assert_eq!(&buf[2..6], &[0x00, 0x00, 0x03, 0xe8]); // timeout_ms
        assert_eq!(&buf[6..10], &[0x00, 0x00, 0x00, 0x01]); // 1 topic
    }

    #[test]
    fn response_roundtrip() {
        let data = [
            0x00, 0x00, 0x00, 0x01, // 1 topic
            0x00, 0x03, b'f', b'o', b'o', // name
            0x00, 0x00, 0x00, 0x01, // 1 partition
            0x00, 0x00, 0x00, 0x00, // partition_index 0
            0x00, 0x00, // no error
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2a, // base_offset 42
        ];
        let resp = ProduceResponse::read_versioned(&mut Cursor::new(data), ApiVersion(0)).unwrap();
        assert_eq!(resp.topics.len(), 1);
        assert_eq!(resp.topics[0].name, "foo");
        assert_eq!(resp.topics[0].partitions[0].base_offset, 42);
        assert_eq!(resp.topics[0].partitions[0].error, None);
    }
}
