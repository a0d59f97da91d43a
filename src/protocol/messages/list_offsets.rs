//! `ListOffsets` request and response, version 0.

use std::io::{Read, Write};

use super::{RequestBody, read_versioned_array, write_versioned_array};
use crate::protocol::api_key::ApiKey;
use crate::protocol::api_version::{ApiVersion, ApiVersionRange};
use crate::protocol::error::Error;
use crate::protocol::traits::{
    ReadError, ReadType, ReadVersionedType, WriteError, WriteType, WriteVersionedType,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOffsetsRequestPartition {
    pub partition_index: i32,
    /// `-1` = latest offset, `-2` = earliest offset, per the classic special values.
    pub timestamp: i64,
    pub max_num_offsets: i32,
}

impl<W: Write> WriteVersionedType<W> for ListOffsetsRequestPartition {
    fn write_versioned(&self, writer: &mut W, _version: ApiVersion) -> Result<(), WriteError> {
        self.partition_index.write(writer)?;
        self.timestamp.write(writer)?;
        self.max_num_offsets.write(writer)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOffsetsRequestTopic {
    pub name: String,
    pub partitions: Vec<ListOffsetsRequestPartition>,
}

impl<W: Write> WriteVersionedType<W> for ListOffsetsRequestTopic {
    fn write_versioned(&self, writer: &mut W, version: ApiVersion) -> Result<(), WriteError> {
        self.name.write(writer)?;
        write_versioned_array(writer, version, Some(&self.partitions))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOffsetsRequest {
    /// Broker id of the requestor, or `-1` for a normal consumer.
    pub replica_id: i32,
    pub topics: Vec<ListOffsetsRequestTopic>,
}

impl RequestBody for ListOffsetsRequest {
    type ResponseBody = ListOffsetsResponse;
    const API_KEY: ApiKey = ApiKey::ListOffsets;
    const API_VERSION_RANGE: ApiVersionRange = ApiVersionRange::new(0, 0);
}

impl<W: Write> WriteVersionedType<W> for ListOffsetsRequest {
    fn write_versioned(&self, writer: &mut W, version: ApiVersion) -> Result<(), WriteError> {
        self.replica_id.write(writer)?;
        write_versioned_array(writer, version, Some(&self.topics))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOffsetsResponsePartition {
    pub partition_index: i32,
    pub error: Option<Error>,
    pub offsets: Vec<i64>,
}

impl<R: Read> ReadVersionedType<R> for ListOffsetsResponsePartition {
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            partition_index: i32::read(reader)?,
            error: Error::new(i16::read(reader)?),
            offsets: Vec::<i64>::read(reader)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOffsetsResponseTopic {
    pub name: String,
    pub partitions: Vec<ListOffsetsResponsePartition>,
}

impl<R: Read> ReadVersionedType<R> for ListOffsetsResponseTopic {
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            name: String::read(reader)?,
            partitions: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOffsetsResponse {
    pub topics: Vec<ListOffsetsResponseTopic>,
}

impl<R: Read> ReadVersionedType<R> for ListOffsetsResponse {
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
    fn request_one_block() {
        let req = ListOffsetsRequest {
            replica_id: -1,
            topics: vec![ListOffsetsRequestTopic {
                name: "foo".to_string(),
                partitions: vec![ListOffsetsRequestPartition {
                    partition_index: 4,
                    timestamp: 1,
                    max_num_offsets: 2,
                }],
            }],
        };
        let mut buf = vec![];
        req.write_versioned(&mut buf, ApiVersion(0)).unwrap();
        let want = [
            0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x01, 0x00, 0x03, b'f', b'o', b'o', 0x00,
            0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00, 0x02,
        ];
        assert_eq!(buf, want);
    }

    #[test]
    fn response_roundtrip() {
        let data = [
            0x00, 0x00, 0x00, 0x01, // 1 topic
            0x00, 0x01, b'z', // name
            0x00, 0x00, 0x00, 0x01, // 1 partition
            0x00, 0x00, 0x00, 0x02, // partition_index 2
            0x00, 0x00, // no error
            0x00, 0x00, 0x00, 0x02, // 2 offsets
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x06,
        ];
        let resp = ListOffsetsResponse::read_versioned(&mut Cursor::new(data), ApiVersion(0)).unwrap();
        assert_eq!(resp.topics[0].partitions[0].offsets, vec![5, 6]);
    }
}
