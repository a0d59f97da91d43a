use std::io::{Read, Write};

use super::{RequestBody, read_versioned_array, write_versioned_array};
use crate::protocol::api_version::{ApiVersion, ApiVersionRange};
use crate::protocol::error::Error;
use crate::protocol::traits::{
    ReadError, ReadType, ReadVersionedType, WriteError, WriteType, WriteVersionedType,
};
use crate::protocol::api_key::ApiKey;

#[derive(Debug)]
pub struct MetadataRequestTopic {
    pub name: String,
}

impl<W: Write> WriteVersionedType<W> for MetadataRequestTopic {
    fn write_versioned(&self, writer: &mut W, _version: ApiVersion) -> Result<(), WriteError> {
        self.name.write(writer)
    }
}

/// `None` requests metadata for all topics known to the cluster.
#[derive(Debug)]
pub struct MetadataRequest {
    pub topics: Option<Vec<MetadataRequestTopic>>,
}

impl RequestBody for MetadataRequest {
    type ResponseBody = MetadataResponse;
    const API_KEY: ApiKey = ApiKey::Metadata;
    const API_VERSION_RANGE: ApiVersionRange = ApiVersionRange::new(0, 0);
}

impl<W: Write> WriteVersionedType<W> for MetadataRequest {
    fn write_versioned(&self, writer: &mut W, version: ApiVersion) -> Result<(), WriteError> {
        write_versioned_array(writer, version, self.topics.as_ref())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MetadataResponseBroker {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
}

impl<R: Read> ReadVersionedType<R> for MetadataResponseBroker {
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            node_id: i32::read(reader)?,
            host: String::read(reader)?,
            port: i32::read(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MetadataResponsePartition {
    pub error: Option<Error>,
    pub partition_index: i32,
    pub leader_id: i32,
    pub replica_nodes: Vec<i32>,
    pub isr_nodes: Vec<i32>,
}

impl<R: Read> ReadVersionedType<R> for MetadataResponsePartition {
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            error: Error::new(i16::read(reader)?),
            partition_index: i32::read(reader)?,
            leader_id: i32::read(reader)?,
            replica_nodes: Vec::<i32>::read(reader)?,
            isr_nodes: Vec::<i32>::read(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MetadataResponseTopic {
    pub error: Option<Error>,
    pub name: String,
    pub partitions: Vec<MetadataResponsePartition>,
}

impl<R: Read> ReadVersionedType<R> for MetadataResponseTopic {
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            error: Error::new(i16::read(reader)?),
            name: String::read(reader)?,
            partitions: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MetadataResponse {
    pub brokers: Vec<MetadataResponseBroker>,
    pub topics: Vec<MetadataResponseTopic>,
}

impl<R: Read> ReadVersionedType<R> for MetadataResponse {
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            brokers: read_versioned_array(reader, version)?.unwrap_or_default(),
            topics: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn request_no_topics() {
        let req = MetadataRequest { topics: Some(vec![]) };
        let mut buf = vec![];
        req.write_versioned(&mut buf, ApiVersion(0)).unwrap();
        assert_eq!(buf, [0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn request_one_topic() {
        let req = MetadataRequest {
            topics: Some(vec![MetadataRequestTopic {
                name: "topic1".to_string(),
            }]),
        };
        let mut buf = vec![];
        req.write_versioned(&mut buf, ApiVersion(0)).unwrap();
        assert_eq!(
            buf,
            [0x00, 0x00, 0x00, 0x01, 0x00, 0x06, b't', b'o', b'p', b'i', b'c', b'1']
        );
    }

    #[test]
    fn response_roundtrip() {
        let data = [
            0x00, 0x00, 0x00, 0x01, // 1 broker
            0x00, 0x00, 0x00, 0x01, // node id 1
            0x00, 0x09, b'l', b'o', b'c', b'a', b'l', b'h', b'o', b's', b't', // host
            0x00, 0x00, 0x23, 0x84, // port 9092
            0x00, 0x00, 0x00, 0x01, // 1 topic
            0x00, 0x00, // no error
            0x00, 0x03, b'f', b'o', b'o', // name
            0x00, 0x00, 0x00, 0x00, // 0 partitions
        ];
        let resp = MetadataResponse::read_versioned(&mut Cursor::new(data), ApiVersion(0)).unwrap();
        assert_eq!(resp.brokers.len(), 1);
        assert_eq!(resp.brokers[0].host, "localhost");
        assert_eq!(resp.topics.len(), 1);
        assert_eq!(resp.topics[0].name, "foo");
    }
}
