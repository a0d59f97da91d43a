//! The embedded `ConsumerProtocol` metadata and assignment payloads.
//!
//! `JoinGroupRequest` protocols and `SyncGroupResponse` assignments carry opaque byte
//! blobs on the wire; their contents follow the same `ConsumerProtocolSubscription` /
//! `ConsumerProtocolAssignment` encoding Kafka clients use, independent of the request
//! API version. Only the base (version 0) shape is implemented here: subscribed topics,
//! user data, and a flat per-topic partition assignment. Cooperative-rebalancing extras
//! (owned partitions, generation id, rack id) are not modeled.

use std::io::{Read, Write};

use crate::protocol::traits::{ReadError, ReadType, WriteError, WriteType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerGroupMemberMetadata {
    pub version: i16,
    pub topics: Vec<String>,
    pub user_data: Vec<u8>,
}

impl<R: Read> ReadType<R> for ConsumerGroupMemberMetadata {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let version = i16::read(reader)?;

        let len = usize::try_from(i32::read(reader)?)?;
        let mut topics = Vec::with_capacity(len);
        for _ in 0..len {
            topics.push(String::read(reader)?);
        }

        let user_data = Vec::<u8>::read(reader)?;

        Ok(Self {
            version,
            topics,
            user_data,
        })
    }
}

impl<W: Write> WriteType<W> for ConsumerGroupMemberMetadata {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.version.write(writer)?;

        let len = i32::try_from(self.topics.len())?;
        len.write(writer)?;
        for topic in &self.topics {
            topic.write(writer)?;
        }

        self.user_data.write(writer)?;

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionAssignment {
    pub topic: String,
    pub partitions: Vec<i32>,
}

impl<R: Read> ReadType<R> for PartitionAssignment {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let topic = String::read(reader)?;

        let len = usize::try_from(i32::read(reader)?)?;
        let mut partitions = Vec::with_capacity(len);
        for _ in 0..len {
            partitions.push(i32::read(reader)?);
        }

        Ok(Self { topic, partitions })
    }
}

impl<W: Write> WriteType<W> for PartitionAssignment {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.topic.write(writer)?;

        let len = i32::try_from(self.partitions.len())?;
        len.write(writer)?;
        for partition in &self.partitions {
            partition.write(writer)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerGroupMemberAssignment {
    pub version: i16,
    pub topics: Vec<PartitionAssignment>,
    pub user_data: Vec<u8>,
}

impl<R: Read> ReadType<R> for ConsumerGroupMemberAssignment {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let version = i16::read(reader)?;

        let len = usize::try_from(i32::read(reader)?)?;
        let mut topics = Vec::with_capacity(len);
        for _ in 0..len {
            topics.push(PartitionAssignment::read(reader)?);
        }

        let user_data = Vec::<u8>::read(reader)?;

        Ok(Self {
            version,
            topics,
            user_data,
        })
    }
}

impl<W: Write> WriteType<W> for ConsumerGroupMemberAssignment {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.version.write(writer)?;

        let len = i32::try_from(self.topics.len())?;
        len.write(writer)?;
        for topic in &self.topics {
            topic.write(writer)?;
        }

        self.user_data.write(writer)?;

        Ok(())
    }
}

impl ConsumerGroupMemberAssignment {
    pub fn encode(&self) -> Result<Vec<u8>, WriteError> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }
}

impl ConsumerGroupMemberMetadata {
    pub fn encode(&self) -> Result<Vec<u8>, WriteError> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn member_metadata_roundtrip() {
        let metadata = ConsumerGroupMemberMetadata {
            version: 0,
            topics: vec!["one".into(), "two".into()],
            user_data: vec![0x01, 0x02, 0x03],
        };
        let data = [
            0, 0, // version
            0, 0, 0, 2, // topic array length
            0, 3, b'o', b'n', b'e', // "one"
            0, 3, b't', b'w', b'o', // "two"
            0, 0, 0, 3, 0x01, 0x02, 0x03, // user data
        ];

        let mut buf = vec![];
        metadata.write(&mut buf).unwrap();
        assert_eq!(buf, data);

        let decoded =
            ConsumerGroupMemberMetadata::read(&mut Cursor::new(data.as_slice())).unwrap();
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn member_assignment_roundtrip() {
        let want = ConsumerGroupMemberAssignment {
            version: 0,
            topics: vec![PartitionAssignment {
                topic: "one".to_string(),
                partitions: vec![0, 2, 4],
            }],
            user_data: vec![0x01, 0x02, 0x03],
        };

        let data = [
            0, 0, // version
            0, 0, 0, 1, // topic array length
            0, 3, b'o', b'n', b'e', // "one"
            0, 0, 0, 3, // partition array length
            0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 4, // 0, 2, 4
            0, 0, 0, 3, 0x01, 0x02, 0x03, // user data
        ];

        let got = ConsumerGroupMemberAssignment::read(&mut Cursor::new(data.as_slice())).unwrap();
        assert_eq!(got, want);

        let mut buf = vec![];
        want.write(&mut buf).unwrap();
        assert_eq!(buf, data);
    }
}
