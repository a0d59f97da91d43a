//! `SyncGroup` request/response, version 0.
//!
//! After `JoinGroup` completes, the elected leader computes the partition assignment for
//! every member and submits it here; the coordinator fans each member's slice back out
//! through the response. Non-leader members submit an empty assignment list and simply
//! wait for their own slice.

use std::io::{Cursor, Read, Write};

use super::{RequestBody, write_versioned_array};
use crate::protocol::api_key::ApiKey;
use crate::protocol::api_version::{ApiVersion, ApiVersionRange};
use crate::protocol::error::Error;
use crate::protocol::messages::assignment::ConsumerGroupMemberAssignment;
use crate::protocol::traits::{
    ReadError, ReadType, ReadVersionedType, WriteError, WriteType, WriteVersionedType,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncGroupRequestAssignment {
    pub member_id: String,
    pub assignment: Vec<u8>,
}

impl<W: Write> WriteVersionedType<W> for SyncGroupRequestAssignment {
    fn write_versioned(&self, writer: &mut W, _version: ApiVersion) -> Result<(), WriteError> {
        self.member_id.write(writer)?;
        self.assignment.write(writer)?;
        Ok(())
    }
}

impl<R: Read> ReadVersionedType<R> for SyncGroupRequestAssignment {
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            member_id: String::read(reader)?,
            assignment: Vec::<u8>::read(reader)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncGroupRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    pub assignments: Vec<SyncGroupRequestAssignment>,
}

impl RequestBody for SyncGroupRequest {
    type ResponseBody = SyncGroupResponse;
    const API_KEY: ApiKey = ApiKey::SyncGroup;
    const API_VERSION_RANGE: ApiVersionRange = ApiVersionRange::new(0, 0);
}

impl<W: Write> WriteVersionedType<W> for SyncGroupRequest {
    fn write_versioned(&self, writer: &mut W, version: ApiVersion) -> Result<(), WriteError> {
        self.group_id.write(writer)?;
        self.generation_id.write(writer)?;
        self.member_id.write(writer)?;
        write_versioned_array(writer, version, Some(&self.assignments))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncGroupResponse {
    pub error: Option<Error>,
    pub assignment: ConsumerGroupMemberAssignment,
}

impl<R: Read> ReadVersionedType<R> for SyncGroupResponse {
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadError> {
        let error = Error::new(i16::read(reader)?);

        let buf = Vec::<u8>::read(reader)?;
        let assignment = if buf.is_empty() {
            ConsumerGroupMemberAssignment {
                version: 0,
                topics: vec![],
                user_data: vec![],
            }
        } else {
            ConsumerGroupMemberAssignment::read(&mut Cursor::new(buf))?
        };

        Ok(Self { error, assignment })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::protocol::messages::assignment::PartitionAssignment;

    #[test]
    fn request_empty() {
        let req = SyncGroupRequest {
            group_id: "foo".to_string(),
            generation_id: 0x00010203,
            member_id: "baz".to_string(),
            assignments: vec![],
        };
        let mut buf = vec![];
        req.write_versioned(&mut buf, ApiVersion(0)).unwrap();
        assert_eq!(
            buf,
            [
                0, 3, b'f', b'o', b'o', // group id
                0x00, 0x01, 0x02, 0x03, // generation id
                0, 3, b'b', b'a', b'z', // member id
                0, 0, 0, 0, // no assignments
            ]
        );
    }

    #[test]
    fn request_populated() {
        let req = SyncGroupRequest {
            group_id: "foo".to_string(),
            generation_id: 0x00010203,
            member_id: "baz".to_string(),
            assignments: vec![SyncGroupRequestAssignment {
                member_id: "baz".to_string(),
                assignment: vec![b'f', b'o', b'o'],
            }],
        };
        let mut buf = vec![];
        req.write_versioned(&mut buf, ApiVersion(0)).unwrap();
        assert_eq!(
            buf,
            [
                0, 3, b'f', b'o', b'o', // group id
                0x00, 0x01, 0x02, 0x03, // generation id
                0, 3, b'b', b'a', b'z', // member id
                0, 0, 0, 1, // one assignment
                0, 3, b'b', b'a', b'z', // member id
                0, 0, 0, 3, b'f', b'o', b'o', // assignment bytes
            ]
        );
    }

    #[test]
    fn response_no_error() {
        let data = [
            0x00, 0x00, // no error
            0, 0, 0, 34, // assignment length
            0, 0, // version
            0, 0, 0, 1, // topic array length
            0, 3, b'o', b'n', b'e', // topic one
            0, 0, 0, 3, // one's partition array length
            0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 4, // 0, 2, 4
            0, 0, 0, 3, 0x01, 0x02, 0x03, // user data
        ];
        let got = SyncGroupResponse::read_versioned(&mut Cursor::new(data), ApiVersion(0)).unwrap();
        assert_eq!(
            got,
            SyncGroupResponse {
                error: None,
                assignment: ConsumerGroupMemberAssignment {
                    version: 0,
                    topics: vec![PartitionAssignment {
                        topic: "one".to_string(),
                        partitions: vec![0, 2, 4],
                    }],
                    user_data: vec![0x01, 0x02, 0x03],
                },
            }
        );
    }

    #[test]
    fn response_error() {
        let data = [
            0, 27, // RebalanceInProgress
            0, 0, 0, 0, // no assignment data
        ];
        let got = SyncGroupResponse::read_versioned(&mut Cursor::new(data), ApiVersion(0)).unwrap();
        assert_eq!(got.error, Some(Error::RebalanceInProgress));
        assert!(got.assignment.topics.is_empty());
    }
}
