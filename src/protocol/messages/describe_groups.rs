//! `DescribeGroups` request/response, version 0.

use std::io::{Read, Write};

use super::{RequestBody, read_versioned_array};
use crate::protocol::api_key::ApiKey;
use crate::protocol::api_version::{ApiVersion, ApiVersionRange};
use crate::protocol::error::Error;
use crate::protocol::traits::{
    ReadError, ReadType, ReadVersionedType, WriteError, WriteType, WriteVersionedType,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeGroupsRequest {
    pub groups: Vec<String>,
}

impl RequestBody for DescribeGroupsRequest {
    type ResponseBody = DescribeGroupsResponse;
    const API_KEY: ApiKey = ApiKey::DescribeGroups;
    const API_VERSION_RANGE: ApiVersionRange = ApiVersionRange::new(0, 0);
}

impl<W: Write> WriteVersionedType<W> for DescribeGroupsRequest {
    fn write_versioned(&self, writer: &mut W, _version: ApiVersion) -> Result<(), WriteError> {
        self.groups.write(writer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeGroupsResponseGroupMember {
    pub member_id: String,
    pub client_id: String,
    pub client_host: String,
    pub member_metadata: Vec<u8>,
    pub member_assignment: Vec<u8>,
}

impl<R: Read> ReadVersionedType<R> for DescribeGroupsResponseGroupMember {
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            member_id: String::read(reader)?,
            client_id: String::read(reader)?,
            client_host: String::read(reader)?,
            member_metadata: Vec::<u8>::read(reader)?,
            member_assignment: Vec::<u8>::read(reader)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeGroupsResponseGroup {
    pub error: Option<Error>,
    pub group_id: String,
    pub group_state: String,
    pub protocol_type: String,
    pub protocol_data: String,
    pub members: Vec<DescribeGroupsResponseGroupMember>,
}

impl<R: Read> ReadVersionedType<R> for DescribeGroupsResponseGroup {
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            error: Error::new(i16::read(reader)?),
            group_id: String::read(reader)?,
            group_state: String::read(reader)?,
            protocol_type: String::read(reader)?,
            protocol_data: String::read(reader)?,
            members: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeGroupsResponse {
    pub groups: Vec<DescribeGroupsResponseGroup>,
}

impl<R: Read> ReadVersionedType<R> for DescribeGroupsResponse {
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            groups: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn request_two_groups() {
        let req = DescribeGroupsRequest {
            groups: vec!["foo".to_string(), "bar".to_string()],
        };
        let mut buf = vec![];
        req.write_versioned(&mut buf, ApiVersion(0)).unwrap();
        assert_eq!(
            buf,
            [0, 0, 0, 2, 0, 3, b'f', b'o', b'o', 0, 3, b'b', b'a', b'r']
        );
    }

    #[test]
    fn response_populated() {
        let data = [
            0, 0, 0, 2, // 2 groups
            0, 0, // no error
            0, 3, b'f', b'o', b'o', // group id
            0, 3, b'b', b'a', b'r', // state
            0, 8, b'c', b'o', b'n', b's', b'u', b'm', b'e', b'r', // protocol type
            0, 3, b'b', b'a', b'z', // protocol data
            0, 0, 0, 1, // 1 member
            0, 2, b'i', b'd', // member id
            0, 6, b's', b'a', b'r', b'a', b'm', b'a', // client id
            0, 9, b'l', b'o', b'c', b'a', b'l', b'h', b'o', b's', b't', // client host
            0, 0, 0, 3, 0x01, 0x02, 0x03, // member metadata
            0, 0, 0, 3, 0x04, 0x05, 0x06, // member assignment
            0, 30, // GroupAuthorizationFailed
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        let resp = DescribeGroupsResponse::read_versioned(&mut Cursor::new(data), ApiVersion(0)).unwrap();
        assert_eq!(resp.groups.len(), 2);
        assert_eq!(resp.groups[0].group_id, "foo");
        assert_eq!(resp.groups[0].members[0].client_id, "sarama");
        assert_eq!(resp.groups[1].error, Some(Error::GroupAuthorizationFailed));
    }
}
