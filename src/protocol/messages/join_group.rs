//! `JoinGroup` request/response, version 0.

use std::io::{Cursor, Read, Write};

use super::{RequestBody, read_versioned_array, write_versioned_array};
use crate::protocol::api_key::ApiKey;
use crate::protocol::api_version::{ApiVersion, ApiVersionRange};
use crate::protocol::error::Error;
use crate::protocol::messages::assignment::ConsumerGroupMemberMetadata;
use crate::protocol::traits::{
    ReadError, ReadType, ReadVersionedType, WriteError, WriteType, WriteVersionedType,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinGroupProtocol {
    /// "range", "roundrobin", or a crate-defined assignor name.
    pub name: String,
    pub metadata: Vec<u8>,
}

impl<W: Write> WriteVersionedType<W> for JoinGroupProtocol {
    fn write_versioned(&self, writer: &mut W, _version: ApiVersion) -> Result<(), WriteError> {
        self.name.write(writer)?;
        self.metadata.write(writer)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinGroupRequest {
    pub group_id: String,
    pub session_timeout_ms: i32,
    pub member_id: String,
    pub protocol_type: String,
    pub protocols: Vec<JoinGroupProtocol>,
}

impl RequestBody for JoinGroupRequest {
    type ResponseBody = JoinGroupResponse;
    const API_KEY: ApiKey = ApiKey::JoinGroup;
    const API_VERSION_RANGE: ApiVersionRange = ApiVersionRange::new(0, 0);
}

impl<W: Write> WriteVersionedType<W> for JoinGroupRequest {
    fn write_versioned(&self, writer: &mut W, version: ApiVersion) -> Result<(), WriteError> {
        self.group_id.write(writer)?;
        self.session_timeout_ms.write(writer)?;
        self.member_id.write(writer)?;
        self.protocol_type.write(writer)?;
        write_versioned_array(writer, version, Some(&self.protocols))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinGroupResponseMember {
    pub member_id: String,
    pub metadata: ConsumerGroupMemberMetadata,
}

impl<R: Read> ReadVersionedType<R> for JoinGroupResponseMember {
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadError> {
        let member_id = String::read(reader)?;
        let buf = Vec::<u8>::read(reader)?;
        let metadata = ConsumerGroupMemberMetadata::read(&mut Cursor::new(buf))?;

        Ok(Self {
            member_id,
            metadata,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinGroupResponse {
    pub error: Option<Error>,
    pub generation_id: i32,
    pub protocol_name: String,
    pub leader: String,
    pub member_id: String,
    pub members: Vec<JoinGroupResponseMember>,
}

impl<R: Read> ReadVersionedType<R> for JoinGroupResponse {
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            error: Error::new(i16::read(reader)?),
            generation_id: i32::read(reader)?,
            protocol_name: String::read(reader)?,
            leader: String::read(reader)?,
            member_id: String::read(reader)?,
            members: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn request_no_protocols() {
        let req = JoinGroupRequest {
            group_id: "TestGroup".to_string(),
            session_timeout_ms: 100,
            member_id: "".to_string(),
            protocol_type: "consumer".to_string(),
            protocols: vec![],
        };
        let mut buf = vec![];
        req.write_versioned(&mut buf, ApiVersion(0)).unwrap();
        assert_eq!(
            buf,
            [
                0, 9, b'T', b'e', b's', b't', b'G', b'r', b'o', b'u', b'p', // group id
                0, 0, 0, 100, // session timeout
                0, 0, // member id
                0, 8, b'c', b'o', b'n', b's', b'u', b'm', b'e', b'r', // protocol type
                0, 0, 0, 0, // 0 protocols
            ]
        );
    }

    #[test]
    fn request_one_protocol() {
        let req = JoinGroupRequest {
            group_id: "TestGroup".to_string(),
            session_timeout_ms: 100,
            member_id: "OneProtocol".to_string(),
            protocol_type: "consumer".to_string(),
            protocols: vec![JoinGroupProtocol {
                name: "one".to_string(),
                metadata: vec![0x01, 0x02, 0x03],
            }],
        };
        let mut buf = vec![];
        req.write_versioned(&mut buf, ApiVersion(0)).unwrap();
        assert_eq!(
            buf,
            [
                0, 9, b'T', b'e', b's', b't', b'G', b'r', b'o', b'u', b'p', // group id
                0, 0, 0, 100, // session timeout
                0, 11, b'O', b'n', b'e', b'P', b'r', b'o', b't', b'o', b'c', b'o',
                b'l', // member id
                0, 8, b'c', b'o', b'n', b's', b'u', b'm', b'e', b'r', // protocol type
                0, 0, 0, 1, // 1 protocol
                0, 3, b'o', b'n', b'e', // protocol name
                0, 0, 0, 3, 0x01, 0x02, 0x03, // protocol metadata
            ]
        );
    }

    #[test]
    fn response_no_error() {
        let data = [
            0x00, 0x00, // no error
            0x00, 0x01, 0x02, 0x03, // generation id
            0, 8, b'p', b'r', b'o', b't', b'o', b'c', b'o', b'l', // protocol name chosen
            0, 3, b'f', b'o', b'o', // leader id
            0, 3, b'b', b'a', b'r', // member id
            0, 0, 0, 0, // no members
        ];
        let got = JoinGroupResponse::read_versioned(&mut Cursor::new(data), ApiVersion(0)).unwrap();
        assert_eq!(
            got,
            JoinGroupResponse {
                error: None,
                generation_id: 66051,
                protocol_name: "protocol".to_string(),
                leader: "foo".to_string(),
                member_id: "bar".to_string(),
                members: vec![],
            }
        );
    }

    #[test]
    fn response_with_error() {
        let data = [
            0, 23, // InconsistentGroupProtocol
            0x00, 0x00, 0x00, 0x00, // generation id
            0, 0, // protocol name
            0, 0, // leader id
            0, 0, // member id
            0, 0, 0, 0, // no members
        ];
        let got = JoinGroupResponse::read_versioned(&mut Cursor::new(data), ApiVersion(0)).unwrap();
        assert_eq!(got.error, Some(Error::InconsistentGroupProtocol));
    }

    #[test]
    fn response_with_leader_member() {
        let data = [
            0x00, 0x00, // no error
            0x00, 0x01, 0x02, 0x03, // generation id
            0, 8, b'p', b'r', b'o', b't', b'o', b'c', b'o', b'l', // protocol name chosen
            0, 3, b'f', b'o', b'o', // leader id
            0, 3, b'f', b'o', b'o', // member id == leader id
            0, 0, 0, 1, // 1 member
            0, 3, b'f', b'o', b'o', // member id
            0, 0, 0, 23, // metadata length
            0, 0, // metadata version
            0, 0, 0, 2, // topic array length
            0, 3, b'o', b'n', b'e', // topic one
            0, 3, b't', b'w', b'o', // topic two
            0, 0, 0, 3, 0x01, 0x02, 0x03, // user data
        ];
        let got = JoinGroupResponse::read_versioned(&mut Cursor::new(data), ApiVersion(0)).unwrap();
        assert_eq!(got.members.len(), 1);
        assert_eq!(
            got.members[0].metadata,
            ConsumerGroupMemberMetadata {
                version: 0,
                topics: vec!["one".into(), "two".into()],
                user_data: vec![0x01, 0x02, 0x03],
            }
        );
    }
}
