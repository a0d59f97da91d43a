//! `LeaveGroup` request/response, version 0.

use std::io::{Read, Write};

use super::RequestBody;
use crate::protocol::api_key::ApiKey;
use crate::protocol::api_version::{ApiVersion, ApiVersionRange};
use crate::protocol::error::Error;
use crate::protocol::traits::{
    ReadError, ReadType, ReadVersionedType, WriteError, WriteType, WriteVersionedType,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveGroupRequest {
    pub group_id: String,
    pub member_id: String,
}

impl RequestBody for LeaveGroupRequest {
    type ResponseBody = LeaveGroupResponse;
    const API_KEY: ApiKey = ApiKey::LeaveGroup;
    const API_VERSION_RANGE: ApiVersionRange = ApiVersionRange::new(0, 0);
}

impl<W: Write> WriteVersionedType<W> for LeaveGroupRequest {
    fn write_versioned(&self, writer: &mut W, _version: ApiVersion) -> Result<(), WriteError> {
        self.group_id.write(writer)?;
        self.member_id.write(writer)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveGroupResponse {
    pub error: Option<Error>,
}

impl<R: Read> ReadVersionedType<R> for LeaveGroupResponse {
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            error: Error::new(i16::read(reader)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn request_roundtrip() {
        let req = LeaveGroupRequest {
            group_id: "foo".to_string(),
            member_id: "bar".to_string(),
        };
        let mut buf = vec![];
        req.write_versioned(&mut buf, ApiVersion(0)).unwrap();
        assert_eq!(buf, [0, 3, b'f', b'o', b'o', 0, 3, b'b', b'a', b'r']);
    }

    #[test]
    fn response_error() {
        let resp =
            LeaveGroupResponse::read_versioned(&mut Cursor::new([0, 25]), ApiVersion(0)).unwrap();
        assert_eq!(resp.error, Some(Error::UnknownMemberId));
    }
}
