//! `Heartbeat` request/response, version 0.

use std::io::{Read, Write};

use super::RequestBody;
use crate::protocol::api_key::ApiKey;
use crate::protocol::api_version::{ApiVersion, ApiVersionRange};
use crate::protocol::error::Error;
use crate::protocol::traits::{
    ReadError, ReadType, ReadVersionedType, WriteError, WriteType, WriteVersionedType,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
}

impl RequestBody for HeartbeatRequest {
    type ResponseBody = HeartbeatResponse;
    const API_KEY: ApiKey = ApiKey::Heartbeat;
    const API_VERSION_RANGE: ApiVersionRange = ApiVersionRange::new(0, 0);
}

impl<W: Write> WriteVersionedType<W> for HeartbeatRequest {
    fn write_versioned(&self, writer: &mut W, _version: ApiVersion) -> Result<(), WriteError> {
        self.group_id.write(writer)?;
        self.generation_id.write(writer)?;
        self.member_id.write(writer)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatResponse {
    pub error: Option<Error>,
}

impl<R: Read> ReadVersionedType<R> for HeartbeatResponse {
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            error: Error::new(i16::read(reader)?),
        })
    }
}
