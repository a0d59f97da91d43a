//! `GroupCoordinator` (historically "FindCoordinator") request/response, version 0.
//!
//! Only the `Group` coordinator type is modeled; transaction coordination is out of scope.

use std::io::{Read, Write};

use super::RequestBody;
use crate::protocol::api_key::ApiKey;
use crate::protocol::api_version::{ApiVersion, ApiVersionRange};
use crate::protocol::error::Error;
use crate::protocol::traits::{
    ReadError, ReadType, ReadVersionedType, WriteError, WriteType, WriteVersionedType,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCoordinatorRequest {
    pub group_id: String,
}

impl RequestBody for GroupCoordinatorRequest {
    type ResponseBody = GroupCoordinatorResponse;
    const API_KEY: ApiKey = ApiKey::GroupCoordinator;
    const API_VERSION_RANGE: ApiVersionRange = ApiVersionRange::new(0, 0);
}

impl<W: Write> WriteVersionedType<W> for GroupCoordinatorRequest {
    fn write_versioned(&self, writer: &mut W, _version: ApiVersion) -> Result<(), WriteError> {
        self.group_id.write(writer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCoordinatorResponse {
    pub error: Option<Error>,
    pub node_id: i32,
    pub host: String,
    pub port: i32,
}

impl<R: Read> ReadVersionedType<R> for GroupCoordinatorResponse {
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            error: Error::new(i16::read(reader)?),
            node_id: i32::read(reader)?,
            host: String::read(reader)?,
            port: i32::read(reader)?,
        })
    }
}
