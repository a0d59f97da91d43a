//! `ListGroups` request/response, version 0.

use std::io::{Read, Write};

use super::{RequestBody, read_versioned_array};
use crate::protocol::api_key::ApiKey;
use crate::protocol::api_version::{ApiVersion, ApiVersionRange};
use crate::protocol::error::Error;
use crate::protocol::traits::{ReadError, ReadType, ReadVersionedType, WriteError, WriteVersionedType};

/// The version 0 request has no body at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListGroupsRequest;

impl RequestBody for ListGroupsRequest {
    type ResponseBody = ListGroupsResponse;
    const API_KEY: ApiKey = ApiKey::ListGroups;
    const API_VERSION_RANGE: ApiVersionRange = ApiVersionRange::new(0, 0);
}

impl<W: Write> WriteVersionedType<W> for ListGroupsRequest {
    fn write_versioned(&self, _writer: &mut W, _version: ApiVersion) -> Result<(), WriteError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListGroupsResponseGroup {
    pub group_id: String,
    pub protocol_type: String,
}

impl<R: Read> ReadVersionedType<R> for ListGroupsResponseGroup {
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            group_id: String::read(reader)?,
            protocol_type: String::read(reader)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListGroupsResponse {
    pub error: Option<Error>,
    pub groups: Vec<ListGroupsResponseGroup>,
}

impl<R: Read> ReadVersionedType<R> for ListGroupsResponse {
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadError> {
        Ok(Self {
            error: Error::new(i16::read(reader)?),
            groups: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}
