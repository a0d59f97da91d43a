//! Request/response message bodies.
//!
//! Every body in this module implements [`RequestBody`] (requests) or is produced by a
//! [`RequestBody::ResponseBody`] (responses), and is read/written through [`ReadVersionedType`]/
//! [`WriteVersionedType`] keyed by an explicit [`ApiVersion`]. Only version 0 is implemented for
//! every kind; the versioned plumbing stays in place so a later version can be slotted in without
//! reshaping the call sites.

use std::io::{Read, Write};

use crate::protocol::api_key::ApiKey;
use crate::protocol::api_version::ApiVersionRange;
use crate::protocol::traits::{
    ReadError, ReadType, ReadVersionedType, WriteError, WriteType, WriteVersionedType,
};

pub mod assignment;
pub mod describe_groups;
pub mod fetch;
pub mod group_coordinator;
pub mod header;
pub mod heartbeat;
pub mod join_group;
pub mod leave_group;
pub mod list_groups;
pub mod list_offsets;
pub mod metadata;
pub mod offset_commit;
pub mod offset_fetch;
pub mod produce;
pub mod sync_group;

pub type ReadVersionedError = ReadError;
pub type WriteVersionedError = WriteError;

/// A request body known to the protocol layer.
///
/// Implementors also carry the [`ApiKey`]/[`ApiVersionRange`] constants a connection uses to
/// populate the request header and to reject a version the broker hasn't advertised support for.
pub trait RequestBody {
    type ResponseBody;

    const API_KEY: ApiKey;
    const API_VERSION_RANGE: ApiVersionRange;
}

/// Reads a classic `ARRAY<T>`: an `INT32` length followed by that many versioned elements.
///
/// A length of `-1` or `0` is treated as "no elements" per spec.md's classic-array convention.
pub fn read_versioned_array<R, T>(
    reader: &mut R,
    version: crate::protocol::api_version::ApiVersion,
) -> Result<Option<Vec<T>>, ReadVersionedError>
where
    R: Read,
    T: ReadVersionedType<R>,
{
    let len = i32::read(reader)?;
    if len <= 0 {
        return Ok(Some(vec![]));
    }
    let len = usize::try_from(len)?;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(T::read_versioned(reader, version)?);
    }
    Ok(Some(out))
}

/// Writes a classic `ARRAY<T>`.
pub fn write_versioned_array<W, T>(
    writer: &mut W,
    version: crate::protocol::api_version::ApiVersion,
    elements: Option<&Vec<T>>,
) -> Result<(), WriteVersionedError>
where
    W: Write,
    T: WriteVersionedType<W>,
{
    match elements {
        None => (-1i32).write(writer),
        Some(elements) => {
            let len = i32::try_from(elements.len()).map_err(WriteError::Overflow)?;
            len.write(writer)?;
            for elmt in elements {
                elmt.write_versioned(writer, version)?;
            }
            Ok(())
        }
    }
}
