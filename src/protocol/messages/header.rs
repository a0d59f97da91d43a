use std::io::{Read, Write};

use crate::protocol::api_key::ApiKey;
use crate::protocol::api_version::ApiVersion;
use crate::protocol::traits::{ReadType, WriteType};

/// Every request carries this header: `{api_key, api_version, correlation_id, client_id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub api_key: ApiKey,
    pub api_version: ApiVersion,
    pub correlation_id: i32,
    pub client_id: String,
}

impl<W: Write> WriteType<W> for RequestHeader {
    fn write(&self, writer: &mut W) -> Result<(), crate::protocol::traits::WriteError> {
        i16::from(self.api_key).write(writer)?;
        self.api_version.0.write(writer)?;
        self.correlation_id.write(writer)?;
        self.client_id.write(writer)?;
        Ok(())
    }
}

impl<R: Read> ReadType<R> for RequestHeader {
    fn read(reader: &mut R) -> Result<Self, crate::protocol::traits::ReadError> {
        let api_key = ApiKey::from(i16::read(reader)?);
        let api_version = ApiVersion(i16::read(reader)?);
        let correlation_id = i32::read(reader)?;
        let client_id = String::read(reader)?;
        Ok(Self {
            api_key,
            api_version,
            correlation_id,
            client_id,
        })
    }
}

/// Every response carries this header: just the `correlation_id` echoed back from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    pub correlation_id: i32,
}

impl<W: Write> WriteType<W> for ResponseHeader {
    fn write(&self, writer: &mut W) -> Result<(), crate::protocol::traits::WriteError> {
        self.correlation_id.write(writer)
    }
}

impl<R: Read> ReadType<R> for ResponseHeader {
    fn read(reader: &mut R) -> Result<Self, crate::protocol::traits::ReadError> {
        Ok(Self {
            correlation_id: i32::read(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn request_header_roundtrip() {
        let header = RequestHeader {
            api_key: ApiKey::Metadata,
            api_version: ApiVersion(0),
            correlation_id: 42,
            client_id: "test-client".to_string(),
        };

        let mut buf = vec![];
        header.write(&mut buf).unwrap();

        let want = [
            0, 3, // api key = Metadata
            0, 0, // api version = 0
            0, 0, 0, 42, // correlation id
            0, 11, b't', b'e', b's', b't', b'-', b'c', b'l', b'i', b'e', b'n', b't',
        ];
        assert_eq!(buf, want);

        let restored = RequestHeader::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(restored, header);
    }

    #[test]
    fn response_header_roundtrip() {
        let header = ResponseHeader { correlation_id: 7 };
        let mut buf = vec![];
        header.write(&mut buf).unwrap();
        assert_eq!(buf, [0, 0, 0, 7]);

        let restored = ResponseHeader::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(restored, header);
    }
}
