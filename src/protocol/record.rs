//! The classic `MessageSet` record format.
//!
//! Each entry is `{offset: INT64, message_size: INT32, crc: UINT32, magic: INT8, attributes:
//! INT8, key: NULLABLE_BYTES, value: NULLABLE_BYTES}`. The CRC is CRC32 (IEEE) computed over
//! `magic..value` inclusive. `attributes & 0x07` selects the compression codec; when non-zero,
//! `value` holds a nested, itself-uncompressed `MessageSet` whose inner offsets are relative to
//! the outer entry's offset (the outer offset is the *last* offset of the inner batch).

use std::io::{Cursor, Read, Write};

use crate::compression::Compression;
use crate::protocol::traits::{ReadError, ReadType, WriteError, WriteType};

pub const MAGIC_BYTE: i8 = 1;

const COMPRESSION_MASK: i8 = 0x07;

/// A single record: an application key/value pair plus the codec it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub magic: i8,
    pub compression: Compression,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
}

impl Message {
    fn attributes(&self) -> i8 {
        self.compression.wire_code() & COMPRESSION_MASK
    }

    fn crc(&self) -> Result<u32, WriteError> {
        let mut buf = vec![];
        self.magic.write(&mut buf)?;
        self.attributes().write(&mut buf)?;
        self.key.write(&mut buf)?;
        self.value.write(&mut buf)?;
        Ok(crc32fast::hash(&buf))
    }
}

impl<W: Write> WriteType<W> for Message {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.crc()?.write(writer)?;
        self.magic.write(writer)?;
        self.attributes().write(writer)?;
        self.key.write(writer)?;
        self.value.write(writer)?;
        Ok(())
    }
}

impl<R: Read> ReadType<R> for Message {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let crc = u32::read(reader)?;
        let magic = i8::read(reader)?;
        let attributes = i8::read(reader)?;
        let key = Option::<Vec<u8>>::read(reader)?;
        let value = Option::<Vec<u8>>::read(reader)?;

        let msg = Self {
            magic,
            compression: Compression::from_wire_code(attributes & COMPRESSION_MASK)
                .map_err(|e| ReadError::Malformed(Box::new(e)))?,
            key,
            value,
        };
        let expected = msg
            .crc()
            .map_err(|e| ReadError::Malformed(format!("{e}").into()))?;
        if expected != crc {
            return Err(ReadError::Malformed(
                format!("CRC mismatch: expected {expected}, got {crc}").into(),
            ));
        }
        Ok(msg)
    }
}

impl<R: Read> ReadType<R> for u32 {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }
}

impl<W: Write> WriteType<W> for u32 {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_all(&self.to_be_bytes())?;
        Ok(())
    }
}

/// One `{offset, message}` entry in a [`MessageSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub offset: i64,
    pub message: Message,
}

impl<W: Write> WriteType<W> for Record {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.offset.write(writer)?;

        let mut body = vec![];
        self.message.write(&mut body)?;
        let len = i32::try_from(body.len()).map_err(WriteError::Overflow)?;
        len.write(writer)?;
        writer.write_all(&body)?;
        Ok(())
    }
}

/// A sequence of [`Record`]s as they appear on the wire (e.g. a `Produce` request's per-partition
/// body, or a `Fetch` response's per-partition body).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordSet(pub Vec<Record>);

impl RecordSet {
    /// Parses a raw `MessageSet` byte buffer, recursively expanding compressed entries into their
    /// inner, uncompressed records with correctly-reconstructed absolute offsets.
    ///
    /// Mirrors `Records::read`'s tolerance for a batch cut off mid-way (a `Fetch` response may be
    /// truncated by `max_bytes`): a trailing partial entry is silently dropped rather than
    /// treated as an error.
    pub fn parse(buf: &[u8]) -> Result<Self, ReadError> {
        let mut cursor = Cursor::new(buf);
        let len = buf.len() as u64;
        let mut out = vec![];

        while cursor.position() < len {
            let start = cursor.position();
            let offset = match i64::read(&mut cursor) {
                Ok(v) => v,
                Err(_) => break,
            };
            let message_size = match i32::read(&mut cursor) {
                Ok(v) => v,
                Err(_) => {
                    cursor.set_position(start);
                    break;
                }
            };
            let message_size = match usize::try_from(message_size) {
                Ok(v) => v,
                Err(_) => break,
            };

            let remaining = (len - cursor.position()) as usize;
            if message_size > remaining {
                // Cut off mid-message, e.g. by a `Fetch` max_bytes limit.
                break;
            }

            let pos = cursor.position() as usize;
            let body = &buf[pos..pos + message_size];
            cursor.set_position((pos + message_size) as u64);

            let message = Message::read(&mut Cursor::new(body))?;

            if message.compression == Compression::None {
                out.push(Record { offset, message });
                continue;
            }

            let inner_bytes = crate::compression::decompress(
                message.compression,
                message.value.as_deref().unwrap_or_default(),
            )
            .map_err(|e| ReadError::Malformed(Box::new(e)))?;
            let inner = Self::parse(&inner_bytes)?;
            let last_inner_offset = inner.0.last().map(|r| r.offset).unwrap_or(0);
            for inner_record in inner.0 {
                let absolute_offset = offset - (last_inner_offset - inner_record.offset);
                out.push(Record {
                    offset: absolute_offset,
                    message: inner_record.message,
                });
            }
        }

        Ok(Self(out))
    }

    pub fn write_uncompressed(&self, writer: &mut impl Write) -> Result<(), WriteError> {
        for record in &self.0 {
            record.write(writer)?;
        }
        Ok(())
    }

    /// Compresses the whole set into a single outer [`Record`] whose value is the nested,
    /// uncompressed `MessageSet`.
    pub fn compress(&self, codec: Compression) -> Result<Record, WriteError> {
        let mut inner = vec![];
        self.write_uncompressed(&mut inner)?;
        let compressed =
            crate::compression::compress(codec, &inner).map_err(|e| WriteError::Malformed(Box::new(e)))?;

        let last_offset = self.0.last().map(|r| r.offset).unwrap_or(0);
        Ok(Record {
            offset: last_offset,
            message: Message {
                magic: MAGIC_BYTE,
                compression: codec,
                key: None,
                value: Some(compressed),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(key: &[u8], value: &[u8]) -> Message {
        Message {
            magic: MAGIC_BYTE,
            compression: Compression::None,
            key: Some(key.to_vec()),
            value: Some(value.to_vec()),
        }
    }

    #[test]
    fn roundtrip_uncompressed() {
        let set = RecordSet(vec![
            Record {
                offset: 0,
                message: msg(b"k1", b"v1"),
            },
            Record {
                offset: 1,
                message: msg(b"k2", b"v2"),
            },
        ]);

        let mut buf = vec![];
        set.write_uncompressed(&mut buf).unwrap();

        let parsed = RecordSet::parse(&buf).unwrap();
        assert_eq!(parsed, set);
    }

    #[test]
    fn crc_mismatch_is_rejected() {
        let set = RecordSet(vec![Record {
            offset: 0,
            message: msg(b"k", b"v"),
        }]);
        let mut buf = vec![];
        set.write_uncompressed(&mut buf).unwrap();

        // corrupt the CRC (first 4 bytes after offset+size, i.e. bytes 12..16)
        buf[12] ^= 0xff;

        let err = RecordSet::parse(&buf).unwrap_err();
        assert!(matches!(err, ReadError::Malformed(_)));
    }

    #[test]
    fn truncated_trailing_message_is_dropped() {
        let set = RecordSet(vec![
            Record {
                offset: 0,
                message: msg(b"k1", b"v1"),
            },
            Record {
                offset: 1,
                message: msg(b"k2", b"v2"),
            },
        ]);
        let mut buf = vec![];
        set.write_uncompressed(&mut buf).unwrap();
        buf.truncate(buf.len() - 1);

        let parsed = RecordSet::parse(&buf).unwrap();
        assert_eq!(parsed.0.len(), 1);
        assert_eq!(parsed.0[0].offset, 0);
    }

    #[test]
    fn compress_and_reconstruct_offsets_gzip() {
        let set = RecordSet(vec![
            Record {
                offset: 10,
                message: msg(b"k1", b"v1"),
            },
            Record {
                offset: 11,
                message: msg(b"k2", b"v2"),
            },
        ]);

        let outer = set.compress(Compression::Gzip).unwrap();
        let mut buf = vec![];
        outer.write(&mut buf).unwrap();

        let parsed = RecordSet::parse(&buf).unwrap();
        assert_eq!(parsed.0.len(), 2);
        assert_eq!(parsed.0[0].offset, 10);
        assert_eq!(parsed.0[1].offset, 11);
    }
}
