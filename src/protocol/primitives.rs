//! Primitive types of the classic (non-flexible) wire protocol.
//!
//! # References
//! - <https://kafka.apache.org/protocol#protocol_types>
//!
//! This is deliberately the *classic* encoding: fixed-width, `INT16`/`INT32`-length-prefixed
//! strings and byte arrays, no varints, no tagged fields. There is exactly one wire generation
//! here, not the multi-version flexible/compact split a modern broker protocol carries.

use std::io::{Read, Write};

use super::{
    traits::{ReadError, ReadType, WriteError, WriteType},
    vec_builder::VecBuilder,
};

impl<R: Read> ReadType<R> for bool {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf)?;
        Ok(buf[0] != 0)
    }
}

impl<W: Write> WriteType<W> for bool {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_all(&[*self as u8])?;
        Ok(())
    }
}

impl<R: Read> ReadType<R> for i8 {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf)?;
        Ok(i8::from_be_bytes(buf))
    }
}

impl<W: Write> WriteType<W> for i8 {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_all(&self.to_be_bytes())?;
        Ok(())
    }
}

impl<R: Read> ReadType<R> for i16 {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf)?;
        Ok(i16::from_be_bytes(buf))
    }
}

impl<W: Write> WriteType<W> for i16 {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_all(&self.to_be_bytes())?;
        Ok(())
    }
}

impl<R: Read> ReadType<R> for i32 {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }
}

impl<W: Write> WriteType<W> for i32 {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_all(&self.to_be_bytes())?;
        Ok(())
    }
}

impl<R: Read> ReadType<R> for i64 {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }
}

impl<W: Write> WriteType<W> for i64 {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_all(&self.to_be_bytes())?;
        Ok(())
    }
}

/// Non-null `STRING`: an `INT16` length followed by that many UTF-8 bytes.
impl<R: Read> ReadType<R> for String {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i16::read(reader)?;
        if len < 0 {
            return Err(ReadError::Malformed(
                format!("Invalid negative length for string: {len}").into(),
            ));
        }
        let len = usize::try_from(len)?;
        let mut buf = VecBuilder::new(len);
        buf = buf.read_exact(reader)?;
        String::from_utf8(buf.into()).map_err(|e| ReadError::Malformed(Box::new(e)))
    }
}

impl<W: Write> WriteType<W> for String {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let len = i16::try_from(self.len()).map_err(WriteError::Overflow)?;
        len.write(writer)?;
        writer.write_all(self.as_bytes())?;
        Ok(())
    }
}

/// `NULLABLE_STRING`: like `STRING`, but a length of `-1` denotes `None`.
impl<R: Read> ReadType<R> for Option<String> {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i16::read(reader)?;
        match len {
            l if l < -1 => Err(ReadError::Malformed(
                format!("Invalid negative length for nullable string: {l}").into(),
            )),
            -1 => Ok(None),
            l => {
                let len = usize::try_from(l)?;
                let mut buf = VecBuilder::new(len);
                buf = buf.read_exact(reader)?;
                let s =
                    String::from_utf8(buf.into()).map_err(|e| ReadError::Malformed(Box::new(e)))?;
                Ok(Some(s))
            }
        }
    }
}

impl<W: Write> WriteType<W> for Option<String> {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        match self {
            Some(s) => s.write(writer),
            None => (-1i16).write(writer),
        }
    }
}

/// `NULLABLE_BYTES`: an `INT32` length followed by that many bytes, `-1` denotes `None`.
impl<R: Read> ReadType<R> for Option<Vec<u8>> {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i32::read(reader)?;
        match len {
            l if l < -1 => Err(ReadError::Malformed(
                format!("Invalid negative length for nullable bytes: {l}").into(),
            )),
            -1 => Ok(None),
            l => {
                let len = usize::try_from(l)?;
                let mut buf = VecBuilder::new(len);
                buf = buf.read_exact(reader)?;
                Ok(Some(buf.into()))
            }
        }
    }
}

impl<W: Write> WriteType<W> for Option<Vec<u8>> {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        match self {
            Some(buf) => {
                let l = i32::try_from(buf.len()).map_err(WriteError::Overflow)?;
                l.write(writer)?;
                writer.write_all(buf)?;
                Ok(())
            }
            None => (-1i32).write(writer),
        }
    }
}

/// `BYTES`: an `INT32` length followed by that many bytes. Never null.
impl<R: Read> ReadType<R> for Vec<u8> {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i32::read(reader)?;
        if len < 0 {
            return Err(ReadError::Malformed(
                format!("Invalid length for bytes: {len}").into(),
            ));
        }
        let len = usize::try_from(len)?;
        let mut buf = VecBuilder::new(len);
        buf = buf.read_exact(reader)?;
        Ok(buf.into())
    }
}

impl<W: Write> WriteType<W> for Vec<u8> {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let len = i32::try_from(self.len()).map_err(WriteError::Overflow)?;
        len.write(writer)?;
        writer.write_all(self)?;
        Ok(())
    }
}

/// `ARRAY<STRING>`: an `INT32` length (`-1` for an empty/null array) then that many `STRING`s.
impl<R: Read> ReadType<R> for Vec<String> {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i32::read(reader)?;
        if len <= 0 {
            return Ok(vec![]);
        }
        let len = usize::try_from(len)?;
        let mut res = VecBuilder::new(len);
        for _ in 0..len {
            res.push(String::read(reader)?);
        }
        Ok(res.into())
    }
}

impl<W: Write> WriteType<W> for Vec<String> {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        if self.is_empty() {
            return (-1i32).write(writer);
        }
        let len = i32::try_from(self.len()).map_err(WriteError::Overflow)?;
        len.write(writer)?;
        for elmt in self {
            elmt.write(writer)?;
        }
        Ok(())
    }
}

/// `ARRAY<INT32>`.
impl<R: Read> ReadType<R> for Vec<i32> {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i32::read(reader)?;
        if len <= 0 {
            return Ok(vec![]);
        }
        let len = usize::try_from(len)?;
        let mut res = VecBuilder::new(len);
        for _ in 0..len {
            res.push(i32::read(reader)?);
        }
        Ok(res.into())
    }
}

impl<W: Write> WriteType<W> for Vec<i32> {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        if self.is_empty() {
            return (-1i32).write(writer);
        }
        let len = i32::try_from(self.len()).map_err(WriteError::Overflow)?;
        len.write(writer)?;
        for elmt in self {
            elmt.write(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use assert_matches::assert_matches;

    use super::*;
    use crate::protocol::test_utils::test_roundtrip;

    test_roundtrip!(bool, test_bool_roundtrip);

    #[test]
    fn test_boolean_decode() {
        assert!(!bool::read(&mut Cursor::new(vec![0])).unwrap());
        for v in [1, 35, 255] {
            assert!(bool::read(&mut Cursor::new(vec![v])).unwrap());
        }
    }

    test_roundtrip!(i8, test_int8_roundtrip);
    test_roundtrip!(i16, test_int16_roundtrip);
    test_roundtrip!(i32, test_int32_roundtrip);
    test_roundtrip!(i64, test_int64_roundtrip);
    test_roundtrip!(String, test_string_roundtrip);
    test_roundtrip!(Option<String>, test_nullable_string_roundtrip);
    test_roundtrip!(Vec<u8>, test_bytes_roundtrip);
    test_roundtrip!(Option<Vec<u8>>, test_nullable_bytes_roundtrip);
    test_roundtrip!(Vec<i32>, test_array_i32_roundtrip);

    #[test]
    fn test_nullable_string_read_negative_length() {
        let mut buf = Cursor::new(Vec::<u8>::new());
        (-2i16).write(&mut buf).unwrap();
        buf.set_position(0);

        let err = Option::<String>::read(&mut buf).unwrap_err();
        assert_matches!(err, ReadError::Malformed(_));
    }

    #[test]
    fn test_nullable_bytes_read_negative_length() {
        let mut buf = Cursor::new(Vec::<u8>::new());
        (-2i32).write(&mut buf).unwrap();
        buf.set_position(0);

        let err = Option::<Vec<u8>>::read(&mut buf).unwrap_err();
        assert_matches!(err, ReadError::Malformed(_));
    }
}
