//! The compression envelope: `identity`, `gzip`, and `snappy`.
//!
//! Both `gzip` and `snappy` are mandatory per the wire spec, so unlike the optional
//! feature-gated codecs a general-purpose client might ship, they are always compiled in.

use std::io::{Read, Write};

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Unsupported compression codec bit: {0}")]
    UnsupportedCompression(i8),

    #[error("compression codec I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The compression codec a [`crate::protocol::record::Message`] was written with, taken from the
/// low 3 bits of its `attributes` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Snappy,
}

impl Compression {
    pub fn wire_code(&self) -> i8 {
        match self {
            Self::None => 0,
            Self::Gzip => 1,
            Self::Snappy => 2,
        }
    }

    pub fn from_wire_code(code: i8) -> Result<Self, Error> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::Gzip),
            2 => Ok(Self::Snappy),
            other => Err(Error::UnsupportedCompression(other)),
        }
    }
}

pub fn compress(codec: Compression, data: &[u8]) -> Result<Vec<u8>, Error> {
    match codec {
        Compression::None => Ok(data.to_vec()),
        Compression::Gzip => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
        Compression::Snappy => {
            let mut encoder = snap::write::FrameEncoder::new(Vec::new());
            encoder.write_all(data)?;
            encoder
                .into_inner()
                .map_err(|e| Error::Io(e.into_error()))
        }
    }
}

pub fn decompress(codec: Compression, data: &[u8]) -> Result<Vec<u8>, Error> {
    match codec {
        Compression::None => Ok(data.to_vec()),
        Compression::Gzip => {
            let mut decoder = flate2::read::GzDecoder::new(data);
            let mut out = Vec::new();
            decoder.read_to_end(&mut out)?;
            Ok(out)
        }
        Compression::Snappy => {
            let mut decoder = snap::read::FrameDecoder::new(data);
            let mut out = Vec::new();
            decoder.read_to_end(&mut out)?;
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_roundtrip() {
        let data = b"hello world, this is a test payload".repeat(4);
        let compressed = compress(Compression::Gzip, &data).unwrap();
        let decompressed = decompress(Compression::Gzip, &compressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn snappy_roundtrip() {
        let data = b"hello world, this is a test payload".repeat(4);
        let compressed = compress(Compression::Snappy, &data).unwrap();
        let decompressed = decompress(Compression::Snappy, &compressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn identity_is_passthrough() {
        let data = b"hello".to_vec();
        assert_eq!(compress(Compression::None, &data).unwrap(), data);
        assert_eq!(decompress(Compression::None, &data).unwrap(), data);
    }

    #[test]
    fn unknown_codec_bit_is_rejected() {
        let err = Compression::from_wire_code(5).unwrap_err();
        assert!(matches!(err, Error::UnsupportedCompression(5)));
    }
}
