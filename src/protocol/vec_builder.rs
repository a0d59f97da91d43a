//! A `Vec<T>` builder that allocates incrementally instead of trusting a length prefix outright.
//!
//! A naive `Vec::with_capacity(len)` driven by an attacker- or bug-controlled length prefix can
//! OOM the process before a single element is read. This builder caps its up-front reservation
//! and grows the rest on demand.

use std::io::Read;

use crate::protocol::traits::ReadError;

const MAX_PREALLOC: usize = 64 * 1024;

pub struct VecBuilder<T> {
    buf: Vec<T>,
    len: usize,
}

impl<T> VecBuilder<T> {
    pub fn new(len: usize) -> Self {
        Self {
            buf: Vec::with_capacity(len.min(MAX_PREALLOC)),
            len,
        }
    }

    pub fn push(&mut self, value: T) {
        self.buf.push(value);
    }
}

impl VecBuilder<u8> {
    pub fn read_exact<R: Read>(mut self, reader: &mut R) -> Result<Self, ReadError> {
        let mut remaining = self.len;
        while remaining > 0 {
            let chunk = remaining.min(MAX_PREALLOC);
            let start = self.buf.len();
            self.buf.resize(start + chunk, 0);
            reader.read_exact(&mut self.buf[start..])?;
            remaining -= chunk;
        }
        Ok(self)
    }
}

impl<T> From<VecBuilder<T>> for Vec<T> {
    fn from(builder: VecBuilder<T>) -> Self {
        builder.buf
    }
}
