//! Wire codec: Fixed-order, length-prefixed binary encoding
//!
//! Every action and every stored record is written with the same primitives:
//! - strings: `u16` big-endian length + UTF-8 bytes
//! - byte strings: `u32` big-endian length + bytes
//! - counts: `u32` big-endian
//! - integers: `u64` big-endian
//! - optional values: one flag byte (`0` absent, `1` present)
//!
//! Decoding is strict: truncated input, trailing bytes, unknown flags and
//! invalid UTF-8 are all rejected with a [`DecodeError`].

/// Errors produced while decoding wire or stored bytes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("{0} trailing bytes after decoded value")]
    TrailingBytes(usize),

    #[error("unknown action type id {0}")]
    UnknownAction(u8),

    #[error("invalid option flag {0}")]
    InvalidFlag(u8),

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("length {len} exceeds encodable maximum {max}")]
    TooLong { len: usize, max: usize },

    #[error("invalid field: {0}")]
    InvalidField(&'static str),
}

/// Longest string a `u16` length prefix can carry
pub const MAX_STR_LEN: usize = u16::MAX as usize;

/// Append-only encoder.
///
/// Writes are infallible; the first string too long for its prefix is
/// remembered and reported by [`Packer::finish`].
#[derive(Debug, Default, Clone)]
pub struct Packer {
    buf: Vec<u8>,
    overflow: Option<DecodeError>,
}

impl Packer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            overflow: None,
        }
    }

    pub fn pack_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn pack_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn pack_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn pack_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Pack a `u16`-length-prefixed UTF-8 string. A string longer than
    /// [`MAX_STR_LEN`] is not written and fails [`Packer::finish`].
    pub fn pack_str(&mut self, s: &str) {
        if s.len() > MAX_STR_LEN {
            self.overflow.get_or_insert(DecodeError::TooLong {
                len: s.len(),
                max: MAX_STR_LEN,
            });
            return;
        }
        self.pack_u16(s.len() as u16);
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn pack_bytes(&mut self, b: &[u8]) {
        let len = b.len().min(u32::MAX as usize);
        self.pack_u32(len as u32);
        self.buf.extend_from_slice(&b[..len]);
    }

    pub fn pack_count(&mut self, n: usize) {
        self.pack_u32(n.min(u32::MAX as usize) as u32);
    }

    pub fn pack_bool(&mut self, v: bool) {
        self.pack_u8(v as u8);
    }

    /// Raw bytes with no length prefix
    pub fn pack_raw(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// The encoding, or `TooLong` if any string overflowed its prefix
    pub fn finish(self) -> Result<Vec<u8>, DecodeError> {
        match self.overflow {
            Some(err) => Err(err),
            None => Ok(self.buf),
        }
    }
}

/// Cursor-based decoder over a borrowed buffer
#[derive(Debug)]
pub struct Unpacker<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Unpacker<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn unpack_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn unpack_u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn unpack_u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn unpack_u64(&mut self) -> Result<u64, DecodeError> {
        let mut arr = [0u8; 8];
        arr.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(arr))
    }

    pub fn unpack_string(&mut self) -> Result<String, DecodeError> {
        let len = self.unpack_u16()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }

    pub fn unpack_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.unpack_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    /// Read a count and make sure at least `min_item_size` bytes per item
    /// remain, so a forged count cannot force a huge allocation.
    pub fn unpack_count(&mut self, min_item_size: usize) -> Result<usize, DecodeError> {
        let n = self.unpack_u32()? as usize;
        let needed = n.saturating_mul(min_item_size.max(1));
        if needed > self.remaining() {
            return Err(DecodeError::Truncated {
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(n)
    }

    pub fn unpack_bool(&mut self) -> Result<bool, DecodeError> {
        match self.unpack_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::InvalidFlag(other)),
        }
    }

    pub fn unpack_raw(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        self.take(n)
    }

    /// Fail if any bytes are left over
    pub fn finish(&self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}
