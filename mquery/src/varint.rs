//! The 7-bit-group variable length integer used by the Java protocol.
//!
//! [VarInt and VarLong](https://wiki.vg/Protocol#VarInt_and_VarLong)

use bytes::Buf;

use crate::Error;

/// The most bytes a 32-bit VarInt can occupy.
pub const MAX_LEN: usize = 5;

const SEGMENT_BITS: u8 = 0x7f;
const CONTINUE_BIT: u8 = 0x80;

/// Encodes `value` into little-endian 7-bit groups.
#[must_use]
pub fn encode(value: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_LEN);
    write(&mut out, value);
    out
}

/// Appends the encoding of `value` to `out`.
#[allow(clippy::cast_possible_truncation)]
pub fn write(out: &mut Vec<u8>, value: u32) {
    let mut val = value;
    loop {
        if val & !u32::from(SEGMENT_BITS) == 0 {
            out.push(val as u8);
            return;
        }
        out.push((val as u8 & SEGMENT_BITS) | CONTINUE_BIT);
        val >>= 7;
    }
}

/// Incremental decoder, fed one byte at a time.
///
/// Used by both the buffered transports, which pull bytes as they arrive, and
/// [`decode`], which works over an in-memory buffer.
#[derive(Debug, Default)]
pub struct Decoder {
    value: u32,
    read: usize,
}

impl Decoder {
    #[must_use]
    pub const fn new() -> Self {
        Self { value: 0, read: 0 }
    }

    /// Accumulates one byte, returning the value once the final byte is seen.
    ///
    /// # Errors
    /// [`Error::VarIntTooLong`] when the input would need more than
    /// [`MAX_LEN`] bytes.
    pub fn push(&mut self, byte: u8) -> Result<Option<i32>, Error> {
        if self.read >= MAX_LEN {
            return Err(Error::VarIntTooLong);
        }
        self.value |= u32::from(byte & SEGMENT_BITS) << (7 * self.read);
        self.read += 1;
        if byte & CONTINUE_BIT == 0 {
            return Ok(Some(i32::from_ne_bytes(self.value.to_ne_bytes())));
        }
        if self.read == MAX_LEN {
            return Err(Error::VarIntTooLong);
        }
        Ok(None)
    }
}

/// Decodes one VarInt from the front of `buf`.
///
/// # Errors
/// [`Error::VarIntTooLong`] on overlong input, [`Error::ConnectionClosed`]
/// when `buf` runs out first.
pub fn decode<B: Buf>(buf: &mut B) -> Result<i32, Error> {
    let mut decoder = Decoder::new();
    while buf.has_remaining() {
        if let Some(value) = decoder.push(buf.get_u8())? {
            return Ok(value);
        }
    }
    Err(Error::ConnectionClosed { wanted: 1 })
}
