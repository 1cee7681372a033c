//! MSB-first bit reader over one compressed chunk.
//!
//! LZX packs bits into little-endian 16-bit words and consumes each word from
//! its most significant bit down. The reader keeps a 32-bit accumulator that
//! is topped up one word at a time.

use vassago_core::{Error, Result};

/// Zero bytes the reader may synthesize past the end of a chunk.
///
/// Encoders flush the final word of a frame lazily, so a decoder peeking a
/// full 16 bits near the end can legitimately run a little past the data.
const MAX_OVERRUN: usize = 2;

/// Bit reader for LZX chunks.
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    buffer: u32,
    bits_left: u32,
}

impl<'a> BitReader<'a> {
    /// Create a new bit reader.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            buffer: 0,
            bits_left: 0,
        }
    }

    /// Drop buffered bits and continue from the current byte position.
    pub fn reset(&mut self) {
        self.buffer = 0;
        self.bits_left = 0;
    }

    /// Ensure at least `n` (at most 16) bits are buffered.
    #[inline]
    pub fn ensure(&mut self, n: u32) -> Result<()> {
        debug_assert!(n <= 16);
        while self.bits_left < n {
            if self.pos >= self.data.len() + MAX_OVERRUN {
                return Err(Error::TruncatedInput {
                    offset: self.pos,
                    needed: 2,
                });
            }
            let lo = self.byte_at(self.pos) as u32;
            let hi = self.byte_at(self.pos + 1) as u32;
            self.pos += 2;
            self.buffer |= ((hi << 8) | lo) << (16 - self.bits_left);
            self.bits_left += 16;
        }
        Ok(())
    }

    #[inline]
    fn byte_at(&self, pos: usize) -> u8 {
        self.data.get(pos).copied().unwrap_or(0)
    }

    /// Look at the next `n` bits without consuming them. Requires `ensure(n)`.
    #[inline]
    pub fn peek(&self, n: u32) -> u32 {
        if n == 0 {
            0
        } else {
            self.buffer >> (32 - n)
        }
    }

    /// Raw accumulator, most significant bit first.
    #[inline]
    pub fn buffer(&self) -> u32 {
        self.buffer
    }

    /// Number of bits currently buffered.
    #[inline]
    pub fn bits_left(&self) -> u32 {
        self.bits_left
    }

    /// Discard `n` buffered bits.
    #[inline]
    pub fn remove(&mut self, n: u32) {
        debug_assert!(n <= self.bits_left);
        self.buffer = if n >= 32 { 0 } else { self.buffer << n };
        self.bits_left -= n;
    }

    /// Read `n` bits, `n` in `0..=16`.
    #[inline]
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n == 0 {
            return Ok(0);
        }
        self.ensure(n)?;
        let value = self.peek(n);
        self.remove(n);
        Ok(value)
    }

    /// Read up to 32 bits as a high part followed by a 16-bit low part.
    pub fn read_bits_wide(&mut self, n: u32) -> Result<u32> {
        if n > 16 {
            let high = self.read_bits(n - 16)?;
            let low = self.read_bits(16)?;
            Ok((high << 16) | low)
        } else {
            self.read_bits(n)
        }
    }

    /// Move to the byte boundary that precedes an uncompressed block body.
    ///
    /// The bits still buffered from the partially consumed word are padding.
    /// If a whole unread word was already pulled into the buffer it is handed
    /// back to the byte stream.
    pub fn align_to_bytes(&mut self) -> Result<()> {
        self.ensure(16)?;
        if self.bits_left > 16 {
            self.pos -= 2;
        }
        self.reset();
        Ok(())
    }

    /// Copy raw bytes, bypassing the bit buffer. Requires an empty buffer.
    pub fn read_raw(&mut self, out: &mut [u8]) -> Result<()> {
        let end = self.pos + out.len();
        if end > self.data.len() {
            return Err(Error::TruncatedInput {
                offset: self.pos,
                needed: end - self.data.len().min(end),
            });
        }
        out.copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(())
    }

    /// Read a raw little-endian u32, bypassing the bit buffer.
    pub fn read_raw_u32(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.read_raw(&mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Skip one raw byte.
    pub fn skip_raw_byte(&mut self) -> Result<()> {
        let mut pad = [0u8; 1];
        self.read_raw(&mut pad)
    }

    /// Byte position of the next unread word.
    pub fn byte_pos(&self) -> usize {
        self.pos
    }
}
