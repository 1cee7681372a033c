//! Payload and container builders for tests.
//!
//! # Feature Gate
//!
//! This module is only available when the `testing` feature is enabled,
//! or when running tests.

use vassago_lzx::testing::{frame_stream, BlockKind, EncoderOptions, LzxEncoder};

use crate::header::{COMPRESSED_PROLOGUE_SIZE, MAGIC, PROLOGUE_SIZE, VERSION_COMPRESSED, VERSION_UNCOMPRESSED};

/// Writes payload bytes in the layout [`ContentReader`](crate::ContentReader) reads.
#[derive(Debug, Default, Clone)]
pub struct ContentWriter {
    buf: Vec<u8>,
}

impl ContentWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.u8(value as u8)
    }

    pub fn i16(&mut self, value: i16) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn i64(&mut self, value: i64) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn f32(&mut self, value: f32) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn f64(&mut self, value: f64) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// 7-bit encoded int.
    pub fn encoded_int(&mut self, value: i32) -> &mut Self {
        let mut value = value as u32;
        while value >= 0x80 {
            self.buf.push(value as u8 | 0x80);
            value >>= 7;
        }
        self.u8(value as u8)
    }

    /// Length-prefixed UTF-8 string.
    pub fn string(&mut self, value: &str) -> &mut Self {
        self.encoded_int(value.len() as i32).bytes(value.as_bytes())
    }

    /// Reader count followed by `(name, version)` entries.
    pub fn manifest(&mut self, entries: &[(&str, i32)]) -> &mut Self {
        self.encoded_int(entries.len() as i32);
        for &(name, version) in entries {
            self.string(name).i32(version);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

fn prologue(version: u16, profile: u8, total_size: u32) -> Vec<u8> {
    let mut out = MAGIC.to_vec();
    out.push(b'w');
    out.extend_from_slice(&(version | (profile as u16) << 8).to_le_bytes());
    out.extend_from_slice(&total_size.to_le_bytes());
    out
}

/// Wrap `payload` in an uncompressed container for platform `'w'`.
pub fn plain_container(profile: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = prologue(VERSION_UNCOMPRESSED, profile, payload.len() as u32 + PROLOGUE_SIZE);
    out.extend_from_slice(payload);
    out
}

/// Wrap `payload` in an LZX-compressed container for platform `'w'`.
pub fn compressed_container(profile: u8, payload: &[u8]) -> Vec<u8> {
    let options = EncoderOptions {
        block_kind: BlockKind::Rotate,
        block_size: 20_000,
        ..Default::default()
    };
    let frames = frame_stream(&LzxEncoder::new(options).encode(payload));
    let mut out = prologue(
        VERSION_COMPRESSED,
        profile,
        frames.len() as u32 + COMPRESSED_PROLOGUE_SIZE,
    );
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&frames);
    out
}
