//! Core type definitions shared by the decoder and the content layer.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Log2 of an LZX sliding window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct WindowBits(u8);

impl WindowBits {
    /// Smallest window the format allows (32 KiB).
    pub const MIN: u8 = 15;
    /// Largest window the format allows (2 MiB).
    pub const MAX: u8 = 21;
    /// Window used by compressed asset containers (64 KiB).
    pub const CONTAINER: WindowBits = WindowBits(16);

    /// Validate a window size given in bits.
    pub fn new(bits: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&bits) {
            Ok(WindowBits(bits))
        } else {
            Err(Error::UnsupportedWindowSize { bits: bits as u32 })
        }
    }

    /// Number of bits.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Window size in bytes.
    pub fn size(self) -> usize {
        1 << self.0
    }

    /// Number of position slots addressable with this window.
    pub fn position_slots(self) -> usize {
        match self.0 {
            20 => 42,
            21 => 50,
            bits => bits as usize * 2,
        }
    }
}

impl Default for WindowBits {
    fn default() -> Self {
        Self::CONTAINER
    }
}

impl TryFrom<u8> for WindowBits {
    type Error = Error;

    fn try_from(bits: u8) -> Result<Self> {
        WindowBits::new(bits)
    }
}

impl From<WindowBits> for u8 {
    fn from(bits: WindowBits) -> u8 {
        bits.0
    }
}
