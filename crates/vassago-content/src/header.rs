//! Container prologue parsing.
//!
//! Every asset file starts with a small little-endian prologue:
//!
//! ```text
//! "XNB" platform:u8 version:u16 total_size:u32 [decompressed_size:u32]
//! ```
//!
//! The version word carries the graphics profile in bits 8..15 and, outside
//! that field, either the plain (`5`) or the compressed (`0x8005`) version.
//! A compressed payload is a sequence of LZX frames and is decoded eagerly.

use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

use tracing::debug;
use vassago_core::stream::{read_array, remaining_len};
use vassago_core::{DecodeStats, Error, Result};
use vassago_lzx::{FrameDemuxer, LzxDecoder};

use crate::config::HeaderOptions;

/// Container magic.
pub const MAGIC: [u8; 3] = *b"XNB";
/// Version of an uncompressed container.
pub const VERSION_UNCOMPRESSED: u16 = 5;
/// Version of an LZX-compressed container.
pub const VERSION_COMPRESSED: u16 = 0x8005;
/// Bytes before the payload of an uncompressed container.
pub const PROLOGUE_SIZE: u32 = 10;
/// Bytes before the payload of a compressed container.
pub const COMPRESSED_PROLOGUE_SIZE: u32 = 14;

const PROFILE_MASK: u16 = 0x7F00;
const PROFILE_SHIFT: u16 = 8;

/// Graphics feature level an asset was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsProfile {
    Reach,
    HiDef,
    Other(u8),
}

impl GraphicsProfile {
    /// Profile for the raw identifier in the version word.
    pub fn from_id(id: u8) -> Self {
        match id {
            0 => GraphicsProfile::Reach,
            1 => GraphicsProfile::HiDef,
            other => GraphicsProfile::Other(other),
        }
    }

    /// Raw identifier.
    pub fn id(self) -> u8 {
        match self {
            GraphicsProfile::Reach => 0,
            GraphicsProfile::HiDef => 1,
            GraphicsProfile::Other(id) => id,
        }
    }
}

impl fmt::Display for GraphicsProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsProfile::Reach => write!(f, "Reach"),
            GraphicsProfile::HiDef => write!(f, "HiDef"),
            GraphicsProfile::Other(id) => write!(f, "profile {id}"),
        }
    }
}

/// Parsed container prologue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetHeader {
    /// Platform tag byte.
    pub platform: u8,
    pub graphics_profile: GraphicsProfile,
    /// Whether the payload is LZX-compressed.
    pub compressed: bool,
    /// Declared size of the whole file, prologue included.
    pub total_size: u32,
    /// Declared payload size after decompression (compressed containers only).
    pub decompressed_size: Option<u32>,
}

impl AssetHeader {
    /// Parse and validate the prologue, leaving `input` at the first payload byte.
    pub fn parse<R: Read + Seek + ?Sized>(input: &mut R, options: &HeaderOptions) -> Result<Self> {
        let magic = read_array::<3, _>(input, 0)?;
        if magic != MAGIC {
            return Err(Error::malformed_header(format!("bad magic {magic:02X?}")));
        }

        let [platform] = read_array::<1, _>(input, 3)?;
        if platform != options.platform {
            return Err(Error::malformed_header(format!(
                "platform tag {:?} (expected {:?})",
                platform as char, options.platform as char
            )));
        }

        let version = u16::from_le_bytes(read_array(input, 4)?);
        let graphics_profile = GraphicsProfile::from_id(((version & PROFILE_MASK) >> PROFILE_SHIFT) as u8);
        let compressed = match version & !PROFILE_MASK {
            VERSION_UNCOMPRESSED => false,
            VERSION_COMPRESSED => true,
            other => {
                return Err(Error::malformed_header(format!("unknown version {other:#06x}")));
            }
        };

        let total_size = u32::from_le_bytes(read_array(input, 6)?);
        let prologue = if compressed {
            COMPRESSED_PROLOGUE_SIZE
        } else {
            PROLOGUE_SIZE
        };
        if total_size < prologue {
            return Err(Error::malformed_header(format!(
                "total size {total_size} is smaller than the {prologue}-byte prologue"
            )));
        }

        let remaining = remaining_len(input)?;
        let declared = (total_size - PROLOGUE_SIZE) as u64;
        if declared > remaining {
            return Err(Error::SizeMismatch {
                what: "container",
                expected: declared,
                actual: remaining,
            });
        }

        let decompressed_size = if compressed {
            let size = u32::from_le_bytes(read_array(input, PROLOGUE_SIZE as u64)?);
            if size as u64 > options.max_decompressed_size {
                return Err(Error::LimitExceeded {
                    what: "decompressed payload",
                    requested: size as u64,
                    limit: options.max_decompressed_size,
                });
            }
            Some(size)
        } else {
            None
        };

        Ok(Self {
            platform,
            graphics_profile,
            compressed,
            total_size,
            decompressed_size,
        })
    }

    /// Parse the prologue and return a stream over the plain payload.
    pub fn prepare<R: Read + Seek>(mut input: R, options: &HeaderOptions) -> Result<(Self, PreparedStream<R>)> {
        let header = Self::parse(&mut input, options)?;
        let Some(decompressed_len) = header.decompressed_size else {
            return Ok((header, PreparedStream::Raw(input)));
        };

        let compressed_len = header.payload_size() as usize;
        let mut demuxer = FrameDemuxer::new(LzxDecoder::with_window(options.window_bits));
        let data = demuxer.demux(&mut input, compressed_len, decompressed_len as usize)?;
        let stats = demuxer.stats();
        debug!(
            compressed = compressed_len,
            decompressed = data.len(),
            frames = stats.frames,
            "decompressed container payload"
        );

        Ok((
            header,
            PreparedStream::Decompressed {
                data: Cursor::new(data),
                stats,
            },
        ))
    }

    /// Bytes taken by the prologue.
    pub fn prologue_size(&self) -> u32 {
        if self.compressed {
            COMPRESSED_PROLOGUE_SIZE
        } else {
            PROLOGUE_SIZE
        }
    }

    /// Bytes stored after the prologue (compressed size for compressed containers).
    pub fn payload_size(&self) -> u32 {
        self.total_size - self.prologue_size()
    }

    /// Size of the payload once decompressed.
    pub fn content_size(&self) -> u32 {
        self.decompressed_size.unwrap_or_else(|| self.payload_size())
    }
}

/// Readable view of a container payload.
#[derive(Debug)]
pub enum PreparedStream<R> {
    /// The original stream, positioned after the prologue.
    Raw(R),
    /// Fully decompressed payload.
    Decompressed { data: Cursor<Vec<u8>>, stats: DecodeStats },
}

impl<R> PreparedStream<R> {
    /// Whether the payload came out of the LZX decoder.
    pub fn is_decompressed(&self) -> bool {
        matches!(self, PreparedStream::Decompressed { .. })
    }

    /// Decoding statistics for a decompressed payload.
    pub fn stats(&self) -> Option<&DecodeStats> {
        match self {
            PreparedStream::Raw(_) => None,
            PreparedStream::Decompressed { stats, .. } => Some(stats),
        }
    }
}

impl<R: Read> Read for PreparedStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            PreparedStream::Raw(input) => input.read(buf),
            PreparedStream::Decompressed { data, .. } => data.read(buf),
        }
    }
}

impl<R: Seek> Seek for PreparedStream<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            PreparedStream::Raw(input) => input.seek(pos),
            PreparedStream::Decompressed { data, .. } => data.seek(pos),
        }
    }
}
