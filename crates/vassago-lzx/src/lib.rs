//! # Vassago LZX
//!
//! LZX decompression as used inside compressed asset containers.
//!
//! The decoder keeps its sliding window, Huffman trees and repeat offsets
//! between chunks, so a payload is decoded by feeding it frame after frame
//! through one [`LzxDecoder`]. [`FrameDemuxer`] handles the frame size
//! headers and checks the final length.
//!
//! ## Block Types
//!
//! - **Verbatim**: literals and matches coded with the main and length trees
//! - **Aligned**: as verbatim, with the low offset bits coded by an extra tree
//! - **Uncompressed**: raw bytes, with explicit repeat offsets
//!
//! ## Example
//!
//! ```ignore
//! use vassago_lzx::{FrameDemuxer, LzxDecoder};
//!
//! let decoder = LzxDecoder::new(16)?;
//! let mut demuxer = FrameDemuxer::new(decoder);
//! let bytes = demuxer.demux(&mut reader, compressed_len, decompressed_len)?;
//! ```

pub mod bits;
pub mod decoder;
pub mod frame;
pub mod huffman;
pub mod offsets;
pub mod tables;
pub mod translate;
pub mod window;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types
pub use decoder::{BlockType, LzxDecoder};
pub use frame::{FrameDemuxer, FrameHeader};
pub use huffman::HuffmanTable;
pub use offsets::RepeatOffsets;
pub use vassago_core::{ChunkDecompressor, DecodeStats, Error, Result, WindowBits};
