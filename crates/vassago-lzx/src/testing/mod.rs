//! Reference LZX encoder for building test fixtures.
//!
//! The encoder is deliberately simple (greedy matching, fixed tree shapes) but
//! produces every construct the decoder understands: all three block types,
//! repeat offsets, long matches through the length tree, delta-coded tree
//! lengths with every run code, codes longer than the lookup tables, blocks
//! that span frames, odd-length stored blocks, and the call translation header.
//!
//! # Feature Gate
//!
//! This module is only available when the `testing` feature is enabled,
//! or when running tests.
//!
//! ```toml
//! [dev-dependencies]
//! vassago-lzx = { version = "...", features = ["testing"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vassago_lzx::testing::{frame_stream, EncoderOptions, LzxEncoder};
//!
//! let frames = LzxEncoder::new(EncoderOptions::default()).encode(&data);
//! let payload = frame_stream(&frames);
//! ```

mod bit_writer;
mod encoder;

pub use bit_writer::BitWriter;
pub use encoder::{
    complete_lengths, frame_stream, skewed_lengths, BlockKind, CanonicalCodes, EncodedFrame,
    EncoderOptions, LzxEncoder, TreeShape,
};
