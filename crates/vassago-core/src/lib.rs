//! # Vassago Core
//!
//! Shared error types, traits and helpers for the Vassago asset container toolkit.
//!
//! Vassago is named after the third spirit of the Ars Goetia, who discovers
//! things hidden and lost - just as this toolkit recovers typed assets from
//! compressed containers.
//!
//! ## Core Items
//!
//! - [`Error`] / [`Result`] - the error taxonomy used by every crate
//! - [`ChunkDecompressor`] - frame-at-a-time stateful decompression
//! - [`WindowBits`] - validated sliding window size
//! - [`DecodeStats`] - counters gathered while decoding

pub mod error;
pub mod stats;
pub mod stream;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use stats::DecodeStats;
pub use traits::ChunkDecompressor;
pub use types::WindowBits;
