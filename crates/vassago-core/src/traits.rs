//! Core traits at the seam between framing and decompression.

use crate::error::Result;
use crate::stats::DecodeStats;
use crate::types::WindowBits;

/// Stateful decompressor fed one frame at a time.
///
/// State carries over between calls, so chunks must be supplied strictly in
/// stream order. Implementations are not meant to be shared between streams.
pub trait ChunkDecompressor {
    /// Window the decompressor was configured with.
    fn window_bits(&self) -> WindowBits;

    /// Decompress one chunk of compressed bytes.
    ///
    /// Exactly `output_len` bytes are appended to `output` on success.
    fn decompress_chunk(&mut self, input: &[u8], output_len: usize, output: &mut Vec<u8>) -> Result<()>;

    /// Forget all stream state so the instance can decode a new stream.
    fn reset(&mut self);

    /// Block-level counters, if the implementation keeps any.
    fn stats(&self) -> Option<DecodeStats> {
        None
    }
}

impl<D: ChunkDecompressor + ?Sized> ChunkDecompressor for &mut D {
    fn window_bits(&self) -> WindowBits {
        (**self).window_bits()
    }

    fn decompress_chunk(&mut self, input: &[u8], output_len: usize, output: &mut Vec<u8>) -> Result<()> {
        (**self).decompress_chunk(input, output_len, output)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn stats(&self) -> Option<DecodeStats> {
        (**self).stats()
    }
}
