//! Statistics gathered while decoding.

/// Counters from a decode operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Frames handed to the decompressor.
    pub frames: usize,

    /// Compressed bytes consumed, frame headers included.
    pub compressed_bytes: u64,

    /// Decompressed bytes produced.
    pub decompressed_bytes: u64,

    /// Verbatim blocks started.
    pub verbatim_blocks: usize,

    /// Aligned-offset blocks started.
    pub aligned_blocks: usize,

    /// Uncompressed blocks started.
    pub uncompressed_blocks: usize,
}

impl DecodeStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total blocks of any kind.
    pub fn blocks(&self) -> usize {
        self.verbatim_blocks + self.aligned_blocks + self.uncompressed_blocks
    }

    /// Decompressed bytes per compressed byte.
    pub fn ratio(&self) -> f64 {
        if self.compressed_bytes == 0 {
            return 0.0;
        }
        self.decompressed_bytes as f64 / self.compressed_bytes as f64
    }

    /// Merge stats from another operation.
    pub fn merge(&mut self, other: &DecodeStats) {
        self.frames += other.frames;
        self.compressed_bytes += other.compressed_bytes;
        self.decompressed_bytes += other.decompressed_bytes;
        self.verbatim_blocks += other.verbatim_blocks;
        self.aligned_blocks += other.aligned_blocks;
        self.uncompressed_blocks += other.uncompressed_blocks;
    }
}
