//! Frame demultiplexing for compressed container payloads.
//!
//! A compressed payload is a sequence of frames, each prefixed by its
//! compressed size as a big-endian u16. Frames decompress to 32 KiB unless the
//! header starts with `0xFF`, in which case the next two bytes give the
//! decompressed size and a further two the compressed size.

use std::io::Read;

use tracing::debug;
use vassago_core::stream::{read_array, read_exact};
use vassago_core::{ChunkDecompressor, DecodeStats, Error, Result};

use crate::tables::FRAME_SIZE;

/// Marker byte introducing an explicit frame size.
pub const EXPLICIT_FRAME_MARKER: u8 = 0xFF;

/// Size header of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Compressed bytes that follow the header.
    pub block_size: usize,
    /// Bytes the frame decompresses to.
    pub frame_size: usize,
    /// Bytes the header itself occupied.
    pub header_len: usize,
}

impl FrameHeader {
    /// Read a frame header. `position` is only used for error reporting.
    pub fn read<R: Read + ?Sized>(input: &mut R, position: u64) -> Result<Self> {
        let [hi, lo] = read_array::<2, _>(input, position)?;
        if hi == EXPLICIT_FRAME_MARKER {
            let [extra] = read_array::<1, _>(input, position + 2)?;
            let block = read_array::<2, _>(input, position + 3)?;
            Ok(Self {
                block_size: u16::from_be_bytes(block) as usize,
                frame_size: u16::from_be_bytes([lo, extra]) as usize,
                header_len: 5,
            })
        } else {
            Ok(Self {
                block_size: u16::from_be_bytes([hi, lo]) as usize,
                frame_size: FRAME_SIZE,
                header_len: 2,
            })
        }
    }
}

/// Drives a [`ChunkDecompressor`] frame by frame.
pub struct FrameDemuxer<D: ChunkDecompressor> {
    decompressor: D,
    stats: DecodeStats,
    chunk: Vec<u8>,
}

impl<D: ChunkDecompressor> FrameDemuxer<D> {
    /// Create a demuxer around a fresh decompressor.
    pub fn new(decompressor: D) -> Self {
        Self {
            decompressor,
            stats: DecodeStats::new(),
            chunk: Vec::with_capacity(FRAME_SIZE),
        }
    }

    /// Get a reference to the decompressor.
    pub fn decompressor(&self) -> &D {
        &self.decompressor
    }

    /// Frame and block counters for everything demuxed so far.
    pub fn stats(&self) -> DecodeStats {
        let mut stats = self.stats.clone();
        if let Some(blocks) = self.decompressor.stats() {
            stats.verbatim_blocks = blocks.verbatim_blocks;
            stats.aligned_blocks = blocks.aligned_blocks;
            stats.uncompressed_blocks = blocks.uncompressed_blocks;
        }
        stats
    }

    /// Consume the demuxer, returning the decompressor.
    pub fn into_inner(self) -> D {
        self.decompressor
    }

    /// Decompress `compressed_len` bytes of framed input.
    ///
    /// The result must be exactly `decompressed_len` bytes long.
    pub fn demux<R: Read + ?Sized>(
        &mut self,
        input: &mut R,
        compressed_len: usize,
        decompressed_len: usize,
    ) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(decompressed_len);
        let mut consumed = 0usize;
        let mut frames = 0usize;

        while consumed < compressed_len {
            let header = FrameHeader::read(input, consumed as u64)?;
            consumed += header.header_len;
            if header.block_size == 0 || header.frame_size == 0 {
                break;
            }
            if consumed + header.block_size > compressed_len {
                return Err(Error::SizeMismatch {
                    what: "compressed",
                    expected: compressed_len as u64,
                    actual: (consumed + header.block_size) as u64,
                });
            }
            if output.len() + header.frame_size > decompressed_len {
                return Err(Error::SizeMismatch {
                    what: "decompressed",
                    expected: decompressed_len as u64,
                    actual: (output.len() + header.frame_size) as u64,
                });
            }

            self.chunk.resize(header.block_size, 0);
            read_exact(input, &mut self.chunk, consumed as u64)?;
            self.decompressor
                .decompress_chunk(&self.chunk, header.frame_size, &mut output)?;

            consumed += header.block_size;
            frames += 1;
        }

        self.stats.frames += frames;
        self.stats.compressed_bytes += consumed as u64;
        self.stats.decompressed_bytes += output.len() as u64;
        debug!(
            frames,
            compressed = consumed,
            decompressed = output.len(),
            "demuxed compressed payload"
        );

        if output.len() != decompressed_len {
            return Err(Error::SizeMismatch {
                what: "decompressed",
                expected: decompressed_len as u64,
                actual: output.len() as u64,
            });
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{frame_stream, EncoderOptions, LzxEncoder};
    use crate::LzxDecoder;
    use std::io::Cursor;
    use vassago_core::WindowBits;

    /// Emits `output_len` copies of the first input byte.
    struct Repeater {
        calls: Vec<(usize, usize)>,
    }

    impl ChunkDecompressor for Repeater {
        fn window_bits(&self) -> WindowBits {
            WindowBits::default()
        }

        fn decompress_chunk(&mut self, input: &[u8], output_len: usize, output: &mut Vec<u8>) -> Result<()> {
            self.calls.push((input.len(), output_len));
            output.extend(std::iter::repeat(input[0]).take(output_len));
            Ok(())
        }

        fn reset(&mut self) {
            self.calls.clear();
        }
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| ((i / 7) % 13) as u8 + b'a').collect()
    }

    #[test]
    fn test_frame_header_forms() {
        let mut plain = Cursor::new(vec![0x12, 0x34]);
        let header = FrameHeader::read(&mut plain, 0).unwrap();
        assert_eq!(header.block_size, 0x1234);
        assert_eq!(header.frame_size, FRAME_SIZE);
        assert_eq!(header.header_len, 2);

        let mut explicit = Cursor::new(vec![0xFF, 0x1C, 0x40, 0x00, 0x10]);
        let header = FrameHeader::read(&mut explicit, 0).unwrap();
        assert_eq!(header.block_size, 0x10);
        assert_eq!(header.frame_size, 7232);
        assert_eq!(header.header_len, 5);
    }

    #[test]
    fn test_demux_drives_decompressor_per_frame() {
        let mut stream = vec![0x00, 0x02, b'x', b'y'];
        stream.extend_from_slice(&[0xFF, 0x00, 0x10, 0x00, 0x01, b'z']);
        let total = stream.len();

        let mut demuxer = FrameDemuxer::new(Repeater { calls: Vec::new() });
        let out = demuxer
            .demux(&mut Cursor::new(stream), total, FRAME_SIZE + 16)
            .unwrap();

        assert_eq!(out.len(), FRAME_SIZE + 16);
        assert_eq!(out[0], b'x');
        assert_eq!(out[FRAME_SIZE], b'z');
        assert_eq!(demuxer.decompressor().calls, vec![(2, FRAME_SIZE), (1, 16)]);
        assert_eq!(demuxer.stats().frames, 2);
    }

    #[test]
    fn test_zero_block_size_stops() {
        let stream = vec![0xFF, 0x00, 0x04, 0x00, 0x01, b'q', 0x00, 0x00, 0xAA, 0xBB];
        let mut demuxer = FrameDemuxer::new(Repeater { calls: Vec::new() });
        let out = demuxer
            .demux(&mut Cursor::new(stream.clone()), stream.len(), 4)
            .unwrap();
        assert_eq!(out, b"qqqq");
    }

    #[test]
    fn test_lzx_frames_reassemble() {
        let data = sample(40_000);
        let options = EncoderOptions {
            window_bits: 15,
            ..Default::default()
        };
        let payload = frame_stream(&LzxEncoder::new(options).encode(&data));

        let mut demuxer = FrameDemuxer::new(LzxDecoder::new(15).unwrap());
        let out = demuxer
            .demux(&mut Cursor::new(&payload), payload.len(), data.len())
            .unwrap();
        assert_eq!(out, data);

        let stats = demuxer.stats();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.verbatim_blocks, 2);
        assert_eq!(stats.compressed_bytes, payload.len() as u64);
        assert_eq!(stats.decompressed_bytes, 40_000);
    }

    #[test]
    fn test_declared_size_off_by_one() {
        let data = sample(40_000);
        let payload = frame_stream(&LzxEncoder::new(EncoderOptions::default()).encode(&data));

        for declared in [data.len() - 1, data.len() + 1] {
            let mut demuxer = FrameDemuxer::new(LzxDecoder::new(16).unwrap());
            let err = demuxer
                .demux(&mut Cursor::new(&payload), payload.len(), declared)
                .unwrap_err();
            assert!(
                matches!(err, Error::SizeMismatch { what: "decompressed", .. }),
                "declared {declared}: {err}"
            );
        }
    }

    #[test]
    fn test_frame_past_compressed_length() {
        let data = sample(1000);
        let payload = frame_stream(&LzxEncoder::new(EncoderOptions::default()).encode(&data));
        let mut demuxer = FrameDemuxer::new(LzxDecoder::new(16).unwrap());
        let err = demuxer
            .demux(&mut Cursor::new(&payload), payload.len() - 1, data.len())
            .unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { what: "compressed", .. }));
    }

    #[test]
    fn test_truncated_stream() {
        let data = sample(1000);
        let payload = frame_stream(&LzxEncoder::new(EncoderOptions::default()).encode(&data));
        let short = payload[..payload.len() - 3].to_vec();
        let mut demuxer = FrameDemuxer::new(LzxDecoder::new(16).unwrap());
        let err = demuxer
            .demux(&mut Cursor::new(short), payload.len(), data.len())
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof { .. }));
    }
}
