//! Property-based tests for LZX decoding.
//!
//! - Encoded payloads decode back to the original bytes for every block type,
//!   window size and block size
//! - Arbitrary code lengths and arbitrary chunks never panic the decoder
//! - Repeat offsets behave as a three-entry recency list
//!
//! Run with: cargo test -p vassago-lzx --test proptest_lzx

use std::io::Cursor;

use proptest::prelude::*;

use vassago_lzx::testing::{frame_stream, BlockKind, EncoderOptions, LzxEncoder, TreeShape};
use vassago_lzx::{FrameDemuxer, HuffmanTable, LzxDecoder, RepeatOffsets};

/// Data with enough repetition to produce matches and repeat offsets.
fn compressible_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop_oneof![
            prop::collection::vec(b'a'..=b'e', 1..40),
            prop::collection::vec(any::<u8>(), 1..8),
            (1usize..600).prop_map(|n| b"xnb payload ".repeat(n / 12 + 1)),
        ],
        0..200,
    )
    .prop_map(|chunks| chunks.concat())
}

fn block_kind_strategy() -> impl Strategy<Value = BlockKind> {
    prop_oneof![
        Just(BlockKind::Verbatim),
        Just(BlockKind::Aligned),
        Just(BlockKind::Uncompressed),
        Just(BlockKind::Rotate),
    ]
}

fn tree_shape_strategy() -> impl Strategy<Value = TreeShape> {
    prop_oneof![Just(TreeShape::Flat), Just(TreeShape::Skewed)]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 48,
        max_shrink_iters: 100,
        ..ProptestConfig::default()
    })]

    /// Property: demuxing an encoded payload reproduces the input exactly.
    #[test]
    fn prop_roundtrip(
        data in compressible_strategy(),
        window_bits in 15u8..=21,
        block_size in 1000usize..=70_000,
        block_kind in block_kind_strategy(),
        tree_shape in tree_shape_strategy(),
    ) {
        let options = EncoderOptions {
            window_bits,
            block_size,
            block_kind,
            tree_shape,
            ..Default::default()
        };
        let payload = frame_stream(&LzxEncoder::new(options).encode(&data));

        let mut demuxer = FrameDemuxer::new(LzxDecoder::new(window_bits).unwrap());
        let out = demuxer
            .demux(&mut Cursor::new(&payload), payload.len(), data.len())
            .unwrap();
        prop_assert_eq!(out, data);
    }

    /// Property: building a table from any lengths either succeeds or reports
    /// a malformed table, and decoding from a built table never panics.
    #[test]
    fn prop_huffman_build_never_panics(
        lengths in prop::collection::vec(0u8..=18, 2..=64),
        input in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        if let Ok(table) = HuffmanTable::from_lengths("prop", &lengths, 7) {
            let mut bits = vassago_lzx::bits::BitReader::new(&input);
            for _ in 0..32 {
                if table.decode(&mut bits).is_err() {
                    break;
                }
            }
        }
    }

    /// Property: arbitrary chunks produce an error or output, never a panic.
    #[test]
    fn prop_decoder_rejects_garbage_cleanly(
        input in prop::collection::vec(any::<u8>(), 0..2048),
        output_len in 1usize..=32_768,
    ) {
        let mut decoder = LzxDecoder::new(16).unwrap();
        let mut out = Vec::new();
        if decoder.decompress(&input, output_len, &mut out).is_ok() {
            prop_assert_eq!(out.len(), output_len);
        }
    }

    /// Property: repeat offsets act as a recency list of three.
    #[test]
    fn prop_repeat_offsets_recency(
        ops in prop::collection::vec((any::<bool>(), 1u32..100_000, 0usize..3), 1..64),
    ) {
        let mut offsets = RepeatOffsets::new();
        for (is_push, value, slot) in ops {
            let before = offsets.get();
            if is_push {
                offsets.push(value);
                prop_assert_eq!(offsets.get(), [value, before[0], before[1]]);
            } else {
                let taken = offsets.take(slot);
                prop_assert_eq!(taken, before[slot]);
                prop_assert_eq!(offsets.get()[0], before[slot]);
                let mut sorted_before = before;
                let mut sorted_after = offsets.get();
                sorted_before.sort_unstable();
                sorted_after.sort_unstable();
                prop_assert_eq!(sorted_before, sorted_after);
            }
        }
    }
}
