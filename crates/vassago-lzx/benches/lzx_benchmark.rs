//! Benchmarks for LZX decompression.
//!
//! Run with: `cargo bench -p vassago-lzx`

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vassago_lzx::testing::{frame_stream, BlockKind, EncoderOptions, LzxEncoder};
use vassago_lzx::{FrameDemuxer, LzxDecoder};

/// Generate test data with varying compressibility.
fn generate_test_data(size: usize, compressibility: f64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut data = Vec::with_capacity(size);

    if compressibility > 0.9 {
        let pattern = b"ABCDEFGHIJKLMNOP";
        while data.len() < size {
            data.extend_from_slice(pattern);
        }
        data.truncate(size);
    } else if compressibility > 0.5 {
        let phrases: &[&[u8]] = &[
            b"Microsoft.Xna.Framework.Content.Texture2DReader",
            b"Microsoft.Xna.Framework.Content.StringReader",
            b"Microsoft.Xna.Framework.Vector3",
        ];
        while data.len() < size {
            if rng.gen_bool(compressibility) {
                let phrase = phrases[rng.gen_range(0..phrases.len())];
                data.extend_from_slice(phrase);
            } else {
                data.push(rng.gen::<u8>());
            }
        }
        data.truncate(size);
    } else {
        data.resize(size, 0);
        rng.fill(&mut data[..]);
    }

    data
}

fn encode(data: &[u8], block_kind: BlockKind) -> Vec<u8> {
    let options = EncoderOptions {
        block_kind,
        ..Default::default()
    };
    frame_stream(&LzxEncoder::new(options).encode(data))
}

fn bench_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("lzx_decompress");

    for &(name, compressibility) in &[("repetitive", 0.95), ("mixed", 0.7), ("random", 0.0)] {
        for &size in &[64 * 1024, 1024 * 1024] {
            let data = generate_test_data(size, compressibility);
            let payload = encode(&data, BlockKind::Verbatim);
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(name, size),
                &payload,
                |b, payload| {
                    b.iter(|| {
                        let mut demuxer = FrameDemuxer::new(LzxDecoder::new(16).unwrap());
                        let out = demuxer
                            .demux(&mut Cursor::new(payload), payload.len(), size)
                            .unwrap();
                        black_box(out)
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_block_types(c: &mut Criterion) {
    let mut group = c.benchmark_group("lzx_block_types");
    let size = 256 * 1024;
    let data = generate_test_data(size, 0.7);
    group.throughput(Throughput::Bytes(size as u64));

    for &(name, kind) in &[
        ("verbatim", BlockKind::Verbatim),
        ("aligned", BlockKind::Aligned),
        ("uncompressed", BlockKind::Uncompressed),
    ] {
        let payload = encode(&data, kind);
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut demuxer = FrameDemuxer::new(LzxDecoder::new(16).unwrap());
                black_box(
                    demuxer
                        .demux(&mut Cursor::new(&payload), payload.len(), size)
                        .unwrap(),
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decompress, bench_block_types);
criterion_main!(benches);
