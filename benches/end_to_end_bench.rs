//! End-to-end throughput of the block codec over the software engine:
//! one framed compress and one framed decompress per iteration, across block
//! sizes that bracket typical storage-engine values.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::RngCore;

use accelflate::{AccelflateConfig, BlockCodec};

fn compressible_block(length: usize) -> Vec<u8> {
    (0..length).map(|i| b'a' + (i % 26) as u8).collect()
}

fn random_block(length: usize) -> Vec<u8> {
    let mut block = vec![0u8; length];
    rand::rng().fill_bytes(&mut block);
    block
}

fn bench_roundtrip(c: &mut Criterion) {
    let codec = BlockCodec::new(Arc::new(AccelflateConfig::default()));
    let mut group = c.benchmark_group("block_codec");

    for size in [4096usize, 65_536, 1 << 20] {
        let input = compressible_block(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("compress", size), &input, |b, data| {
            let mut output = Vec::new();
            b.iter(|| codec.compress(data, &mut output).unwrap());
        });

        let mut compressed = Vec::new();
        codec.compress(&input, &mut compressed).unwrap();
        group.bench_with_input(
            BenchmarkId::new("decompress", size),
            &compressed,
            |b, data| {
                b.iter(|| codec.decompress(data).unwrap());
            },
        );
    }

    // Incompressible input exercises the stored-block fallback path.
    let size = 40_000usize;
    let input = random_block(size);
    group.throughput(Throughput::Bytes(size as u64));
    group.bench_with_input(
        BenchmarkId::new("compress_random", size),
        &input,
        |b, data| {
            let mut output = Vec::new();
            b.iter(|| codec.compress(data, &mut output).unwrap());
        },
    );

    group.finish();
}

criterion_group!(benches, bench_roundtrip);
criterion_main!(benches);
