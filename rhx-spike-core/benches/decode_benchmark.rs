//! Benchmarks for spike file decoder performance.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rhx_spike_core::output::SpikeFileWriter;
use rhx_spike_core::snapshot;
use rhx_spike_core::{FileFormat, FileHeader, Snapshot, SpikeDecoder, SpikeRecord};

const CHANNELS: usize = 64;
const SPIKES: usize = 100_000;

/// Builds a synthetic multi-channel file with 30-sample snapshots.
fn synthetic_file(pre: u32, post: u32) -> Vec<u8> {
    let native: Vec<String> = (0..CHANNELS).map(|i| format!("A-{:03}", i)).collect();
    let header = FileHeader {
        format: FileFormat::MultiChannel,
        version: 1,
        source_file_name: "bench.rhd".to_string(),
        custom_channel_names: native.clone(),
        native_channel_names: native,
        sample_rate_hz: 30000.0,
        samples_pre_detect: pre,
        samples_post_detect: post,
    };
    let n_samples = header.n_samples();

    let mut writer = SpikeFileWriter::new(Vec::new(), header).unwrap();
    for i in 0..SPIKES {
        let raw: Vec<u16> = (0..n_samples)
            .map(|k| (32768 + (k * 13 + i) % 2000) as u16)
            .collect();
        let record = SpikeRecord {
            channel_index: (i * 7) % CHANNELS,
            raw_timestamp: (i * 30) as i32,
            timestamp_seconds: 0.0,
            spike_id: if i % 50 == 0 { 128 } else { 1 },
            snapshot: (n_samples > 0).then(|| Snapshot {
                microvolts: snapshot::convert_snapshot(&raw),
                raw,
            }),
        };
        writer.write_record(&record).unwrap();
    }
    writer.finish().unwrap()
}

fn decode_bytes_benchmark(c: &mut Criterion) {
    let with_snapshots = synthetic_file(10, 20);
    let without_snapshots = synthetic_file(0, 0);

    let mut group = c.benchmark_group("decode_bytes");

    group.throughput(Throughput::Bytes(with_snapshots.len() as u64));
    group.bench_function("100k_spikes_with_snapshots", |b| {
        b.iter(|| {
            let decoder = SpikeDecoder::new();
            let result = decoder.decode_bytes(black_box(&with_snapshots)).unwrap();
            black_box(result.total_spikes())
        })
    });

    group.throughput(Throughput::Bytes(without_snapshots.len() as u64));
    group.bench_function("100k_spikes_timestamps_only", |b| {
        b.iter(|| {
            let decoder = SpikeDecoder::new().exclude_artifacts(true);
            let result = decoder.decode_bytes(black_box(&without_snapshots)).unwrap();
            black_box(result.total_spikes())
        })
    });

    group.finish();
}

fn snapshot_conversion_benchmark(c: &mut Criterion) {
    let raw: Vec<u16> = (0..30_000).map(|i| (i * 2) as u16).collect();

    let mut group = c.benchmark_group("snapshot");
    group.throughput(Throughput::Elements(raw.len() as u64));
    group.bench_function("convert_30k_samples", |b| {
        b.iter(|| black_box(snapshot::convert_snapshot(black_box(&raw))))
    });
    group.finish();
}

criterion_group!(benches, decode_bytes_benchmark, snapshot_conversion_benchmark);
criterion_main!(benches);
