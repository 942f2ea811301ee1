//! Criterion benchmarks for Pilum.
//!
//! Covers the hot paths the load and query tools exercise:
//! - Per-document encode/decode for both codecs
//! - Random fetch under each access strategy
//! - Sequential scan
//! - Numeric range queries

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pilum::codec::codec_for;
use pilum::codec::descriptor::CodecDescriptor;
use pilum::document::{Document, DocumentGenerator};
use pilum::index::numeric::NumericRange;
use pilum::index::reader::IndexReader;
use pilum::index::writer::{IndexWriter, IndexWriterConfig};
use pilum::storage::AccessStrategy;
use tempfile::TempDir;

const CODECS: [CodecDescriptor; 2] = [
    CodecDescriptor::Plain,
    CodecDescriptor::Compressing { block_size: 128 },
];

/// Write `count` generated documents into a fresh index.
fn build_index(count: usize, codec: CodecDescriptor) -> TempDir {
    let dir = TempDir::new().unwrap();
    let config = IndexWriterConfig {
        codec,
        ..Default::default()
    };
    let mut writer = IndexWriter::open(dir.path(), config).unwrap();
    for doc in DocumentGenerator::new(Some(1)).take(count) {
        writer.add_document(doc).unwrap();
    }
    writer.finalize_segment().unwrap();
    writer.close().unwrap();
    dir
}

/// Benchmark document encoding and decoding.
fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let docs: Vec<Document> = DocumentGenerator::new(Some(1)).take(100).collect();

    for descriptor in CODECS {
        let codec = codec_for(descriptor).unwrap();
        let encoded: Vec<Vec<u8>> = docs.iter().map(|d| codec.encode(d).unwrap()).collect();

        group.throughput(Throughput::Elements(docs.len() as u64));
        group.bench_function(BenchmarkId::new("encode", descriptor.name()), |b| {
            b.iter(|| {
                for doc in &docs {
                    black_box(codec.encode(black_box(doc)).unwrap());
                }
            })
        });
        group.bench_function(BenchmarkId::new("decode", descriptor.name()), |b| {
            b.iter(|| {
                for bytes in &encoded {
                    black_box(codec.decode(black_box(bytes)).unwrap());
                }
            })
        });
        group.bench_function(BenchmarkId::new("write_region", descriptor.name()), |b| {
            b.iter(|| black_box(codec.write_region(black_box(&encoded)).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark fetches per access strategy.
fn bench_fetch(c: &mut Criterion) {
    let mut group = c.benchmark_group("fetch");
    group.sample_size(30);

    for codec in CODECS {
        let dir = build_index(5_000, codec);
        for strategy in [
            AccessStrategy::Buffered,
            AccessStrategy::Paged,
            AccessStrategy::Mmap,
        ] {
            let reader = IndexReader::open(dir.path(), strategy).unwrap();
            let id = format!("{}/{strategy}", codec.name());

            group.throughput(Throughput::Elements(100));
            group.bench_function(BenchmarkId::new("random", &id), |b| {
                b.iter(|| {
                    // Stride through the segment so consecutive fetches hit different blocks.
                    for i in 0..100u64 {
                        let ordinal = (i * 2_477) % 5_000;
                        black_box(reader.fetch(ordinal).unwrap());
                    }
                })
            });

            group.throughput(Throughput::Elements(5_000));
            group.bench_function(BenchmarkId::new("scan", &id), |b| {
                b.iter(|| {
                    for doc in reader.scan().unwrap() {
                        black_box(doc.unwrap());
                    }
                })
            });
        }
    }

    group.finish();
}

/// Benchmark numeric range queries.
fn bench_range_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_query");
    let dir = build_index(20_000, CodecDescriptor::Plain);
    let reader = IndexReader::open(dir.path(), AccessStrategy::Mmap).unwrap();

    for threshold in [i32::MIN, 0, 1_000_000_000] {
        let range = NumericRange::greater_than(threshold);
        group.bench_function(BenchmarkId::new("greater_than", threshold), |b| {
            b.iter(|| black_box(reader.range_query("foo", black_box(&range)).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_codec, bench_fetch, bench_range_query);

criterion_main!(benches);
