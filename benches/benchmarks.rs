//! Performance benchmarks for ferro-txmap
//!
//! Run with: cargo bench
//! Run specific benchmark: cargo bench -- lookup

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ferro_txmap::batch::{BatchPipeline, CancellationToken, PipelineConfig};
use ferro_txmap::io::{OutputLayout, TsvQuerySource, TsvResultSink};
use ferro_txmap::{
    parse_cigar, CoordinateIndex, Query, QueryEngine, Strand, TranscriptCatalog,
    TranscriptRecord,
};

/// A CIGAR with `exons` match runs separated by alternating gaps
fn spliced_cigar(exons: usize) -> String {
    (0..exons)
        .map(|i| match i % 3 {
            0 => "150M250D".to_string(),
            1 => "90M3I".to_string(),
            _ => "120M1000D".to_string(),
        })
        .collect::<String>()
        + "50M"
}

/// `n` transcripts spread over 4 chromosomes, overlapping their neighbours
fn catalog(n: usize) -> TranscriptCatalog {
    let records = (0..n).map(|i| TranscriptRecord {
        line: i as u64 + 2,
        id: format!("TX{}", i),
        chromosome: format!("chr{}", i % 4 + 1),
        genomic_start: (i / 4) as u64 * 5_000,
        cigar: spliced_cigar(12),
        strand: if i % 2 == 0 {
            Strand::Forward
        } else {
            Strand::Reverse
        },
    });
    TranscriptCatalog::load(records).0
}

// =============================================================================
// Alignment benchmarks
// =============================================================================

fn bench_cigar_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("cigar");

    for exons in [1, 10, 100, 1000] {
        let cigar = spliced_cigar(exons);
        group.throughput(Throughput::Bytes(cigar.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", exons), &cigar, |b, s| {
            b.iter(|| parse_cigar(black_box(s)))
        });

        let parsed = parse_cigar(&cigar).unwrap();
        group.bench_with_input(BenchmarkId::new("index", exons), &parsed, |b, p| {
            b.iter(|| CoordinateIndex::build(black_box(10_000), Strand::Reverse, p))
        });
    }

    group.finish();
}

fn bench_index_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    for exons in [10, 1000] {
        let cigar = parse_cigar(&spliced_cigar(exons)).unwrap();
        let index = CoordinateIndex::build(10_000, Strand::Forward, &cigar).unwrap();
        let len = index.transcript_len();
        let (start, end) = (index.genomic_start(), index.genomic_end());

        group.bench_function(BenchmarkId::new("t2g", exons), |b| {
            let mut t = 0u64;
            b.iter(|| {
                t = (t + 7919) % len;
                index.transcript_to_genome(black_box(t))
            })
        });
        group.bench_function(BenchmarkId::new("g2t", exons), |b| {
            let mut g = start;
            b.iter(|| {
                g = start + (g - start + 7919) % (end - start);
                index.genome_to_transcript(black_box(g))
            })
        });
    }

    group.finish();
}

// =============================================================================
// Query benchmarks
// =============================================================================

fn bench_query_engine(c: &mut Criterion) {
    let catalog = catalog(2_000);
    let engine = QueryEngine::new(&catalog);

    let mut group = c.benchmark_group("engine");
    group.bench_function("t2g", |b| {
        let query = Query::t2g("TX1234", 500);
        b.iter(|| engine.resolve(black_box(&query)))
    });
    group.bench_function("g2t", |b| {
        let query = Query::g2t("chr2", 1_250_100);
        b.iter(|| engine.resolve(black_box(&query)))
    });
    group.bench_function("g2t_miss", |b| {
        let query = Query::g2t("chrUn", 42);
        b.iter(|| engine.resolve(black_box(&query)))
    });
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let catalog = catalog(200);
    let mut text = String::from("Type\tTranscript\tTranscript_Coord\tChromosome\tGenome_Coord\n");
    let rows = 50_000u64;
    for i in 0..rows {
        if i % 2 == 0 {
            text.push_str(&format!("T2G\tTX{}\t{}\t\t\n", i % 200, i % 1500));
        } else {
            text.push_str(&format!("G2T\t\t\tchr{}\t{}\n", i % 4 + 1, (i * 37) % 250_000));
        }
    }

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(rows));
    group.sample_size(10);

    for workers in [1, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, &w| {
            b.iter(|| {
                let mut source =
                    TsvQuerySource::new(Cursor::new(text.as_bytes()), "bench.tsv").unwrap();
                let mut sink = TsvResultSink::new(Vec::new(), OutputLayout::default()).unwrap();
                BatchPipeline::new(PipelineConfig::new().workers(w).chunk_size(2_000))
                    .run(&catalog, &mut source, &mut sink, &CancellationToken::new())
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_cigar_parsing,
    bench_index_lookup,
    bench_query_engine,
    bench_pipeline,
);

criterion_main!(benches);
