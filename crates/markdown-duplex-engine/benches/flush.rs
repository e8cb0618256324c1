use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use markdown_duplex_engine::sync::IncrementalSerializer;
use markdown_duplex_engine::{
    BlockRange, BlockSurface, BlockTree, EditRange, StructuredSurface, parse,
};
mod common;

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.sample_size(20);

    for sections in [10, 100] {
        let content = common::generate_markdown_content(sections);
        group.bench_with_input(BenchmarkId::from_parameter(sections), &content, |b, md| {
            b.iter(|| black_box(parse(black_box(md))));
        });
    }

    group.finish();
}

fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush");
    group.sample_size(20);

    for sections in [10, 100] {
        let content = common::generate_markdown_content(sections);
        let mut surface = BlockSurface::from_markdown(&content);
        let middle = surface.block_count() / 2;
        surface.replace_block(middle, "Edited paragraph.");
        let baseline = BlockTree::from_markdown(&content);
        let ranges = [EditRange::new(
            BlockRange::single(middle),
            BlockRange::single(middle),
        )];
        let serializer = IncrementalSerializer::new();

        group.bench_with_input(
            BenchmarkId::new("incremental", sections),
            &content,
            |b, md| {
                b.iter(|| black_box(serializer.flush(md, &ranges, &surface, Some(&baseline))));
            },
        );
        group.bench_with_input(
            BenchmarkId::new("full", sections),
            &content,
            |b, md| {
                b.iter(|| {
                    black_box(serializer.flush(md, &[EditRange::unknown()], &surface, None))
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_flush);
criterion_main!(benches);
