//! Benchmarks for the hot paths: predicate evaluation, aggregation and
//! compilation over a synthetic product catalog.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use polyql_core::query::eval;
use polyql_core::types::record;
use polyql_core::{compile_all, execute, AggOp, Predicate, QueryIr, QueryKind, Record, Value};

fn synthetic_catalog(size: usize) -> Vec<Record> {
    let categories = ["Cables", "Audio", "Video", "Storage"];
    (0..size)
        .map(|i| {
            record([
                ("product_name", Value::from(format!("Product {i}"))),
                ("category", Value::from(categories[i % categories.len()])),
                ("rating", Value::from(1.0 + (i % 40) as f64 / 10.0)),
                ("discounted_price", Value::from((i % 500) as f64 + 0.99)),
            ])
        })
        .collect()
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");
    let predicate = Predicate::and(vec![
        Predicate::gt("rating", 4.0),
        Predicate::eq("category", "Cables"),
    ]);
    for size in [1_000, 10_000] {
        let records = synthetic_catalog(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| eval::apply_filter(records, &predicate).len())
        });
    }
    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let records = synthetic_catalog(10_000);
    let ir = QueryIr::new(QueryKind::Average)
        .with_filter(Predicate::gt("rating", 3.0))
        .with_aggregation("discounted_price", AggOp::Avg)
        .with_group_by("category");
    c.bench_function("execute/grouped_average_10k", |b| {
        b.iter(|| execute(&records, &ir))
    });
}

fn bench_compile(c: &mut Criterion) {
    let ir = QueryIr::new(QueryKind::Group)
        .with_filter(Predicate::and(vec![
            Predicate::gte("rating", 4.0),
            Predicate::contains("product_name", "cable"),
        ]))
        .with_aggregation("discounted_price", AggOp::Avg)
        .with_group_by("category");
    c.bench_function("compile/all_targets", |b| b.iter(|| compile_all(&ir)));
}

criterion_group!(benches, bench_filter, bench_execute, bench_compile);
criterion_main!(benches);
