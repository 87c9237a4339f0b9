//! Parse and prune benchmarks on synthetic national snapshots.
//!
//! Run with: `cargo bench --package carburantes-bench`

use carburantes_bench::{NATIONAL_STATIONS, bench_date, synthetic_body, synthetic_table};
use carburantes_fetch::parse_response;
use carburantes_fuels::FuelSelection;
use carburantes_prune::ColumnPruner;
use chrono::Local;
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

const SIZES: [usize; 2] = [1_000, NATIONAL_STATIONS];

fn parse_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for stations in SIZES {
        let body = synthetic_body(stations);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(stations), &body, |b, body| {
            b.iter(|| parse_response(bench_date(), 200, black_box(body), Local::now()));
        });
    }

    group.finish();
}

fn prune_benchmark(c: &mut Criterion) {
    let pruner = ColumnPruner::default();
    let mut group = c.benchmark_group("prune");

    for (name, selection) in [
        ("basic", FuelSelection::basic()),
        ("single", FuelSelection::from_list("Gasoleo A")),
    ] {
        for stations in SIZES {
            let table = synthetic_table(stations);
            group.throughput(Throughput::Elements(stations as u64));
            group.bench_with_input(BenchmarkId::new(name, stations), &table, |b, table| {
                b.iter_batched(
                    || table.clone(),
                    |table| pruner.prune(table, black_box(&selection)),
                    BatchSize::LargeInput,
                );
            });
        }
    }

    group.finish();
}

criterion_group!(benches, parse_benchmark, prune_benchmark);
criterion_main!(benches);
