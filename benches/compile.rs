//! Benchmarks for the tailoring pipeline.
//!
//! These measure the full compile path — populate, resolve, minimize,
//! emit — over a realistically sized alphabet, establishing a baseline
//! for the resolver and the alignment passes.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use seamstress::prelude::*;
use std::sync::Arc;

fn table() -> Arc<WeightTable> {
    Arc::new(WeightTable::parse(include_str!("../testdata/allkeys.txt")))
}

/// A simple-format alphabet with case variants and a couple of digraphs,
/// the shape real locale alphabets take.
fn alphabet() -> Vec<String> {
    let mut values: Vec<String> = ('a'..='z')
        .map(|c| format!("{c}/{}", c.to_uppercase()))
        .collect();
    values.insert(14, "ng".to_string());
    values.insert(4, "dz".to_string());
    values
}

/// Benchmarks simple-list conversion plus the before-insertion pass.
fn bench_convert_simple(c: &mut Criterion) {
    let table = table();
    let values = alphabet();
    c.bench_function("convert_simple_alphabet", |b| {
        b.iter(|| {
            let mut coll = Collation::new(Arc::clone(&table));
            coll.convert_simple(black_box(&values), false);
            black_box(coll.rules().len())
        });
    });
}

/// Benchmarks the whole compile pipeline down to emitted ICU text.
fn bench_full_pipeline(c: &mut Criterion) {
    let table = table();
    let values = alphabet();
    c.bench_function("simple_to_minimal_icu", |b| {
        b.iter(|| {
            let mut coll = Collation::new(Arc::clone(&table));
            coll.convert_simple(black_box(&values), false);
            coll.minimise();
            black_box(coll.to_icu(0))
        });
    });
}

/// Benchmarks parsing and re-emitting an ICU tailoring unchanged.
fn bench_parse_emit(c: &mut Criterion) {
    let table = table();
    let rules = "&[before 1]a < â < Å < b <<< B < b\u{303} <<< B\u{303} \
                 &e < è << ê <<< Ê << é <<< É \
                 &o < ô <<< Ô << ö <<< Ö &u < ü <<< Ü";
    c.bench_function("parse_and_emit", |b| {
        b.iter(|| {
            let mut coll = Collation::new(Arc::clone(&table));
            coll.parse(black_box(rules));
            black_box(coll.to_icu(0))
        });
    });
}

criterion_group!(
    benches,
    bench_convert_simple,
    bench_full_pipeline,
    bench_parse_emit
);
criterion_main!(benches);
