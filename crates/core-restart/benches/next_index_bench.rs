use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use core_restart::next_index;

fn bench_next_index(c: &mut Criterion) {
    c.bench_function("next_index_match", |b| {
        b.iter(|| next_index(black_box("restart###.h5"), black_box("restart042.h5")))
    });
    c.bench_function("next_index_miss", |b| {
        b.iter(|| next_index(black_box("restart###.h5"), black_box("restart042.bak")))
    });
}

criterion_group!(benches, bench_next_index);
criterion_main!(benches);
