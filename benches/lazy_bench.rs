use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use lazy_fuse::Lazy;

/// Warm-path read: the value is already cached, so every `get` is a single
/// acquire load.
fn bench_get_warm(c: &mut Criterion) {
   let value = Lazy::create(|| "Initialized".to_string());
   value.get().unwrap();

   c.bench_function("get_warm", |b| {
      b.iter(|| black_box(value.get().unwrap().len()));
   });
}

/// First-touch cost: claim CAS plus the initializer itself.
fn bench_initialize_and_get(c: &mut Criterion) {
   c.bench_function("initialize_and_get", |b| {
      b.iter(|| {
         let value = Lazy::create(|| "Uninitialized".to_string());
         black_box(value.get().unwrap().len())
      });
   });
}

/// Forcing a two-link map chain from scratch.
fn bench_map_chain(c: &mut Criterion) {
   c.bench_function("map_chain", |b| {
      b.iter(|| {
         let base = Lazy::create(|| 21u64);
         let doubled = base.map(|n| n * 2);
         black_box(*doubled.get().unwrap())
      });
   });
}

criterion_group!(
   benches,
   bench_get_warm,
   bench_initialize_and_get,
   bench_map_chain
);
criterion_main!(benches);
