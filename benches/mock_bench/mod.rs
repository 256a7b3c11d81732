use criterion::Criterion;

pub mod alloc;
pub mod shared;

pub fn bench(c: &mut Criterion) {
    alloc::bench(c);
    shared::bench(c);
}
