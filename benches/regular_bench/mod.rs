pub use criterion::Criterion;

mod nodemask;

pub fn bench(c: &mut Criterion) {
    nodemask::bench(c);
}
