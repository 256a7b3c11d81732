use criterion::Criterion;

use atomic::Atomic;
use mempolicy::policy::select;
use mempolicy::util::nodemask::{NodeId, NodeMask};

pub fn bench(c: &mut Criterion) {
    let nodes: NodeMask = "0,3-5,17,64-71,200".parse().unwrap();

    c.bench_function("nodemask_parse", |b| {
        b.iter(|| "0,3-5,17,64-71,200".parse::<NodeMask>().unwrap())
    });

    let mut offset = 0u64;
    c.bench_function("interleave_static", |b| {
        b.iter(|| {
            offset = offset.wrapping_add(1);
            select::interleave_static(&nodes, offset)
        })
    });

    let cursor = Atomic::new(NodeId::new(0));
    c.bench_function("interleave_dynamic", |b| {
        b.iter(|| select::interleave_dynamic(&cursor, &nodes))
    });
}
