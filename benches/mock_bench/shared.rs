use criterion::Criterion;

use mempolicy::memory_manager;
use mempolicy::policy::{InsertMode, SharedPolicy};
use mempolicy::util::test_util::mock_machine::*;
use mempolicy::PolicyMode;

pub fn bench(c: &mut Criterion) {
    let engine = mock_engine(4);
    let policies = [
        memory_manager::new_policy(&engine, PolicyMode::Bind, &"1".parse().unwrap()).unwrap(),
        memory_manager::new_policy(&engine, PolicyMode::Interleave, &"0-3".parse().unwrap())
            .unwrap(),
    ];
    let store = SharedPolicy::new();
    for i in 0..256u64 {
        store
            .insert_range(i * 16, i * 16 + 8, &policies[i as usize % 2], InsertMode::Replace)
            .unwrap();
    }

    let mut index = 0u64;
    c.bench_function("shared_lookup", |b| {
        b.iter(|| {
            let _policy = store.lookup(index);
            index = (index + 7) % 4096;
        })
    });

    c.bench_function("shared_insert_split", |b| {
        b.iter(|| {
            // Punch a hole into the middle of a range and fill it again.
            store
                .insert_range(66, 68, &policies[1], InsertMode::Replace)
                .unwrap();
            store
                .insert_range(66, 68, &policies[0], InsertMode::Replace)
                .unwrap();
        })
    });
}
