use criterion::Criterion;

use mempolicy::memory_manager;
use mempolicy::policy::TaskPolicy;
use mempolicy::util::constants::BYTES_IN_PAGE;
use mempolicy::util::test_util::mock_machine::*;
use mempolicy::util::Address;
use mempolicy::vm::{Gfp, PageAllocator, VirtualArea};
use mempolicy::PolicyMode;

pub fn bench(c: &mut Criterion) {
    let engine = mock_engine(4);
    let interleave =
        memory_manager::new_policy(&engine, PolicyMode::Interleave, &"0-3".parse().unwrap())
            .unwrap();
    let task = TaskPolicy::with_policy(interleave);

    c.bench_function("alloc_interleave_current", |b| {
        b.iter(|| {
            let page = memory_manager::alloc_page_current(&engine, &task, Gfp::HIGHUSER).unwrap();
            engine.binding().allocator.free_page(page);
        })
    });

    let start = Address::from_usize(0x100000);
    let area = MockArea::anonymous(start, start + (1 << 20));
    let mut addr = start;
    c.bench_function("alloc_interleave_vma", |b| {
        b.iter(|| {
            let page =
                memory_manager::alloc_page_vma(&engine, &task, Some(&area), addr, Gfp::HIGHUSER)
                    .unwrap();
            engine.binding().allocator.free_page(page);
            addr += BYTES_IN_PAGE;
            if addr >= area.end() {
                addr = start;
            }
        })
    });
}
