use super::mock_test_prelude::*;
use std::sync::Arc;

fn spans(store: &SharedPolicy) -> Vec<(u64, u64)> {
    store.ranges().into_iter().map(|(s, e, _)| (s, e)).collect()
}

#[test]
pub fn overlapping_inserts_truncate() {
    let engine = mock_engine(2);
    let store = SharedPolicy::new();
    let a = memory_manager::new_policy(&engine, PolicyMode::Bind, &nodes("0")).unwrap();
    let b = memory_manager::new_policy(&engine, PolicyMode::Interleave, &nodes("0-1")).unwrap();
    store.insert_range(0, 100, &a, InsertMode::Replace).unwrap();
    store.insert_range(50, 150, &b, InsertMode::Replace).unwrap();

    let ranges = store.ranges();
    assert_eq!(spans(&store), vec![(0, 50), (50, 150)]);
    assert!(ranges[0].2.ptr_eq(&a));
    assert!(ranges[1].2.ptr_eq(&b));
    drop(ranges);
    // The truncated tail took no reference with it.
    assert_eq!(a.ref_count(), Some(2));
}

#[test]
pub fn same_range_without_replace() {
    let engine = mock_engine(2);
    let store = SharedPolicy::new();
    let c = memory_manager::new_policy(&engine, PolicyMode::Preferred, &nodes("1")).unwrap();
    store.insert_range(10, 20, &c, InsertMode::Replace).unwrap();
    let before = c.ref_count();
    store.insert_range(10, 20, &c, InsertMode::NoReplace).unwrap();
    assert_eq!(spans(&store), vec![(10, 20)]);
    assert_eq!(c.ref_count(), before);
}

#[test]
pub fn two_mappings_share_policies() {
    // Two tasks map the same object at different addresses and offsets.
    let engine = mock_engine(2);
    let store = Arc::new(SharedPolicy::new());
    let (task_a, task_b) = (TaskPolicy::new(), TaskPolicy::new());
    let mut mm_a = MockAddressSpace::new();
    let mut mm_b = MockAddressSpace::new();
    let a_start = Address::from_usize(0x100000);
    let b_start = Address::from_usize(0x700000);
    // Task A maps pages 0..16 of the object, task B maps pages 8..24.
    mm_a.map(MockArea::shared(a_start, a_start + 16 * BYTES_IN_PAGE, 0, store.clone()));
    mm_b.map(MockArea::shared(b_start, b_start + 16 * BYTES_IN_PAGE, 8, store.clone()));

    // Task A binds pages 8..12 to node 1.
    memory_manager::set_range_policy(
        &engine,
        &task_a,
        &mut mm_a,
        a_start + 8 * BYTES_IN_PAGE,
        4 * BYTES_IN_PAGE,
        PolicyMode::Bind,
        &nodes("1"),
        MbindFlags::empty(),
    )
    .unwrap();
    assert_eq!(spans(&store), vec![(8, 12)]);

    // Task B sees it at the start of its mapping.
    match memory_manager::get_policy(&engine, &task_b, &mut mm_b, Some(b_start), false).unwrap() {
        memory_manager::PolicyQuery::Policy { mode, nodes: n, .. } => {
            assert_eq!(mode, PolicyMode::Bind);
            assert_eq!(n, nodes("1"));
        }
        other => panic!("unexpected {:?}", other),
    }
    let page = memory_manager::alloc_page_vma(
        &engine,
        &task_b,
        mm_b.area(b_start),
        b_start + 3 * BYTES_IN_PAGE,
        Gfp::HIGHUSER,
    )
    .unwrap();
    assert_eq!(page.node(), NodeId::new(1));
    // Past page 12 the object has no policy, and neither does task B.
    match memory_manager::get_policy(&engine, &task_b, &mut mm_b, Some(b_start + 4 * BYTES_IN_PAGE), false)
        .unwrap()
    {
        memory_manager::PolicyQuery::Policy { mode, .. } => assert_eq!(mode, PolicyMode::Default),
        other => panic!("unexpected {:?}", other),
    }

    // Task B sets interleave over pages 10..20 without replacing what is there.
    memory_manager::set_range_policy(
        &engine,
        &task_b,
        &mut mm_b,
        b_start + 2 * BYTES_IN_PAGE,
        10 * BYTES_IN_PAGE,
        PolicyMode::Interleave,
        &nodes("0-1"),
        MbindFlags::NO_REPLACE,
    )
    .unwrap();
    assert_eq!(spans(&store), vec![(8, 12), (12, 20)]);
    assert_eq!(store.lookup(11).unwrap().mode(), PolicyMode::Bind);
    assert_eq!(store.lookup(12).unwrap().mode(), PolicyMode::Interleave);

    // Resetting the whole of A's mapping to default clears the store under it.
    memory_manager::set_range_policy(
        &engine,
        &task_a,
        &mut mm_a,
        a_start,
        16 * BYTES_IN_PAGE,
        PolicyMode::Default,
        &NodeMask::empty(),
        MbindFlags::empty(),
    )
    .unwrap();
    assert_eq!(spans(&store), vec![(16, 20)]);

    drop(mm_a);
    drop(mm_b);
    let store = Arc::try_unwrap(store).unwrap();
    store.teardown();
    assert!(store.is_empty());
}
