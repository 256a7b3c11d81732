use super::mock_test_prelude::*;

const START: Address = Address::from_usize(0x10000);
const END: Address = Address::from_usize(0x14000);
const FILE: MappingId = MappingId(7);

// A private file mapping of pages 0..4, with every page cached on node 0 and none resident.
fn cached_file() -> (
    crate::PolicyEngine<MockBinding>,
    TaskPolicy,
    MockAddressSpace,
) {
    let engine = mock_engine(2);
    let mut mm = MockAddressSpace::new();
    mm.map(MockArea::file(START, END, 0, FILE));
    for index in 0..4 {
        engine.binding().page_cache.insert(FILE, index, NodeId::new(0));
    }
    (engine, TaskPolicy::new(), mm)
}

fn bind_node1(
    engine: &crate::PolicyEngine<MockBinding>,
    task: &TaskPolicy,
    mm: &mut MockAddressSpace,
    flags: MbindFlags,
) -> Result<ScanReport, PolicyError> {
    memory_manager::set_range_policy(
        engine,
        task,
        mm,
        START,
        END - START,
        PolicyMode::Bind,
        &nodes("1"),
        flags,
    )
}

#[test]
pub fn move_evicts_misplaced_cache_pages() {
    let (engine, task, mut mm) = cached_file();
    let cache = &engine.binding().page_cache;
    // A mapped page is another process' business and stays.
    cache.update(FILE, 1, |page| page.mapped = true);
    // A busy page gives in on the last retry.
    let retries = engine.options().evict_retries;
    cache.update(FILE, 2, |page| page.busy = retries - 1);

    let report = bind_node1(&engine, &task, &mut mm, MbindFlags::MOVE).unwrap();
    assert_eq!(report.checked, 4);
    assert_eq!(report.violations, 3);
    assert_eq!(report.evicted, 3);
    assert!(!cache.contains(FILE, 0));
    assert!(cache.contains(FILE, 1));
    assert!(!cache.contains(FILE, 2));
    assert!(!cache.contains(FILE, 3));
    assert_eq!(cache.invalidate_attempts(), 2 + retries);
    assert_eq!(memory_manager::stats(&engine).cache_pages_evicted, 3);
}

#[test]
pub fn strict_reports_cache_pages() {
    let (engine, task, mut mm) = cached_file();
    let err = bind_node1(&engine, &task, &mut mm, MbindFlags::STRICT).unwrap_err();
    assert_eq!(
        err,
        PolicyError::CachePageViolates {
            mapping: FILE,
            index: 0,
            node: NodeId::new(0)
        }
    );
    assert!(err.is_strict_violation());
    // Only checked, nothing evicted.
    assert_eq!(engine.binding().page_cache.invalidate_attempts(), 0);
}

#[test]
pub fn eviction_gives_up_after_retries() {
    let (engine, task, mut mm) = cached_file();
    let cache = &engine.binding().page_cache;
    cache.update(FILE, 3, |page| page.dirty = true);

    // Without strict, the dirty page is left behind.
    let report = bind_node1(&engine, &task, &mut mm, MbindFlags::MOVE).unwrap();
    assert_eq!(report.evicted, 3);
    assert_eq!(report.tolerated, 1);
    assert!(cache.contains(FILE, 3));
    assert_eq!(
        cache.invalidate_attempts(),
        3 + engine.options().evict_retries
    );

    // With strict, it fails the call.
    let err = bind_node1(&engine, &task, &mut mm, MbindFlags::STRICT | MbindFlags::MOVE).unwrap_err();
    assert_eq!(err, PolicyError::EvictionFailed { mapping: FILE, index: 3 });
    assert_eq!(err.errno(), libc::EIO);
}

#[test]
pub fn cached_pages_on_allowed_nodes_stay() {
    let (engine, task, mut mm) = cached_file();
    let report = memory_manager::set_range_policy(
        &engine,
        &task,
        &mut mm,
        START,
        END - START,
        PolicyMode::Interleave,
        &nodes("0-1"),
        MbindFlags::STRICT | MbindFlags::MOVE,
    )
    .unwrap();
    assert_eq!(report.violations, 0);
    assert_eq!(engine.binding().page_cache.invalidate_attempts(), 0);
}
