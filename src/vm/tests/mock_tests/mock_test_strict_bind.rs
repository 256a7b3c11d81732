use super::mock_test_prelude::*;

const START: Address = Address::from_usize(0x1000);
const END: Address = Address::from_usize(0x5000);

fn resident_on_node0() -> (
    crate::PolicyEngine<MockBinding>,
    TaskPolicy,
    MockAddressSpace,
) {
    let engine = mock_engine(2);
    let task = TaskPolicy::new();
    let mut mm = MockAddressSpace::new();
    mm.map(MockArea::anonymous(START, END));
    mm.populate(&engine.binding().allocator, START, END, NodeId::new(0));
    (engine, task, mm)
}

#[test]
pub fn strict_bind_over_misplaced_pages_fails() {
    let (engine, task, mut mm) = resident_on_node0();
    let err = memory_manager::set_range_policy(
        &engine,
        &task,
        &mut mm,
        START,
        END - START,
        PolicyMode::Bind,
        &nodes("1"),
        MbindFlags::STRICT,
    )
    .unwrap_err();
    assert_eq!(
        err,
        PolicyError::ResidentPageViolates {
            addr: START,
            node: NodeId::new(0)
        }
    );
    assert_eq!(err.errno(), libc::EIO);
    assert!(err.is_strict_violation());
    assert_eq!(memory_manager::stats(&engine).strict_violations, 1);
}

#[test]
pub fn move_bind_migrates_pages() {
    let (engine, task, mut mm) = resident_on_node0();
    let report = memory_manager::set_range_policy(
        &engine,
        &task,
        &mut mm,
        START,
        END - START,
        PolicyMode::Bind,
        &nodes("1"),
        MbindFlags::MOVE,
    )
    .unwrap();
    assert_eq!(report.checked, 4);
    assert_eq!(report.migrated, 4);

    let mut addr = START;
    while addr < END {
        assert_eq!(mm.resident_node(addr), Some(NodeId::new(1)));
        addr += BYTES_IN_PAGE;
    }
    let allocator = &engine.binding().allocator;
    assert_eq!(allocator.live_pages_on(NodeId::new(0)), 0);
    assert_eq!(allocator.live_pages_on(NodeId::new(1)), 4);

    // Now the pages comply, so a strict request succeeds.
    let report = memory_manager::set_range_policy(
        &engine,
        &task,
        &mut mm,
        START,
        END - START,
        PolicyMode::Bind,
        &nodes("1"),
        MbindFlags::STRICT,
    )
    .unwrap();
    assert_eq!(report.violations, 0);
}

#[test]
pub fn move_without_strict_tolerates_failures() {
    let (engine, task, mut mm) = resident_on_node0();
    engine
        .binding()
        .allocator
        .set_capacity(NodeId::new(1), 2);
    let report = memory_manager::set_range_policy(
        &engine,
        &task,
        &mut mm,
        START,
        END - START,
        PolicyMode::Bind,
        &nodes("1"),
        MbindFlags::MOVE,
    )
    .unwrap();
    assert_eq!(report.migrated, 2);
    assert_eq!(report.tolerated, 2);

    // With strict, the first page that cannot move fails the request.
    let err = memory_manager::set_range_policy(
        &engine,
        &task,
        &mut mm,
        START,
        END - START,
        PolicyMode::Bind,
        &nodes("1"),
        MbindFlags::MOVE | MbindFlags::STRICT,
    )
    .unwrap_err();
    assert_eq!(
        err,
        PolicyError::MigrationFailed {
            addr: START + 2 * BYTES_IN_PAGE
        }
    );
}
