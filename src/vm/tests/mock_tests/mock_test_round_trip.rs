use super::mock_test_prelude::*;
use std::sync::Arc;
use strum::IntoEnumIterator;

fn mask_for(mode: PolicyMode) -> NodeMask {
    match mode {
        PolicyMode::Default => NodeMask::empty(),
        PolicyMode::Preferred => nodes("2"),
        PolicyMode::Bind => nodes("1,3"),
        PolicyMode::Interleave => nodes("0-3"),
    }
}

fn assert_round_trip(
    engine: &crate::PolicyEngine<MockBinding>,
    mm: &mut MockAddressSpace,
    start: Address,
    len: usize,
) {
    let task = TaskPolicy::new();
    for mode in PolicyMode::iter() {
        let mask = mask_for(mode);
        memory_manager::set_range_policy(engine, &task, mm, start, len, mode, &mask, MbindFlags::empty())
            .unwrap();
        let expected = memory_manager::new_policy(engine, mode, &mask).unwrap();
        let mut addr = start;
        while addr < start + len {
            match memory_manager::get_policy(engine, &task, mm, Some(addr), false).unwrap() {
                memory_manager::PolicyQuery::Policy { policy, mode: got, .. } => {
                    assert_eq!(got, mode);
                    assert_eq!(policy, expected, "{} at {}", mode, addr);
                }
                other => panic!("unexpected {:?}", other),
            }
            addr += BYTES_IN_PAGE;
        }
    }
}

#[test]
pub fn round_trip_private_areas() {
    let engine = mock_engine(4);
    let mut mm = MockAddressSpace::new();
    let base = Address::from_usize(0x200000);
    mm.map(MockArea::anonymous(base, base + 8 * BYTES_IN_PAGE));
    mm.map(MockArea::anonymous(base + 8 * BYTES_IN_PAGE, base + 16 * BYTES_IN_PAGE));
    // Across the boundary of two areas, and inside one.
    assert_round_trip(&engine, &mut mm, base + 6 * BYTES_IN_PAGE, 4 * BYTES_IN_PAGE);
    assert_round_trip(&engine, &mut mm, base + 12 * BYTES_IN_PAGE, BYTES_IN_PAGE);
}

#[test]
pub fn round_trip_shared_area() {
    let engine = mock_engine(4);
    let mut mm = MockAddressSpace::new();
    let base = Address::from_usize(0x300000);
    let store = Arc::new(SharedPolicy::new());
    mm.map(MockArea::shared(base, base + 16 * BYTES_IN_PAGE, 4, store.clone()));
    assert_round_trip(&engine, &mut mm, base + 3 * BYTES_IN_PAGE, 5 * BYTES_IN_PAGE);
    // The last policy set was interleave.
    assert_eq!(store.lookup(7).unwrap().mode(), PolicyMode::Interleave);
}
