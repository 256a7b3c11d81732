use super::mock_test_prelude::*;
use crate::policy::resolve::effective_policy;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

const START: Address = Address::from_usize(0x40000);
const END: Address = Address::from_usize(0x50000);

fn random_policy(engine: &crate::PolicyEngine<MockBinding>, rng: &mut ChaCha8Rng) -> MemPolicy {
    let mut mask = NodeMask::empty();
    for _ in 0..rng.random_range(1..4) {
        mask.set(NodeId::new(rng.random_range(0..4)));
    }
    let mode = match rng.random_range(0..4) {
        0 => return MemPolicy::DEFAULT,
        1 => PolicyMode::Preferred,
        2 => PolicyMode::Bind,
        _ => PolicyMode::Interleave,
    };
    memory_manager::new_policy(engine, mode, &mask).unwrap()
}

#[test]
pub fn resolver_precedence() {
    let engine = mock_engine(4);
    let mut rng = ChaCha8Rng::seed_from_u64(0xfeed);
    for _ in 0..500 {
        let process = random_policy(&engine, &mut rng);
        let attached = random_policy(&engine, &mut rng);
        let stored = random_policy(&engine, &mut rng);
        let task = TaskPolicy::with_policy(process.clone());
        let addr = START + rng.random_range(0..16) * BYTES_IN_PAGE;

        // An area with policy ops: its answer wins, whatever it is.
        let store = Arc::new(SharedPolicy::new());
        store
            .insert_range(0, 16, &stored, InsertMode::Replace)
            .unwrap();
        let mut shared = MockArea::shared(START, END, 0, store);
        shared.set_vm_policy(Some(attached.clone()));
        assert_eq!(effective_policy(&task, Some(&shared), addr), stored);

        // A plain area: a non-default attached policy wins over the process policy.
        let mut plain = MockArea::anonymous(START, END);
        plain.set_vm_policy(Some(attached.clone()));
        let expected = if attached.is_default() {
            &process
        } else {
            &attached
        };
        assert_eq!(effective_policy(&task, Some(&plain), addr), *expected);

        // No area policy: the process policy, which may be the default.
        plain.set_vm_policy(None);
        assert_eq!(effective_policy(&task, Some(&plain), addr), process);
    }
}
