use super::mock_test_prelude::*;
use crate::policy::resolve::effective_policy;
use crate::policy::select::{select_target, Placement};
use crate::util::test_util::panic_after;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const READERS: usize = 4;
const SWAPS: usize = 2000;

#[test]
pub fn readers_survive_policy_swaps() {
    panic_after(10_000, || {
        let engine = Arc::new(mock_engine(4));
        let policies = [
            memory_manager::new_policy(&engine, PolicyMode::Interleave, &nodes("0-3")).unwrap(),
            memory_manager::new_policy(&engine, PolicyMode::Bind, &nodes("2")).unwrap(),
            memory_manager::new_policy(&engine, PolicyMode::Preferred, &nodes("1")).unwrap(),
            MemPolicy::DEFAULT,
        ];
        let task = Arc::new(TaskPolicy::new());
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..READERS)
            .map(|_| {
                let (engine, task, done) = (engine.clone(), task.clone(), done.clone());
                thread::spawn(move || {
                    let mut resolved = 0usize;
                    while !done.load(Ordering::Acquire) {
                        let policy = effective_policy::<MockArea>(&task, None, Address::ZERO);
                        // The snapshot holds a reference of its own.
                        assert!(policy.is_default() || policy.ref_count().unwrap() >= 2);
                        // Allocate under the snapshot, whatever the writer installs meanwhile.
                        let allocator = &engine.binding().allocator;
                        let target = select_target(
                            &policy,
                            Placement::Cursor(task.cursor()),
                            engine.binding().topology.local_node(),
                            Gfp::HIGHUSER,
                            allocator.policy_zone(),
                        );
                        let page = allocator.alloc_page(Gfp::HIGHUSER, target).unwrap();
                        assert!(policy.node_allowed(page.node()), "{:?} under {}", page, policy);
                        allocator.free_page(page);
                        resolved += 1;
                    }
                    resolved
                })
            })
            .collect();

        for i in 0..SWAPS {
            let old = task.set(policies[i % policies.len()].clone());
            old.release();
        }
        done.store(true, Ordering::Release);
        for reader in readers {
            reader.join().unwrap();
        }

        task.reset_default();
        // Only the local handles are left.
        for policy in policies.iter().filter(|policy| !policy.is_default()) {
            assert_eq!(policy.ref_count(), Some(1));
        }
        assert_eq!(engine.binding().allocator.live_pages(), 0);
    });
}

#[test]
pub fn forked_children_keep_their_policy() {
    panic_after(10_000, || {
        let engine = mock_engine(2);
        let parent = TaskPolicy::with_policy(
            memory_manager::new_policy(&engine, PolicyMode::Bind, &nodes("1")).unwrap(),
        );
        let children: Vec<_> = (0..8)
            .map(|_| memory_manager::fork_task_policy(&parent))
            .collect();
        memory_manager::set_process_policy(&engine, &parent, PolicyMode::Default, &NodeMask::empty())
            .unwrap();

        thread::scope(|s| {
            for child in &children {
                let engine = &engine;
                s.spawn(move || {
                    for _ in 0..100 {
                        let page =
                            memory_manager::alloc_page_current(engine, child, Gfp::HIGHUSER).unwrap();
                        assert_eq!(page.node(), NodeId::new(1));
                        engine.binding().allocator.free_page(page);
                    }
                });
            }
        });

        let shared = children[0].policy();
        assert_eq!(shared.ref_count(), Some(children.len() + 1));
        for child in &children {
            memory_manager::exit_task_policy(child);
        }
        assert_eq!(shared.ref_count(), Some(1));
    });
}
