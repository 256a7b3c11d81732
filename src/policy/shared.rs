//! Policies of shared objects, keyed by page index.
//!
//! A shared object (e.g. a shared memory segment) can be mapped by several tasks at different
//! addresses, so its policy cannot live in any one area. Instead the object keeps a
//! [`SharedPolicy`]: an ordered set of non-overlapping page ranges, each with its policy. Areas
//! mapping the object translate addresses into page indices and look the policy up here.

use super::mempolicy::MemPolicy;
use crate::util::conversions::area_page_index;
use crate::util::error::PolicyError;
use crate::util::Address;
use crate::vm::VirtualArea;
use spin::Mutex;
use std::collections::BTreeMap;
use std::fmt;

/// What to do with existing entries that overlap an inserted range.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InsertMode {
    /// The inserted policy replaces whatever covered the range.
    Replace,
    /// The inserted policy only fills the parts of the range no entry covers yet.
    NoReplace,
}

struct SpNode {
    start: u64,
    end: u64,
    policy: MemPolicy,
}

impl fmt::Debug for SpNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}) {}", self.start, self.end, self.policy)
    }
}

/// The policy store of a shared object.
///
/// All operations take the store's spin lock, and a multi-entry update happens under one
/// critical section, so lookups never observe a half-applied insert. Entries are built before
/// the lock is taken, and entries removed by an insert are released after it is dropped.
pub struct SharedPolicy {
    // Keyed by the start of each range.
    tree: Mutex<BTreeMap<u64, SpNode>>,
}

impl SharedPolicy {
    pub const fn new() -> Self {
        SharedPolicy {
            tree: Mutex::new(BTreeMap::new()),
        }
    }

    /// The policy of page `index`, if any entry covers it. The returned handle is a new
    /// reference.
    pub fn lookup(&self, index: u64) -> Option<MemPolicy> {
        let tree = self.tree.lock();
        tree.range(..=index)
            .next_back()
            .map(|(_, node)| node)
            .filter(|node| index < node.end)
            .map(|node| node.policy.clone())
    }

    /// Set the policy of pages `[start, end)`.
    ///
    /// With [`InsertMode::Replace`], entries overlapping the range are deleted, truncated or
    /// split so that `policy` alone covers it. Inserting the default policy removes the range.
    /// With [`InsertMode::NoReplace`], existing entries are kept and `policy` is inserted into
    /// the gaps between them.
    ///
    /// An empty range does nothing. An inverted range is an `InvalidArgument`.
    pub fn insert_range(
        &self,
        start: u64,
        end: u64,
        policy: &MemPolicy,
        mode: InsertMode,
    ) -> Result<(), PolicyError> {
        if start > end {
            return Err(PolicyError::InvalidArgument("inverted page range"));
        }
        if start == end || (policy.is_default() && mode == InsertMode::NoReplace) {
            return Ok(());
        }
        trace!("Insert [{}, {}) {} ({:?})", start, end, policy, mode);

        let new = (!policy.is_default()).then(|| SpNode {
            start,
            end,
            policy: policy.clone(),
        });
        // Replacing may split an entry around the range. The tail entry is prepared here and
        // only filled in under the lock.
        let mut spare_tail = (mode == InsertMode::Replace).then(|| SpNode {
            start: end,
            end,
            policy: MemPolicy::DEFAULT,
        });

        let released = {
            let mut tree = self.tree.lock();
            let released = match (mode, new) {
                (InsertMode::Replace, new) => {
                    Self::replace(&mut tree, start, end, new, &mut spare_tail)
                }
                (InsertMode::NoReplace, Some(new)) => {
                    Self::fill_gaps(&mut tree, new);
                    vec![]
                }
                (InsertMode::NoReplace, None) => vec![],
            };
            #[cfg(feature = "extreme_assertions")]
            Self::check_partition(&tree);
            released
        };
        // Drop the references the store no longer holds outside of the lock.
        if !released.is_empty() {
            trace!("Released {:?}", released);
        }
        Ok(())
    }

    fn replace(
        tree: &mut BTreeMap<u64, SpNode>,
        start: u64,
        end: u64,
        new: Option<SpNode>,
        spare_tail: &mut Option<SpNode>,
    ) -> Vec<SpNode> {
        let mut released = vec![];

        // An entry starting before the range and reaching into it is truncated, or split
        // around the range if it spans past its end.
        let mut tail = None;
        if let Some((_, node)) = tree.range_mut(..start).next_back() {
            if node.end > start {
                if node.end > end {
                    tail = spare_tail.take().map(|mut tail| {
                        tail.end = node.end;
                        tail.policy = node.policy.clone();
                        tail
                    });
                }
                node.end = start;
            }
        }
        if let Some(tail) = tail {
            // The split entry spans the whole range, so nothing else overlaps it.
            tree.insert(end, tail);
            if let Some(new) = new {
                tree.insert(new.start, new);
            }
            return released;
        }

        // Entries starting inside the range are deleted, except that the one reaching past
        // its end keeps its tail.
        let inside: Vec<u64> = tree.range(start..end).map(|(key, _)| *key).collect();
        for key in inside {
            if let Some(mut node) = tree.remove(&key) {
                if node.end > end {
                    node.start = end;
                    tree.insert(end, node);
                } else {
                    released.push(node);
                }
            }
        }

        if let Some(new) = new {
            tree.insert(new.start, new);
        }
        released
    }

    fn fill_gaps(tree: &mut BTreeMap<u64, SpNode>, new: SpNode) {
        let mut cursor = new.start;
        // Start from an entry covering the start of the range, if any.
        if let Some((_, node)) = tree.range(..new.start).next_back() {
            cursor = cursor.max(node.end);
        }
        let mut gaps = vec![];
        for (_, node) in tree.range(new.start..new.end) {
            if node.start > cursor {
                gaps.push((cursor, node.start));
            }
            cursor = cursor.max(node.end);
        }
        if cursor < new.end {
            gaps.push((cursor, new.end));
        }
        for (start, end) in gaps {
            tree.insert(
                start,
                SpNode {
                    start,
                    end,
                    policy: new.policy.clone(),
                },
            );
        }
    }

    #[cfg(feature = "extreme_assertions")]
    fn check_partition(tree: &BTreeMap<u64, SpNode>) {
        let mut last_end = 0;
        for (key, node) in tree.iter() {
            assert_eq!(*key, node.start, "entry keyed off its start");
            assert!(node.start < node.end, "empty entry {:?}", node);
            assert!(node.start >= last_end, "overlapping entry {:?}", node);
            assert!(!node.policy.is_default(), "default entry {:?}", node);
            last_end = node.end;
        }
    }

    /// Remove every entry and release its reference.
    pub fn teardown(&self) {
        let tree = std::mem::take(&mut *self.tree.lock());
        if !tree.is_empty() {
            trace!("Tear down {} shared policy entries", tree.len());
        }
    }

    /// A snapshot of the entries, in page order.
    pub fn ranges(&self) -> Vec<(u64, u64, MemPolicy)> {
        self.tree
            .lock()
            .values()
            .map(|node| (node.start, node.end, node.policy.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.lock().is_empty()
    }

    /// The policy of the page `area` maps at `addr`.
    pub fn area_policy<A: VirtualArea + ?Sized>(&self, area: &A, addr: Address) -> Option<MemPolicy> {
        self.lookup(area_page_index(area.start(), area.pgoff(), addr))
    }

    /// Set the policy of every page `area` maps.
    pub fn set_area_policy<A: VirtualArea + ?Sized>(
        &self,
        area: &A,
        policy: &MemPolicy,
        mode: InsertMode,
    ) -> Result<(), PolicyError> {
        let start = area.pgoff();
        let end = area_page_index(area.start(), area.pgoff(), area.end());
        self.insert_range(start, end, policy, mode)
    }
}

impl Default for SharedPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SharedPolicy {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for SharedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.tree.lock().values()).finish()
    }
}
