use super::mempolicy::MemPolicy;
use super::select;
use crate::util::nodemask::NodeId;
use atomic::{Atomic, Ordering};
use spin::RwLock;

/// The per-process policy slot, together with the dynamic-interleave cursor.
///
/// Any task may read the policy of a process. Only the process itself changes it. Readers
/// take a snapshot (a cloned handle) so the policy they resolved stays alive even if it is
/// replaced while they allocate. The cursor is only advanced by the owning process, so a
/// relaxed atomic is enough.
pub struct TaskPolicy {
    policy: RwLock<MemPolicy>,
    il_next: Atomic<NodeId>,
}

impl TaskPolicy {
    /// A process that follows the default policy.
    pub const fn new() -> Self {
        TaskPolicy {
            policy: RwLock::new(MemPolicy::DEFAULT),
            il_next: Atomic::new(NodeId::new(0)),
        }
    }

    /// A process that starts with `policy`.
    pub fn with_policy(policy: MemPolicy) -> Self {
        let task = Self::new();
        task.set(policy);
        task
    }

    /// A snapshot of the current policy.
    pub fn policy(&self) -> MemPolicy {
        self.policy.read().clone()
    }

    /// Install a new policy and return the old one. Installing an interleave policy rewinds
    /// the cursor to its first node.
    pub fn set(&self, policy: MemPolicy) -> MemPolicy {
        let mut slot = self.policy.write();
        if let Some(first) = policy.interleave_nodes().and_then(|nodes| nodes.first_set()) {
            self.il_next.store(first, Ordering::Relaxed);
        }
        std::mem::replace(&mut *slot, policy)
    }

    /// Go back to the default policy and drop the reference to the old one.
    pub fn reset_default(&self) {
        let old = self.set(MemPolicy::DEFAULT);
        trace!("Dropped process policy {}", old);
    }

    /// The slot for a forked child. The child takes another reference to the parent's policy
    /// and starts interleaving where the parent is.
    pub fn fork(&self) -> TaskPolicy {
        let slot = self.policy.read();
        TaskPolicy {
            policy: RwLock::new(slot.clone()),
            il_next: Atomic::new(self.il_next.load(Ordering::Relaxed)),
        }
    }

    /// The cursor position: the node the next dynamic-interleave allocation will try first.
    pub fn il_next(&self) -> NodeId {
        self.il_next.load(Ordering::Relaxed)
    }

    /// The cursor itself, for [`select::Placement::Cursor`].
    pub fn cursor(&self) -> &Atomic<NodeId> {
        &self.il_next
    }

    /// Pick the node for the next dynamic-interleave allocation of the process and advance
    /// the cursor. Returns `None` if the process policy is not interleave.
    pub fn next_interleave_node(&self) -> Option<NodeId> {
        let policy = self.policy.read();
        let nodes = policy.interleave_nodes()?;
        Some(select::interleave_dynamic(&self.il_next, nodes))
    }
}

impl Default for TaskPolicy {
    fn default() -> Self {
        Self::new()
    }
}
