//! Node selection: which node (or zone list) an allocation governed by a policy should use.

use super::mempolicy::{MemPolicy, PolicyMode};
use super::zonelist::{PolicyZone, ZoneList};
use crate::util::constants::LOG_BYTES_IN_PAGE;
use crate::util::nodemask::{NodeId, NodeMask};
use crate::util::Address;
use crate::vm::{AllocTarget, Gfp};
use atomic::{Atomic, Ordering};

/// How an interleave policy spreads allocations.
#[derive(Copy, Clone)]
pub enum Placement<'a> {
    /// The allocation backs a page of an area. The node is a function of the page offset, so
    /// the same page of the same object always lands on the same node.
    Offset(u64),
    /// The allocation is not tied to an address. The node is taken round-robin from the
    /// process's cursor.
    Cursor(&'a Atomic<NodeId>),
}

/// The node at position `offset` (modulo the number of nodes) in `nodes`. Returns `None` if
/// `nodes` is empty.
pub fn interleave_static(nodes: &NodeMask, offset: u64) -> Option<NodeId> {
    let weight = nodes.weight() as u64;
    if weight == 0 {
        return None;
    }
    let target = (offset % weight) as usize;
    nodes.iter().nth(target)
}

/// The interleave offset of the page containing `addr`, in units of `1 << shift` bytes, for an
/// area that starts at `area_start` and maps its object from page `pgoff`. Huge page
/// allocations pass a larger `shift` so that each huge page counts once.
pub fn interleave_offset(area_start: Address, pgoff: u64, addr: Address, shift: u8) -> u64 {
    debug_assert!(shift >= LOG_BYTES_IN_PAGE);
    let base = pgoff >> (shift - LOG_BYTES_IN_PAGE);
    base + ((addr - area_start) >> shift as usize) as u64
}

/// Take the node at or after the cursor, wrapping around, and move the cursor to the node
/// after it. `nodes` must not be empty.
///
/// Only the owning process advances its cursor, so the load and the store need not be one
/// atomic step.
pub fn interleave_dynamic(cursor: &Atomic<NodeId>, nodes: &NodeMask) -> NodeId {
    debug_assert!(!nodes.is_empty());
    let current = cursor.load(Ordering::Relaxed);
    // The cursor may be stale if the policy was just replaced.
    let node = nodes
        .first_set_from(current)
        .or_else(|| nodes.first_set())
        .unwrap_or(current);
    let next = nodes
        .next_set(node)
        .or_else(|| nodes.first_set())
        .unwrap_or(node);
    cursor.store(next, Ordering::Relaxed);
    node
}

/// The node a preferred policy allocates from first.
pub fn preferred(node: Option<NodeId>, local: NodeId) -> NodeId {
    node.unwrap_or(local)
}

/// The target for a bind allocation. Requests for zones below the watermark are not
/// policy-controlled and go to the local node.
pub fn bind_zonelist<'p>(
    zonelist: &'p ZoneList,
    local: NodeId,
    gfp: Gfp,
    policy_zone: &PolicyZone,
) -> AllocTarget<'p> {
    if gfp.zone >= policy_zone.get() {
        AllocTarget::ZoneList(zonelist)
    } else {
        AllocTarget::Node(local)
    }
}

/// Where an allocation governed by `policy` should look for a page.
///
/// Arguments:
/// * `policy`: The effective policy.
/// * `placement`: How to interleave, if `policy` is an interleave policy.
/// * `local`: The node of the allocating CPU.
/// * `gfp`: The allocation flags.
/// * `policy_zone`: The allocator's zone watermark.
pub fn select_target<'p>(
    policy: &'p MemPolicy,
    placement: Placement<'_>,
    local: NodeId,
    gfp: Gfp,
    policy_zone: &PolicyZone,
) -> AllocTarget<'p> {
    match policy.mode() {
        PolicyMode::Default => AllocTarget::Node(local),
        PolicyMode::Preferred => AllocTarget::Node(preferred(policy.preferred_node(), local)),
        PolicyMode::Bind => match policy.zonelist() {
            Some(zonelist) => bind_zonelist(zonelist, local, gfp, policy_zone),
            None => AllocTarget::Node(local),
        },
        PolicyMode::Interleave => {
            let node = policy.interleave_nodes().and_then(|nodes| match placement {
                Placement::Offset(offset) => interleave_static(nodes, offset),
                Placement::Cursor(cursor) => Some(interleave_dynamic(cursor, nodes)),
            });
            AllocTarget::Node(node.unwrap_or(local))
        }
    }
}

/// An allocation target that owns the policy it was selected from, so it can be handed out
/// after the policy lookup is over.
#[derive(Clone, Debug)]
pub struct ResolvedTarget {
    policy: MemPolicy,
    node: Option<NodeId>,
}

impl ResolvedTarget {
    pub fn new(
        policy: MemPolicy,
        placement: Placement<'_>,
        local: NodeId,
        gfp: Gfp,
        policy_zone: &PolicyZone,
    ) -> Self {
        let node = match select_target(&policy, placement, local, gfp, policy_zone) {
            AllocTarget::Node(node) => Some(node),
            AllocTarget::ZoneList(_) => None,
        };
        ResolvedTarget { policy, node }
    }

    /// The policy the target was selected from.
    pub fn policy(&self) -> &MemPolicy {
        &self.policy
    }

    /// The selected node, or `None` if the allocation goes through a bind zone list.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn target(&self) -> AllocTarget<'_> {
        match (self.node, self.policy.zonelist()) {
            (Some(node), _) => AllocTarget::Node(node),
            (None, Some(zonelist)) => AllocTarget::ZoneList(zonelist),
            (None, None) => unreachable!("a zone list target without a bind policy"),
        }
    }
}
