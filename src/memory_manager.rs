//! Binding-to-engine interface: safe Rust APIs.
//!
//! This module provides the policy operations a kernel-side binding exposes to tasks, as
//! free functions over a [`PolicyEngine`]. We expect the binding to expose them further (e.g.
//! as system calls), translating a [`PolicyError`] with [`PolicyError::errno`] where needed.
//!
//! Each task owns a [`TaskPolicy`] and an address space (an [`AddressSpace`]). The engine never
//! holds onto either of them: the binding passes them to each call, and is responsible for
//! keeping a task's address space from being changed concurrently by something else while a
//! call that takes it mutably runs.

use crate::build_info;
use crate::enforce::{apply_policy_to_range, MbindFlags, ScanReport};
use crate::mempolicy::{PolicyEngine, PolicyEngineBuilder};
use crate::policy::resolve::effective_policy;
use crate::policy::select::{interleave_offset, select_target, Placement, ResolvedTarget};
use crate::policy::{MemPolicy, PolicyMode, TaskPolicy};
use crate::util::constants::{LOG_BYTES_IN_HUGE_PAGE, LOG_BYTES_IN_PAGE};
use crate::util::conversions::{bytes_to_pages_up, is_page_aligned, pages_to_bytes};
use crate::util::error::PolicyError;
use crate::util::nodemask::{NodeId, NodeMask};
use crate::util::statistics::StatsSnapshot;
use crate::util::Address;
use crate::vm::*;

/// Initialize a policy engine over the machine described by `binding`.
///
/// Note that this method will attempt to initialize a logger. If the binding would like to use
/// its own logger, it should initialize the logger before calling this method.
///
/// Arguments:
/// * `builder`: The builder with the options for the engine.
/// * `binding`: The machine-wide collaborators.
pub fn init<B: NumaBinding>(builder: &PolicyEngineBuilder, binding: B) -> PolicyEngine<B> {
    match crate::util::logger::try_init() {
        Ok(_) => debug!("The policy engine initialized the logger."),
        Err(_) => debug!(
            "The policy engine failed to initialize the logger. Possibly a logger has been initialized by user."
        ),
    }
    let engine = builder.build(binding);
    info!(
        "Initialized policy engine {} ({}) with {} online nodes, {:?}",
        build_info::MEMPOLICY_PKG_VERSION,
        *build_info::MEMPOLICY_GIT_VERSION,
        engine.binding().topology().online_nodes().weight(),
        engine.options()
    );
    #[cfg(feature = "extreme_assertions")]
    warn!("The feature 'extreme_assertions' is enabled. The engine will run expensive run-time checks. Slow performance should be expected.");
    engine
}

/// Construct a policy from a mode and a node mask. See [`MemPolicy::new`] for the rules.
///
/// Arguments:
/// * `engine`: A reference to the policy engine.
/// * `mode`: The policy mode.
/// * `nodes`: The nodes of the policy.
pub fn new_policy<B: NumaBinding>(
    engine: &PolicyEngine<B>,
    mode: PolicyMode,
    nodes: &NodeMask,
) -> Result<MemPolicy, PolicyError> {
    engine.new_policy(mode, nodes)
}

/// Set the policy of a process. The old policy is released.
///
/// Arguments:
/// * `engine`: A reference to the policy engine.
/// * `task`: The policy slot of the calling process.
/// * `mode`: The policy mode.
/// * `nodes`: The nodes of the policy.
pub fn set_process_policy<B: NumaBinding>(
    engine: &PolicyEngine<B>,
    task: &TaskPolicy,
    mode: PolicyMode,
    nodes: &NodeMask,
) -> Result<(), PolicyError> {
    let policy = engine.new_policy(mode, nodes)?;
    let old = task.set(policy);
    debug!("Process policy {} -> {}", old, task.policy());
    Ok(())
}

/// Set the policy of the address range `[start, start + len)` of a process.
///
/// `start` must be page aligned. `len` is rounded up to whole pages, and an empty range does
/// nothing. Setting the default policy never checks pages strictly.
///
/// Arguments:
/// * `engine`: A reference to the policy engine.
/// * `task`: The policy slot of the process owning `mm`.
/// * `mm`: The address space of the process.
/// * `start`: The start of the range.
/// * `len`: The length of the range in bytes.
/// * `mode`: The policy mode.
/// * `nodes`: The nodes of the policy.
/// * `flags`: Whether to check, move, or keep existing policies. See [`MbindFlags`].
pub fn set_range_policy<B: NumaBinding, M: AddressSpace>(
    engine: &PolicyEngine<B>,
    task: &TaskPolicy,
    mm: &mut M,
    start: Address,
    len: usize,
    mode: PolicyMode,
    nodes: &NodeMask,
    mut flags: MbindFlags,
) -> Result<ScanReport, PolicyError> {
    if !is_page_aligned(start) {
        return Err(PolicyError::InvalidArgument("unaligned start address"));
    }
    if mode == PolicyMode::Default {
        flags.remove(MbindFlags::STRICT);
    }
    let len = bytes_to_pages_up(len)
        .map(pages_to_bytes)
        .ok_or(PolicyError::InvalidArgument("range length overflows"))?;
    let end = start
        .checked_add(len)
        .ok_or(PolicyError::InvalidArgument("range end overflows"))?;
    if start == end {
        return Ok(ScanReport::default());
    }
    let policy = engine.new_policy(mode, nodes)?;
    debug!("Set [{}, {}) to {} ({:?})", start, end, policy, flags);
    apply_policy_to_range(engine, task, mm, start, end, &policy, flags)
}

/// The result of [`get_policy`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyQuery {
    /// A policy and the nodes it names.
    Policy {
        policy: MemPolicy,
        mode: PolicyMode,
        nodes: NodeMask,
    },
    /// A node.
    Node(NodeId),
}

/// Query a policy.
///
/// * Without `addr`, report the process policy. With `want_node`, report the node the next
///   interleaved allocation of the process goes to instead, which is only valid if the
///   process policy is interleave.
/// * With `addr`, report the policy of the area mapping `addr` (which is the default policy
///   if the area has none). With `want_node`, report the node of the page backing `addr`
///   instead, faulting one in under the effective policy if none is resident.
///
/// Arguments:
/// * `engine`: A reference to the policy engine.
/// * `task`: The policy slot of the process owning `mm`.
/// * `mm`: The address space of the process.
/// * `addr`: The address to query, if any.
/// * `want_node`: Whether to report a node instead of a policy.
pub fn get_policy<B: NumaBinding, M: AddressSpace>(
    engine: &PolicyEngine<B>,
    task: &TaskPolicy,
    mm: &mut M,
    addr: Option<Address>,
    want_node: bool,
) -> Result<PolicyQuery, PolicyError> {
    let topology = engine.binding().topology();
    let policy = match addr {
        Some(addr) => {
            let area = mm
                .find_vma(addr)
                .filter(|area| area.contains(addr))
                .ok_or(PolicyError::UnmappedHole { addr })?;
            if want_node {
                if let Some(node) = mm.resident_node(addr) {
                    return Ok(PolicyQuery::Node(node));
                }
                let page = alloc_page_vma(engine, task, Some(area), addr, Gfp::HIGHUSER)
                    .ok_or(PolicyError::OutOfMemory)?;
                let node = page.node();
                if let Some(old) = mm.replace_resident_page(addr, page)? {
                    engine.binding().allocator().free_page(old);
                }
                trace!("Faulted in {:?} at {}", page, addr);
                return Ok(PolicyQuery::Node(node));
            }
            if area.has_policy_ops() {
                area.get_policy(addr).unwrap_or_default()
            } else {
                area.vm_policy().cloned().unwrap_or_default()
            }
        }
        None => {
            let policy = task.policy();
            if want_node {
                return match policy.mode() {
                    PolicyMode::Interleave => Ok(PolicyQuery::Node(task.il_next())),
                    _ => Err(PolicyError::InvalidArgument(
                        "the process policy is not interleave",
                    )),
                };
            }
            policy
        }
    };
    let local = NodeMask::single(topology.local_node());
    Ok(PolicyQuery::Policy {
        mode: policy.mode(),
        nodes: policy.nodes(&local),
        policy,
    })
}

/// Allocate a page to back `addr` in `area`, under the effective policy at `addr`.
/// Interleaved pages are placed by page offset, so a page always lands on the same node. If
/// `area` is `None`, interleaved pages are placed round-robin instead.
///
/// Arguments:
/// * `engine`: A reference to the policy engine.
/// * `task`: The policy slot of the allocating process.
/// * `area`: The area `addr` is in.
/// * `addr`: The address the page will be mapped at.
/// * `gfp`: The allocation flags.
pub fn alloc_page_vma<B: NumaBinding, A: VirtualArea + ?Sized>(
    engine: &PolicyEngine<B>,
    task: &TaskPolicy,
    area: Option<&A>,
    addr: Address,
    gfp: Gfp,
) -> Option<Page> {
    let policy = effective_policy(task, area, addr);
    let placement = match area {
        Some(area) => Placement::Offset(interleave_offset(
            area.start(),
            area.pgoff(),
            addr,
            LOG_BYTES_IN_PAGE,
        )),
        None => Placement::Cursor(task.cursor()),
    };
    alloc_with_policy(engine, &policy, placement, gfp)
}

/// Allocate a page for the process that is not tied to an address, under the process policy.
/// Interleaved pages are placed round-robin.
///
/// Arguments:
/// * `engine`: A reference to the policy engine.
/// * `task`: The policy slot of the allocating process.
/// * `gfp`: The allocation flags.
pub fn alloc_page_current<B: NumaBinding>(
    engine: &PolicyEngine<B>,
    task: &TaskPolicy,
    gfp: Gfp,
) -> Option<Page> {
    let policy = task.policy();
    alloc_with_policy(engine, &policy, Placement::Cursor(task.cursor()), gfp)
}

fn alloc_with_policy<B: NumaBinding>(
    engine: &PolicyEngine<B>,
    policy: &MemPolicy,
    placement: Placement<'_>,
    gfp: Gfp,
) -> Option<Page> {
    let allocator = engine.binding().allocator();
    let local = engine.binding().topology().local_node();
    let target = select_target(policy, placement, local, gfp, allocator.policy_zone());
    let page = allocator.alloc_page(gfp, target);
    if page.is_some() {
        engine.stats().allocations[policy.mode()].increment();
    }
    page
}

/// Where a huge page backing `addr` in `area` should come from. Interleaved huge pages are
/// placed by huge page offset.
///
/// Arguments:
/// * `engine`: A reference to the policy engine.
/// * `task`: The policy slot of the allocating process.
/// * `area`: The area `addr` is in.
/// * `addr`: The address the huge page will be mapped at.
/// * `gfp`: The allocation flags.
pub fn huge_page_target<B: NumaBinding, A: VirtualArea + ?Sized>(
    engine: &PolicyEngine<B>,
    task: &TaskPolicy,
    area: &A,
    addr: Address,
    gfp: Gfp,
) -> ResolvedTarget {
    let policy = effective_policy(task, Some(area), addr);
    let offset = interleave_offset(area.start(), area.pgoff(), addr, LOG_BYTES_IN_HUGE_PAGE);
    ResolvedTarget::new(
        policy,
        Placement::Offset(offset),
        engine.binding().topology().local_node(),
        gfp,
        engine.binding().allocator().policy_zone(),
    )
}

/// Reset a process to the default policy, e.g. for the first process at boot.
pub fn numa_default_policy(task: &TaskPolicy) {
    task.reset_default();
}

/// The policy slot of a child process. The child shares the parent's policy.
pub fn fork_task_policy(parent: &TaskPolicy) -> TaskPolicy {
    parent.fork()
}

/// Release the policy of an exiting process.
pub fn exit_task_policy(task: &TaskPolicy) {
    task.reset_default();
}

/// A snapshot of the engine's event counters.
pub fn stats<B: NumaBinding>(engine: &PolicyEngine<B>) -> StatsSnapshot {
    engine.stats().snapshot()
}
