use crate::mempolicy::PolicyEngine;
use crate::policy::resolve::effective_policy;
use crate::policy::select::{interleave_offset, select_target, Placement};
use crate::policy::{MemPolicy, TaskPolicy};
use crate::util::constants::{BYTES_IN_PAGE, LOG_BYTES_IN_PAGE};
use crate::util::conversions::area_page_index;
use crate::util::error::PolicyError;
use crate::util::nodemask::NodeId;
use crate::util::Address;
use crate::vm::*;
use crossbeam::utils::Backoff;
use probe::probe;

/// What the scanner does with a page that violates its policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScanMode {
    /// Only report it.
    CheckOnly,
    /// Move it onto a node the policy allows. Resident pages are migrated. Unmapped
    /// page-cache pages are evicted so the next fault reads them in under the policy.
    Move,
}

/// What a scan found and did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Pages looked at.
    pub checked: usize,
    /// Pages found on a node their policy does not allow.
    pub violations: usize,
    /// Resident pages moved onto an allowed node.
    pub migrated: usize,
    /// Page-cache pages evicted.
    pub evicted: usize,
    /// Violations left in place, as the scan was not strict.
    pub tolerated: usize,
}

// What the scanner needs to know about the area a page is in.
struct PageContext {
    policy: MemPolicy,
    area_start: Address,
    pgoff: u64,
    mapping: Option<MappingId>,
}

/// Check every page in `[start, end)` against the policy governing it, and fix what can be
/// fixed in `ScanMode::Move`.
///
/// Pages outside of any area are skipped. If `policy_override` is given, pages are checked
/// against it instead of their effective policy. With `strict`, the first violation that is
/// not fixed fails the scan. Without it, unfixed violations are counted as tolerated.
///
/// Arguments:
/// * `engine`: The policy engine.
/// * `task`: The policy slot of the task owning `mm`.
/// * `mm`: The address space to scan.
/// * `start`, `end`: The page-aligned range to scan.
/// * `mode`: Whether to fix violations.
/// * `strict`: Whether an unfixed violation is an error.
/// * `policy_override`: A policy to check against instead of the effective policy.
pub fn verify_and_fix<B: NumaBinding, M: AddressSpace>(
    engine: &PolicyEngine<B>,
    task: &TaskPolicy,
    mm: &mut M,
    start: Address,
    end: Address,
    mode: ScanMode,
    strict: bool,
    policy_override: Option<&MemPolicy>,
) -> Result<ScanReport, PolicyError> {
    let mut report = ScanReport::default();
    let result = scan_pages(
        engine,
        task,
        mm,
        start,
        end,
        mode,
        strict,
        policy_override,
        &mut report,
    );
    match &result {
        Ok(()) => debug!("Scanned [{}, {}) {:?}: {:?}", start, end, mode, report),
        Err(e) => {
            if e.is_strict_violation() {
                engine.stats().strict_violations.increment();
            }
            debug!("Scan of [{}, {}) {:?} failed: {}", start, end, mode, e);
        }
    }
    result.map(|_| report)
}

fn scan_pages<B: NumaBinding, M: AddressSpace>(
    engine: &PolicyEngine<B>,
    task: &TaskPolicy,
    mm: &mut M,
    start: Address,
    end: Address,
    mode: ScanMode,
    strict: bool,
    policy_override: Option<&MemPolicy>,
    report: &mut ScanReport,
) -> Result<(), PolicyError> {
    let stats = engine.stats();
    let mut addr = start;
    while addr < end {
        let context = match mm.find_vma(addr) {
            None => break,
            Some(area) if area.start() > addr => {
                // Skip the hole up to the next area.
                addr = area.start();
                continue;
            }
            Some(area) => PageContext {
                policy: match policy_override {
                    Some(policy) => policy.clone(),
                    None => effective_policy(task, Some(area), addr),
                },
                area_start: area.start(),
                pgoff: area.pgoff(),
                mapping: area.mapping(),
            },
        };

        report.checked += 1;
        stats.pages_checked.increment();
        if let Some(node) = mm.resident_node(addr) {
            if !context.policy.node_allowed(node) {
                report.violations += 1;
                trace!("Page at {} on {} violates {}", addr, node, context.policy);
                let fixed = match mode {
                    ScanMode::CheckOnly => Err(PolicyError::ResidentPageViolates { addr, node }),
                    ScanMode::Move => migrate_page(engine, mm, addr, &context),
                };
                match fixed {
                    Ok(()) => {
                        report.migrated += 1;
                        stats.pages_migrated.increment();
                    }
                    Err(e) if strict => return Err(e),
                    Err(_) => {
                        report.tolerated += 1;
                        stats.tolerated_failures.increment();
                    }
                }
            }
        }
        // A private file mapping may have a resident copy of the page as well as the page in
        // the cache, so the cache is checked either way.
        if let Some(mapping) = context.mapping {
            let index = area_page_index(context.area_start, context.pgoff, addr);
            let cache = engine.binding().page_cache();
            match cache.find_page(mapping, index) {
                Some(cached) if !cached.mapped && !context.policy.node_allowed(cached.node) => {
                    report.violations += 1;
                    trace!(
                        "Cached page {} of {:?} on {} violates {}",
                        index,
                        mapping,
                        cached.node,
                        context.policy
                    );
                    let fixed = match mode {
                        ScanMode::CheckOnly => Err(PolicyError::CachePageViolates {
                            mapping,
                            index,
                            node: cached.node,
                        }),
                        ScanMode::Move => evict_page(engine, mapping, index, cached.node),
                    };
                    match fixed {
                        Ok(()) => {
                            report.evicted += 1;
                            stats.cache_pages_evicted.increment();
                        }
                        Err(e) if strict => return Err(e),
                        Err(_) => {
                            report.tolerated += 1;
                            stats.tolerated_failures.increment();
                        }
                    }
                }
                _ => {}
            }
        }
        addr += BYTES_IN_PAGE;
    }
    Ok(())
}

/// Allocate a page under the policy and have the address space move the resident page there.
fn migrate_page<B: NumaBinding, M: AddressSpace>(
    engine: &PolicyEngine<B>,
    mm: &mut M,
    addr: Address,
    context: &PageContext,
) -> Result<(), PolicyError> {
    let allocator = engine.binding().allocator();
    let gfp = Gfp {
        zone: engine.options().migrate_zone,
        can_block: true,
    };
    let placement = Placement::Offset(interleave_offset(
        context.area_start,
        context.pgoff,
        addr,
        LOG_BYTES_IN_PAGE,
    ));
    let local = engine.binding().topology().local_node();
    let target = select_target(
        &context.policy,
        placement,
        local,
        gfp,
        allocator.policy_zone(),
    );
    let page = allocator
        .alloc_page(gfp, target)
        .ok_or(PolicyError::MigrationFailed { addr })?;
    // The allocator may have fallen back to a node the policy does not allow.
    if !context.policy.node_allowed(page.node()) {
        allocator.free_page(page);
        return Err(PolicyError::MigrationFailed { addr });
    }
    match mm.replace_resident_page(addr, page) {
        Ok(old) => {
            let from: Option<NodeId> = old.map(|old| {
                let node = old.node();
                allocator.free_page(old);
                node
            });
            probe!(
                mempolicy,
                page_migrated,
                addr.as_usize(),
                from.map_or(usize::MAX, |node| node.as_usize()),
                page.node().as_usize()
            );
            Ok(())
        }
        Err(e) => {
            allocator.free_page(page);
            Err(e)
        }
    }
}

/// Evict an unmapped page-cache page, retrying while the page cache reports it busy.
fn evict_page<B: NumaBinding>(
    engine: &PolicyEngine<B>,
    mapping: MappingId,
    index: u64,
    node: NodeId,
) -> Result<(), PolicyError> {
    let cache = engine.binding().page_cache();
    let backoff = Backoff::new();
    for _ in 0..engine.options().evict_retries {
        if cache.invalidate_page(mapping, index) {
            probe!(mempolicy, cache_page_evicted, mapping.0, index, node.as_usize());
            return Ok(());
        }
        backoff.snooze();
    }
    Err(PolicyError::EvictionFailed { mapping, index })
}
