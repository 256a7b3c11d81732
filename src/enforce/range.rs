use super::scan::{verify_and_fix, ScanMode, ScanReport};
use crate::mempolicy::PolicyEngine;
use crate::policy::{InsertMode, MemPolicy, TaskPolicy};
use crate::util::error::PolicyError;
use crate::util::options::RangeApply;
use crate::util::Address;
use crate::vm::*;
use bitflags::bitflags;

bitflags! {
    /// Flags of a range policy request.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct MbindFlags: u32 {
        /// Fail if a page in the range is on a node the policy does not allow.
        const STRICT = 1 << 0;
        /// Move pages in the range onto nodes the policy allows.
        const MOVE = 1 << 1;
        /// Keep existing non-default policies, and only set the policy where there is none.
        const NO_REPLACE = 1 << 2;
    }
}

/// Check that `[start, end)` has no unmapped holes.
fn check_coverage<M: AddressSpace>(mm: &M, start: Address, end: Address) -> Result<(), PolicyError> {
    let mut addr = start;
    while addr < end {
        match mm.find_vma(addr) {
            Some(area) if area.start() <= addr => addr = area.end(),
            _ => return Err(PolicyError::UnmappedHole { addr }),
        }
    }
    Ok(())
}

/// Attach `policy` to every area in `[start, end)`, splitting the areas at the range
/// boundaries, then check or move the pages in the range as `flags` ask.
///
/// The range must be page aligned. Nothing is changed if the range has a hole. With
/// [`RangeApply::BestEffort`], a failure part way leaves the areas before it with the new
/// policy. With [`RangeApply::ValidateFirst`], a strict request that does not move pages
/// checks the whole range against `policy` before changing any area.
///
/// Returns what the page scan found, or an empty report if no scan was asked for.
pub fn apply_policy_to_range<B: NumaBinding, M: AddressSpace>(
    engine: &PolicyEngine<B>,
    task: &TaskPolicy,
    mm: &mut M,
    start: Address,
    end: Address,
    policy: &MemPolicy,
    flags: MbindFlags,
) -> Result<ScanReport, PolicyError> {
    check_coverage(mm, start, end)?;

    let strict = flags.contains(MbindFlags::STRICT);
    let moving = flags.contains(MbindFlags::MOVE);
    let no_replace = flags.contains(MbindFlags::NO_REPLACE);
    if strict
        && !moving
        && !no_replace
        && engine.options().range_apply == RangeApply::ValidateFirst
    {
        verify_and_fix(engine, task, mm, start, end, ScanMode::CheckOnly, true, Some(policy))?;
    }

    let insert_mode = if no_replace {
        InsertMode::NoReplace
    } else {
        InsertMode::Replace
    };
    let mut addr = start;
    while addr < end {
        let (area_start, area_end) = match mm.find_vma(addr) {
            Some(area) => (area.start(), area.end()),
            None => return Err(PolicyError::UnmappedHole { addr }),
        };
        if area_start < addr {
            mm.split_vma(addr)?;
        }
        if area_end > end {
            mm.split_vma(end)?;
        }
        let area = mm
            .find_vma_mut(addr)
            .ok_or(PolicyError::UnmappedHole { addr })?;
        debug_assert!(area.start() == addr && area.end() <= end);
        area.set_policy(policy, insert_mode)?;
        let keep_existing = no_replace && area.vm_policy().is_some_and(|p| !p.is_default());
        if !keep_existing {
            let new = (!policy.is_default()).then(|| policy.clone());
            let old = area.set_vm_policy(new);
            trace!(
                "Area [{}, {}) policy {:?} -> {}",
                area.start(),
                area.end(),
                old,
                policy
            );
        }
        addr = area.end();
    }

    if strict || moving {
        let mode = if moving {
            ScanMode::Move
        } else {
            ScanMode::CheckOnly
        };
        verify_and_fix(engine, task, mm, start, end, mode, strict, None)
    } else {
        Ok(ScanReport::default())
    }
}
