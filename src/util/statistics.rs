use crate::policy::PolicyMode;
use crate::util::synchronized_counter::SynchronizedCounter;
use enum_map::EnumMap;
use std::fmt;
use strum::IntoEnumIterator;

/// Event counters of a policy engine. Every counter can be bumped from any task.
#[derive(Default)]
pub struct PolicyStats {
    /// Policies constructed, excluding the default policy.
    pub policies_created: SynchronizedCounter,
    /// Pages checked by the compliance scanner.
    pub pages_checked: SynchronizedCounter,
    /// Resident pages moved onto a policy node.
    pub pages_migrated: SynchronizedCounter,
    /// Page-cache pages evicted so they are read back under the policy.
    pub cache_pages_evicted: SynchronizedCounter,
    /// Misplaced pages that could not be fixed and were tolerated as the request was not strict.
    pub tolerated_failures: SynchronizedCounter,
    /// Requests failed because a page violated the policy under strict checking.
    pub strict_violations: SynchronizedCounter,
    /// Page allocations, by the mode of the governing policy.
    pub allocations: EnumMap<PolicyMode, SynchronizedCounter>,
}

impl PolicyStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            policies_created: self.policies_created.peek(),
            pages_checked: self.pages_checked.peek(),
            pages_migrated: self.pages_migrated.peek(),
            cache_pages_evicted: self.cache_pages_evicted.peek(),
            tolerated_failures: self.tolerated_failures.peek(),
            strict_violations: self.strict_violations.peek(),
            allocations: EnumMap::from_fn(|mode| self.allocations[mode].peek()),
        }
    }

    /// Reset every counter to zero.
    pub fn reset(&self) {
        self.policies_created.reset();
        self.pages_checked.reset();
        self.pages_migrated.reset();
        self.cache_pages_evicted.reset();
        self.tolerated_failures.reset();
        self.strict_violations.reset();
        for counter in self.allocations.values() {
            counter.reset();
        }
    }
}

/// Counter values at one point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub policies_created: usize,
    pub pages_checked: usize,
    pub pages_migrated: usize,
    pub cache_pages_evicted: usize,
    pub tolerated_failures: usize,
    pub strict_violations: usize,
    pub allocations: EnumMap<PolicyMode, usize>,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "policies={} checked={} migrated={} evicted={} tolerated={} strict_violations={}",
            self.policies_created,
            self.pages_checked,
            self.pages_migrated,
            self.cache_pages_evicted,
            self.tolerated_failures,
            self.strict_violations
        )?;
        for mode in PolicyMode::iter() {
            write!(f, " alloc.{}={}", mode, self.allocations[mode])?;
        }
        Ok(())
    }
}
