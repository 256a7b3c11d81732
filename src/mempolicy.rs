//! The policy engine and its builder.

use crate::policy::{MemPolicy, PolicyMode};
use crate::util::error::PolicyError;
use crate::util::nodemask::NodeMask;
use crate::util::options::Options;
use crate::util::statistics::PolicyStats;
use crate::vm::{NumaBinding, PageAllocator, Topology};
use std::sync::Arc;

/// Policy engine builder. This is used to set options before building the engine.
pub struct PolicyEngineBuilder {
    /// The options for this instance.
    pub options: Options,
}

impl PolicyEngineBuilder {
    /// Create a builder with options read from `MEMPOLICY_*` environment variables, or their
    /// defaults.
    pub fn new() -> Self {
        PolicyEngineBuilder {
            options: Options::default(),
        }
    }

    /// Set an option by name. Returns false if the option is unknown or the value is invalid.
    pub fn set_option(&mut self, name: &str, val: &str) -> bool {
        self.options.set_from_str(name, val)
    }

    /// Set options in bulk, from a string of space-separated `name=value` pairs.
    pub fn set_options_bulk_by_str(&mut self, options: &str) -> bool {
        options.split_ascii_whitespace().all(|pair| match pair.split_once('=') {
            Some((name, val)) => self.set_option(name, val),
            None => false,
        })
    }

    /// Build an engine over the machine described by `binding`.
    pub fn build<B: NumaBinding>(&self, binding: B) -> PolicyEngine<B> {
        PolicyEngine {
            binding,
            options: Arc::new(self.options.clone()),
            stats: PolicyStats::new(),
        }
    }
}

impl Default for PolicyEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A policy engine over one machine. All the policy operations in
/// [`memory_manager`](crate::memory_manager) take a reference to it.
pub struct PolicyEngine<B: NumaBinding> {
    binding: B,
    options: Arc<Options>,
    stats: PolicyStats,
}

impl<B: NumaBinding> PolicyEngine<B> {
    pub fn binding(&self) -> &B {
        &self.binding
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn stats(&self) -> &PolicyStats {
        &self.stats
    }

    /// Construct a policy and account for it. Bind policies raise the allocator's zone
    /// watermark to the highest zone they allocate from.
    pub fn new_policy(&self, mode: PolicyMode, nodes: &NodeMask) -> Result<MemPolicy, PolicyError> {
        let policy = MemPolicy::new(mode, nodes, self.binding.topology())?;
        if let Some(level) = policy.bind_zone_level() {
            if self.binding.allocator().policy_zone().raise(level) {
                debug!("Raised the policy zone to {}", level);
            }
        }
        if !policy.is_default() {
            self.stats.policies_created.increment();
        }
        Ok(policy)
    }

    pub fn log_stats(&self) {
        info!("Policy engine statistics: {}", self.stats.snapshot());
    }
}
