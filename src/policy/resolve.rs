use super::mempolicy::MemPolicy;
use super::task::TaskPolicy;
use crate::util::Address;
use crate::vm::VirtualArea;

/// The policy that governs an allocation at `addr`.
///
/// In order of precedence:
/// 1. If the area resolves policies itself, whatever it returns for `addr`. A `None` result
///    means the default policy, even if the process has a policy.
/// 2. The policy attached to the area, unless it is the default policy.
/// 3. The process policy.
///
/// The returned handle holds a reference, so the policy stays alive while the caller uses it
/// even if the area or the process installs a new one.
pub fn effective_policy<A: VirtualArea + ?Sized>(
    task: &TaskPolicy,
    area: Option<&A>,
    addr: Address,
) -> MemPolicy {
    if let Some(area) = area {
        if area.has_policy_ops() {
            return area.get_policy(addr).unwrap_or_default();
        }
        if let Some(policy) = area.vm_policy().filter(|policy| !policy.is_default()) {
            return policy.clone();
        }
    }
    task.policy()
}
