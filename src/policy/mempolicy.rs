use super::zonelist::ZoneList;
use crate::util::error::{InvalidPolicy, PolicyError};
use crate::util::nodemask::{NodeId, NodeMask};
use crate::vm::Topology;
use enum_map::Enum;
use std::fmt;
use std::sync::Arc;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// The policy modes.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Enum,
    EnumIter,
    EnumString,
    Display,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PolicyMode {
    /// Allocate on the local node, or defer to the enclosing policy.
    Default,
    /// Try one node first and fall back to any node.
    Preferred,
    /// Only allocate from the given nodes.
    Bind,
    /// Spread allocations over the given nodes.
    Interleave,
}

#[derive(Debug, PartialEq, Eq)]
enum PolicyKind {
    /// `None` means "the local node at allocation time".
    Preferred(Option<NodeId>),
    Bind(ZoneList),
    Interleave(NodeMask),
}

#[derive(Debug)]
struct PolicyInner {
    kind: PolicyKind,
}

impl Drop for PolicyInner {
    fn drop(&mut self) {
        trace!("Free policy {:?}", self.kind);
    }
}

/// A memory policy.
///
/// A `MemPolicy` is a reference-counted handle to an immutable policy body. Cloning a handle
/// takes another reference, dropping a handle releases it, and the body (with the zone list
/// of a bind policy) is freed when the last handle goes away. A policy is never changed after
/// it is constructed: to change the policy of a task or an area, construct a new one and swap
/// the handle.
///
/// The default policy is a static sentinel that holds no body. Every default policy is the
/// sentinel, so cloning or dropping it costs nothing.
#[derive(Clone)]
pub struct MemPolicy {
    inner: Option<Arc<PolicyInner>>,
}

/// The default policy sentinel.
pub static DEFAULT_POLICY: MemPolicy = MemPolicy::DEFAULT;

impl MemPolicy {
    pub const DEFAULT: MemPolicy = MemPolicy { inner: None };

    /// Construct a policy.
    ///
    /// * `Default` requires an empty node mask.
    /// * `Preferred` prefers the first node of the mask, or the local node if the mask is empty.
    /// * `Bind` and `Interleave` require a non-empty mask of online nodes. `Bind` builds its
    ///   zone list here. The caller should raise the allocator's
    ///   [`PolicyZone`](crate::policy::PolicyZone) with [`MemPolicy::bind_zone_level`].
    pub fn new<T: Topology + ?Sized>(
        mode: PolicyMode,
        nodes: &NodeMask,
        topology: &T,
    ) -> Result<MemPolicy, PolicyError> {
        let kind = match mode {
            PolicyMode::Default => {
                if !nodes.is_empty() {
                    return Err(InvalidPolicy::NonEmptyDefault.into());
                }
                return Ok(MemPolicy::DEFAULT);
            }
            PolicyMode::Preferred => PolicyKind::Preferred(nodes.first_set()),
            PolicyMode::Bind | PolicyMode::Interleave => {
                if nodes.is_empty() {
                    return Err(InvalidPolicy::Empty.into());
                }
                if let Some(offline) = nodes.first_not_in(&topology.online_nodes()) {
                    return Err(InvalidPolicy::OfflineNode(offline).into());
                }
                if mode == PolicyMode::Bind {
                    PolicyKind::Bind(ZoneList::build(topology, nodes)?)
                } else {
                    PolicyKind::Interleave(*nodes)
                }
            }
        };
        let policy = MemPolicy {
            inner: Some(Arc::new(PolicyInner { kind })),
        };
        debug!("New policy {}", policy);
        Ok(policy)
    }

    fn kind(&self) -> Option<&PolicyKind> {
        self.inner.as_deref().map(|inner| &inner.kind)
    }

    pub fn mode(&self) -> PolicyMode {
        match self.kind() {
            None => PolicyMode::Default,
            Some(PolicyKind::Preferred(_)) => PolicyMode::Preferred,
            Some(PolicyKind::Bind(_)) => PolicyMode::Bind,
            Some(PolicyKind::Interleave(_)) => PolicyMode::Interleave,
        }
    }

    pub fn is_default(&self) -> bool {
        self.inner.is_none()
    }

    /// The preferred node of a preferred policy. `None` for other modes and for a preferred
    /// policy that prefers the local node.
    pub fn preferred_node(&self) -> Option<NodeId> {
        match self.kind() {
            Some(PolicyKind::Preferred(node)) => *node,
            _ => None,
        }
    }

    /// The nodes of an interleave policy.
    pub fn interleave_nodes(&self) -> Option<&NodeMask> {
        match self.kind() {
            Some(PolicyKind::Interleave(nodes)) => Some(nodes),
            _ => None,
        }
    }

    /// The zone list of a bind policy.
    pub fn zonelist(&self) -> Option<&ZoneList> {
        match self.kind() {
            Some(PolicyKind::Bind(zonelist)) => Some(zonelist),
            _ => None,
        }
    }

    /// The highest zone level a bind policy allocates from.
    pub fn bind_zone_level(&self) -> Option<super::ZoneType> {
        self.zonelist().map(|zonelist| zonelist.highest_zone())
    }

    /// The nodes the policy names, as reported to a task querying its policy. A preferred
    /// policy for the local node reports `local_nodes`.
    pub fn nodes(&self, local_nodes: &NodeMask) -> NodeMask {
        match self.kind() {
            None => NodeMask::empty(),
            Some(PolicyKind::Preferred(Some(node))) => NodeMask::single(*node),
            Some(PolicyKind::Preferred(None)) => *local_nodes,
            Some(PolicyKind::Bind(zonelist)) => zonelist.nodes(),
            Some(PolicyKind::Interleave(nodes)) => *nodes,
        }
    }

    /// May a page governed by this policy reside on `node`? Default and preferred policies
    /// never restrict placement.
    pub fn node_allowed(&self, node: NodeId) -> bool {
        match self.kind() {
            None | Some(PolicyKind::Preferred(_)) => true,
            Some(PolicyKind::Bind(zonelist)) => zonelist.contains_node(node),
            Some(PolicyKind::Interleave(nodes)) => nodes.test(node),
        }
    }

    /// Do both handles refer to the same policy body (or are both the default sentinel)?
    pub fn ptr_eq(&self, other: &MemPolicy) -> bool {
        match (&self.inner, &other.inner) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// The number of live references to the policy body. `None` for the default sentinel,
    /// which is not reference counted.
    pub fn ref_count(&self) -> Option<usize> {
        self.inner.as_ref().map(Arc::strong_count)
    }

    /// Release this reference. This is the same as dropping the handle.
    pub fn release(self) {}

    #[cfg(test)]
    pub(crate) fn downgrade(&self) -> Option<std::sync::Weak<impl Sized>> {
        self.inner.as_ref().map(Arc::downgrade)
    }
}

impl Default for MemPolicy {
    fn default() -> Self {
        MemPolicy::DEFAULT
    }
}

/// Structural equality: same mode and same nodes (same zone list for bind).
impl PartialEq for MemPolicy {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.kind() == other.kind()
    }
}

impl Eq for MemPolicy {}

/// Formats the policy the way numa_maps does, e.g. `interleave:0,2-3` or `prefer:local`.
impl fmt::Display for MemPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            None => write!(f, "default"),
            Some(PolicyKind::Preferred(Some(node))) => write!(f, "prefer:{}", node),
            Some(PolicyKind::Preferred(None)) => write!(f, "prefer:local"),
            Some(PolicyKind::Bind(zonelist)) => write!(f, "bind:{}", zonelist.nodes()),
            Some(PolicyKind::Interleave(nodes)) => write!(f, "interleave:{}", nodes),
        }
    }
}

impl fmt::Debug for MemPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemPolicy({})", self)
    }
}
