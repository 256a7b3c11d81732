use crate::util::nodemask::NodeId;
use crate::util::Address;
use crate::vm::MappingId;
use std::fmt;

/// Why a policy could not be constructed from a mode and a node mask.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InvalidPolicy {
    /// The default policy takes no nodes.
    NonEmptyDefault,
    /// Bind and interleave need at least one node.
    Empty,
    /// The mask names a node that is not online.
    OfflineNode(NodeId),
    /// None of the bound nodes has a populated zone to allocate from.
    NoZones,
}

impl fmt::Display for InvalidPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidPolicy::NonEmptyDefault => write!(f, "the default policy takes no nodes"),
            InvalidPolicy::Empty => write!(f, "the node mask is empty"),
            InvalidPolicy::OfflineNode(node) => write!(f, "node {} is not online", node),
            InvalidPolicy::NoZones => write!(f, "no populated zone on the bound nodes"),
        }
    }
}

/// Errors reported by the policy engine. All of them are local and recoverable by the caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PolicyError {
    /// The policy was rejected at construction time.
    InvalidPolicy(InvalidPolicy),
    /// A malformed request, such as a misaligned range or an unsupported flag combination.
    InvalidArgument(&'static str),
    /// Allocating a zone list, a store entry or a replacement page failed.
    OutOfMemory,
    /// The address range is not fully covered by mapped areas.
    UnmappedHole { addr: Address },
    /// The address space could not split an area at `addr`.
    SplitFailed { addr: Address },
    /// A resident page violates the policy and strict checking was requested.
    ResidentPageViolates { addr: Address, node: NodeId },
    /// An unmapped page-cache page violates the policy and strict checking was requested.
    CachePageViolates {
        mapping: MappingId,
        index: u64,
        node: NodeId,
    },
    /// A violating resident page could not be moved.
    MigrationFailed { addr: Address },
    /// A violating page-cache page could not be evicted.
    EvictionFailed { mapping: MappingId, index: u64 },
}

impl PolicyError {
    /// The errno a system-call front end would report for this error.
    pub fn errno(&self) -> i32 {
        match self {
            PolicyError::InvalidPolicy(_) | PolicyError::InvalidArgument(_) => libc::EINVAL,
            PolicyError::OutOfMemory | PolicyError::SplitFailed { .. } => libc::ENOMEM,
            PolicyError::UnmappedHole { .. } => libc::EFAULT,
            PolicyError::ResidentPageViolates { .. }
            | PolicyError::CachePageViolates { .. }
            | PolicyError::MigrationFailed { .. }
            | PolicyError::EvictionFailed { .. } => libc::EIO,
        }
    }

    /// Is this one of the failures only reported when strict checking is requested?
    pub fn is_strict_violation(&self) -> bool {
        matches!(
            self,
            PolicyError::ResidentPageViolates { .. }
                | PolicyError::CachePageViolates { .. }
                | PolicyError::MigrationFailed { .. }
                | PolicyError::EvictionFailed { .. }
        )
    }
}

impl From<InvalidPolicy> for PolicyError {
    fn from(reason: InvalidPolicy) -> Self {
        PolicyError::InvalidPolicy(reason)
    }
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::InvalidPolicy(reason) => write!(f, "invalid policy: {}", reason),
            PolicyError::InvalidArgument(what) => write!(f, "invalid argument: {}", what),
            PolicyError::OutOfMemory => write!(f, "out of memory"),
            PolicyError::UnmappedHole { addr } => write!(f, "no mapping at {}", addr),
            PolicyError::SplitFailed { addr } => write!(f, "cannot split the area at {}", addr),
            PolicyError::ResidentPageViolates { addr, node } => write!(
                f,
                "page at {} resides on node {} outside the policy",
                addr, node
            ),
            PolicyError::CachePageViolates {
                mapping,
                index,
                node,
            } => write!(
                f,
                "cached page {} of {:?} resides on node {} outside the policy",
                index, mapping, node
            ),
            PolicyError::MigrationFailed { addr } => {
                write!(f, "cannot move the page at {}", addr)
            }
            PolicyError::EvictionFailed { mapping, index } => {
                write!(f, "cannot evict cached page {} of {:?}", index, mapping)
            }
        }
    }
}

impl std::error::Error for PolicyError {}
