use crate::util::nodemask::NodeId;
use std::fmt;

/// Identifies a file-backed object (an inode or a shared memory segment) whose pages live in
/// the page cache.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MappingId(pub u64);

impl fmt::Debug for MappingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mapping#{}", self.0)
    }
}

/// What the engine needs to know about a page-cache page.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CachedPage {
    /// The node the page resides on.
    pub node: NodeId,
    /// Whether the page is mapped into some page table. Mapped pages are checked through the
    /// address space instead.
    pub mapped: bool,
}

/// The page cache.
pub trait PageCache: Send + Sync {
    /// Find the page caching page `index` of `mapping`, if any.
    fn find_page(&self, mapping: MappingId, index: u64) -> Option<CachedPage>;

    /// Try to evict a clean, unmapped, unlocked page from the cache so a later fault reads it
    /// again. Return `false` if the page is dirty, locked, under writeback or mapped, in which
    /// case the engine may retry.
    fn invalidate_page(&self, mapping: MappingId, index: u64) -> bool;
}
