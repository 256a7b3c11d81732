use crate::policy::{PolicyZone, ZoneList, ZoneType};
use crate::util::nodemask::NodeId;

/// A physical page handed out by the page allocator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Page {
    pfn: usize,
    node: NodeId,
}

impl Page {
    pub const fn new(pfn: usize, node: NodeId) -> Self {
        Page { pfn, node }
    }

    /// The page frame number.
    pub const fn pfn(&self) -> usize {
        self.pfn
    }

    /// The node the page resides on.
    pub const fn node(&self) -> NodeId {
        self.node
    }
}

/// Allocation flags: which zone the request needs, and whether the caller may block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Gfp {
    pub zone: ZoneType,
    pub can_block: bool,
}

impl Gfp {
    /// User pages: any zone, may block.
    pub const HIGHUSER: Gfp = Gfp {
        zone: ZoneType::HighMem,
        can_block: true,
    };
    /// Kernel pages from the normal zone, may block.
    pub const KERNEL: Gfp = Gfp {
        zone: ZoneType::Normal,
        can_block: true,
    };
    /// Kernel pages from the normal zone, must not block.
    pub const ATOMIC: Gfp = Gfp {
        zone: ZoneType::Normal,
        can_block: false,
    };
    /// Pages for devices that can only address the DMA zone.
    pub const DMA: Gfp = Gfp {
        zone: ZoneType::Dma,
        can_block: true,
    };
}

/// Where the page allocator should look for a page.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AllocTarget<'a> {
    /// Start at the node and fall back to any other node when it is exhausted.
    Node(NodeId),
    /// Try the zones in order and never fall back outside them.
    ZoneList(&'a ZoneList),
}

/// The page allocator.
pub trait PageAllocator: Send + Sync {
    /// Allocate a page.
    ///
    /// Arguments:
    /// * `gfp`: The allocation flags.
    /// * `target`: Where to allocate from. See [`AllocTarget`].
    fn alloc_page(&self, gfp: Gfp, target: AllocTarget<'_>) -> Option<Page>;

    /// Return a page to the allocator.
    fn free_page(&self, page: Page);

    /// The zone level watermark. Bind policies only apply to requests at or above it.
    fn policy_zone(&self) -> &PolicyZone;
}
