use super::{PageAllocator, PageCache, Topology};

/// The `NumaBinding` trait associates the machine-wide collaborators the engine calls into.
/// Each of them must be safe to share between tasks, as policies are resolved and pages are
/// allocated from any task concurrently.
pub trait NumaBinding
where
    Self: Sized + 'static + Send + Sync,
{
    /// The node topology.
    type NumaTopology: Topology;
    /// The page allocator.
    type NumaAllocator: PageAllocator;
    /// The page cache of file-backed objects.
    type NumaPageCache: PageCache;

    fn topology(&self) -> &Self::NumaTopology;

    fn allocator(&self) -> &Self::NumaAllocator;

    fn page_cache(&self) -> &Self::NumaPageCache;
}
