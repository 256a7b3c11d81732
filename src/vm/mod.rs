//! Binding-to-engine interface: the collaborators the policy engine needs.
//!
//! The policy engine does not own page tables, areas, the page cache or the page allocator.
//! A binding describes them by implementing the traits in this module and bundling them in
//! a [`NumaBinding`]. Address spaces (one per task) are passed to each operation that needs
//! them, as the engine never holds onto them.

mod address_space;
mod allocator;
mod binding;
mod page_cache;
mod topology;

pub use self::address_space::AddressSpace;
pub use self::address_space::VirtualArea;
pub use self::allocator::AllocTarget;
pub use self::allocator::Gfp;
pub use self::allocator::Page;
pub use self::allocator::PageAllocator;
pub use self::binding::NumaBinding;
pub use self::page_cache::CachedPage;
pub use self::page_cache::MappingId;
pub use self::page_cache::PageCache;
pub use self::topology::Topology;

#[cfg(test)]
mod tests;
