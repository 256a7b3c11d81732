use crate::policy::{InsertMode, MemPolicy};
use crate::util::error::PolicyError;
use crate::util::nodemask::NodeId;
use crate::util::Address;
use crate::vm::{MappingId, Page};

/// A virtual memory area: a contiguous, page-aligned range of a task's address space with
/// uniform attributes.
///
/// Areas own a policy slot. Plain areas keep their policy in that slot. Areas backed by a
/// shared object (e.g. shared memory) keep their policy with the object instead, keyed by page
/// offset, and override [`VirtualArea::has_policy_ops`], [`VirtualArea::get_policy`] and
/// [`VirtualArea::set_policy`] to reach it. See [`crate::policy::SharedPolicy::area_policy`].
pub trait VirtualArea {
    /// The first address of the area.
    fn start(&self) -> Address;

    /// The first address above the area.
    fn end(&self) -> Address;

    /// The page offset into the backing object that `start()` maps.
    fn pgoff(&self) -> u64;

    /// The backing object whose pages are in the page cache, if the area is file-backed.
    fn mapping(&self) -> Option<MappingId> {
        None
    }

    /// The policy attached to the area.
    fn vm_policy(&self) -> Option<&MemPolicy>;

    /// Swap the attached policy, returning the old one.
    fn set_vm_policy(&mut self, policy: Option<MemPolicy>) -> Option<MemPolicy>;

    /// Does the area resolve policies itself instead of using its attached policy?
    fn has_policy_ops(&self) -> bool {
        false
    }

    /// The policy governing `addr`. Only called if [`VirtualArea::has_policy_ops`] is true.
    /// `None` means the default policy.
    fn get_policy(&self, _addr: Address) -> Option<MemPolicy> {
        self.vm_policy().cloned()
    }

    /// Called before `policy` is attached to the whole area.
    fn set_policy(&mut self, _policy: &MemPolicy, _mode: InsertMode) -> Result<(), PolicyError> {
        Ok(())
    }

    fn contains(&self, addr: Address) -> bool {
        self.start() <= addr && addr < self.end()
    }
}

/// A task's address space: its areas and page tables.
pub trait AddressSpace {
    type Area: VirtualArea;

    /// The first area that ends above `addr`. The area may start above `addr`.
    fn find_vma(&self, addr: Address) -> Option<&Self::Area>;

    /// The mutable version of [`AddressSpace::find_vma`].
    fn find_vma_mut(&mut self, addr: Address) -> Option<&mut Self::Area>;

    /// Split the area containing `addr` into `[start, addr)` and `[addr, end)`. Both halves
    /// keep a reference to the policy of the original area.
    fn split_vma(&mut self, addr: Address) -> Result<(), PolicyError>;

    /// The node of the page mapped at `addr`, if one is resident.
    fn resident_node(&self, addr: Address) -> Option<NodeId>;

    /// Map `page` at `addr`. If a page is already resident, copy its contents into `page` and
    /// atomically rewrite the page table entry. Returns the page that was replaced, which the
    /// engine then frees.
    fn replace_resident_page(
        &mut self,
        addr: Address,
        page: Page,
    ) -> Result<Option<Page>, PolicyError>;
}
