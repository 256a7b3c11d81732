//! A mock machine for tests: a node topology, a page allocator, a page cache and task address
//! spaces, all kept in plain memory. Tests set up the machine state they need, run the engine
//! against it, and inspect where pages ended up.

use crate::mempolicy::{PolicyEngine, PolicyEngineBuilder};
use crate::policy::{InsertMode, MemPolicy, PolicyZone, SharedPolicy, ZoneType};
use crate::util::constants::BYTES_IN_PAGE;
use crate::util::conversions::{area_page_index, page_align_down};
use crate::util::error::PolicyError;
use crate::util::nodemask::{NodeId, NodeMask};
use crate::util::Address;
use crate::vm::*;
use atomic::{Atomic, Ordering};
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex};
use strum::IntoEnumIterator;

/// A machine topology with a fixed set of online nodes.
pub struct MockTopology {
    online: NodeMask,
    zones: BTreeMap<NodeId, Vec<ZoneType>>,
    local: Atomic<NodeId>,
}

impl MockTopology {
    pub fn builder() -> MockTopologyBuilder {
        MockTopologyBuilder::default()
    }

    /// `nodes` online nodes, `0..nodes`. Node 0 has every zone, and the other nodes have
    /// normal and high memory. The local node is node 0.
    pub fn uniform(nodes: usize) -> Self {
        let mut builder = Self::builder();
        for id in 0..nodes {
            if id == 0 {
                builder = builder.node(id, &ZoneType::iter().collect::<Vec<_>>());
            } else {
                builder = builder.node(id, &[ZoneType::Normal, ZoneType::HighMem]);
            }
        }
        builder.build()
    }

    /// Pretend the caller now runs on a CPU of `node`.
    pub fn set_local_node(&self, node: NodeId) {
        self.local.store(node, Ordering::Relaxed);
    }
}

impl Topology for MockTopology {
    fn online_nodes(&self) -> NodeMask {
        self.online
    }

    fn local_node(&self) -> NodeId {
        self.local.load(Ordering::Relaxed)
    }

    fn zone_populated(&self, node: NodeId, zone_type: ZoneType) -> bool {
        self.zones
            .get(&node)
            .is_some_and(|zones| zones.contains(&zone_type))
    }
}

#[derive(Default)]
pub struct MockTopologyBuilder {
    zones: BTreeMap<NodeId, Vec<ZoneType>>,
    local: Option<NodeId>,
}

impl MockTopologyBuilder {
    /// Bring node `id` online with the given populated zones.
    pub fn node(mut self, id: usize, zones: &[ZoneType]) -> Self {
        self.zones.insert(NodeId::new(id), zones.to_vec());
        self
    }

    pub fn local(mut self, id: usize) -> Self {
        self.local = Some(NodeId::new(id));
        self
    }

    pub fn build(self) -> MockTopology {
        let online: NodeMask = self.zones.keys().copied().collect();
        let local = self
            .local
            .or_else(|| online.first_set())
            .unwrap_or_default();
        MockTopology {
            online,
            zones: self.zones,
            local: Atomic::new(local),
        }
    }
}

#[derive(Default)]
struct AllocatorState {
    // Free pages per node. A node without an entry has unlimited pages.
    capacity: HashMap<NodeId, usize>,
    live: HashMap<usize, Page>,
}

/// A page allocator that hands out page frame numbers and tracks the live pages.
pub struct MockAllocator {
    online: NodeMask,
    policy_zone: PolicyZone,
    next_pfn: AtomicUsize,
    state: Mutex<AllocatorState>,
}

impl MockAllocator {
    pub fn new(online: NodeMask) -> Self {
        MockAllocator {
            online,
            policy_zone: PolicyZone::default(),
            next_pfn: AtomicUsize::new(1),
            state: Mutex::new(AllocatorState::default()),
        }
    }

    /// Limit the number of free pages on `node`.
    pub fn set_capacity(&self, node: NodeId, pages: usize) {
        self.state.lock().unwrap().capacity.insert(node, pages);
    }

    pub fn live_pages(&self) -> usize {
        self.state.lock().unwrap().live.len()
    }

    pub fn live_pages_on(&self, node: NodeId) -> usize {
        self.state
            .lock()
            .unwrap()
            .live
            .values()
            .filter(|page| page.node() == node)
            .count()
    }

    fn candidates(&self, gfp: Gfp, target: AllocTarget<'_>) -> Vec<NodeId> {
        match target {
            AllocTarget::Node(node) => std::iter::once(node)
                .chain(self.online.iter().filter(|other| *other != node))
                .collect(),
            AllocTarget::ZoneList(zonelist) => zonelist
                .usable_zones(gfp.zone)
                .map(|zone| zone.node)
                .dedup()
                .collect(),
        }
    }
}

impl PageAllocator for MockAllocator {
    fn alloc_page(&self, gfp: Gfp, target: AllocTarget<'_>) -> Option<Page> {
        let candidates = self.candidates(gfp, target);
        let mut state = self.state.lock().unwrap();
        for node in candidates {
            let free = state.capacity.entry(node).or_insert(usize::MAX);
            if *free > 0 {
                *free -= 1;
                let page = Page::new(self.next_pfn.fetch_add(1, Ordering::Relaxed), node);
                state.live.insert(page.pfn(), page);
                return Some(page);
            }
        }
        None
    }

    fn free_page(&self, page: Page) {
        let mut state = self.state.lock().unwrap();
        assert!(
            state.live.remove(&page.pfn()).is_some(),
            "{:?} freed twice",
            page
        );
        if let Some(free) = state.capacity.get_mut(&page.node()) {
            *free = free.saturating_add(1);
        }
    }

    fn policy_zone(&self) -> &PolicyZone {
        &self.policy_zone
    }
}

/// A page-cache page of the mock page cache.
#[derive(Copy, Clone, Debug)]
pub struct MockCachedPage {
    pub node: NodeId,
    pub mapped: bool,
    pub dirty: bool,
    /// The number of eviction attempts that fail before one succeeds.
    pub busy: usize,
}

#[derive(Default)]
pub struct MockPageCache {
    pages: Mutex<HashMap<(MappingId, u64), MockCachedPage>>,
    invalidate_attempts: AtomicUsize,
}

impl MockPageCache {
    /// Cache page `index` of `mapping` on `node`, clean and unmapped.
    pub fn insert(&self, mapping: MappingId, index: u64, node: NodeId) {
        self.pages.lock().unwrap().insert(
            (mapping, index),
            MockCachedPage {
                node,
                mapped: false,
                dirty: false,
                busy: 0,
            },
        );
    }

    pub fn update<F: FnOnce(&mut MockCachedPage)>(&self, mapping: MappingId, index: u64, f: F) {
        f(self
            .pages
            .lock()
            .unwrap()
            .get_mut(&(mapping, index))
            .unwrap());
    }

    pub fn contains(&self, mapping: MappingId, index: u64) -> bool {
        self.pages.lock().unwrap().contains_key(&(mapping, index))
    }

    pub fn invalidate_attempts(&self) -> usize {
        self.invalidate_attempts.load(Ordering::Relaxed)
    }
}

impl PageCache for MockPageCache {
    fn find_page(&self, mapping: MappingId, index: u64) -> Option<CachedPage> {
        self.pages
            .lock()
            .unwrap()
            .get(&(mapping, index))
            .map(|page| CachedPage {
                node: page.node,
                mapped: page.mapped,
            })
    }

    fn invalidate_page(&self, mapping: MappingId, index: u64) -> bool {
        self.invalidate_attempts.fetch_add(1, Ordering::Relaxed);
        let mut pages = self.pages.lock().unwrap();
        let Some(page) = pages.get_mut(&(mapping, index)) else {
            return true;
        };
        if page.mapped || page.dirty {
            return false;
        }
        if page.busy > 0 {
            page.busy -= 1;
            return false;
        }
        pages.remove(&(mapping, index));
        true
    }
}

/// An area of a mock address space. Shared areas keep their policies in a [`SharedPolicy`].
#[derive(Clone, Debug)]
pub struct MockArea {
    start: Address,
    end: Address,
    pgoff: u64,
    mapping: Option<MappingId>,
    policy: Option<MemPolicy>,
    shared: Option<Arc<SharedPolicy>>,
}

impl MockArea {
    pub fn anonymous(start: Address, end: Address) -> Self {
        MockArea {
            start,
            end,
            pgoff: (start >> crate::util::constants::LOG_BYTES_IN_PAGE as usize) as u64,
            mapping: None,
            policy: None,
            shared: None,
        }
    }

    /// A private mapping of a file, whose pages are in the page cache.
    pub fn file(start: Address, end: Address, pgoff: u64, mapping: MappingId) -> Self {
        MockArea {
            pgoff,
            mapping: Some(mapping),
            ..Self::anonymous(start, end)
        }
    }

    /// A mapping of a shared object with its own policy store.
    pub fn shared(start: Address, end: Address, pgoff: u64, store: Arc<SharedPolicy>) -> Self {
        MockArea {
            pgoff,
            shared: Some(store),
            ..Self::anonymous(start, end)
        }
    }
}

impl VirtualArea for MockArea {
    fn start(&self) -> Address {
        self.start
    }

    fn end(&self) -> Address {
        self.end
    }

    fn pgoff(&self) -> u64 {
        self.pgoff
    }

    fn mapping(&self) -> Option<MappingId> {
        self.mapping
    }

    fn vm_policy(&self) -> Option<&MemPolicy> {
        self.policy.as_ref()
    }

    fn set_vm_policy(&mut self, policy: Option<MemPolicy>) -> Option<MemPolicy> {
        std::mem::replace(&mut self.policy, policy)
    }

    fn has_policy_ops(&self) -> bool {
        self.shared.is_some()
    }

    fn get_policy(&self, addr: Address) -> Option<MemPolicy> {
        match &self.shared {
            Some(store) => store.area_policy(self, addr),
            None => self.policy.clone(),
        }
    }

    fn set_policy(&mut self, policy: &MemPolicy, mode: InsertMode) -> Result<(), PolicyError> {
        match &self.shared {
            Some(store) => store.set_area_policy(self, policy, mode),
            None => Ok(()),
        }
    }
}

/// The address space of a mock task: its areas and a page table.
#[derive(Default)]
pub struct MockAddressSpace {
    areas: BTreeMap<Address, MockArea>,
    ptes: BTreeMap<Address, Page>,
    split_failures: HashSet<Address>,
    replace_failures: HashSet<Address>,
}

impl MockAddressSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an area. Areas must not overlap.
    pub fn map(&mut self, area: MockArea) {
        assert!(area.start < area.end);
        assert!(
            self.areas
                .values()
                .all(|other| other.end <= area.start || area.end <= other.start),
            "{:?} overlaps an existing area",
            area
        );
        self.areas.insert(area.start, area);
    }

    /// Make every page of `[start, end)` resident on `node`.
    pub fn populate(&mut self, allocator: &MockAllocator, start: Address, end: Address, node: NodeId) {
        let mut addr = start;
        while addr < end {
            let page = allocator
                .alloc_page(Gfp::HIGHUSER, AllocTarget::Node(node))
                .unwrap();
            assert_eq!(page.node(), node, "node {} is full", node);
            if let Some(old) = self.ptes.insert(addr, page) {
                allocator.free_page(old);
            }
            addr += BYTES_IN_PAGE;
        }
    }

    pub fn resident_page(&self, addr: Address) -> Option<Page> {
        self.ptes.get(&page_align_down(addr)).copied()
    }

    /// The area containing `addr`.
    pub fn area(&self, addr: Address) -> Option<&MockArea> {
        self.find_vma(addr).filter(|area| area.contains(addr))
    }

    /// The bounds of every area, in address order.
    pub fn area_bounds(&self) -> Vec<(Address, Address)> {
        self.areas.values().map(|area| (area.start, area.end)).collect()
    }

    pub fn fail_split_at(&mut self, addr: Address) {
        self.split_failures.insert(addr);
    }

    pub fn fail_replace_at(&mut self, addr: Address) {
        self.replace_failures.insert(page_align_down(addr));
    }
}

impl AddressSpace for MockAddressSpace {
    type Area = MockArea;

    fn find_vma(&self, addr: Address) -> Option<&MockArea> {
        self.areas
            .range(..=addr)
            .next_back()
            .map(|(_, area)| area)
            .filter(|area| area.end > addr)
            .or_else(|| self.areas.range(addr..).next().map(|(_, area)| area))
    }

    fn find_vma_mut(&mut self, addr: Address) -> Option<&mut MockArea> {
        let key = self.find_vma(addr)?.start;
        self.areas.get_mut(&key)
    }

    fn split_vma(&mut self, addr: Address) -> Result<(), PolicyError> {
        if self.split_failures.contains(&addr) {
            return Err(PolicyError::SplitFailed { addr });
        }
        let key = match self.areas.range(..addr).next_back() {
            Some((key, area)) if area.end > addr => *key,
            _ => return Ok(()),
        };
        let area = self.areas.get_mut(&key).unwrap();
        let mut tail = area.clone();
        tail.start = addr;
        tail.pgoff = area_page_index(area.start, area.pgoff, addr);
        area.end = addr;
        self.areas.insert(addr, tail);
        Ok(())
    }

    fn resident_node(&self, addr: Address) -> Option<NodeId> {
        self.resident_page(addr).map(|page| page.node())
    }

    fn replace_resident_page(
        &mut self,
        addr: Address,
        page: Page,
    ) -> Result<Option<Page>, PolicyError> {
        let addr = page_align_down(addr);
        if self.replace_failures.contains(&addr) {
            return Err(PolicyError::MigrationFailed { addr });
        }
        Ok(self.ptes.insert(addr, page))
    }
}

/// The mock machine as a binding.
pub struct MockBinding {
    pub topology: MockTopology,
    pub allocator: MockAllocator,
    pub page_cache: MockPageCache,
}

impl MockBinding {
    pub fn new(topology: MockTopology) -> Self {
        let allocator = MockAllocator::new(topology.online_nodes());
        MockBinding {
            topology,
            allocator,
            page_cache: MockPageCache::default(),
        }
    }
}

impl NumaBinding for MockBinding {
    type NumaTopology = MockTopology;
    type NumaAllocator = MockAllocator;
    type NumaPageCache = MockPageCache;

    fn topology(&self) -> &MockTopology {
        &self.topology
    }

    fn allocator(&self) -> &MockAllocator {
        &self.allocator
    }

    fn page_cache(&self) -> &MockPageCache {
        &self.page_cache
    }
}

/// An engine over a mock machine with `nodes` uniform nodes.
pub fn mock_engine(nodes: usize) -> PolicyEngine<MockBinding> {
    mock_engine_with(MockTopology::uniform(nodes), |_| {})
}

/// An engine over a mock machine, with options set by `set_options`.
pub fn mock_engine_with<F>(topology: MockTopology, set_options: F) -> PolicyEngine<MockBinding>
where
    F: FnOnce(&mut PolicyEngineBuilder),
{
    let mut builder = PolicyEngineBuilder::new();
    set_options(&mut builder);
    builder.build(MockBinding::new(topology))
}
