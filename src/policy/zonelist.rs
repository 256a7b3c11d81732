use crate::util::error::{InvalidPolicy, PolicyError};
use crate::util::nodemask::{NodeId, NodeMask};
use crate::vm::Topology;
use atomic::{Atomic, Ordering};
use bytemuck::NoUninit;
use enum_map::Enum;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

/// Zone levels, ordered from the most constrained to the least constrained.
#[repr(u8)]
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Enum,
    EnumIter,
    EnumString,
    Display,
    NoUninit,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ZoneType {
    /// Memory reachable by legacy DMA devices.
    Dma,
    /// Memory reachable by 32-bit DMA devices.
    Dma32,
    /// Memory the kernel maps directly.
    Normal,
    /// Memory that is not permanently mapped.
    HighMem,
}

/// A zone: one zone level of one node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Zone {
    pub node: NodeId,
    pub zone_type: ZoneType,
}

/// An ordered sequence of zones a bind allocation tries in turn, without falling back to
/// any zone outside of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZoneList {
    zones: Vec<Zone>,
}

impl ZoneList {
    /// Build the zone list for a bind policy over `nodes`.
    ///
    /// Zones are ordered by level, highest first, and by node id within a level. Only
    /// populated zones are included.
    pub fn build<T: Topology + ?Sized>(
        topology: &T,
        nodes: &NodeMask,
    ) -> Result<ZoneList, PolicyError> {
        let mut zones = Vec::new();
        zones
            .try_reserve_exact(nodes.weight() * <ZoneType as Enum>::LENGTH)
            .map_err(|_| PolicyError::OutOfMemory)?;
        for zone_type in ZoneType::iter().rev() {
            for node in nodes {
                if topology.zone_populated(node, zone_type) {
                    zones.push(Zone { node, zone_type });
                }
            }
        }
        if zones.is_empty() {
            return Err(InvalidPolicy::NoZones.into());
        }
        trace!("Built zone list {:?} for nodes {}", zones, nodes);
        Ok(ZoneList { zones })
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// The highest zone level present in the list. Bind allocations below this level cannot
    /// be satisfied by the list.
    pub fn highest_zone(&self) -> ZoneType {
        // The list is never empty, and is sorted by level, highest first.
        self.zones[0].zone_type
    }

    /// The nodes the list allocates from.
    pub fn nodes(&self) -> NodeMask {
        self.zones.iter().map(|zone| zone.node).collect()
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.zones.iter().any(|zone| zone.node == node)
    }

    /// The zones of the list that can satisfy a request for `zone_type`.
    pub fn usable_zones(&self, zone_type: ZoneType) -> impl Iterator<Item = &Zone> + '_ {
        self.zones
            .iter()
            .filter(move |zone| zone.zone_type <= zone_type)
    }
}

/// The highest zone level any bind policy has been built for. Requests for zones below this
/// level are not worth policy control and bypass bind policies.
///
/// The watermark is owned by the page allocator. Building a bind policy reports the levels it
/// touches through [`ZoneList::highest_zone`], and the engine raises the watermark with it.
pub struct PolicyZone {
    level: Atomic<ZoneType>,
}

impl PolicyZone {
    pub const fn new(level: ZoneType) -> Self {
        PolicyZone {
            level: Atomic::new(level),
        }
    }

    pub fn get(&self) -> ZoneType {
        self.level.load(Ordering::Relaxed)
    }

    pub fn set(&self, level: ZoneType) {
        self.level.store(level, Ordering::Relaxed)
    }

    /// Raise the watermark to `level` if it is lower. Returns whether it was raised.
    pub fn raise(&self, level: ZoneType) -> bool {
        self.level
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                (level > current).then_some(level)
            })
            .is_ok()
    }
}

impl Default for PolicyZone {
    fn default() -> Self {
        Self::new(ZoneType::Dma)
    }
}
