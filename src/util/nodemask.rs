//! NUMA node identifiers and node masks.
//!
//! A [`NodeMask`] is a fixed-capacity bitmap over [`NodeId`]s, `0..MAX_NUMNODES`. It is a
//! plain value type: copying it copies the bits. Checking a mask against the machine's
//! online nodes needs a snapshot of those nodes from the
//! [`Topology`](crate::vm::Topology) collaborator.

use crate::util::constants::*;
use bytemuck::NoUninit;
use itertools::Itertools;
use std::fmt;
use std::str::FromStr;

/// The identifier of a NUMA node.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, NoUninit)]
pub struct NodeId(u16);

impl NodeId {
    /// Create a node id. Panics if `id` is not below [`MAX_NUMNODES`].
    pub const fn new(id: usize) -> Self {
        assert!(id < MAX_NUMNODES, "node id out of range");
        NodeId(id as u16)
    }

    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

/// A set of NUMA nodes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodeMask {
    bits: [usize; NODEMASK_WORDS],
}

impl NodeMask {
    /// An empty node mask.
    pub const fn empty() -> Self {
        NodeMask {
            bits: [0; NODEMASK_WORDS],
        }
    }

    /// A node mask with exactly the given nodes.
    pub fn from_nodes<I: IntoIterator<Item = NodeId>>(nodes: I) -> Self {
        let mut mask = Self::empty();
        for node in nodes {
            mask.set(node);
        }
        mask
    }

    /// A node mask containing a single node.
    pub fn single(node: NodeId) -> Self {
        let mut mask = Self::empty();
        mask.set(node);
        mask
    }

    #[inline(always)]
    fn word_and_bit(node: NodeId) -> (usize, usize) {
        let id = node.as_usize();
        (id >> LOG_BITS_IN_WORD, id & (BITS_IN_WORD - 1))
    }

    pub fn set(&mut self, node: NodeId) {
        let (word, bit) = Self::word_and_bit(node);
        self.bits[word] |= 1 << bit;
    }

    pub fn clear(&mut self, node: NodeId) {
        let (word, bit) = Self::word_and_bit(node);
        self.bits[word] &= !(1 << bit);
    }

    pub fn test(&self, node: NodeId) -> bool {
        let (word, bit) = Self::word_and_bit(node);
        self.bits[word] & (1 << bit) != 0
    }

    /// The number of nodes in the mask.
    pub fn weight(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }

    /// The lowest node in the mask.
    pub fn first_set(&self) -> Option<NodeId> {
        self.find_from(0)
    }

    /// The lowest node in the mask that is strictly above `after`.
    pub fn next_set(&self, after: NodeId) -> Option<NodeId> {
        self.find_from(after.as_usize() + 1)
    }

    /// The lowest node in the mask at or above `from`.
    pub fn first_set_from(&self, from: NodeId) -> Option<NodeId> {
        self.find_from(from.as_usize())
    }

    fn find_from(&self, from: usize) -> Option<NodeId> {
        if from >= MAX_NUMNODES {
            return None;
        }
        let mut word_index = from >> LOG_BITS_IN_WORD;
        // Mask off the bits below `from` in the first word.
        let mut word = self.bits[word_index] & (usize::MAX << (from & (BITS_IN_WORD - 1)));
        loop {
            if word != 0 {
                let id = (word_index << LOG_BITS_IN_WORD) + word.trailing_zeros() as usize;
                return Some(NodeId::new(id));
            }
            word_index += 1;
            if word_index == NODEMASK_WORDS {
                return None;
            }
            word = self.bits[word_index];
        }
    }

    /// Overwrite this mask with `other`.
    pub fn copy_from(&mut self, other: &NodeMask) {
        self.bits = other.bits;
    }

    pub fn equals(&self, other: &NodeMask) -> bool {
        self == other
    }

    /// Is every node in this mask also in `other`?
    pub fn is_subset_of(&self, other: &NodeMask) -> bool {
        self.bits
            .iter()
            .zip(other.bits.iter())
            .all(|(a, b)| a & !b == 0)
    }

    /// Is every node in this mask online? `online` is a snapshot of the online nodes.
    pub fn is_subset_of_online(&self, online: &NodeMask) -> bool {
        self.is_subset_of(online)
    }

    /// The first node of this mask that is not in `other`, if any.
    pub fn first_not_in(&self, other: &NodeMask) -> Option<NodeId> {
        let mut diff = *self;
        for (d, o) in diff.bits.iter_mut().zip(other.bits.iter()) {
            *d &= !o;
        }
        diff.first_set()
    }

    pub fn intersects(&self, other: &NodeMask) -> bool {
        self.bits
            .iter()
            .zip(other.bits.iter())
            .any(|(a, b)| a & b != 0)
    }

    /// Iterate the nodes in the mask in ascending order.
    pub fn iter(&self) -> NodeMaskIter<'_> {
        NodeMaskIter {
            mask: self,
            next: self.first_set(),
        }
    }

    /// Group the nodes into inclusive ranges of consecutive ids.
    fn ranges(&self) -> Vec<(NodeId, NodeId)> {
        let mut ranges: Vec<(NodeId, NodeId)> = vec![];
        for node in self.iter() {
            match ranges.last_mut() {
                Some((_, last)) if last.as_usize() + 1 == node.as_usize() => *last = node,
                _ => ranges.push((node, node)),
            }
        }
        ranges
    }
}

pub struct NodeMaskIter<'a> {
    mask: &'a NodeMask,
    next: Option<NodeId>,
}

impl Iterator for NodeMaskIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.mask.next_set(current);
        Some(current)
    }
}

impl<'a> IntoIterator for &'a NodeMask {
    type Item = NodeId;
    type IntoIter = NodeMaskIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<NodeId> for NodeMask {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        NodeMask::from_nodes(iter)
    }
}

/// Formats the mask as a node list, e.g. `0,2-3`. An empty mask prints as an empty string.
impl fmt::Display for NodeMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = self
            .ranges()
            .into_iter()
            .map(|(first, last)| {
                if first == last {
                    format!("{}", first)
                } else {
                    format!("{}-{}", first, last)
                }
            })
            .join(",");
        f.write_str(&list)
    }
}

impl fmt::Debug for NodeMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeMask[{}]", self)
    }
}

/// Parses a node list such as `0,2-3`.
impl FromStr for NodeMask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_id = |text: &str| -> Result<NodeId, String> {
            let id: usize = text
                .trim()
                .parse()
                .map_err(|_| format!("Invalid node id {:?}", text))?;
            if id >= MAX_NUMNODES {
                return Err(format!("Node id {} is out of range", id));
            }
            Ok(NodeId::new(id))
        };

        let mut mask = NodeMask::empty();
        for item in s.split(',').filter(|item| !item.trim().is_empty()) {
            match item.split_once('-') {
                Some((first, last)) => {
                    let (first, last) = (parse_id(first)?, parse_id(last)?);
                    if first > last {
                        return Err(format!("Invalid node range {:?}", item));
                    }
                    for id in first.as_usize()..=last.as_usize() {
                        mask.set(NodeId::new(id));
                    }
                }
                None => mask.set(parse_id(item)?),
            }
        }
        Ok(mask)
    }
}
