use crate::policy::ZoneType;
use crate::util::nodemask::{NodeId, NodeMask};

/// The NUMA topology of the machine, as discovered by the binding at boot.
pub trait Topology: Send + Sync {
    /// A snapshot of the online nodes.
    fn online_nodes(&self) -> NodeMask;

    /// Is the node online?
    fn is_node_online(&self, node: NodeId) -> bool {
        self.online_nodes().test(node)
    }

    /// The node of the CPU the caller runs on. Allocations that do not name a node go here.
    fn local_node(&self) -> NodeId;

    /// Does `node` have a populated zone of the given type?
    ///
    /// Arguments:
    /// * `node`: An online node.
    /// * `zone_type`: The zone level to query.
    fn zone_populated(&self, node: NodeId, zone_type: ZoneType) -> bool;
}
