//! VertexMap: the result of registering the coupled mesh.
//!
//! Ties together the region atlas, the exchange buffers and the node tables
//! needed to move between host nodes and buffer slots in both directions.
//!
//! Every host node owns at most one slot. A node on the boundary between two
//! coupled regions belongs to the first of them in traversal order; faces of
//! the later region still resolve it through [`VertexMap::owner_slot`].

use hashbrown::HashMap;

use crate::data::atlas::RegionAtlas;
use crate::data::buffers::ExchangeBuffers;
use crate::data::DebugInvariants;
use crate::coupling_error::CouplingError;
use crate::topology::point::NodeId;
use crate::topology::region::RegionDescriptor;

/// Registered coupling topology and its buffers.
#[derive(Clone, Debug)]
pub struct VertexMap {
    regions: Vec<RegionDescriptor>,
    atlas: RegionAtlas,
    buffers: ExchangeBuffers,
    /// slot -> host node
    nodes: Vec<NodeId>,
    /// host node -> slot
    slots: HashMap<NodeId, usize>,
}

impl VertexMap {
    /// Assembles a map whose buffers are already populated.
    ///
    /// `nodes` lists the host node of every slot, region-then-node.
    pub(crate) fn new(
        regions: Vec<RegionDescriptor>,
        atlas: RegionAtlas,
        buffers: ExchangeBuffers,
        nodes: Vec<NodeId>,
    ) -> Result<Self, CouplingError> {
        if nodes.len() != atlas.total_len() {
            return Err(CouplingError::VertexCountMismatch {
                expected: atlas.total_len(),
                found: nodes.len(),
            });
        }
        let slots = nodes
            .iter()
            .enumerate()
            .map(|(slot, &node)| (node, slot))
            .collect();
        let map = Self {
            regions,
            atlas,
            buffers,
            nodes,
            slots,
        };
        map.validate_invariants()?;
        Ok(map)
    }

    /// Coupled regions in traversal order.
    #[inline]
    pub fn regions(&self) -> &[RegionDescriptor] {
        &self.regions
    }

    /// The thread/offset index.
    #[inline]
    pub fn atlas(&self) -> &RegionAtlas {
        &self.atlas
    }

    /// Exchange buffers.
    #[inline]
    pub fn buffers(&self) -> &ExchangeBuffers {
        &self.buffers
    }

    #[inline]
    pub(crate) fn buffers_mut(&mut self) -> &mut ExchangeBuffers {
        &mut self.buffers
    }

    /// Total number of registered vertices.
    #[inline]
    pub fn total(&self) -> usize {
        self.atlas.total_len()
    }

    /// Host node stored in `slot`.
    #[inline]
    pub fn node_at(&self, slot: usize) -> Option<NodeId> {
        self.nodes.get(slot).copied()
    }

    /// Buffer slot of `node` if it is owned by the region at ordinal `index`.
    pub fn slot_of(&self, index: usize, node: NodeId) -> Option<usize> {
        let span = self.atlas.span(index)?;
        self.owner_slot(node).filter(|slot| span.range().contains(slot))
    }

    /// Buffer slot of `node`, whichever region owns it.
    #[inline]
    pub fn owner_slot(&self, node: NodeId) -> Option<usize> {
        self.slots.get(&node).copied()
    }
}

impl DebugInvariants for VertexMap {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "VertexMap invalid");
    }

    fn validate_invariants(&self) -> Result<(), CouplingError> {
        self.atlas.validate_invariants()?;
        let total = self.atlas.total_len();
        if self.nodes.len() != total || self.buffers.len() != total {
            return Err(CouplingError::VertexCountMismatch {
                expected: total,
                found: self.nodes.len().min(self.buffers.len()),
            });
        }
        if self.regions.len() != self.atlas.len() {
            return Err(CouplingError::RegionCountChanged {
                expected: self.atlas.len(),
                found: self.regions.len(),
            });
        }
        // a node listed twice would collapse in the slot table
        if self.slots.len() != total {
            return Err(CouplingError::InvalidLayout {
                expected: total,
                found: self.slots.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::point::RegionId;

    fn descriptors(ids: &[u32]) -> Vec<RegionDescriptor> {
        ids.iter()
            .enumerate()
            .map(|(index, &id)| RegionDescriptor {
                id: RegionId::new(id),
                name: "gridmotions".into(),
                index,
            })
            .collect()
    }

    fn node(raw: u64) -> NodeId {
        NodeId::new(raw).unwrap()
    }

    #[test]
    fn shared_node_resolves_to_its_owner() {
        let atlas = RegionAtlas::from_counts([(RegionId::new(1), 2), (RegionId::new(2), 1)]).unwrap();
        let map = VertexMap::new(
            descriptors(&[1, 2]),
            atlas,
            ExchangeBuffers::with_len(3),
            vec![node(1), node(2), node(3)],
        )
        .unwrap();
        assert_eq!(map.slot_of(0, node(2)), Some(1));
        assert_eq!(map.slot_of(1, node(2)), None);
        assert_eq!(map.owner_slot(node(2)), Some(1));
        assert_eq!(map.slot_of(1, node(3)), Some(2));
    }

    #[test]
    fn node_in_two_slots_is_fatal() {
        let atlas = RegionAtlas::from_counts([(RegionId::new(1), 2), (RegionId::new(2), 1)]).unwrap();
        let err = VertexMap::new(
            descriptors(&[1, 2]),
            atlas,
            ExchangeBuffers::with_len(3),
            vec![node(1), node(2), node(2)],
        )
        .unwrap_err();
        assert_eq!(err, CouplingError::InvalidLayout { expected: 3, found: 2 });
        assert!(err.is_fatal());
    }
}
