//! The host solver contract.
//!
//! The adapter never owns mesh geometry. Everything it needs from the fluid
//! solver (region list, face/node traversal, coordinates, update marks and
//! per-face load quantities) goes through [`HostMesh`].

use crate::data::vector::Vec2;
use crate::topology::marks::NodeMark;
use crate::topology::point::{FaceId, NodeId, RegionId};

/// One entry of the host's dynamic-region list, in host traversal order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionInfo {
    /// Host id of the region.
    pub id: RegionId,
    /// Name of the motion profile attached to the region; used for role tagging.
    pub name: String,
}

impl RegionInfo {
    pub fn new(id: RegionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Load quantities the host solver supplies for a single boundary face.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FaceLoads {
    /// Face area vector (outward normal scaled by face area).
    pub area: Vec2,
    /// Static pressure on the face.
    pub pressure: f64,
    /// Wall shear stress vector as stored by the solver.
    pub wall_shear: Vec2,
}

impl FaceLoads {
    /// Total face force: area-weighted pressure plus the viscous term.
    ///
    /// The solver stores wall shear with the opposite sign convention, hence the
    /// negation.
    #[inline]
    pub fn force(&self) -> Vec2 {
        self.area * self.pressure - self.wall_shear
    }
}

/// Read/write access to the host solver's partitioned mesh.
///
/// Traversal methods return owned `Vec`s in host order; the adapter relies on
/// that order being stable between calls for an unchanged topology.
pub trait HostMesh {
    /// Spatial dimension of the host build.
    fn dimension(&self) -> usize;

    /// All dynamic regions known to the host, in traversal order.
    fn regions(&self) -> Vec<RegionInfo>;

    /// Principal faces of `region`, or `None` if the region has no backing face set.
    fn principal_faces(&self, region: RegionId) -> Option<Vec<FaceId>>;

    /// Nodes of `face`, in host order.
    fn face_nodes(&self, face: FaceId) -> Vec<NodeId>;

    /// Load quantities on `face`.
    fn face_loads(&self, face: FaceId) -> FaceLoads;

    /// Current coordinate of `node`.
    fn node_coord(&self, node: NodeId) -> Vec2;

    /// Overwrite the coordinate of `node`.
    fn set_node_coord(&mut self, node: NodeId, coord: Vec2);

    /// Current update mark of `node`.
    fn node_mark(&self, node: NodeId) -> NodeMark;

    /// Overwrite the update mark of `node`.
    fn set_node_mark(&mut self, node: NodeId, mark: NodeMark);

    /// Looks up a region by host id in the live region list.
    fn region_info(&self, region: RegionId) -> Option<RegionInfo> {
        self.regions().into_iter().find(|r| r.id == region)
    }
}
