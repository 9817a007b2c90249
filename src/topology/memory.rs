//! In-memory reference implementation of [`HostMesh`].
//!
//! `InMemoryMesh` stands in for the fluid solver in tests, benches and offline
//! tooling. Regions keep their faces in insertion order, which plays the role
//! of the host's traversal order. Node marks behave like the solver's: once a
//! displacement has been applied the mark stays `Settled` until the host re-arms
//! it with [`InMemoryMesh::mark_all`].

use std::num::NonZeroU64;

use hashbrown::HashMap;

use crate::coupling_error::CouplingError;
use crate::data::vector::{ND, Vec2};
use crate::topology::marks::NodeMark;
use crate::topology::mesh::{FaceLoads, HostMesh, RegionInfo};
use crate::topology::point::{FaceId, NodeId, RegionId};

#[derive(Clone, Debug)]
struct NodeRecord {
    coord: Vec2,
    mark: NodeMark,
}

#[derive(Clone, Debug)]
struct FaceRecord {
    nodes: Vec<NodeId>,
    loads: FaceLoads,
}

#[derive(Clone, Debug)]
struct RegionRecord {
    info: RegionInfo,
    faces: Option<Vec<FaceId>>,
}

/// A small host mesh kept entirely in memory.
#[derive(Clone, Debug)]
pub struct InMemoryMesh {
    dimension: usize,
    regions: Vec<RegionRecord>,
    faces: HashMap<FaceId, FaceRecord>,
    nodes: HashMap<NodeId, NodeRecord>,
    next_node: NonZeroU64,
    next_face: NonZeroU64,
}

impl Default for InMemoryMesh {
    fn default() -> Self {
        Self::with_dimension(ND)
    }
}

impl InMemoryMesh {
    /// Empty 2D mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty mesh reporting `dimension` to the adapter.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            regions: Vec::new(),
            faces: HashMap::new(),
            nodes: HashMap::new(),
            next_node: NonZeroU64::MIN,
            next_face: NonZeroU64::MIN,
        }
    }

    /// Adds a free node at `coord`.
    pub fn add_node(&mut self, coord: Vec2) -> NodeId {
        let id = NodeId::from_nonzero(self.next_node);
        self.next_node = self.next_node.saturating_add(1);
        self.nodes.insert(
            id,
            NodeRecord {
                coord,
                mark: NodeMark::Settled,
            },
        );
        id
    }

    /// Appends a dynamic region with an empty face set.
    pub fn add_region(&mut self, id: RegionId, name: &str) -> RegionId {
        self.regions.push(RegionRecord {
            info: RegionInfo::new(id, name),
            faces: Some(Vec::new()),
        });
        id
    }

    /// Appends a dynamic region that has no backing face set at all.
    pub fn add_region_without_faces(&mut self, id: RegionId, name: &str) -> RegionId {
        self.regions.push(RegionRecord {
            info: RegionInfo::new(id, name),
            faces: None,
        });
        id
    }

    /// Removes a region from the host list.
    pub fn remove_region(&mut self, id: RegionId) {
        self.regions.retain(|r| r.info.id != id);
    }

    /// Drops the face set backing `id`, keeping the region itself listed.
    pub fn clear_face_set(&mut self, id: RegionId) {
        if let Some(record) = self.region_mut(id) {
            record.faces = None;
        }
    }

    /// Adds a principal face spanning `nodes` to `region`.
    ///
    /// Two-node faces get the area vector `(dy, -dx)` of the edge, i.e. the
    /// edge normal scaled by its length.
    pub fn add_face(&mut self, region: RegionId, nodes: &[NodeId]) -> Result<FaceId, CouplingError> {
        let area = match nodes {
            [a, b] => {
                let d = self.node_coord(*b) - self.node_coord(*a);
                Vec2::new(d.y(), -d.x())
            }
            _ => Vec2::ZERO,
        };
        let id = FaceId::from_nonzero(self.next_face);
        let faces = self
            .region_mut(region)
            .and_then(|r| r.faces.as_mut())
            .ok_or(CouplingError::MissingFaceSet(region))?;
        faces.push(id);
        self.next_face = self.next_face.saturating_add(1);
        self.faces.insert(
            id,
            FaceRecord {
                nodes: nodes.to_vec(),
                loads: FaceLoads {
                    area,
                    ..FaceLoads::default()
                },
            },
        );
        Ok(id)
    }

    /// Builds a polyline of faces through `points` in `region` and returns its nodes.
    pub fn add_polyline(
        &mut self,
        region: RegionId,
        points: &[Vec2],
    ) -> Result<Vec<NodeId>, CouplingError> {
        let nodes: Vec<NodeId> = points.iter().map(|&p| self.add_node(p)).collect();
        for pair in nodes.windows(2) {
            self.add_face(region, pair)?;
        }
        Ok(nodes)
    }

    /// Removes `face` from every region and from the face table.
    pub fn remove_face(&mut self, face: FaceId) -> bool {
        for record in &mut self.regions {
            if let Some(faces) = record.faces.as_mut() {
                faces.retain(|&f| f != face);
            }
        }
        self.faces.remove(&face).is_some()
    }

    /// Sets the pressure and wall shear of `face`, keeping its area vector.
    pub fn set_face_loads(&mut self, face: FaceId, pressure: f64, wall_shear: Vec2) {
        if let Some(record) = self.faces.get_mut(&face) {
            record.loads.pressure = pressure;
            record.loads.wall_shear = wall_shear;
        }
    }

    /// Overwrites the area vector of `face`.
    pub fn set_face_area(&mut self, face: FaceId, area: Vec2) {
        if let Some(record) = self.faces.get_mut(&face) {
            record.loads.area = area;
        }
    }

    /// Sets the mark of every node, as the solver does at the start of a mesh update.
    pub fn mark_all(&mut self, mark: NodeMark) {
        for record in self.nodes.values_mut() {
            record.mark = mark;
        }
    }

    /// Number of nodes currently carrying `mark`.
    pub fn count_marked(&self, mark: NodeMark) -> usize {
        self.nodes.values().filter(|n| n.mark == mark).count()
    }

    /// Faces currently listed for `region`.
    pub fn faces_of(&self, region: RegionId) -> &[FaceId] {
        self.regions
            .iter()
            .find(|r| r.info.id == region)
            .and_then(|r| r.faces.as_deref())
            .unwrap_or(&[])
    }

    fn region_mut(&mut self, id: RegionId) -> Option<&mut RegionRecord> {
        self.regions.iter_mut().find(|r| r.info.id == id)
    }
}

impl HostMesh for InMemoryMesh {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn regions(&self) -> Vec<RegionInfo> {
        self.regions.iter().map(|r| r.info.clone()).collect()
    }

    fn principal_faces(&self, region: RegionId) -> Option<Vec<FaceId>> {
        self.regions
            .iter()
            .find(|r| r.info.id == region)
            .and_then(|r| r.faces.clone())
    }

    fn face_nodes(&self, face: FaceId) -> Vec<NodeId> {
        self.faces
            .get(&face)
            .map(|f| f.nodes.clone())
            .unwrap_or_default()
    }

    fn face_loads(&self, face: FaceId) -> FaceLoads {
        self.faces.get(&face).map(|f| f.loads).unwrap_or_default()
    }

    fn node_coord(&self, node: NodeId) -> Vec2 {
        self.nodes.get(&node).map_or(Vec2::ZERO, |n| n.coord)
    }

    fn set_node_coord(&mut self, node: NodeId, coord: Vec2) {
        if let Some(record) = self.nodes.get_mut(&node) {
            record.coord = coord;
        }
    }

    fn node_mark(&self, node: NodeId) -> NodeMark {
        self.nodes.get(&node).map_or(NodeMark::Settled, |n| n.mark)
    }

    fn set_node_mark(&mut self, node: NodeId, mark: NodeMark) {
        if let Some(record) = self.nodes.get_mut(&node) {
            record.mark = mark;
        }
    }

    fn region_info(&self, region: RegionId) -> Option<RegionInfo> {
        self.regions
            .iter()
            .find(|r| r.info.id == region)
            .map(|r| r.info.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polyline_builds_edges_with_normals() {
        let mut mesh = InMemoryMesh::new();
        let r = mesh.add_region(RegionId::new(1), "gridmotions");
        let nodes = mesh
            .add_polyline(r, &[Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0), Vec2::new(2.0, 1.0)])
            .unwrap();
        assert_eq!(nodes.len(), 3);
        let faces = mesh.principal_faces(r).unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(mesh.face_nodes(faces[0]), vec![nodes[0], nodes[1]]);
        assert_eq!(mesh.face_loads(faces[0]).area, Vec2::new(0.0, -2.0));
        assert_eq!(mesh.face_loads(faces[1]).area, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn region_without_faces_rejects_new_faces() {
        let mut mesh = InMemoryMesh::new();
        let r = mesh.add_region_without_faces(RegionId::new(4), "gridmotions");
        let n = mesh.add_node(Vec2::ZERO);
        assert_eq!(mesh.principal_faces(r), None);
        assert_eq!(mesh.add_face(r, &[n, n]), Err(CouplingError::MissingFaceSet(r)));
    }

    #[test]
    fn remove_face_drops_it_from_traversal() {
        let mut mesh = InMemoryMesh::new();
        let r = mesh.add_region(RegionId::new(1), "gridmotions");
        mesh.add_polyline(r, &[Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)])
            .unwrap();
        let first = mesh.faces_of(r)[0];
        assert!(mesh.remove_face(first));
        assert_eq!(mesh.faces_of(r).len(), 1);
        assert!(!mesh.remove_face(first));
    }

    #[test]
    fn marks_start_settled_and_can_be_rearmed() {
        let mut mesh = InMemoryMesh::new();
        let a = mesh.add_node(Vec2::ZERO);
        mesh.add_node(Vec2::new(1.0, 0.0));
        assert_eq!(mesh.node_mark(a), NodeMark::Settled);
        mesh.mark_all(NodeMark::NeedsUpdate);
        assert_eq!(mesh.count_marked(NodeMark::NeedsUpdate), 2);
    }
}
