//! Mesh vertex registration.
//!
//! Registration walks every coupled region twice. The first pass only counts
//! nodes to size the region atlas; the second captures initial coordinates in
//! region-then-node order, arms each node for update and hands the coordinates
//! to the coupling service, whose vertex ids become the index buffer of every
//! later block transfer.
//!
//! A node shared by several faces occupies a single slot, at the position of
//! its first occurrence in region-then-face traversal order. This holds across
//! regions too: a node on the boundary of two coupled regions is owned by the
//! first one, since the host keeps a single update mark per node.

use hashbrown::HashSet;
use itertools::Itertools;

use crate::coupling::service::{CouplingService, MeshId};
use crate::coupling_error::CouplingError;
use crate::data::atlas::RegionAtlas;
use crate::data::buffers::ExchangeBuffers;
use crate::data::vertex_map::VertexMap;
use crate::topology::marks::NodeMark;
use crate::topology::mesh::HostMesh;
use crate::topology::point::{NodeId, RegionId};
use crate::topology::region::RegionDescriptor;

/// Unique nodes of `region`, in first-occurrence order over its principal faces.
///
/// # Errors
/// Returns [`CouplingError::MissingFaceSet`] if the region has no face set.
pub fn region_nodes<M: HostMesh + ?Sized>(
    mesh: &M,
    region: RegionId,
) -> Result<Vec<NodeId>, CouplingError> {
    let faces = mesh
        .principal_faces(region)
        .ok_or(CouplingError::MissingFaceSet(region))?;
    Ok(faces
        .into_iter()
        .flat_map(|face| mesh.face_nodes(face))
        .unique()
        .collect())
}

/// Nodes owned by each region, in order.
///
/// Like [`region_nodes`], except that a node already owned by an earlier
/// region is left out.
///
/// # Errors
/// Returns [`CouplingError::MissingFaceSet`] if a region has no face set.
pub fn owned_region_nodes<M: HostMesh + ?Sized>(
    mesh: &M,
    regions: &[RegionDescriptor],
) -> Result<Vec<Vec<NodeId>>, CouplingError> {
    let mut claimed = HashSet::new();
    regions
        .iter()
        .map(|r| {
            let nodes = region_nodes(mesh, r.id)?;
            Ok(nodes.into_iter().filter(|n| claimed.insert(*n)).collect())
        })
        .collect()
}

/// Owned node count of every region, in order.
pub fn count_region_nodes<M: HostMesh + ?Sized>(
    mesh: &M,
    regions: &[RegionDescriptor],
) -> Result<Vec<usize>, CouplingError> {
    Ok(owned_region_nodes(mesh, regions)?
        .iter()
        .map(Vec::len)
        .collect())
}

/// Register the coupled regions of `mesh` with the coupling service.
///
/// # Errors
/// - [`CouplingError::EmptyRegionList`] if `regions` is empty,
/// - [`CouplingError::MissingFaceSet`] if a region has no face set,
/// - [`CouplingError::VertexCountMismatch`] if the service returns the wrong
///   number of vertex ids,
/// - any error raised by the service itself.
pub fn register_mesh<M, S>(
    mesh: &mut M,
    regions: &[RegionDescriptor],
    service: &mut S,
    mesh_id: MeshId,
) -> Result<VertexMap, CouplingError>
where
    M: HostMesh + ?Sized,
    S: CouplingService + ?Sized,
{
    if regions.is_empty() {
        return Err(CouplingError::EmptyRegionList);
    }

    // pass 1: sizes
    let counts = count_region_nodes(mesh, regions)?;
    let atlas = RegionAtlas::from_counts(regions.iter().map(|r| r.id).zip(counts))?;
    let total = atlas.total_len();
    log::info!("Setting {total} initial positions over {} regions", regions.len());

    // pass 2: coordinates and marks
    let mut buffers = ExchangeBuffers::with_len(total);
    let mut nodes = Vec::with_capacity(total);
    for (region_nodes, span) in owned_region_nodes(mesh, regions)?.into_iter().zip(atlas.iter()) {
        if region_nodes.len() != span.count {
            // face set changed between the two passes
            return Err(CouplingError::TopologyDrift {
                expected: span.count,
                found: region_nodes.len(),
            });
        }
        let initial = &mut buffers.initial_mut()[span.range()];
        for (slot, &node) in initial.iter_mut().zip(&region_nodes) {
            *slot = mesh.node_coord(node);
            mesh.set_node_mark(node, NodeMark::NeedsUpdate);
        }
        nodes.extend(region_nodes);
    }

    let ids = service.set_mesh_vertices(mesh_id, buffers.initial_flat())?;
    if ids.len() != total {
        return Err(CouplingError::VertexCountMismatch {
            expected: total,
            found: ids.len(),
        });
    }
    buffers.set_vertex_ids(ids);
    log::info!("Set {total} mesh positions");

    VertexMap::new(regions.to_vec(), atlas, buffers, nodes)
}
