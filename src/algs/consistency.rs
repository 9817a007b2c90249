//! Topology drift detection.
//!
//! Both checks recount wet nodes on the live host mesh and compare the result
//! with the counts captured at registration. They never modify the vertex map:
//! a mismatch is reported to the caller, which decides between re-registering
//! and aborting.

use crate::algs::registry::{count_region_nodes, owned_region_nodes};
use crate::coupling_error::CouplingError;
use crate::data::vertex_map::VertexMap;
use crate::topology::marks::NodeMark;
use crate::topology::mesh::HostMesh;

/// Recount the nodes of every registered region.
///
/// Returns `Some(total)` with the live node total if it differs from the
/// registered one, `None` if registration is still current.
///
/// # Errors
/// Returns [`CouplingError::MissingFaceSet`] if a registered region lost its
/// face set.
pub fn check_write_positions<M: HostMesh + ?Sized>(
    mesh: &M,
    map: &VertexMap,
) -> Result<Option<usize>, CouplingError> {
    let live: usize = count_region_nodes(mesh, map.regions())?.into_iter().sum();
    log::debug!("write positions: {live} wet nodes, {} registered", map.total());
    Ok((live != map.total()).then_some(live))
}

/// Count the nodes owned by region `region_index` still waiting for a
/// displacement.
///
/// Pending nodes are claimed with [`NodeMark::Counted`] so that a node shared
/// by several faces is counted once, then re-armed. Marks are identical before
/// and after the call.
///
/// Returns `Some(count)` if the count differs from the registered one.
///
/// # Errors
/// - [`CouplingError::RegionCountChanged`] if `region_index` is out of range,
/// - [`CouplingError::MissingFaceSet`] if the region or an earlier one lost
///   its face set.
pub fn check_read_positions<M: HostMesh + ?Sized>(
    mesh: &mut M,
    map: &VertexMap,
    region_index: usize,
) -> Result<Option<usize>, CouplingError> {
    let (preceding, expected) = map
        .regions()
        .get(..=region_index)
        .zip(map.atlas().count_of(region_index))
        .ok_or(CouplingError::RegionCountChanged {
            expected: map.atlas().len(),
            found: region_index + 1,
        })?;
    // nodes on a boundary with an earlier region are owned and consumed there
    let nodes = owned_region_nodes(&*mesh, preceding)?.pop().unwrap_or_default();

    let mut pending = 0;
    for &node in &nodes {
        if mesh.node_mark(node).needs_update() {
            mesh.set_node_mark(node, NodeMark::Counted);
            pending += 1;
        }
    }
    for &node in &nodes {
        if mesh.node_mark(node) == NodeMark::Counted {
            mesh.set_node_mark(node, NodeMark::NeedsUpdate);
        }
    }

    if pending != expected {
        log::warn!(
            "wet node count has changed for dynamic region {region_index}: registered {expected}, now {pending}"
        );
        return Ok(Some(pending));
    }
    Ok(None)
}
