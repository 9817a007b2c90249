//! Gather/scatter between the host mesh and the flat exchange buffers.
//!
//! Forces flow out once per coupling step as a single block write over all
//! registered vertices. Displacements flow in one region at a time, as the
//! host fires its grid-motion callback for each coupled region.

use crate::config::DisplacementPolicy;
use crate::coupling::service::{CouplingService, DataId};
use crate::coupling_error::CouplingError;
use crate::data::vector::{Vec2, max_by_magnitude};
use crate::data::vertex_map::VertexMap;
use crate::topology::marks::NodeMark;
use crate::topology::mesh::HostMesh;

/// Outcome of a force gather.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct GatherReport {
    /// Vertices written to the service.
    pub written: usize,
    /// Regions whose faces were traversed.
    pub regions_visited: usize,
    /// Signed face-force component with the largest magnitude.
    pub max_force: f64,
}

/// Outcome of a displacement scatter for one region.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ScatterReport {
    /// Vertices read from the service.
    pub read: usize,
    /// Vertices whose pending update was consumed.
    pub applied: usize,
    /// Signed displacement component with the largest magnitude.
    pub max_delta: f64,
}

/// Gather face forces into nodal forces and write them in one block.
///
/// Each face force is shared equally among the nodes of the face, so the sum
/// of the nodal forces equals the sum of the face forces. A node on the
/// boundary of two regions collects shares from the faces of both.
///
/// # Errors
/// - [`CouplingError::RegionCountChanged`] if a registered region lost its
///   face set; nothing is written in that case,
/// - [`CouplingError::UnknownNode`] if a face references a node that was not
///   registered,
/// - any error raised by the service.
pub fn gather_forces<M, S>(
    mesh: &M,
    map: &mut VertexMap,
    service: &mut S,
    data_id: DataId,
) -> Result<GatherReport, CouplingError>
where
    M: HostMesh + ?Sized,
    S: CouplingService + ?Sized,
{
    let mut forces = vec![Vec2::ZERO; map.total()];
    let mut report = GatherReport::default();

    for region in map.regions() {
        let Some(faces) = mesh.principal_faces(region.id) else {
            log::warn!("region {} has no face set, skipped in force gather", region.id);
            continue;
        };
        report.regions_visited += 1;
        for face in faces {
            let force = mesh.face_loads(face).force();
            report.max_force = max_by_magnitude(report.max_force, force.dominant_component());
            let nodes = mesh.face_nodes(face);
            if nodes.is_empty() {
                continue;
            }
            let share = force / nodes.len() as f64;
            for node in nodes {
                let slot = map
                    .owner_slot(node)
                    .ok_or(CouplingError::UnknownNode {
                        region: region.id,
                        node,
                    })?;
                forces[slot] += share;
            }
        }
    }

    let expected = map.regions().len();
    if report.regions_visited != expected {
        return Err(CouplingError::RegionCountChanged {
            expected,
            found: report.regions_visited,
        });
    }

    map.buffers_mut().forces_mut().copy_from_slice(&forces);
    let buffers = map.buffers();
    service.write_block_vector_data(data_id, buffers.vertex_ids(), buffers.forces_flat())?;
    report.written = buffers.len();
    log::debug!(
        "wrote {} nodal forces, max force component {:e}",
        report.written,
        report.max_force
    );
    Ok(report)
}

/// Read the displacements of the region at ordinal `region_index` and consume
/// the pending updates of its nodes.
///
/// Only nodes still marked [`NodeMark::NeedsUpdate`] are touched; their mark
/// is reset to [`NodeMark::Settled`]. Under
/// [`DisplacementPolicy::ApplyToGeometry`] each such node is also moved to its
/// initial coordinate plus the received displacement.
///
/// # Errors
/// - [`CouplingError::RegionCountChanged`] if `region_index` is out of range,
/// - any error raised by the service.
pub fn scatter_displacements<M, S>(
    mesh: &mut M,
    map: &mut VertexMap,
    service: &mut S,
    data_id: DataId,
    region_index: usize,
    policy: DisplacementPolicy,
) -> Result<ScatterReport, CouplingError>
where
    M: HostMesh + ?Sized,
    S: CouplingService + ?Sized,
{
    let span = map
        .atlas()
        .span(region_index)
        .ok_or(CouplingError::RegionCountChanged {
            expected: map.atlas().len(),
            found: region_index + 1,
        })?;
    if span.count == 0 {
        return Ok(ScatterReport::default());
    }

    {
        let (ids, values) = map.buffers_mut().displacement_window(span.range());
        service.read_block_vector_data(data_id, ids, values)?;
    }

    let mut report = ScatterReport {
        read: span.count,
        ..ScatterReport::default()
    };
    let buffers = map.buffers();
    for slot in span.range() {
        let Some(node) = map.node_at(slot) else {
            continue;
        };
        if !mesh.node_mark(node).needs_update() {
            continue;
        }
        let delta = buffers.displacements()[slot];
        if policy == DisplacementPolicy::ApplyToGeometry {
            mesh.set_node_coord(node, buffers.initial()[slot] + delta);
        }
        mesh.set_node_mark(node, NodeMark::Settled);
        report.max_delta = max_by_magnitude(report.max_delta, delta.dominant_component());
        report.applied += 1;
    }
    Ok(report)
}
