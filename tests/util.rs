#![allow(dead_code)]
use fsi_adapter::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub const FIELDS: [&str; 2] = ["Forces", "Displacements"];

/// Fixed-seed RNG so failures reproduce.
pub fn rng() -> SmallRng {
    SmallRng::seed_from_u64(0x5EED_F51)
}

pub fn rid(u: u32) -> RegionId {
    RegionId::new(u)
}

/// Scripted service named after the participant the session announces.
pub fn scripted(info: &ParticipantInfo) -> ScriptedService {
    ScriptedService::new(info.clone(), "moving_base", &FIELDS)
}

/// Two coupled regions with 3 and 2 nodes, plus one uncoupled region in between.
pub fn two_region_mesh() -> InMemoryMesh {
    let mut mesh = InMemoryMesh::new();
    let a = mesh.add_region(rid(1), "gridmotions");
    mesh.add_region(rid(9), "inlet_velocity");
    let b = mesh.add_region(rid(2), "gridmotions::flap");
    mesh.add_polyline(a, &[Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)])
        .unwrap();
    mesh.add_polyline(b, &[Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0)])
        .unwrap();
    mesh
}

/// Two coupled wall segments meeting at a corner node, which is returned.
///
/// Region 1 runs from (0, 0) to the corner at (1, 0); region 2 has a single
/// face from the corner up to (1, 1).
pub fn corner_mesh() -> (InMemoryMesh, NodeId) {
    let mut mesh = InMemoryMesh::new();
    let a = mesh.add_region(rid(1), "gridmotions");
    let b = mesh.add_region(rid(2), "gridmotions");
    let corner = mesh
        .add_polyline(a, &[Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)])
        .unwrap()[1];
    let top = mesh.add_node(Vec2::new(1.0, 1.0));
    mesh.add_face(b, &[corner, top]).unwrap();
    (mesh, corner)
}

/// `n` coupled regions, region `i` being a polyline of `i + 2` nodes.
pub fn staircase_mesh(n: u32) -> InMemoryMesh {
    let mut mesh = InMemoryMesh::new();
    for i in 0..n {
        let r = mesh.add_region(rid(i + 1), "gridmotions");
        let y = f64::from(i);
        let points: Vec<_> = (0..=i + 1).map(|x| Vec2::new(f64::from(x), y)).collect();
        mesh.add_polyline(r, &points).unwrap();
    }
    mesh
}

/// One coupled region per entry of `lengths`, each a polyline of that many
/// random points. Entries below 2 produce regions without faces.
pub fn polyline_mesh<R: Rng>(rng: &mut R, lengths: &[usize]) -> InMemoryMesh {
    let mut mesh = InMemoryMesh::new();
    for (i, &len) in lengths.iter().enumerate() {
        let r = mesh.add_region(rid(i as u32 + 1), "gridmotions");
        let points: Vec<_> = (0..len)
            .map(|_| Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
            .collect();
        mesh.add_polyline(r, &points).unwrap();
    }
    mesh
}

/// Serial session whose service is shaped by `script`.
pub fn serial_session(
    config: AdapterConfig,
    script: impl FnOnce(ScriptedService) -> ScriptedService,
) -> CouplingSession<ScriptedService, NoComm> {
    CouplingSession::create(config, NoComm, |info| Ok(script(scripted(info)))).unwrap()
}

/// Drive the baseline motion cycle over every coupled region.
pub fn baseline_round<C: Communicator>(
    session: &mut CouplingSession<ScriptedService, C>,
    mesh: &mut InMemoryMesh,
) {
    let regions: Vec<_> = session.regions().iter().map(|r| r.id).collect();
    for region in regions {
        assert_eq!(
            session.on_grid_motion(mesh, region).unwrap(),
            MotionOutcome::BaselineSkipped
        );
    }
}
