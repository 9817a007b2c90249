mod util;

use fsi_adapter::algs::{check_read_positions, check_write_positions, gather_forces};
use fsi_adapter::coupling::MeshId;
use fsi_adapter::prelude::*;
use util::*;

#[test]
fn write_check_is_idempotent_on_unchanged_mesh() {
    let mut mesh = two_region_mesh();
    let mut s = serial_session(AdapterConfig::default(), |svc| svc);
    s.initialize(&mut mesh).unwrap();
    let map = s.vertex_map().unwrap();
    assert_eq!(check_write_positions(&mesh, map).unwrap(), None);
    assert_eq!(check_write_positions(&mesh, map).unwrap(), None);
}

#[test]
fn removed_face_is_reported_then_recovered() {
    let mut mesh = staircase_mesh(2);
    let mut s = serial_session(AdapterConfig::default(), |svc| {
        svc.then_advance(AdvanceScript::step(0.1))
            .then_advance(AdvanceScript::step(0.1))
    });
    s.initialize(&mut mesh).unwrap();
    assert_eq!(s.vertex_map().unwrap().total(), 5);

    let last = *mesh.faces_of(rid(2)).last().unwrap();
    assert!(mesh.remove_face(last));
    let err = s.write_and_advance(&mesh, 0.1).unwrap_err();
    assert_eq!(err, CouplingError::TopologyDrift { expected: 5, found: 4 });
    assert!(!err.is_fatal());
    // registration untouched until the caller rebuilds it
    assert_eq!(s.vertex_map().unwrap().total(), 5);

    s.reregister(&mut mesh).unwrap();
    let map = s.vertex_map().unwrap();
    assert_eq!(map.total(), 4);
    assert_eq!(map.atlas().offset_of(1), Some(2));
    assert!(s.write_and_advance(&mesh, 0.1).is_ok());
}

#[test]
fn write_check_can_be_disabled() {
    let mut mesh = staircase_mesh(1);
    let config = AdapterConfig {
        check_write_positions: false,
        ..AdapterConfig::default()
    };
    let mut s = serial_session(config, |svc| svc.then_advance(AdvanceScript::step(0.1)));
    s.initialize(&mut mesh).unwrap();
    let extra = mesh.add_node(Vec2::new(5.0, 5.0));
    let first = s.vertex_map().unwrap().node_at(0).unwrap();
    mesh.add_face(rid(1), &[first, extra]).unwrap();
    // the new node was never registered, so the gather itself rejects it
    assert!(matches!(
        s.write_and_advance(&mesh, 0.1),
        Err(CouplingError::UnknownNode { .. })
    ));
}

#[test]
fn read_check_reports_consumed_nodes() {
    let mut mesh = two_region_mesh();
    let config = AdapterConfig {
        check_read_positions: true,
        ..AdapterConfig::default()
    };
    let mut s = serial_session(config, |svc| svc.then_advance(AdvanceScript::step(0.1)));
    s.initialize(&mut mesh).unwrap();
    baseline_round(&mut s, &mut mesh);

    assert!(matches!(
        s.on_grid_motion(&mut mesh, rid(1)).unwrap(),
        MotionOutcome::Applied(_)
    ));
    // nodes of region 1 were consumed and the host has not re-armed them
    let err = s.on_grid_motion(&mut mesh, rid(1)).unwrap_err();
    assert_eq!(
        err,
        CouplingError::ReadDrift {
            region: 0,
            expected: 3,
            found: 0
        }
    );
    assert!(!err.is_fatal());
    assert_eq!(mesh.count_marked(NodeMark::Counted), 0);

    mesh.mark_all(NodeMark::NeedsUpdate);
    assert!(s.on_grid_motion(&mut mesh, rid(1)).is_ok());
}

#[test]
fn shared_corner_is_not_drift() {
    let (mut mesh, corner) = corner_mesh();
    let config = AdapterConfig {
        check_read_positions: true,
        ..AdapterConfig::default()
    };
    let mut s = serial_session(config, |svc| svc.then_advance(AdvanceScript::step(0.1)));
    s.initialize(&mut mesh).unwrap();
    let map = s.vertex_map().unwrap();
    assert_eq!(map.atlas().count_of(0), Some(2));
    assert_eq!(map.atlas().count_of(1), Some(1));
    assert_eq!(map.slot_of(0, corner), Some(1));
    assert_eq!(check_write_positions(&mesh, map).unwrap(), None);
    assert_eq!(check_read_positions(&mut mesh, map, 1).unwrap(), None);

    baseline_round(&mut s, &mut mesh);
    assert!(s.on_grid_motion(&mut mesh, rid(1)).is_ok());
    // the corner was consumed by region 1, region 2 still sees its own node
    assert!(matches!(
        s.on_grid_motion(&mut mesh, rid(2)).unwrap(),
        MotionOutcome::Applied(r) if r.applied == 1
    ));
}

#[test]
fn shared_corner_collects_force_from_both_regions() {
    let (mut mesh, _) = corner_mesh();
    for region in [rid(1), rid(2)] {
        for face in mesh.faces_of(region).to_vec() {
            mesh.set_face_area(face, Vec2::new(0.0, 1.0));
            mesh.set_face_loads(face, 2.0, Vec2::ZERO);
        }
    }
    let mut s = serial_session(AdapterConfig::default(), |svc| svc);
    s.initialize(&mut mesh).unwrap();
    let mut map = s.vertex_map().unwrap().clone();
    let mut svc = s.service().unwrap().clone();
    let data = svc.data_id("Forces", MeshId(0)).unwrap();
    let report = gather_forces(&mesh, &mut map, &mut svc, data).unwrap();
    assert_eq!(report.written, 3);
    assert_eq!(
        svc.last_write("Forces").unwrap(),
        &[0.0, 1.0, 0.0, 2.0, 0.0, 1.0]
    );
}

#[test]
fn subcycle_does_not_block_on_drift() {
    let mut mesh = staircase_mesh(2);
    let mut s = serial_session(AdapterConfig::default(), |svc| {
        svc.with_write_required(&[false, true])
            .then_advance(AdvanceScript::step(0.1))
            .then_advance(AdvanceScript::step(0.1))
    });
    s.initialize(&mut mesh).unwrap();
    let last = *mesh.faces_of(rid(2)).last().unwrap();
    assert!(mesh.remove_face(last));

    let sub = s.write_and_advance(&mesh, 0.05).unwrap();
    assert!(sub.subcycling);
    assert_eq!(
        s.write_and_advance(&mesh, 0.05).unwrap_err(),
        CouplingError::TopologyDrift { expected: 5, found: 4 }
    );
}
