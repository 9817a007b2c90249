mod util;

use fsi_adapter::algs::{count_region_nodes, gather_forces, register_mesh};
use fsi_adapter::coupling::{DataId, MeshId};
use fsi_adapter::prelude::*;
use fsi_adapter::topology::classify_regions;
use proptest::prelude::*;
use rand::Rng;
use util::*;

fn register(mesh: &mut InMemoryMesh) -> (VertexMap, ScriptedService) {
    let info = ParticipantInfo {
        name: "Fluent".into(),
        config_path: "precice-config.xml".into(),
        rank: 0,
        size: 1,
    };
    let mut svc = scripted(&info);
    let regions = classify_regions(&mesh.regions(), "gridmotions").unwrap();
    let map = register_mesh(mesh, &regions, &mut svc, MeshId(0)).unwrap();
    (map, svc)
}

#[test]
fn two_regions_three_and_two_nodes() {
    let mut mesh = two_region_mesh();
    let (mut map, mut svc) = register(&mut mesh);

    let atlas = map.atlas();
    assert_eq!(atlas.len(), 2);
    assert_eq!((atlas.count_of(0), atlas.count_of(1)), (Some(3), Some(2)));
    assert_eq!((atlas.offset_of(0), atlas.offset_of(1)), (Some(0), Some(3)));
    assert_eq!(map.total(), 5);

    gather_forces(&mesh, &mut map, &mut svc, DataId(0)).unwrap();
    let written = svc.last_write("Forces").unwrap();
    assert_eq!(written.len(), 10);
    assert_eq!(map.buffers().forces_flat().len(), 10);
}

#[test]
fn gather_conserves_total_face_force() {
    let mut rng = rng();
    let mut mesh = polyline_mesh(&mut rng, &[5, 0, 3, 8]);
    let (mut map, mut svc) = register(&mut mesh);

    let mut expected = Vec2::ZERO;
    for region in map.regions().to_vec() {
        for &face in mesh.faces_of(region.id).to_vec().iter() {
            let shear = Vec2::new(rng.gen_range(-0.1..0.1), rng.gen_range(-0.1..0.1));
            mesh.set_face_loads(face, rng.gen_range(0.5..2.0), shear);
            expected += mesh.face_loads(face).force();
        }
    }
    gather_forces(&mesh, &mut map, &mut svc, DataId(0)).unwrap();

    let total = map.buffers().forces().iter().fold(Vec2::ZERO, |acc, &f| acc + f);
    assert!((total - expected).norm() < 1e-12, "total={total:?} expected={expected:?}");
}

#[test]
fn uncoupled_regions_are_ignored() {
    let mut mesh = two_region_mesh();
    let (map, _) = register(&mut mesh);
    assert!(map.regions().iter().all(|r| r.name.starts_with("gridmotions")));
    assert_eq!(map.atlas().index_of(rid(9)), None);
}

proptest! {
    #[test]
    fn counts_sum_to_total_and_offsets_are_prefix_sums(lengths in prop::collection::vec(0usize..7, 1..8)) {
        let mut rng = rng();
        let mut mesh = polyline_mesh(&mut rng, &lengths);
        let regions = classify_regions(&mesh.regions(), "gridmotions").unwrap();
        let counts = count_region_nodes(&mesh, &regions).unwrap();
        let (map, svc) = register(&mut mesh);

        let atlas = map.atlas();
        prop_assert_eq!(counts.iter().sum::<usize>(), map.total());
        prop_assert_eq!(svc.registered_vertices().len(), map.total());
        let mut prefix = 0;
        for (i, &len) in lengths.iter().enumerate() {
            let expected = if len >= 2 { len } else { 0 };
            prop_assert_eq!(atlas.count_of(i), Some(expected));
            prop_assert_eq!(atlas.offset_of(i), Some(prefix));
            prefix += expected;
        }
        map.validate_invariants().unwrap();
    }

    #[test]
    fn offsets_strictly_increase_for_non_empty_regions(counts in prop::collection::vec(1usize..20, 1..12)) {
        let atlas = RegionAtlas::from_counts(
            counts.iter().enumerate().map(|(i, &c)| (rid(i as u32), c)),
        )
        .unwrap();
        let offsets: Vec<_> = (0..counts.len()).filter_map(|i| atlas.offset_of(i)).collect();
        prop_assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(atlas.total_len(), counts.iter().sum::<usize>());
    }
}
