//! End-to-end junction repair scenarios on synthetic saves.

mod common;

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use serde_json::json;

use sav_format::EntityId;
use sav_repair::{
    AnalyzerConfig, ChangeEntry, DeleteReason, EntityKind, LaneAxis, RepairEngine, RepairError,
    RepairOptions, RepairWarning, analyze, apply,
};

use common::{
    SaveBuilder, assert_no_orphans, assert_referential_integrity, endpoints, ids_of_kind,
    lane_chain, parse,
};

/// Pole each spline end points at after repair.
fn poles_by_end(output: &[u8]) -> BTreeMap<EntityId, (EntityId, EntityId)> {
    endpoints(&parse(output))
}

#[test]
fn test_simple_pair() {
    let input = SaveBuilder::new()
        .station(2, [-500.0, 0.0, 0.0])
        .junction(1, [0.0, 0.0, 0.0])
        .station(3, [500.0, 0.0, 0.0])
        .spline(10, 2, 1, [-450.0, 0.0, 0.0], [-25.0, 0.0, 0.0])
        .spline(11, 1, 3, [25.0, 0.0, 0.0], [450.0, 0.0, 0.0])
        .build();

    let (output, report) = apply(&input).unwrap();
    let counts = report.counts();
    assert_eq!(counts.junctions_repaired, 1);
    assert_eq!(counts.poles_created, 2);
    assert_eq!(counts.references_rewritten, 2);
    assert_eq!(counts.entities_deleted, 0);
    assert_eq!(report.junctions()[0].lanes, 2);
    assert_eq!(report.junctions()[0].axis, LaneAxis::X);

    let save = parse(&output);
    let ends = endpoints(&save);
    let (start_a, pole_a) = ends[&EntityId(10)];
    let (pole_b, end_b) = ends[&EntityId(11)];
    assert_eq!(start_a, EntityId(2));
    assert_eq!(end_b, EntityId(3));
    assert_ne!(pole_a, pole_b);
    assert_eq!(
        ids_of_kind(&save, EntityKind::InvisiblePole),
        BTreeSet::from([pole_a, pole_b])
    );
    assert!(pole_a.value() > 11 && pole_b.value() > 11);
    assert_referential_integrity(&save);
    assert_no_orphans(&save);
}

#[test]
fn test_new_pole_records_use_template() {
    let input = SaveBuilder::new()
        .station(2, [-500.0, 0.0, 0.0])
        .junction(1, [0.0, 0.0, 0.0])
        .spline(10, 2, 1, [-450.0, 0.0, 0.0], [-25.0, 4.0, 8.0])
        .build();
    let (output, _) = apply(&input).unwrap();
    let save = parse(&output);
    let record = save.records().last().unwrap();
    assert_eq!(record.key, "(ID=11)");
    let body: serde_json::Value = serde_json::from_str(
        save.record_text(record)
            .split_once(':')
            .map(|(_, body)| body)
            .unwrap(),
    )
    .unwrap();
    assert_eq!(
        body["spawnData"]["transform"]["translation"],
        json!({"x": -25.0, "y": 4.0, "z": 8.0})
    );
    assert_eq!(
        body["fragmentValues"],
        json!(["/Script/Chimera.CrElectricityFragment(ElectricityMultiplierLevel=1)"])
    );
}

#[test]
fn test_new_pole_skips_connector_ids() {
    let input = SaveBuilder::new()
        .station(2, [-500.0, 0.0, 0.0])
        .junction(1, [0.0, 0.0, 0.0])
        .spline(10, 2, 1, [-450.0, 0.0, 0.0], [-25.0, 0.0, 0.0])
        .connector(11)
        .build();
    let (output, _) = apply(&input).unwrap();
    let save = parse(&output);
    let pole = endpoints(&save)[&EntityId(10)].1;
    assert_eq!(pole, EntityId(12));
    let connectors: Vec<_> = save
        .connectors()
        .unwrap()
        .records()
        .iter()
        .filter_map(|r| r.id)
        .collect();
    assert_eq!(connectors, vec![EntityId(11)]);
}

#[test]
fn test_new_pole_skips_dangling_references() {
    let input = SaveBuilder::new()
        .station(2, [-500.0, 0.0, 0.0])
        .junction(1, [0.0, 0.0, 0.0])
        .spline(5, 2, 11, [-450.0, 100.0, 0.0], [-300.0, 100.0, 0.0])
        .spline(10, 2, 1, [-450.0, 0.0, 0.0], [-25.0, 0.0, 0.0])
        .build();
    let engine = RepairEngine::with_options(RepairOptions::new().remove_dangling(false));
    let (output, report) = engine.apply(&input).unwrap();
    assert_eq!(report.counts().poles_created, 1);

    let ends = poles_by_end(&output);
    assert_eq!(ends[&EntityId(5)], (EntityId(2), EntityId(11)));
    assert_eq!(ends[&EntityId(10)], (EntityId(2), EntityId(12)));
    let save = parse(&output);
    assert_eq!(
        ids_of_kind(&save, EntityKind::InvisiblePole),
        BTreeSet::from([EntityId(12)])
    );
}

#[test]
fn test_chain_resolves_each_hop() {
    let input = lane_chain(&[1, 2, 3, 4], 100).build();
    let (output, report) = apply(&input).unwrap();
    assert_eq!(report.counts().junctions_repaired, 4);
    assert_eq!(report.counts().poles_created, 12);
    assert_eq!(report.counts().references_rewritten, 18);
    for junction in report.junctions() {
        assert_eq!(junction.axis, LaneAxis::Y);
        assert_eq!(junction.lanes, 3);
    }

    // Splines 100..109 run hop by hop, three lanes per hop.
    let ends = poles_by_end(&output);
    let lane_of = |spline: EntityId| (spline.value() - 100) % 3;
    let mut pole_lanes: BTreeMap<EntityId, BTreeSet<u64>> = BTreeMap::new();
    for (&spline, &(start, end)) in &ends {
        pole_lanes.entry(start).or_default().insert(lane_of(spline));
        pole_lanes.entry(end).or_default().insert(lane_of(spline));
    }
    assert_eq!(pole_lanes.len(), 12);
    for lanes in pole_lanes.values() {
        assert_eq!(lanes.len(), 1, "pole shared across lanes");
    }

    // Consecutive hops meet at the same pole in every lane.
    for hop in 0..2u64 {
        for lane in 0..3u64 {
            let incoming = EntityId(100 + hop * 3 + lane);
            let outgoing = EntityId(100 + (hop + 1) * 3 + lane);
            assert_eq!(ends[&incoming].1, ends[&outgoing].0);
        }
    }

    let save = parse(&output);
    assert_referential_integrity(&save);
    assert_no_orphans(&save);
}

#[test]
fn test_second_run_is_a_no_op() {
    let input = lane_chain(&[1, 2, 3], 50).drone(9).build();
    let (first, report) = apply(&input).unwrap();
    assert!(!report.is_empty());

    let (second, report) = apply(&first).unwrap();
    assert!(report.is_empty());
    assert_eq!(report.warnings(), &[RepairWarning::NothingToRepair]);
    assert_eq!(second, first);
}

#[test]
fn test_save_without_broken_junctions_round_trips() {
    let input = SaveBuilder::new()
        .station(1, [0.0, 0.0, 0.0])
        .station(2, [100.0, 0.0, 0.0])
        .junction(3, [500.0, 500.0, 0.0])
        .spline(4, 1, 2, [0.0, 0.0, 0.0], [100.0, 0.0, 0.0])
        .drone(5)
        .raw(6, json!(["opaque", 1, null]))
        .connector(1)
        .build();
    let (output, report) = apply(&input).unwrap();
    assert_eq!(output, input);
    assert!(report.is_empty());
}

#[test]
fn test_stale_poles_and_drones_are_collected() {
    let input = SaveBuilder::new()
        .station(2, [-500.0, 0.0, 0.0])
        .junction(1, [0.0, 0.0, 0.0])
        .pole(7, [0.0, 0.0, 0.0])
        .drone(8)
        .spline(10, 2, 1, [-450.0, 0.0, 0.0], [-25.0, 0.0, 0.0])
        .connector(7)
        .connector(2)
        .build();
    let (output, report) = apply(&input).unwrap();
    assert_eq!(
        report.deleted(DeleteReason::Unreferenced).collect::<Vec<_>>(),
        vec![EntityId(7), EntityId(8)]
    );
    assert!(
        report
            .entries()
            .contains(&ChangeEntry::RemoveConnector { id: EntityId(7) })
    );

    let save = parse(&output);
    let ids: BTreeSet<_> = save.records().iter().filter_map(|r| r.id).collect();
    assert!(!ids.contains(&EntityId(7)));
    assert!(!ids.contains(&EntityId(8)));
    let connectors: Vec<_> = save
        .connectors()
        .unwrap()
        .records()
        .iter()
        .filter_map(|r| r.id)
        .collect();
    assert_eq!(connectors, vec![EntityId(2)]);
    assert_no_orphans(&save);
}

#[test]
fn test_garbage_collection_can_be_disabled() {
    let input = SaveBuilder::new()
        .station(2, [-500.0, 0.0, 0.0])
        .junction(1, [0.0, 0.0, 0.0])
        .drone(8)
        .spline(10, 2, 1, [-450.0, 0.0, 0.0], [-25.0, 0.0, 0.0])
        .build();
    let engine = RepairEngine::with_options(RepairOptions::new().collect_garbage(false));
    let report = engine.analyze(&input).unwrap();
    assert_eq!(report.counts().entities_deleted, 0);
    assert_eq!(report.counts().poles_created, 1);
}

#[test]
fn test_axis_detection_in_rotated_junction() {
    // Quarter turn about Z: lanes separated along world X lie on local Y.
    let half = std::f64::consts::FRAC_1_SQRT_2;
    let mut builder = SaveBuilder::new()
        .station(2, [0.0, -500.0, 0.0])
        .station(3, [0.0, 500.0, 0.0])
        .junction_with(1, common::DRONE_LANE_3, [0.0, 0.0, 0.0], [0.0, 0.0, half, half]);
    for (lane, x) in [-20.0, 0.0, 20.0].into_iter().enumerate() {
        let lane = lane as u64;
        builder = builder
            .spline(10 + lane, 2, 1, [x, -450.0, 0.0], [x, -50.0, 0.0])
            .spline(20 + lane, 1, 3, [x, 50.0, 0.0], [x, 450.0, 0.0]);
    }
    let report = analyze(&builder.build()).unwrap();
    let junction = &report.junctions()[0];
    assert_eq!(junction.axis, LaneAxis::Y);
    assert!(junction.spread.x.abs() < 1e-6);
    assert!((junction.spread.y - 80.0).abs() < 1e-6);
    assert_eq!(junction.lanes, 3);
    assert_eq!(junction.touches, 6);
}

#[test]
fn test_axis_detection_unrotated() {
    for (axis, offsets) in [
        (LaneAxis::X, [[-20.0, 0.0], [20.0, 0.0]]),
        (LaneAxis::Y, [[0.0, -20.0], [0.0, 20.0]]),
    ] {
        let mut builder = SaveBuilder::new()
            .station(2, [-500.0, 0.0, 0.0])
            .junction(1, [0.0, 0.0, 0.0]);
        for (idx, [x, y]) in offsets.into_iter().enumerate() {
            builder = builder.spline(10 + idx as u64, 2, 1, [-450.0, y, 0.0], [x, y, 0.0]);
        }
        let report = analyze(&builder.build()).unwrap();
        assert_eq!(report.junctions()[0].axis, axis);
        assert_eq!(report.junctions()[0].lanes, 2);
    }
}

fn two_lanes_apart(gap: f64) -> Vec<u8> {
    SaveBuilder::new()
        .station(2, [-500.0, 0.0, 0.0])
        .junction(1, [0.0, 0.0, 0.0])
        .spline(10, 2, 1, [-450.0, 0.0, 0.0], [-25.0, 10.0, 0.0])
        .spline(11, 2, 1, [-450.0, gap, 0.0], [-25.0, 10.0 + gap, 0.0])
        .build()
}

#[test]
fn test_clustering_tolerance() {
    assert_eq!(analyze(&two_lanes_apart(20.0)).unwrap().counts().poles_created, 2);
    assert_eq!(analyze(&two_lanes_apart(14.0)).unwrap().counts().poles_created, 1);
    assert_eq!(analyze(&two_lanes_apart(10.0)).unwrap().counts().poles_created, 1);

    let strict = RepairEngine::with_options(
        RepairOptions::new().with_analyzer(AnalyzerConfig::new().with_tolerance(5.0)),
    );
    assert_eq!(strict.analyze(&two_lanes_apart(10.0)).unwrap().counts().poles_created, 2);
}

#[test]
fn test_positionless_touch_gets_own_lane() {
    let input = SaveBuilder::new()
        .station(2, [-500.0, 0.0, 0.0])
        .junction(1, [10.0, 20.0, 30.0])
        .spline(10, 2, 1, [-450.0, 0.0, 0.0], [-25.0, 0.0, 0.0])
        .spline_at(11, 2, 1, None, None)
        .build();
    let report = analyze(&input).unwrap();
    assert_eq!(report.counts().poles_created, 2);
    assert_eq!(
        report.warnings(),
        &[RepairWarning::PositionlessTouch {
            junction: EntityId(1),
            spline: EntityId(11),
        }]
    );
    let positionless_pole = report.entries().iter().find_map(|entry| match entry {
        ChangeEntry::CreatePole { splines, position, .. } if splines == &[EntityId(11)] => {
            Some(*position)
        }
        _ => None,
    });
    assert_eq!(positionless_pole, Some([10.0, 20.0, 30.0]));
}

#[test]
fn test_dry_run_matches_apply() {
    let input = lane_chain(&[1, 2, 3], 10).drone(99).build();
    let dry = analyze(&input).unwrap();
    let (_, applied) = apply(&input).unwrap();
    assert_eq!(dry, applied);

    let mut corrupt = input.clone();
    corrupt[0] ^= 0x01;
    assert!(matches!(analyze(&corrupt), Err(RepairError::Format(_))));
    assert!(matches!(apply(&corrupt), Err(RepairError::Format(_))));
}

#[test]
fn test_dangling_splines_are_removed() {
    let intersection = "/Script/Chimera.CrLogisticsIntersectionFragment(CachedMoveSpeedPerLine=((Entity=(ID=20),Speed=300.0)))";
    let sockets = "/Script/Chimera.CrLogisticsSocketsFragment(Sockets=((WorldPosition=(X=0.0,Y=0.0,Z=0.0),SocketPairInvisibleConnector=(ID=7)),(WorldPosition=(X=1.0,Y=0.0,Z=0.0))))";
    let input = SaveBuilder::new()
        .station(2, [-500.0, 0.0, 0.0])
        .raw(
            1,
            json!({
                "spawnData": {
                    "entityConfigDataPath": common::DRONE_LANE_3,
                    "transform": {"translation": {"x": 0.0, "y": 0.0, "z": 0.0}}
                },
                "fragmentValues": [intersection, sockets]
            }),
        )
        .pole(7, [-100.0, 0.0, 0.0])
        .spline(10, 2, 1, [-450.0, 0.0, 0.0], [-25.0, 0.0, 0.0])
        .spline(20, 7, 999, [-100.0, 0.0, 0.0], [-200.0, 0.0, 0.0])
        .connector(20)
        .connector(7)
        .build();

    let (output, report) = apply(&input).unwrap();
    assert_eq!(
        report.deleted(DeleteReason::DanglingSpline).collect::<Vec<_>>(),
        vec![EntityId(20)]
    );
    assert_eq!(
        report.deleted(DeleteReason::Unreferenced).collect::<Vec<_>>(),
        vec![EntityId(7)]
    );

    let save = parse(&output);
    assert!(save.connectors().unwrap().is_empty());
    let junction = save
        .records()
        .iter()
        .find(|record| record.id == Some(EntityId(1)))
        .unwrap();
    let fragments: Vec<_> = junction.text_fragments().map(|(_, text)| text).collect();
    assert_eq!(
        fragments,
        vec![
            "/Script/Chimera.CrLogisticsIntersectionFragment(CachedMoveSpeedPerLine=())",
            "/Script/Chimera.CrLogisticsSocketsFragment(Sockets=((WorldPosition=(X=0.0,Y=0.0,Z=0.0)),(WorldPosition=(X=1.0,Y=0.0,Z=0.0))))",
        ]
    );
    assert_referential_integrity(&save);
    assert_no_orphans(&save);
}

#[test]
fn test_dangling_cleanup_can_be_disabled() {
    let input = SaveBuilder::new()
        .station(2, [0.0, 0.0, 0.0])
        .spline(20, 2, 999, [0.0, 0.0, 0.0], [10.0, 0.0, 0.0])
        .build();
    let engine = RepairEngine::with_options(RepairOptions::new().remove_dangling(false));
    let (output, report) = engine.apply(&input).unwrap();
    assert!(report.is_empty());
    assert_eq!(output, input);

    let (_, report) = apply(&input).unwrap();
    assert_eq!(report.counts().entities_deleted, 1);
}

#[test]
fn test_five_way_and_three_way_mixed() {
    let mut builder = SaveBuilder::new()
        .station(9, [-1000.0, 0.0, 0.0])
        .junction_with(1, common::DRONE_LANE_5, [0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0])
        .junction(2, [1000.0, 0.0, 0.0]);
    // Five lanes into the 5-way, three of them continue to the 3-way.
    for lane in 0..5u64 {
        let y = lane as f64 * 20.0 - 40.0;
        builder = builder.spline(100 + lane, 9, 1, [-950.0, y, 0.0], [-50.0, y, 0.0]);
    }
    for lane in 0..3u64 {
        let y = lane as f64 * 20.0 - 20.0;
        builder = builder.spline(200 + lane, 1, 2, [50.0, y, 0.0], [950.0, y, 0.0]);
    }
    let (output, report) = apply(&builder.build()).unwrap();
    let lanes: Vec<_> = report.junctions().iter().map(|j| (j.id, j.lanes)).collect();
    assert_eq!(lanes, vec![(EntityId(1), 5), (EntityId(2), 3)]);
    let save = parse(&output);
    assert_referential_integrity(&save);
    assert_no_orphans(&save);
}

proptest! {
    #[test]
    fn test_lanes_follow_tolerance_gaps(offsets in proptest::collection::vec((-200i32..200).prop_map(f64::from), 1..8)) {
        let mut builder = SaveBuilder::new()
            .station(2, [-1000.0, 0.0, 0.0])
            .junction(1, [0.0, 0.0, 0.0]);
        for (idx, y) in offsets.iter().enumerate() {
            builder = builder.spline(10 + idx as u64, 2, 1, [-900.0, *y, 0.0], [-50.0, *y, 0.0]);
        }
        let (output, report) = apply(&builder.build()).unwrap();

        let mut sorted = offsets.clone();
        sorted.sort_by(f64::total_cmp);
        let breaks: Vec<f64> = sorted
            .windows(2)
            .filter(|pair| pair[1] - pair[0] > 15.0)
            .map(|pair| pair[1])
            .collect();
        prop_assert_eq!(report.counts().poles_created, breaks.len() + 1);

        // Two ends share a pole exactly when no gap wider than the tolerance separates them.
        let lane_of = |y: f64| breaks.iter().filter(|&&b| b <= y).count();
        let ends = endpoints(&parse(&output));
        for (i, a) in offsets.iter().enumerate() {
            for (j, b) in offsets.iter().enumerate() {
                let pole_a = ends[&EntityId(10 + i as u64)].1;
                let pole_b = ends[&EntityId(10 + j as u64)].1;
                prop_assert_eq!(pole_a == pole_b, lane_of(*a) == lane_of(*b));
            }
        }
    }
}
