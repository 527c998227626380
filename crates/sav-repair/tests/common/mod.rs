//! Synthetic save files for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use serde_json::{Value, json};

use sav_repair::{Classifier, EntityIndex, EntityKind, SplineGraph};
use sav_format::{EntityId, SaveFile, parse_save};

pub const DRONE_LANE_3: &str =
    "/Game/Chimera/Buildings/DroneConnections/DroneLane_3/DA_DroneLane_3.DA_DroneLane_3";
pub const DRONE_LANE_5: &str =
    "/Game/Chimera/Buildings/DroneConnections/DroneLane_5/DA_DroneLane_5.DA_DroneLane_5";
pub const POLE: &str = "/Game/Chimera/Buildings/DroneConnections/InvisibleConnection/DA_DroneInvisiblePole.DA_DroneInvisiblePole";
pub const DRONE: &str = "/Game/Chimera/Drones/DA_Drone.DA_Drone";
pub const STATION: &str = "/Game/Chimera/Buildings/DroneStation/DA_DroneStation.DA_DroneStation";

/// Builds a save payload record by record, in insertion order.
#[derive(Debug, Default)]
pub struct SaveBuilder {
    records: Vec<(u64, Value)>,
    connectors: Vec<u64>,
}

fn translation(position: [f64; 3]) -> Value {
    json!({"x": position[0], "y": position[1], "z": position[2]})
}

fn placed(config: &str, position: [f64; 3], rotation: [f64; 4]) -> Value {
    json!({
        "spawnData": {
            "entityConfigDataPath": config,
            "transform": {
                "rotation": {"x": rotation[0], "y": rotation[1], "z": rotation[2], "w": rotation[3]},
                "translation": translation(position),
            }
        },
        "fragmentValues": []
    })
}

pub fn spline_fragment(
    start: u64,
    end: u64,
    start_pos: Option<[f64; 3]>,
    end_pos: Option<[f64; 3]>,
) -> String {
    let point = |p: [f64; 3]| format!("(Position=(X={:.6},Y={:.6},Z={:.6}))", p[0], p[1], p[2]);
    let points: Vec<String> = [start_pos, end_pos].into_iter().flatten().map(point).collect();
    format!(
        "/Script/AuLogistics.AuSplineConnectionFragment(StartEntity=(ID={start}),EndEntity=(ID={end}),Points=({}))",
        points.join(",")
    )
}

impl SaveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(mut self, id: u64, body: Value) -> Self {
        self.records.push((id, body));
        self
    }

    pub fn junction(self, id: u64, position: [f64; 3]) -> Self {
        self.junction_with(id, DRONE_LANE_3, position, [0.0, 0.0, 0.0, 1.0])
    }

    pub fn junction_with(
        self,
        id: u64,
        config: &str,
        position: [f64; 3],
        rotation: [f64; 4],
    ) -> Self {
        self.raw(id, placed(config, position, rotation))
    }

    pub fn station(self, id: u64, position: [f64; 3]) -> Self {
        self.raw(id, placed(STATION, position, [0.0, 0.0, 0.0, 1.0]))
    }

    pub fn pole(self, id: u64, position: [f64; 3]) -> Self {
        self.raw(id, placed(POLE, position, [0.0, 0.0, 0.0, 1.0]))
    }

    pub fn drone(self, id: u64) -> Self {
        self.raw(id, placed(DRONE, [0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0]))
    }

    pub fn spline(self, id: u64, start: u64, end: u64, start_pos: [f64; 3], end_pos: [f64; 3]) -> Self {
        self.spline_at(id, start, end, Some(start_pos), Some(end_pos))
    }

    pub fn spline_at(
        self,
        id: u64,
        start: u64,
        end: u64,
        start_pos: Option<[f64; 3]>,
        end_pos: Option<[f64; 3]>,
    ) -> Self {
        let body = json!({
            "fragmentValues": [spline_fragment(start, end, start_pos, end_pos)]
        });
        self.raw(id, body)
    }

    pub fn connector(mut self, id: u64) -> Self {
        self.connectors.push(id);
        self
    }

    pub fn payload(&self) -> String {
        let entities: Vec<String> = self
            .records
            .iter()
            .map(|(id, body)| format!("\"(ID={id})\":{body}"))
            .collect();
        let connectors: Vec<String> = self
            .connectors
            .iter()
            .map(|id| format!("\"(ID={id})\":{{\"connections\":[]}}"))
            .collect();
        format!(
            "{{\"header\":{{\"version\":3}},\"itemData\":{{\"entities\":{{{}}},\"Mass\":{{\"electricitySubsystemState\":{{\"connectorData\":{{{}}}}}}}}}}}",
            entities.join(","),
            connectors.join(",")
        )
    }

    pub fn build(&self) -> Vec<u8> {
        pack(&self.payload())
    }
}

/// Frame a JSON payload as a save file.
pub fn pack(json: &str) -> Vec<u8> {
    let mut out = (json.len() as u32).to_le_bytes().to_vec();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(json.as_bytes()).unwrap();
    out.extend(encoder.finish().unwrap());
    out
}

pub fn parse(bytes: &[u8]) -> SaveFile {
    parse_save(bytes).unwrap()
}

/// `(start, end)` of every spline, keyed by spline id.
pub fn endpoints(save: &SaveFile) -> BTreeMap<EntityId, (EntityId, EntityId)> {
    SplineGraph::from_save(save)
        .splines()
        .map(|spline| (spline.id, (spline.start, spline.end)))
        .collect()
}

pub fn ids_of_kind(save: &SaveFile, kind: EntityKind) -> BTreeSet<EntityId> {
    EntityIndex::from_save(save, &Classifier::default())
        .of_kind(kind)
        .map(|entry| entry.id)
        .collect()
}

pub fn all_ids(save: &SaveFile) -> BTreeSet<EntityId> {
    save.records().iter().filter_map(|record| record.id).collect()
}

/// Every spline endpoint names an entity present in the save.
pub fn assert_referential_integrity(save: &SaveFile) {
    let ids = all_ids(save);
    for (spline, (start, end)) in endpoints(save) {
        assert!(ids.contains(&start), "spline {spline} start {start} missing");
        assert!(ids.contains(&end), "spline {spline} end {end} missing");
    }
}

/// Every pole and drone is referenced by some spline.
pub fn assert_no_orphans(save: &SaveFile) {
    let referenced: BTreeSet<EntityId> = endpoints(save)
        .values()
        .flat_map(|&(start, end)| [start, end])
        .collect();
    for kind in [EntityKind::InvisiblePole, EntityKind::Drone] {
        for id in ids_of_kind(save, kind) {
            assert!(referenced.contains(&id), "{kind} {id} is unreferenced");
        }
    }
}

/// Three lanes between each consecutive pair of junctions along world X.
///
/// Junctions are 1000 apart starting at the origin; lanes sit at local
/// Y = -20, 0 and 20, and spline ends stop 50 short of each junction.
pub fn lane_chain(junctions: &[u64], first_spline: u64) -> SaveBuilder {
    let mut builder = SaveBuilder::new();
    for (idx, &id) in junctions.iter().enumerate() {
        builder = builder.junction(id, [idx as f64 * 1000.0, 0.0, 0.0]);
    }
    let mut spline = first_spline;
    for (hop, pair) in junctions.windows(2).enumerate() {
        let from_x = hop as f64 * 1000.0;
        for lane in [-20.0, 0.0, 20.0] {
            builder = builder.spline(
                spline,
                pair[0],
                pair[1],
                [from_x + 50.0, lane, 0.0],
                [from_x + 950.0, lane, 0.0],
            );
            spline += 1;
        }
    }
    builder
}
