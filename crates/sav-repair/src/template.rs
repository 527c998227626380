//! Record bodies for entities created during a repair.

use glam::DVec3;
use serde::Serialize;

use crate::index::{NewEntity, SpawnKind};

pub const POLE_CONFIG: &str = "/Game/Chimera/Buildings/DroneConnections/InvisibleConnection/DA_DroneInvisiblePole.DA_DroneInvisiblePole";

pub const POLE_FRAGMENTS: [&str; 1] =
    ["/Script/Chimera.CrElectricityFragment(ElectricityMultiplierLevel=1)"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntityRecord<'a> {
    spawn_data: SpawnData<'a>,
    tags: [&'a str; 0],
    fragment_values: &'a [&'a str],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpawnData<'a> {
    entity_config_data_path: &'a str,
    transform: TransformRecord,
}

#[derive(Serialize)]
struct TransformRecord {
    rotation: Xyzw,
    translation: Xyz,
    #[serde(rename = "scale3D")]
    scale: Xyz,
}

#[derive(Serialize)]
struct Xyz {
    x: f64,
    y: f64,
    z: f64,
}

impl From<DVec3> for Xyz {
    fn from(v: DVec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

#[derive(Serialize)]
struct Xyzw {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

/// Compact JSON body for a new entity.
pub fn render(entity: &NewEntity) -> serde_json::Result<String> {
    match entity.kind {
        SpawnKind::InvisiblePole => pole_record(entity.position),
    }
}

/// Invisible pole at `position` with identity rotation and unit scale.
pub fn pole_record(position: DVec3) -> serde_json::Result<String> {
    let position = if position.is_finite() {
        position
    } else {
        DVec3::ZERO
    };
    serde_json::to_string(&EntityRecord {
        spawn_data: SpawnData {
            entity_config_data_path: POLE_CONFIG,
            transform: TransformRecord {
                rotation: Xyzw {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                    w: 1.0,
                },
                translation: position.into(),
                scale: DVec3::ONE.into(),
            },
        },
        tags: [],
        fragment_values: &POLE_FRAGMENTS,
    })
}
