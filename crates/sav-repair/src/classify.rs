//! Entity classification by config asset path.

use std::fmt;

use serde::{Serialize, Serializer};

/// Junction variants recognized by the repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum JunctionKind {
    #[serde(rename = "3-way")]
    ThreeWay,
    #[serde(rename = "4-way")]
    FourWay,
    #[serde(rename = "5-way")]
    FiveWay,
    #[serde(rename = "merger-3")]
    Merger3To1,
    #[serde(rename = "merger-5")]
    Merger5To1,
}

impl JunctionKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::ThreeWay => "3-way",
            Self::FourWay => "4-way",
            Self::FiveWay => "5-way",
            Self::Merger3To1 => "merger-3",
            Self::Merger5To1 => "merger-5",
        }
    }
}

impl fmt::Display for JunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What an entity is, as far as the repair cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Junction(JunctionKind),
    InvisiblePole,
    Drone,
    Spline,
    Other,
}

impl EntityKind {
    pub fn is_junction(self) -> bool {
        matches!(self, Self::Junction(_))
    }

    /// Poles and drones are the only kinds garbage collection may delete.
    pub fn is_collectable(self) -> bool {
        matches!(self, Self::InvisiblePole | Self::Drone)
    }
}

impl Serialize for EntityKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Junction(kind) => serializer.collect_str(&format_args!("junction-{kind}")),
            Self::InvisiblePole => serializer.serialize_str("invisible-pole"),
            Self::Drone => serializer.serialize_str("drone"),
            Self::Spline => serializer.serialize_str("spline"),
            Self::Other => serializer.serialize_str("other"),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Junction(kind) => write!(f, "junction ({kind})"),
            Self::InvisiblePole => f.write_str("invisible pole"),
            Self::Drone => f.write_str("drone"),
            Self::Spline => f.write_str("spline"),
            Self::Other => f.write_str("other"),
        }
    }
}

/// Maps config asset paths to entity kinds.
///
/// Junction markers are substring matches tried in order; drones match on the
/// asset name after the final `.` exactly.
#[derive(Debug, Clone)]
pub struct Classifier {
    junctions: Vec<(String, JunctionKind)>,
    pole_marker: String,
    drone_assets: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            junctions: vec![
                ("DroneLane_3".to_string(), JunctionKind::ThreeWay),
                ("DroneLane_5".to_string(), JunctionKind::FiveWay),
                ("DroneMerger_3To1".to_string(), JunctionKind::Merger3To1),
                ("DroneMerger_5To1".to_string(), JunctionKind::Merger5To1),
                ("DA_DroneJunction_4".to_string(), JunctionKind::FourWay),
            ],
            pole_marker: "DroneInvisiblePole".to_string(),
            drone_assets: vec!["DA_Drone".to_string()],
        }
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a junction marker, tried after the built-in ones.
    pub fn with_junction(mut self, marker: impl Into<String>, kind: JunctionKind) -> Self {
        self.junctions.push((marker.into(), kind));
        self
    }

    pub fn with_pole_marker(mut self, marker: impl Into<String>) -> Self {
        self.pole_marker = marker.into();
        self
    }

    /// Replace the drone asset names.
    pub fn with_drone_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drone_assets = assets.into_iter().map(Into::into).collect();
        self
    }

    /// Classify by config path alone. Records without a recognized config may
    /// still turn out to be splines; see [`Classifier::classify_record`].
    pub fn classify(&self, config_path: Option<&str>) -> EntityKind {
        let Some(path) = config_path.filter(|path| !path.is_empty()) else {
            return EntityKind::Other;
        };
        if let Some((_, kind)) = self
            .junctions
            .iter()
            .find(|(marker, _)| path.contains(marker.as_str()))
        {
            return EntityKind::Junction(*kind);
        }
        if path.contains(self.pole_marker.as_str()) {
            return EntityKind::InvisiblePole;
        }
        let asset = path.rsplit('.').next().unwrap_or(path);
        if self.drone_assets.iter().any(|name| name == asset) {
            return EntityKind::Drone;
        }
        EntityKind::Other
    }

    /// Classify a record, falling back to `Spline` when it carries a spline
    /// connection and its config is not otherwise recognized.
    pub fn classify_record(&self, config_path: Option<&str>, has_spline: bool) -> EntityKind {
        match self.classify(config_path) {
            EntityKind::Other if has_spline => EntityKind::Spline,
            kind => kind,
        }
    }
}
