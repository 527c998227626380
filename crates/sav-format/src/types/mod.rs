//! Core record types.

mod options;
mod save;

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scan::{self, Member};

pub use options::{ReaderOptions, WriterOptions};
pub use save::{RecordTable, SaveFile};

/// Entity identifier as stored in record keys: `(ID=N)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Extract the identifier from a record key.
    pub fn from_key(key: &str) -> Option<Self> {
        let start = key.find("(ID=")? + 4;
        let rest = &key[start..];
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 || rest.as_bytes().get(digits) != Some(&b')') {
            return None;
        }
        rest[..digits].parse().ok().map(Self)
    }

    /// Key under which a record for this identifier is stored.
    pub fn key(self) -> String {
        self.to_string()
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(ID={})", self.0)
    }
}

/// World-space vector as stored in transforms.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Rotation quaternion as stored in transforms. Missing fields default to identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default = "unit")]
    pub w: f64,
}

fn unit() -> f64 {
    1.0
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Placement of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub translation: Vector3,
    #[serde(default)]
    pub rotation: Quaternion,
}

/// One element of an entity's `fragmentValues` array.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Decoded text when the element is a string.
    pub text: Option<String>,
    span: Range<usize>,
}

impl Fragment {
    pub(crate) fn span(&self) -> Range<usize> {
        self.span.clone()
    }
}

/// Parsed body of an entity record.
#[derive(Debug, Clone, Default)]
pub struct EntityBody {
    pub config_path: Option<String>,
    pub transform: Option<Transform>,
    pub fragments: Vec<Fragment>,
}

/// Record payload: either a recognized entity body or an opaque value that is
/// only ever copied through.
#[derive(Debug, Clone)]
pub enum RecordBody {
    Entity(EntityBody),
    Opaque,
}

/// A serialized unit of a record table.
#[derive(Debug, Clone)]
pub struct Record {
    /// Raw key text.
    pub key: String,
    /// Identifier parsed from the key, if any.
    pub id: Option<EntityId>,
    pub body: RecordBody,
    span: Range<usize>,
}

impl Record {
    /// Byte offset of the record within the payload.
    pub fn offset(&self) -> usize {
        self.span.start
    }

    /// Byte length of the record within the payload.
    pub fn len(&self) -> usize {
        self.span.len()
    }

    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }

    pub(crate) fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// Entity body, if the record was recognized.
    pub fn entity(&self) -> Option<&EntityBody> {
        match &self.body {
            RecordBody::Entity(body) => Some(body),
            RecordBody::Opaque => None,
        }
    }

    /// String fragments with their positions in `fragmentValues`.
    pub fn text_fragments(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entity()
            .into_iter()
            .flat_map(|body| body.fragments.iter().enumerate())
            .filter_map(|(idx, fragment)| fragment.text.as_deref().map(|text| (idx, text)))
    }

    /// Parse a table member as an entity record.
    pub(crate) fn parse_entity(text: &str, member: Member) -> Result<Self> {
        let body = parse_body(text, &member)?;
        Ok(Self::new(member, body))
    }

    /// Keep a table member without interpreting its value.
    pub(crate) fn opaque(member: Member) -> Self {
        Self::new(member, RecordBody::Opaque)
    }

    fn new(member: Member, body: RecordBody) -> Self {
        Self {
            id: EntityId::from_key(&member.key),
            span: member.span(),
            key: member.key,
            body,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBody {
    #[serde(default)]
    spawn_data: Option<RawSpawnData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpawnData {
    #[serde(default)]
    entity_config_data_path: Option<String>,
    #[serde(default)]
    transform: Option<Transform>,
}

fn parse_body(text: &str, member: &Member) -> Result<RecordBody> {
    let raw = &text[member.value.clone()];
    let Ok(parsed) = serde_json::from_str::<RawBody>(raw) else {
        return Ok(RecordBody::Opaque);
    };
    if text.as_bytes()[member.value.start] != b'{' {
        return Ok(RecordBody::Opaque);
    }
    let object = scan::scan_object(text, member.value.start)?;
    let mut fragments = Vec::new();
    if let Some(values) = object.member("fragmentValues")
        && text.as_bytes()[values.value.start] == b'['
    {
        for span in scan::scan_array(text, values.value.start)? {
            let text_value = if text.as_bytes()[span.start] == b'"' {
                Some(scan::decode_string(text, span.clone())?)
            } else {
                None
            };
            fragments.push(Fragment {
                text: text_value,
                span,
            });
        }
    }
    let (config_path, transform) = match parsed.spawn_data {
        Some(spawn) => (spawn.entity_config_data_path, spawn.transform),
        None => (None, None),
    };
    Ok(RecordBody::Entity(EntityBody {
        config_path,
        transform,
        fragments,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_from_key() {
        assert_eq!(EntityId::from_key("(ID=42)"), Some(EntityId(42)));
        assert_eq!(EntityId::from_key("Entity(ID=7)"), Some(EntityId(7)));
        assert_eq!(EntityId::from_key("(ID=)"), None);
        assert_eq!(EntityId::from_key("(ID=12"), None);
        assert_eq!(EntityId::from_key("name"), None);
    }

    #[test]
    fn test_entity_id_display() {
        assert_eq!(EntityId(9).to_string(), "(ID=9)");
        assert_eq!(EntityId::from_key(&EntityId(9).key()), Some(EntityId(9)));
    }

    #[test]
    fn test_quaternion_defaults_to_identity() {
        let q: Quaternion = serde_json::from_str(r#"{"z":0.5}"#).unwrap();
        assert_eq!(q.w, 1.0);
        assert_eq!(q.z, 0.5);
    }

    #[test]
    fn test_parse_body() {
        let text = r#"{"(ID=3)":{"spawnData":{"entityConfigDataPath":"/Game/A.A","transform":{"translation":{"x":1,"y":2,"z":3}}},"fragmentValues":["/Script/X.F(A=1)",5]}}"#;
        let object = scan::scan_object(text, 0).unwrap();
        let member = object.members.into_iter().next().unwrap();
        let record = Record::parse_entity(text, member).unwrap();
        assert_eq!(record.id, Some(EntityId(3)));
        let body = record.entity().unwrap();
        assert_eq!(body.config_path.as_deref(), Some("/Game/A.A"));
        let transform = body.transform.unwrap();
        assert_eq!(transform.translation, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(transform.rotation, Quaternion::IDENTITY);
        assert_eq!(body.fragments.len(), 2);
        let fragments: Vec<_> = record.text_fragments().collect();
        assert_eq!(fragments, vec![(0, "/Script/X.F(A=1)")]);
    }

    #[test]
    fn test_non_object_body_is_opaque() {
        let text = r#"{"(ID=3)":[1,2]}"#;
        let object = scan::scan_object(text, 0).unwrap();
        let member = object.members.into_iter().next().unwrap();
        let record = Record::parse_entity(text, member).unwrap();
        assert!(matches!(record.body, RecordBody::Opaque));
        assert_eq!(record.len(), text.len() - 2);
    }
}
