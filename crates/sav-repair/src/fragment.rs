//! Reading and rewriting typed fragment strings.
//!
//! Fragments look like `/Script/Module.TypeName(Field=Value,...)`. Only the
//! handful of fields the repair touches are matched; everything else in a
//! fragment is carried over verbatim.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use glam::DVec3;
use regex::{Captures, Regex};
use sav_format::EntityId;

use crate::graph::SplineEnd;

pub const SPLINE_FRAGMENT: &str = "AuSplineConnectionFragment";
pub const SOCKETS_FRAGMENT: &str = "CrLogisticsSocketsFragment";
pub const INTERSECTION_FRAGMENT: &str = "CrLogisticsIntersectionFragment";

/// Intersection fragment with its cached lane data cleared.
pub const EMPTY_INTERSECTION: &str =
    "/Script/Chimera.CrLogisticsIntersectionFragment(CachedMoveSpeedPerLine=())";

static START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"StartEntity=\(ID=(\d+)\)").expect("valid regex"));
static END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"EndEntity=\(ID=(\d+)\)").expect("valid regex"));
static POSITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Position=\(X=([-+\d.eE]+),Y=([-+\d.eE]+),Z=([-+\d.eE]+)\)").expect("valid regex")
});
static ENTITY_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Entity=\(ID=(\d+)\)").expect("valid regex"));
static ANY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(ID=(\d+)\)").expect("valid regex"));
static SOCKET_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r",SocketPairInvisibleConnector=\(ID=(\d+)\)").expect("valid regex")
});

/// Endpoints and end positions read from a spline connection fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineFragment {
    pub start: EntityId,
    pub end: EntityId,
    /// First control point.
    pub start_pos: Option<DVec3>,
    /// Last control point.
    pub end_pos: Option<DVec3>,
}

fn capture_id(re: &Regex, text: &str) -> Option<EntityId> {
    re.captures(text)?.get(1)?.as_str().parse().ok().map(EntityId)
}

fn capture_position(caps: &Captures<'_>) -> Option<DVec3> {
    let x: f64 = caps.get(1)?.as_str().parse().ok()?;
    let y: f64 = caps.get(2)?.as_str().parse().ok()?;
    let z: f64 = caps.get(3)?.as_str().parse().ok()?;
    let position = DVec3::new(x, y, z);
    position.is_finite().then_some(position)
}

/// Parse a spline connection fragment. Returns `None` for any other fragment
/// or when either endpoint is missing.
pub fn parse_spline(text: &str) -> Option<SplineFragment> {
    if !text.contains(SPLINE_FRAGMENT) {
        return None;
    }
    let start = capture_id(&START_RE, text)?;
    let end = capture_id(&END_RE, text)?;
    let positions: Vec<_> = POSITION_RE.captures_iter(text).collect();
    Some(SplineFragment {
        start,
        end,
        start_pos: positions.first().and_then(capture_position),
        end_pos: positions.last().and_then(capture_position),
    })
}

/// Point one endpoint field from `old` to `new`.
///
/// Returns `None` when the fragment does not reference `old` on that end.
pub fn rewrite_endpoint(
    text: &str,
    end: SplineEnd,
    old: EntityId,
    new: EntityId,
) -> Option<String> {
    let field = end.field();
    let current = format!("{field}={old}");
    if !text.contains(&current) {
        return None;
    }
    Some(text.replacen(&current, &format!("{field}={new}"), 1))
}

/// Every `...Entity=(ID=N)` reference in a fragment.
pub fn entity_refs(text: &str) -> impl Iterator<Item = EntityId> + '_ {
    ENTITY_REF_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok().map(EntityId))
}

/// Every `(ID=N)` mentioned anywhere in a fragment, whatever the field.
pub fn mentioned_ids(text: &str) -> impl Iterator<Item = EntityId> + '_ {
    ANY_ID_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok().map(EntityId))
}

/// Drop socket-pair clauses that name any of `ids`.
///
/// Returns `None` when nothing was removed.
pub fn strip_socket_pairs(text: &str, ids: &BTreeSet<EntityId>) -> Option<String> {
    let mut stripped = false;
    let result = SOCKET_PAIR_RE.replace_all(text, |caps: &Captures<'_>| {
        let named = caps
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .map(EntityId);
        match named {
            Some(id) if ids.contains(&id) => {
                stripped = true;
                String::new()
            }
            _ => caps[0].to_string(),
        }
    });
    stripped.then(|| result.into_owned())
}

/// Whether a fragment is of the given type, e.g. `CrLogisticsSocketsFragment`.
pub fn is_type(text: &str, type_name: &str) -> bool {
    text.contains(type_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPLINE: &str = "/Script/AuLogistics.AuSplineConnectionFragment(StartEntity=(ID=5),EndEntity=(ID=55),Points=((Position=(X=1.5,Y=-2.0,Z=3.0)),(Position=(X=10.0,Y=20.0,Z=30.0)),(Position=(X=-4.25,Y=1e2,Z=0.0))))";

    #[test]
    fn test_parse_spline() {
        let spline = parse_spline(SPLINE).unwrap();
        assert_eq!(spline.start, EntityId(5));
        assert_eq!(spline.end, EntityId(55));
        assert_eq!(spline.start_pos, Some(DVec3::new(1.5, -2.0, 3.0)));
        assert_eq!(spline.end_pos, Some(DVec3::new(-4.25, 100.0, 0.0)));
    }

    #[test]
    fn test_parse_spline_single_point() {
        let text = "/Script/A.AuSplineConnectionFragment(StartEntity=(ID=1),EndEntity=(ID=2),Position=(X=1,Y=2,Z=3))";
        let spline = parse_spline(text).unwrap();
        assert_eq!(spline.start_pos, spline.end_pos);
        assert!(spline.start_pos.is_some());
    }

    #[test]
    fn test_parse_spline_rejects_other_fragments() {
        assert!(parse_spline("/Script/A.Other(StartEntity=(ID=1),EndEntity=(ID=2))").is_none());
        assert!(parse_spline("/Script/A.AuSplineConnectionFragment(StartEntity=(ID=1))").is_none());
    }

    #[test]
    fn test_parse_spline_without_positions() {
        let text = "/Script/A.AuSplineConnectionFragment(StartEntity=(ID=1),EndEntity=(ID=2))";
        let spline = parse_spline(text).unwrap();
        assert_eq!(spline.start_pos, None);
        assert_eq!(spline.end_pos, None);
    }

    #[test]
    fn test_rewrite_endpoint_exact_id() {
        let rewritten = rewrite_endpoint(SPLINE, SplineEnd::Start, EntityId(5), EntityId(77)).unwrap();
        assert!(rewritten.contains("StartEntity=(ID=77),EndEntity=(ID=55)"));
        assert_eq!(rewritten.len(), SPLINE.len() + 1);

        // 5 must not match the 55 on the other end.
        assert!(rewrite_endpoint(SPLINE, SplineEnd::End, EntityId(5), EntityId(77)).is_none());
        let rewritten = rewrite_endpoint(SPLINE, SplineEnd::End, EntityId(55), EntityId(6)).unwrap();
        assert!(rewritten.contains("StartEntity=(ID=5),EndEntity=(ID=6)"));
    }

    #[test]
    fn test_entity_refs() {
        let text = "/Script/Chimera.CrLogisticsIntersectionFragment(Lines=((InEntity=(ID=3),OutEntity=(ID=4))))";
        let refs: Vec<_> = entity_refs(text).collect();
        assert_eq!(refs, vec![EntityId(3), EntityId(4)]);
    }

    #[test]
    fn test_mentioned_ids() {
        let text = "/Script/Chimera.CrLogisticsSocketsFragment(Sockets=((Owner=(ID=3),SocketPairInvisibleConnector=(ID=12))))";
        let ids: Vec<_> = mentioned_ids(text).collect();
        assert_eq!(ids, vec![EntityId(3), EntityId(12)]);
        assert_eq!(mentioned_ids(SPLINE).max(), Some(EntityId(55)));
    }

    #[test]
    fn test_strip_socket_pairs() {
        let text = "/Script/Chimera.CrLogisticsSocketsFragment(Sockets=((WorldPosition=(X=0,Y=0,Z=0),SocketPairInvisibleConnector=(ID=8)),(WorldPosition=(X=1,Y=0,Z=0),SocketPairInvisibleConnector=(ID=9))))";
        let ids = BTreeSet::from([EntityId(9)]);
        let stripped = strip_socket_pairs(text, &ids).unwrap();
        assert!(stripped.contains("SocketPairInvisibleConnector=(ID=8)"));
        assert!(!stripped.contains("(ID=9)"));
        assert!(strip_socket_pairs(text, &BTreeSet::from([EntityId(1)])).is_none());
    }
}
