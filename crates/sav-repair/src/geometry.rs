//! Conversions between save transforms and junction-local coordinates.

use glam::{DQuat, DVec3};
use sav_format::{Quaternion, Transform, Vector3};

pub fn to_vec(v: Vector3) -> DVec3 {
    DVec3::new(v.x, v.y, v.z)
}

/// Rotation as a unit quaternion. Degenerate rotations read as identity.
pub fn to_quat(q: Quaternion) -> DQuat {
    let quat = DQuat::from_xyzw(q.x, q.y, q.z, q.w);
    if !quat.is_finite() || quat.length_squared() < 1e-12 {
        return DQuat::IDENTITY;
    }
    quat.normalize()
}

/// Placement of a junction, used to express touch points in its own frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    pub origin: DVec3,
    pub rotation: DQuat,
}

impl Default for LocalFrame {
    fn default() -> Self {
        Self {
            origin: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
        }
    }
}

impl LocalFrame {
    pub fn from_transform(transform: &Transform) -> Self {
        Self {
            origin: to_vec(transform.translation),
            rotation: to_quat(transform.rotation),
        }
    }

    /// World point to local coordinates.
    pub fn to_local(&self, world: DVec3) -> DVec3 {
        self.rotation.inverse() * (world - self.origin)
    }

    /// Local point to world coordinates.
    pub fn to_world(&self, local: DVec3) -> DVec3 {
        self.rotation * local + self.origin
    }
}

/// Arithmetic mean of a set of points.
pub fn centroid(points: impl IntoIterator<Item = DVec3>) -> Option<DVec3> {
    let (sum, count) = points
        .into_iter()
        .fold((DVec3::ZERO, 0u32), |(sum, count), p| (sum + p, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: DVec3, b: DVec3) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn test_local_frame_round_trip() {
        let frame = LocalFrame {
            origin: DVec3::new(100.0, -50.0, 10.0),
            rotation: DQuat::from_rotation_z(0.7),
        };
        let world = DVec3::new(130.0, -20.0, 12.0);
        assert!(approx(frame.to_world(frame.to_local(world)), world));
    }

    #[test]
    fn test_quarter_turn_swaps_axes() {
        let frame = LocalFrame {
            origin: DVec3::new(10.0, 10.0, 0.0),
            rotation: DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2),
        };
        // World +Y from the origin is local +X after a quarter turn about Z.
        let local = frame.to_local(DVec3::new(10.0, 30.0, 0.0));
        assert!(approx(local, DVec3::new(20.0, 0.0, 0.0)));
    }

    #[test]
    fn test_degenerate_rotation_is_identity() {
        let q = Quaternion {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 0.0,
        };
        assert_eq!(to_quat(q), DQuat::IDENTITY);
        let scaled = to_quat(Quaternion {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 2.0,
        });
        assert!((scaled.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_centroid() {
        assert_eq!(centroid([]), None);
        let mean = centroid([DVec3::new(0.0, 0.0, 0.0), DVec3::new(10.0, 20.0, 30.0)]);
        assert_eq!(mean, Some(DVec3::new(5.0, 10.0, 15.0)));
    }
}
