//! Math re-exports and small free functions shared by the mixer and HRTF code.
//!
//! Vector/matrix/ray primitives come from `rg3d-core`, the same crate the teacher library
//! uses for its own geometry — there is no reason to hand-roll a second `Vec3` type
//! alongside it.

pub use rg3d_core::math::{mat4::Mat4, quat::Quat, ray::Ray, vec3::Vec3};

/// Linear interpolation, `a` at `t=0`, `b` at `t=1`.
pub fn lerpf(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Clamps `x` into `[min, max]`.
pub fn clampf(x: f32, min: f32, max: f32) -> f32 {
    if x < min {
        min
    } else if x > max {
        max
    } else {
        x
    }
}

/// Direction from listener to emitter, expressed in the listener's local frame (forward,
/// up, right), per §6 "Coordinate system": right-handed, meters, ear axis derived as
/// `world_up.cross(forward)` so that positive ear_axis is the listener's right.
pub struct ListenerBasis {
    pub forward: Vec3,
    pub up: Vec3,
    pub ear_axis: Vec3,
}

impl ListenerBasis {
    pub fn new(forward: Vec3, world_up: Vec3) -> Self {
        let forward = forward.normalized().unwrap_or(Vec3::new(0.0, 0.0, 1.0));
        // `world_up x forward`, not `forward x world_up`: for the default frame
        // (forward +z, up +y) this is +x, so an object to the listener's right maps to
        // positive ear_axis and therefore the right channel (§8 scenario 3).
        let ear_axis = world_up
            .cross(&forward)
            .normalized()
            .unwrap_or(Vec3::new(1.0, 0.0, 0.0));
        let up = ear_axis.cross(&forward).normalized().unwrap_or(world_up);
        Self {
            forward,
            up,
            ear_axis,
        }
    }

    /// Projects `world_vector` into (right, up, forward) local coordinates.
    pub fn to_local(&self, world_vector: Vec3) -> Vec3 {
        Vec3::new(
            world_vector.dot(&self.ear_axis),
            world_vector.dot(&self.up),
            world_vector.dot(&self.forward),
        )
    }
}

/// Elevation in degrees above the horizontal plane and azimuth in degrees measured
/// clockwise from straight ahead, both in the listener's local frame. Matches the
/// convention the KEMAR measurement grid is indexed by (§4.3).
pub struct Spherical {
    pub elevation_deg: f32,
    pub azimuth_deg: f32,
}

impl Spherical {
    /// `local` must already be in the listener's local (right, up, forward) frame and
    /// normalized; degenerate (near-zero) input is handled by the caller (§7).
    pub fn from_local_direction(local: Vec3) -> Self {
        let elevation_deg = local.y.clamp(-1.0, 1.0).asin().to_degrees();
        let azimuth_deg = local.x.atan2(local.z).to_degrees();
        let azimuth_deg = if azimuth_deg < 0.0 {
            azimuth_deg + 360.0
        } else {
            azimuth_deg
        };
        Self {
            elevation_deg,
            azimuth_deg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerpf(2.0, 10.0, 0.0), 2.0);
        assert_eq!(lerpf(2.0, 10.0, 1.0), 10.0);
        assert_eq!(lerpf(2.0, 10.0, 0.5), 6.0);
    }

    #[test]
    fn straight_ahead_is_zero_azimuth_zero_elevation() {
        let basis = ListenerBasis::new(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 0.0));
        let local = basis.to_local(Vec3::new(0.0, 0.0, 5.0));
        let sph = Spherical::from_local_direction(local.normalized().unwrap());
        assert!(sph.azimuth_deg.abs() < 1e-3);
        assert!(sph.elevation_deg.abs() < 1e-3);
    }
}
