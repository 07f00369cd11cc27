//! Listener pose, owned by `Context` (§3 "Context" row).

use crate::math::{ListenerBasis, Vec3};

/// Position, velocity and orientation of the single listener in the scene.
#[derive(Debug, Clone, Copy)]
pub struct Listener {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Forward unit vector; the ear axis is derived from this and `up` (§6).
    pub orientation: Vec3,
    pub up: Vec3,
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            orientation: Vec3::new(0.0, 0.0, 1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
        }
    }
}

impl Listener {
    pub fn basis(&self) -> ListenerBasis {
        ListenerBasis::new(self.orientation, self.up)
    }
}
