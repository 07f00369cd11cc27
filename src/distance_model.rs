//! Pure distance-attenuation and Doppler functions (§4.6 "Distance model").
//!
//! Everything here is a pure function of scalar inputs: no locking, no allocation, safe to
//! call from the hot mixing path on every (object, source) pair.

use crate::math::{clampf, Vec3};

/// One of the three attenuation curves the mixer can use. Each carries its own
/// parameters so `Context::set_distance_model` is a single value, not a model plus a
/// side-table of coefficients.
#[derive(Debug, Clone, Copy)]
pub enum DistanceModel {
    Inverse {
        ref_distance: f32,
        rolloff: f32,
        max_distance: f32,
    },
    Linear {
        ref_distance: f32,
        rolloff: f32,
        max_distance: f32,
    },
    Exponential {
        ref_distance: f32,
        rolloff: f32,
        max_distance: f32,
    },
}

impl Default for DistanceModel {
    fn default() -> Self {
        DistanceModel::Inverse {
            ref_distance: 1.0,
            rolloff: 1.0,
            max_distance: 1.0e6,
        }
    }
}

impl DistanceModel {
    /// Gain attenuation for a source at distance `r` from the listener. Monotonically
    /// non-increasing in `r` beyond `ref_distance`, per §8.
    pub fn gain(&self, r: f32) -> f32 {
        match *self {
            DistanceModel::Inverse {
                ref_distance,
                rolloff,
                max_distance,
            } => {
                let r = r.min(max_distance).max(ref_distance);
                ref_distance / (ref_distance + rolloff * (r - ref_distance))
            }
            DistanceModel::Linear {
                ref_distance,
                rolloff,
                max_distance,
            } => {
                let r = r.min(max_distance).max(ref_distance);
                let denom = (max_distance - ref_distance).max(1.0e-6);
                clampf(1.0 - rolloff * (r - ref_distance) / denom, 0.0, 1.0)
            }
            DistanceModel::Exponential {
                ref_distance,
                rolloff,
                max_distance,
            } => {
                let r = r.min(max_distance).max(ref_distance.max(1.0e-6));
                (r / ref_distance).powf(-rolloff)
            }
        }
    }

    /// Returns `(gain, doppler_pitch_factor)` for a source at relative position `r` (from
    /// listener to source) and relative velocities, using `speed_of_sound` as `c`
    /// (§4.6 "Doppler pitch factor").
    pub fn evaluate(
        &self,
        relative_position: Vec3,
        listener_velocity: Vec3,
        source_velocity: Vec3,
        speed_of_sound: f32,
    ) -> (f32, f32) {
        let distance = relative_position.len();
        let gain = self.gain(distance);

        let doppler = if distance < 1.0e-4 {
            1.0
        } else {
            // Unit vector from source to listener: this is the direction sound actually
            // propagates, and the sign convention the Doppler formula below expects.
            let dir_source_to_listener = relative_position.scale(-1.0 / distance);
            let v_l = listener_velocity.dot(&dir_source_to_listener);
            let v_s = source_velocity.dot(&dir_source_to_listener);
            let denom = speed_of_sound - v_s;
            if denom.abs() < 1.0e-4 {
                1.0
            } else {
                ((speed_of_sound - v_l) / denom).max(0.0)
            }
        };

        (gain, doppler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn inverse_gain_is_monotonic() {
        let model = DistanceModel::Inverse {
            ref_distance: 1.0,
            rolloff: 1.0,
            max_distance: 1000.0,
        };
        let mut prev = model.gain(1.0);
        for r in [2.0, 5.0, 10.0, 50.0, 200.0] {
            let g = model.gain(r);
            assert!(g <= prev + 1e-6, "gain should not increase with distance");
            prev = g;
        }
    }

    #[test]
    fn linear_gain_is_monotonic_and_clamped() {
        let model = DistanceModel::Linear {
            ref_distance: 1.0,
            rolloff: 1.0,
            max_distance: 10.0,
        };
        assert_relative_eq!(model.gain(1.0), 1.0, epsilon = 1e-5);
        assert_relative_eq!(model.gain(10.0), 0.0, epsilon = 1e-5);
        assert_relative_eq!(model.gain(100.0), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn exponential_gain_is_monotonic() {
        let model = DistanceModel::Exponential {
            ref_distance: 1.0,
            rolloff: 1.0,
            max_distance: 1000.0,
        };
        let mut prev = model.gain(1.0);
        for r in [2.0, 5.0, 10.0, 50.0] {
            let g = model.gain(r);
            assert!(g <= prev + 1e-6);
            prev = g;
        }
    }

    #[test]
    fn doppler_blueshift_when_source_approaches() {
        let model = DistanceModel::default();
        let relative_position = Vec3::new(0.0, 0.0, 100.0);
        let source_velocity = Vec3::new(0.0, 0.0, -10.0);
        let (_, pitch) = model.evaluate(relative_position, Vec3::ZERO, source_velocity, 340.0);
        assert_relative_eq!(pitch, 340.0 / (340.0 - 10.0), epsilon = 1e-4);
    }
}
