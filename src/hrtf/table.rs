//! The KEMAR-style HRTF table: an elevation x azimuth grid of impulse responses, with
//! mirror symmetry standing in for the second ear (§4.3).
//!
//! The real library this crate is modeled on ships the actual measured KEMAR dataset as a
//! compiled-in binary blob loaded at startup. That dataset (a multi-megabyte set of WAV
//! impulse responses) is not part of this crate's sources, so the table here is built
//! procedurally from a simple spherical-head model (interaural time difference via the
//! Woodworth approximation, plus a one-pole head-shadow filter) instead of being parsed
//! from a measurement file. See DESIGN.md for the rationale; the table's *shape* — grid
//! layout, nearest-neighbor lookup, mirror symmetry — is exactly what the spec describes,
//! only the impulse response values are synthetic rather than measured.

use std::sync::OnceLock;

use crate::math::Vec3;
use crate::math::Spherical;

/// Length of every impulse response in the table, in samples (§4.3, §6).
pub const IR_LEN: usize = 128;

/// Sample rate the table's impulse responses are defined at; resampled to the context's
/// output rate if that differs (§6).
pub const NATIVE_SAMPLE_RATE: u32 = 44100;

const ELEVATIONS_DEG: &[f32] = &[
    -40.0, -30.0, -20.0, -10.0, 0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0,
];

fn azimuth_count_for(elevation_deg: f32) -> usize {
    match elevation_deg.round() as i32 {
        -40 | 40 => 56,
        -30 | 30 => 60,
        -20..=20 => 72,
        50 => 45,
        60 => 36,
        70 => 24,
        80 => 12,
        _ => 1, // the pole (+90) has a single measurement: azimuth is meaningless there.
    }
}

fn circular_distance_deg(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

/// One row of the grid: a fixed elevation, with impulse responses at uniformly spaced
/// azimuths around the full circle.
struct Row {
    elevation_deg: f32,
    azimuths_deg: Vec<f32>,
    /// One impulse response per azimuth entry. By construction (see `synth_ir`) this is
    /// the response as heard by a single reference ear; the other ear's response for any
    /// direction is this same table read back at the mirrored azimuth.
    irs: Vec<Vec<f32>>,
}

impl Row {
    fn nearest_azimuth_index(&self, azimuth_deg: f32) -> usize {
        self.azimuths_deg
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                circular_distance_deg(**a, azimuth_deg)
                    .partial_cmp(&circular_distance_deg(**b, azimuth_deg))
                    .unwrap()
            })
            .map(|(index, _)| index)
            .unwrap_or(0)
    }
}

/// A direction-indexed KEMAR-style table: nearest-elevation-then-nearest-azimuth lookup,
/// returning a `(row_index, azimuth_index)` bin identifying the measurement used (stable
/// across calls for the same quantized direction — the cache key sources used to memoize
/// each direction's HRTF spectrum key off of).
pub struct HrtfTable {
    rows: Vec<Row>,
    /// Stand-in IR used for a degenerate (near-zero) direction: frontal, equal-L/R,
    /// full-gain. `row_index` is `usize::MAX`, outside the range any real row can ever
    /// take, so this never collides with a genuine measurement's bin.
    neutral_ir: Vec<f32>,
}

pub type Bin = (usize, usize);

/// The bin returned for a degenerate direction (§7): distinct from every real
/// `(row_index, azimuth_index)` pair so a co-located source's silence-free neutral IR
/// can never be memoized under, or mistaken for, a genuine measurement's cache entry.
pub const NEUTRAL_BIN: Bin = (usize::MAX, 0);

impl HrtfTable {
    fn nearest_row_index(&self, elevation_deg: f32) -> usize {
        self.rows
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (a.elevation_deg - elevation_deg)
                    .abs()
                    .partial_cmp(&(b.elevation_deg - elevation_deg).abs())
                    .unwrap()
            })
            .map(|(index, _)| index)
            .unwrap_or(0)
    }

    /// Snaps `direction` (need not be normalized) to the nearest measured direction and
    /// returns its bin plus the left/right impulse responses (§4.3). A degenerate
    /// (near-zero) direction — a source co-located with the listener — returns
    /// [`NEUTRAL_BIN`] with a neutral frontal, equal-L/R, full-gain impulse response
    /// instead of silence, so a co-located source stays audible and balanced.
    pub fn lookup(&self, direction: Vec3) -> (Bin, &[f32], &[f32]) {
        let Some(dir) = direction.normalized() else {
            return (NEUTRAL_BIN, &self.neutral_ir, &self.neutral_ir);
        };
        let sph = Spherical::from_local_direction(dir);
        let row_index = self.nearest_row_index(sph.elevation_deg);
        let row = &self.rows[row_index];
        let az_index = row.nearest_azimuth_index(sph.azimuth_deg);

        let mirrored_azimuth = (360.0 - row.azimuths_deg[az_index]).rem_euclid(360.0);
        let mirror_index = row.nearest_azimuth_index(mirrored_azimuth);

        let right = &row.irs[az_index];
        let left = &row.irs[mirror_index];
        ((row_index, az_index), left, right)
    }
}

/// An impulse response as a function of a single "nearness" parameter in `[-1, 1]`: `+1`
/// is the direction directly facing this ear (shortest path, least head shadow), `-1` is
/// directly facing the opposite ear (longest path, most head shadow).
fn synth_ir(nearness: f32) -> Vec<f32> {
    const HEAD_RADIUS_M: f32 = 0.0875;
    const SPEED_OF_SOUND: f32 = 340.0;
    const MAX_ITD_SAMPLES: f32 =
        HEAD_RADIUS_M * (std::f32::consts::FRAC_PI_2 + 1.0) / SPEED_OF_SOUND * NATIVE_SAMPLE_RATE as f32;

    let delay = MAX_ITD_SAMPLES * (0.5 - 0.5 * nearness).max(0.0);
    let gain = 0.35 + 0.65 * (0.5 + 0.5 * nearness);
    let cutoff = (0.15 + 0.85 * (0.5 + 0.5 * nearness)).clamp(0.05, 1.0);

    let mut ir = vec![0.0f32; IR_LEN];
    let onset = delay.clamp(0.0, (IR_LEN - 16) as f32);
    let onset_index = onset.floor() as usize;
    let frac = onset - onset_index as f32;

    let mut state = 0.0f32;
    for k in 0..16 {
        let impulse = match k {
            0 => 1.0 - frac,
            1 => frac,
            _ => 0.0,
        };
        state += cutoff * (impulse - state);
        if onset_index + k < IR_LEN {
            ir[onset_index + k] = gain * state;
        }
    }
    ir
}

/// A frontal, equal-L/R, full-gain impulse response: no head shadow, no ITD, unit gain.
/// Used for a degenerate direction rather than `synth_ir(0.0)`, which already carries
/// some head-shadow attenuation and onset delay at the neutral "nearness" of zero.
fn neutral_ir() -> Vec<f32> {
    let mut ir = vec![0.0f32; IR_LEN];
    ir[0] = 1.0;
    ir
}

fn build() -> HrtfTable {
    let rows = ELEVATIONS_DEG
        .iter()
        .map(|&elevation_deg| {
            let count = azimuth_count_for(elevation_deg);
            let azimuths_deg: Vec<f32> = (0..count).map(|k| k as f32 * 360.0 / count as f32).collect();
            let irs = azimuths_deg
                .iter()
                .map(|&az| {
                    let lateral = az.to_radians().sin() * elevation_deg.to_radians().cos();
                    synth_ir(lateral)
                })
                .collect();
            Row {
                elevation_deg,
                azimuths_deg,
                irs,
            }
        })
        .collect();
    HrtfTable {
        rows,
        neutral_ir: neutral_ir(),
    }
}

static TABLE: OnceLock<HrtfTable> = OnceLock::new();

/// The process-wide compiled-in table (§3 "HRTF table" row: "process-wide static
/// constant, read-only after init").
pub fn table() -> &'static HrtfTable {
    TABLE.get_or_init(build)
}

/// Linearly resamples an impulse response captured at `NATIVE_SAMPLE_RATE` to
/// `target_rate` (§6: "resampled on init to the configured output rate if different").
pub fn resample_linear(ir: &[f32], native_rate: u32, target_rate: u32) -> Vec<f32> {
    if native_rate == target_rate {
        return ir.to_vec();
    }
    let ratio = native_rate as f64 / target_rate as f64;
    let out_len = ((ir.len() as f64) / ratio).round() as usize;
    (0..out_len)
        .map(|i| {
            let src_pos = i as f64 * ratio;
            let i0 = src_pos.floor() as usize;
            let frac = (src_pos - i0 as f64) as f32;
            let a = ir.get(i0).copied().unwrap_or(0.0);
            let b = ir.get(i0 + 1).copied().unwrap_or(a);
            a + (b - a) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_symmetry() {
        let table = table();
        for az_deg in [10.0, 45.0, 90.0, 133.0, 200.0, 300.0] {
            let az = az_deg.to_radians();
            let dir = Vec3::new(az.sin(), 0.0, az.cos());
            let mirrored = Vec3::new(-az.sin(), 0.0, az.cos());

            let (_, left, right) = table.lookup(dir);
            let (_, mirrored_left, mirrored_right) = table.lookup(mirrored);

            assert_eq!(left, mirrored_right);
            assert_eq!(right, mirrored_left);
        }
    }

    #[test]
    fn degenerate_direction_is_neutral_not_silent() {
        let table = table();
        let (bin, left, right) = table.lookup(Vec3::ZERO);
        assert_eq!(bin, NEUTRAL_BIN);
        assert!(bin.0 >= ELEVATIONS_DEG.len(), "neutral bin must not collide with a real row index");
        assert_eq!(left, right, "co-located source must be balanced L/R");
        assert!(left.iter().any(|&s| s != 0.0), "co-located source must stay audible");
    }

    #[test]
    fn resample_preserves_endpoints_roughly() {
        let ir = vec![1.0, 0.5, 0.25, 0.0];
        let resampled = resample_linear(&ir, 44100, 22050);
        assert_eq!(resampled.len(), 2);
    }
}
