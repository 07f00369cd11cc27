//! Output device format.
//!
//! Opening and driving an actual audio device is an external collaborator (§1 scope):
//! this module only carries the format the mixer renders into. A host wires `Context` to
//! a real device by calling [`crate::context::Context::process`] from its own callback.

/// Default output sample rate used when a host does not request a specific one.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Output is always interleaved signed 16-bit stereo (§6); only the sample rate and the
/// block size the host's callback asks for per `process` call are configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub sample_rate: u32,
    /// Typical frames-per-callback the host intends to request; used only to size
    /// preallocated scratch buffers up front (§5: no allocation on the hot path). A host
    /// that asks `process` for more frames than this in one call still gets correct
    /// output, just with an internal buffer grow the first time it happens.
    pub frames_per_callback: usize,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            frames_per_callback: 1024,
        }
    }
}

impl OutputFormat {
    pub fn new(sample_rate: u32, frames_per_callback: usize) -> Self {
        Self {
            sample_rate,
            frames_per_callback,
        }
    }
}

/// Clips a floating-point sample into the output PCM range and converts it to `i16`.
pub fn clip_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}
