//! `Stream`: an abstract pull-based PCM source, owned and driven single-threaded by the
//! `Source` that wraps it (§3, §6 "Stream pull interface").

use crate::buffer::Buffer;
use crate::sample::PcmFormat;

/// A pull-based decoder. Implementations are the host's problem (§1): the core only
/// consumes this interface. `read` may return fewer than `hint_bytes` without that
/// implying end-of-stream; only a `false` return means "no more data".
pub trait Stream: Send {
    /// The PCM layout this stream produces. Must not change across the stream's lifetime.
    fn format(&self) -> PcmFormat;

    /// Seeks back to the beginning of the stream, e.g. to honor looping.
    fn rewind(&mut self);

    /// Requests roughly `hint_bytes` more bytes into `out`, appending to whatever is
    /// already there. Returns `false` at end-of-stream.
    fn read(&mut self, out: &mut Buffer, hint_bytes: usize) -> bool;
}

/// Test-only `Stream` fixtures, also used by integration tests under `tests/` when the
/// `test-util` feature is enabled.
#[cfg(any(test, feature = "test-util"))]
pub mod test_support {
    use super::*;
    use crate::sample::SampleWidth;

    /// A `Stream` that yields a fixed-frequency sine wave forever, for use in the mixer's
    /// own tests and in scenario tests (§8 "Looping continuity", "Doppler").
    pub struct SineStream {
        pub sample_rate: u32,
        pub frequency: f32,
        phase: f32,
        pub finite_frames: Option<usize>,
        frames_emitted: usize,
    }

    impl SineStream {
        pub fn new(sample_rate: u32, frequency: f32, finite_frames: Option<usize>) -> Self {
            Self {
                sample_rate,
                frequency,
                phase: 0.0,
                finite_frames,
                frames_emitted: 0,
            }
        }
    }

    impl Stream for SineStream {
        fn format(&self) -> PcmFormat {
            PcmFormat {
                sample_rate: self.sample_rate,
                channels: 1,
                width: SampleWidth::I16,
            }
        }

        fn rewind(&mut self) {
            self.phase = 0.0;
            self.frames_emitted = 0;
        }

        fn read(&mut self, out: &mut Buffer, hint_bytes: usize) -> bool {
            let frames_wanted = hint_bytes / 2;
            for _ in 0..frames_wanted {
                if let Some(limit) = self.finite_frames {
                    if self.frames_emitted >= limit {
                        return false;
                    }
                }
                let sample = (self.phase.sin() * i16::MAX as f32) as i16;
                out.append(&sample.to_le_bytes());
                self.phase += 2.0 * std::f32::consts::PI * self.frequency / self.sample_rate as f32;
                self.frames_emitted += 1;
            }
            true
        }
    }
}
