//! Cross-platform 3D positional audio mixing with HRTF binaural rendering.
//!
//! A host creates a [`Context`](context::Context), registers decoded [`Sample`](sample::Sample)s
//! or wires up [`Stream`](stream::Stream) decoders, spawns [`Object`](object::Object)s to place
//! sounds in the scene, and calls [`Context::process`](context::Context::process) once per audio
//! callback to mix and render the binaural output. See `SPEC_FULL.md` and `DESIGN.md` in the
//! repository root for the full design and its grounding in this crate's own history.
//!
//! Decoding compressed audio formats (Vorbis, MP3, ...) into PCM, and talking to an actual
//! audio device, are both out of scope: the host supplies already-decoded PCM and drives
//! `process` from its own output callback.

pub mod buffer;
pub mod context;
pub mod device;
pub mod distance_model;
pub mod dsp;
pub mod error;
pub mod hrtf;
pub mod listener;
pub mod math;
pub mod object;
pub mod pool;
pub mod sample;
pub mod source;
pub mod stream;

pub use context::Context;
pub use distance_model::DistanceModel;
pub use error::{SoundError, SoundResult};
pub use listener::Listener;
pub use object::{Object, Pose};
pub use pool::Handle;
pub use sample::{PcmFormat, Sample, SampleWidth};
pub use source::SourceParams;
pub use stream::Stream;
