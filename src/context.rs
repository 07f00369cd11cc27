//! `Context`: the mixer (§4.6).
//!
//! Grounded on the teacher's `examples/reverb.rs` API shape (`Context::new().unwrap()`
//! wrapped in `Arc<Mutex<_>>`, a single lock held for the duration of any operation) and
//! on §5's "one non-recursive audio lock" concurrency model. `process` is the only method
//! the host's real-time callback calls; everything else runs on the API thread under the
//! same lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use crate::device::{clip_to_i16, OutputFormat};
use crate::distance_model::DistanceModel;
use crate::error::{SoundError, SoundResult};
use crate::hrtf::{self, Bin};
use crate::listener::Listener;
use crate::object::Object;
use crate::pool::{Handle, Pool};
use crate::sample::{Sample, SampleRegistry};
use crate::source::SourceParams;
use crate::stream::Stream;

/// Owns the listener, the object graph, the sample registry, and the output format
/// (§3 "Context" row). Constructed once, wrapped in `Arc<Mutex<_>>` by the host, and
/// shared between the API thread and the audio callback thread (§5).
pub struct Context {
    listener: Listener,
    objects: Pool<Object>,
    samples: SampleRegistry,
    distance_model: DistanceModel,
    master_gain: f32,
    speed_of_sound: f32,
    output: OutputFormat,

    mix_left: Vec<f32>,
    mix_right: Vec<f32>,
    scratch_left: Vec<f32>,
    scratch_right: Vec<f32>,
    ir_left_scratch: Vec<f32>,
    ir_right_scratch: Vec<f32>,
    resampled_cache: HashMap<Bin, (Vec<f32>, Vec<f32>)>,
}

/// Speed of sound in air at roughly room temperature, m/s; the default `c` the Doppler
/// factor uses unless overridden with [`Context::set_speed_of_sound`].
pub const DEFAULT_SPEED_OF_SOUND: f32 = 340.0;

/// Fills `left_scratch`/`right_scratch` with the impulse-response pair for `bin`, resampled
/// to `target_rate` if that differs from the table's native 44.1 kHz (§6) and normalized
/// back to `hrtf::IR_LEN` taps so the per-source convolver's fixed overlap length stays
/// valid (see DESIGN.md for the tradeoff this simplification makes). A free function rather
/// than a `Context` method so it can run inside a loop that already holds a mutable borrow
/// of `self.objects`.
fn load_ir(
    cache: &mut HashMap<Bin, (Vec<f32>, Vec<f32>)>,
    left_scratch: &mut Vec<f32>,
    right_scratch: &mut Vec<f32>,
    target_rate: u32,
    bin: Bin,
    native_left: &[f32],
    native_right: &[f32],
) {
    if target_rate == hrtf::NATIVE_SAMPLE_RATE {
        left_scratch.clear();
        left_scratch.extend_from_slice(native_left);
        right_scratch.clear();
        right_scratch.extend_from_slice(native_right);
    } else {
        let (left, right) = cache.entry(bin).or_insert_with(|| {
            (
                hrtf::table::resample_linear(native_left, hrtf::NATIVE_SAMPLE_RATE, target_rate),
                hrtf::table::resample_linear(native_right, hrtf::NATIVE_SAMPLE_RATE, target_rate),
            )
        });
        left_scratch.clear();
        left_scratch.extend_from_slice(left);
        right_scratch.clear();
        right_scratch.extend_from_slice(right);
    }
    left_scratch.resize(hrtf::IR_LEN, 0.0);
    right_scratch.resize(hrtf::IR_LEN, 0.0);
}

impl Context {
    /// Creates a context for the given output format, preallocating every scratch buffer
    /// the mixer's hot path needs so `process` never allocates (§5).
    pub fn new(output: OutputFormat) -> SoundResult<Arc<Mutex<Self>>> {
        if output.sample_rate == 0 {
            return Err(SoundError::AllocationFailed("zero output sample rate".into()));
        }
        let frames = output.frames_per_callback;
        let context = Self {
            listener: Listener::default(),
            objects: Pool::new(),
            samples: SampleRegistry::new(),
            distance_model: DistanceModel::default(),
            master_gain: 1.0,
            speed_of_sound: DEFAULT_SPEED_OF_SOUND,
            output,
            mix_left: vec![0.0; frames],
            mix_right: vec![0.0; frames],
            scratch_left: vec![0.0; frames],
            scratch_right: vec![0.0; frames],
            ir_left_scratch: vec![0.0; hrtf::IR_LEN],
            ir_right_scratch: vec![0.0; hrtf::IR_LEN],
            resampled_cache: HashMap::new(),
        };
        debug!(
            "context created: {} Hz, {} frames/callback",
            output.sample_rate, frames
        );
        Ok(Arc::new(Mutex::new(context)))
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output
    }

    pub fn set_listener(&mut self, listener: Listener) {
        self.listener = listener;
    }

    pub fn listener(&self) -> Listener {
        self.listener
    }

    /// `set_volume(master)` (§4.6).
    pub fn set_volume(&mut self, master: f32) {
        self.master_gain = master.max(0.0);
    }

    /// `set_distance_model(...)` (§4.6).
    pub fn set_distance_model(&mut self, model: DistanceModel) {
        self.distance_model = model;
    }

    pub fn set_speed_of_sound(&mut self, c: f32) {
        self.speed_of_sound = c.max(1.0);
    }

    /// Registers a fully decoded sample under `name`, reachable afterwards from `play_sample`
    /// by that name (§5 "Ownership": "Source borrows Samples ... by lookup name from
    /// Context's sample table").
    pub fn register_sample(&mut self, name: impl Into<String>, sample: Sample) -> Arc<Sample> {
        self.samples.register(name, sample)
    }

    /// `create_object()` (§4.6).
    pub fn create_object(&mut self) -> Handle<Object> {
        self.objects.spawn(Object::new())
    }

    pub fn object(&self, handle: Handle<Object>) -> Option<&Object> {
        self.objects.borrow(handle)
    }

    pub fn object_mut(&mut self, handle: Handle<Object>) -> Option<&mut Object> {
        self.objects.borrow_mut(handle)
    }

    pub fn destroy_object(&mut self, handle: Handle<Object>) {
        self.objects.free(handle);
    }

    /// `play(sample, params) → Source*` against a named, previously registered `Sample`
    /// (§4.6). `name`/`index` are the object-local multimap keys (§4.5).
    pub fn play_sample(
        &mut self,
        object: Handle<Object>,
        name: &str,
        index: u32,
        sample_name: &str,
        params: SourceParams,
    ) -> SoundResult<Handle<crate::source::Source>> {
        let sample = self.samples.get(sample_name)?;
        let source = crate::source::Source::from_sample(sample, self.output.frames_per_callback, params)?;
        let object = self
            .objects
            .borrow_mut(object)
            .ok_or_else(|| SoundError::NotFound("object handle".into()))?;
        Ok(object.play(name, index, source))
    }

    /// `play(stream, params) → Source*` against a host-supplied pull decoder (§4.6).
    pub fn play_stream(
        &mut self,
        object: Handle<Object>,
        name: &str,
        index: u32,
        stream: Box<dyn Stream>,
        params: SourceParams,
    ) -> SoundResult<Handle<crate::source::Source>> {
        let source = crate::source::Source::from_stream(stream, self.output.frames_per_callback, params)?;
        let object = self
            .objects
            .borrow_mut(object)
            .ok_or_else(|| SoundError::NotFound("object handle".into()))?;
        Ok(object.play(name, index, source))
    }

    fn ensure_scratch_capacity(&mut self, frames: usize) {
        if self.mix_left.len() < frames {
            self.mix_left.resize(frames, 0.0);
            self.mix_right.resize(frames, 0.0);
            self.scratch_left.resize(frames, 0.0);
            self.scratch_right.resize(frames, 0.0);
        }
    }

    /// `process(buf, B)` (§4.6): the real-time audio callback. `buf` is interleaved
    /// signed 16-bit stereo, at least `frames * 2` samples long.
    pub fn process(&mut self, buf: &mut [i16], frames: usize) -> SoundResult<()> {
        if buf.len() < frames * 2 {
            return Err(SoundError::InvalidFormat(
                "output buffer shorter than frames*2".into(),
            ));
        }
        self.ensure_scratch_capacity(frames);

        for v in self.mix_left[..frames].iter_mut() {
            *v = 0.0;
        }
        for v in self.mix_right[..frames].iter_mut() {
            *v = 0.0;
        }

        let listener = self.listener;
        let basis = listener.basis();
        let speed_of_sound = self.speed_of_sound;
        let distance_model = self.distance_model;
        let output_rate = self.output.sample_rate;

        let mut dead_objects = Vec::new();
        let resampled_cache = &mut self.resampled_cache;
        let ir_left_scratch = &mut self.ir_left_scratch;
        let ir_right_scratch = &mut self.ir_right_scratch;
        for (handle, object) in self.objects.pair_iter_mut() {
            let relative_position = object.pose.position - listener.position;
            let (distance_gain, distance_pitch) =
                distance_model.evaluate(relative_position, listener.velocity, object.pose.velocity, speed_of_sound);

            let local_direction = basis.to_local(relative_position);
            let (bin, native_left, native_right) = hrtf::table().lookup(local_direction);

            // §7's "degenerate direction vector with |r|=0": the table substitutes a
            // neutral, audible IR for this case (see hrtf::table::NEUTRAL_BIN), so only
            // logging for diagnosability is needed here.
            if relative_position.len() < 1.0e-4 {
                warn!("object at listener position; HRTF direction is degenerate, using neutral IR");
            }

            load_ir(
                resampled_cache,
                ir_left_scratch,
                ir_right_scratch,
                output_rate,
                bin,
                native_left,
                native_right,
            );

            object.render_into(
                frames,
                distance_gain,
                distance_pitch,
                output_rate,
                bin,
                ir_left_scratch,
                ir_right_scratch,
                &mut self.mix_left[..frames],
                &mut self.mix_right[..frames],
                &mut self.scratch_left[..frames],
                &mut self.scratch_right[..frames],
            );

            if object.is_dead() && !object.has_sources() {
                dead_objects.push(handle);
            }
        }

        for handle in dead_objects {
            self.objects.free(handle);
            debug!("reaped object {handle:?}");
        }

        let master = self.master_gain;
        for i in 0..frames {
            buf[2 * i] = clip_to_i16(self.mix_left[i] * master);
            buf[2 * i + 1] = clip_to_i16(self.mix_right[i] * master);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::sample::{PcmFormat, SampleWidth};

    fn sine_sample(frames: usize, rate: u32, freq: f32) -> Sample {
        let mut buf = Buffer::new();
        for n in 0..frames {
            let t = n as f32 / rate as f32;
            let v = (2.0 * std::f32::consts::PI * freq * t).sin();
            buf.append(&((v * i16::MAX as f32) as i16).to_le_bytes());
        }
        Sample::new(
            buf,
            PcmFormat {
                sample_rate: rate,
                channels: 1,
                width: SampleWidth::I16,
            },
        )
        .unwrap()
    }

    #[test]
    fn silent_scene_produces_silence() {
        let context = Context::new(OutputFormat::new(44100, 256)).unwrap();
        let mut ctx = context.lock().unwrap();
        let mut buf = vec![1234i16; 256 * 2];
        ctx.process(&mut buf, 256).unwrap();
        assert!(buf.iter().all(|&s| s == 0));
    }

    #[test]
    fn looping_source_on_median_plane_is_balanced() {
        let context = Context::new(OutputFormat::new(44100, 1024)).unwrap();
        let mut ctx = context.lock().unwrap();
        ctx.register_sample("tone", sine_sample(44100, 44100, 1000.0));
        let object = ctx.create_object();
        ctx.play_sample(
            object,
            "tone",
            0,
            "tone",
            SourceParams {
                loop_enabled: true,
                ..Default::default()
            },
        )
        .unwrap();

        let mut buf = vec![0i16; 1024 * 2];
        let mut max_abs = 0i32;
        for _ in 0..10 {
            ctx.process(&mut buf, 1024).unwrap();
            for &s in buf.iter() {
                max_abs = max_abs.max(s.unsigned_abs() as i32);
            }
        }
        assert!(max_abs > (i16::MAX as f32 * 0.5) as i32);
    }

    #[test]
    fn object_reaped_after_autodelete_and_playback_end() {
        let context = Context::new(OutputFormat::new(44100, 256)).unwrap();
        let mut ctx = context.lock().unwrap();
        ctx.register_sample("blip", sine_sample(256, 44100, 440.0));
        let object = ctx.create_object();
        ctx.play_sample(object, "blip", 0, "blip", SourceParams::default()).unwrap();
        ctx.object_mut(object).unwrap().autodelete();

        let mut buf = vec![0i16; 256 * 2];
        for _ in 0..10 {
            ctx.process(&mut buf, 256).unwrap();
        }
        assert!(ctx.object(object).is_none());
    }
}
