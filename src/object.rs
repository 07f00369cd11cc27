//! `Object`: a spatial emitter owning a keyed collection of `Source`s (§4.5).
//!
//! The spec's multimaps keyed by name and by integer index are really two indexes into
//! one collection of sources; modeled here as one `Pool<Source>` the object owns plus two
//! `HashMap`s of handles, rather than two independent owning collections (which would make
//! "a source lives under both of its keys" an invariant instead of a structural fact).

use std::collections::HashMap;

use crate::hrtf::Bin;
use crate::math::Vec3;
use crate::pool::{Handle, Pool};
use crate::source::Source;

/// Pose of an `Object` in world coordinates (§3 "Object" row).
#[derive(Debug, Clone, Copy, Default)]
pub struct Pose {
    pub position: Vec3,
    pub velocity: Vec3,
    pub direction: Vec3,
}

/// A spatial emitter: pose plus a keyed collection of playing `Source`s.
pub struct Object {
    pub pose: Pose,
    sources: Pool<Source>,
    by_name: HashMap<String, Vec<Handle<Source>>>,
    by_index: HashMap<u32, Vec<Handle<Source>>>,
    dead: bool,
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl Object {
    pub fn new() -> Self {
        Self {
            pose: Pose::default(),
            sources: Pool::new(),
            by_name: HashMap::new(),
            by_index: HashMap::new(),
            dead: false,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }

    /// `play(key, source)`: inserts under both the name key and the integer key. Multiple
    /// sources per key are permitted (overlapping plays) (§4.5).
    pub fn play(&mut self, name: &str, index: u32, source: Source) -> Handle<Source> {
        let handle = self.sources.spawn(source);
        self.by_name.entry(name.to_string()).or_default().push(handle);
        self.by_index.entry(index).or_default().push(handle);
        handle
    }

    fn handles_for_name(&self, name: &str) -> Vec<Handle<Source>> {
        self.by_name.get(name).cloned().unwrap_or_default()
    }

    /// `fade_out(key, tau)`: triggers fade-out on all sources under `key` (§4.5).
    pub fn fade_out(&mut self, name: &str, tau: f32) {
        for handle in self.handles_for_name(name) {
            if let Some(source) = self.sources.borrow_mut(handle) {
                source.trigger_fade_out(tau);
            }
        }
    }

    /// `cancel(key, tau)`: tau=0 destroys all sources under key immediately; tau>0 fades
    /// out only the looping ones, leaving non-looping sources to finish (§4.5, §9 open
    /// question (b)).
    pub fn cancel(&mut self, name: &str, tau: f32) {
        let handles = self.handles_for_name(name);
        if tau <= 0.0 {
            for handle in handles {
                if let Some(source) = self.sources.borrow_mut(handle) {
                    source.cancel_immediate();
                }
            }
        } else {
            for handle in handles {
                if let Some(source) = self.sources.borrow_mut(handle) {
                    if source.is_looping() {
                        source.trigger_fade_out(tau);
                    }
                }
            }
        }
    }

    /// `set_loop(key, flag)`: sets the loop flag on the first source under `key`,
    /// explicitly disabling it on the rest (§4.5, §9 open question (a): "first" means
    /// first in insertion order, which is what `by_name`'s `Vec` preserves).
    pub fn set_loop(&mut self, name: &str, flag: bool) {
        let handles = self.handles_for_name(name);
        for (i, handle) in handles.into_iter().enumerate() {
            if let Some(source) = self.sources.borrow_mut(handle) {
                source.set_loop(i == 0 && flag);
            }
        }
    }

    /// `get_loop(key)`: true iff any source under `key` has loop=true (§4.5).
    pub fn get_loop(&self, name: &str) -> bool {
        self.handles_for_name(name)
            .iter()
            .filter_map(|&h| self.sources.borrow(h))
            .any(Source::is_looping)
    }

    /// `playing(key)`: true iff any source exists under `key` (§4.5).
    pub fn playing(&self, name: &str) -> bool {
        !self.handles_for_name(name).is_empty()
    }

    /// `cancel_all(force, tau)`: destroys every source if `force`, otherwise fades out
    /// only the looping ones (§4.5).
    pub fn cancel_all(&mut self, force: bool, tau: f32) {
        if force {
            for source in self.sources.iter_mut() {
                source.cancel_immediate();
            }
        } else {
            for source in self.sources.iter_mut() {
                if source.is_looping() {
                    source.trigger_fade_out(tau);
                }
            }
        }
    }

    /// Marks the object dead and cancels all of its sources; the mixer reaps it once no
    /// sources remain (§4.5).
    pub fn autodelete(&mut self) {
        self.dead = true;
        self.cancel_all(true, 0.0);
    }

    /// Renders every live source's contribution for this callback, in insertion order
    /// (§4.6, §5 "Ordering"), summing directly into `left_out`/`right_out`, and reaps any
    /// source that dies during this call.
    #[allow(clippy::too_many_arguments)]
    pub fn render_into(
        &mut self,
        frames: usize,
        distance_gain: f32,
        distance_pitch: f32,
        output_rate: u32,
        bin: Bin,
        left_ir: &[f32],
        right_ir: &[f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
        scratch_left: &mut [f32],
        scratch_right: &mut [f32],
    ) {
        let mut dead_handles = Vec::new();
        for (handle, source) in self.sources.pair_iter_mut() {
            let alive = source.render(
                frames,
                distance_gain,
                distance_pitch,
                output_rate,
                bin,
                left_ir,
                right_ir,
                scratch_left,
                scratch_right,
            );
            for ((out_l, out_r), (s_l, s_r)) in left_out
                .iter_mut()
                .zip(right_out.iter_mut())
                .zip(scratch_left.iter().zip(scratch_right.iter()))
            {
                *out_l += *s_l;
                *out_r += *s_r;
            }
            if !alive {
                dead_handles.push(handle);
            }
        }
        for handle in dead_handles {
            self.sources.free(handle);
            self.by_name.retain(|_, handles| {
                handles.retain(|h| *h != handle);
                !handles.is_empty()
            });
            self.by_index.retain(|_, handles| {
                handles.retain(|h| *h != handle);
                !handles.is_empty()
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::sample::{PcmFormat, Sample, SampleWidth};
    use crate::source::SourceParams;
    use std::sync::Arc;

    fn silent_sample(frames: usize) -> Arc<Sample> {
        let mut buf = Buffer::new();
        buf.resize(frames * 2);
        Arc::new(
            Sample::new(
                buf,
                PcmFormat {
                    sample_rate: 44100,
                    channels: 1,
                    width: SampleWidth::I16,
                },
            )
            .unwrap(),
        )
    }

    #[test]
    fn set_loop_disables_all_but_first() {
        let mut object = Object::new();
        let block_len = 32;
        let sample = silent_sample(block_len * 4);
        let h1 = Source::from_sample(sample.clone(), block_len, SourceParams::default()).unwrap();
        let h2 = Source::from_sample(sample, block_len, SourceParams::default()).unwrap();
        object.play("shot", 0, h1);
        object.play("shot", 0, h2);

        object.set_loop("shot", true);
        assert!(object.get_loop("shot"));

        let handles = object.handles_for_name("shot");
        assert!(object.sources.borrow(handles[0]).unwrap().is_looping());
        assert!(!object.sources.borrow(handles[1]).unwrap().is_looping());
    }

    #[test]
    fn cancel_zero_destroys_immediately() {
        let mut object = Object::new();
        let block_len = 32;
        let sample = silent_sample(block_len * 4);
        let source = Source::from_sample(sample, block_len, SourceParams::default()).unwrap();
        object.play("shot", 0, source);
        assert!(object.playing("shot"));
        object.cancel("shot", 0.0);

        let mut left = vec![0.0; block_len];
        let mut right = vec![0.0; block_len];
        let mut scratch_l = vec![0.0; block_len];
        let mut scratch_r = vec![0.0; block_len];
        object.render_into(
            block_len,
            1.0,
            1.0,
            44100,
            (0, 0),
            &[0.0; crate::hrtf::IR_LEN],
            &[0.0; crate::hrtf::IR_LEN],
            &mut left,
            &mut right,
            &mut scratch_l,
            &mut scratch_r,
        );
        assert!(!object.playing("shot"));
    }
}
