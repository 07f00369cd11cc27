//! `Source`: per-emitter playback state (§4.4).
//!
//! Grounded on the teacher's `Source` (see `6c312e81_...source.rs.rs` in the retrieval
//! pack): a rational playback cursor, per-ear last-frame state, and a `sample_into`-style
//! per-block pull loop. Replaced wholesale: the teacher resamples into a flat pan/gain
//! mix; this resamples into a mono block and hands it to the HRTF overlap-save convolver
//! (`crate::hrtf::convolver`) instead.

use crate::error::SoundResult;
use crate::hrtf::{Bin, HrtfConvolver};
use crate::math::clampf;
use crate::sample::{PcmFormat, Sample};
use crate::stream::Stream;
use std::sync::Arc;

/// What a `Source` pulls frames from: a shared immutable `Sample`, or an owned, mutable
/// `Stream` (§3 "Source" row).
enum Input {
    Sample { sample: Arc<Sample>, pos: usize },
    Stream {
        stream: Box<dyn Stream>,
        format: PcmFormat,
        buf: crate::buffer::Buffer,
        byte_pos: usize,
    },
}

impl Input {
    fn format(&self) -> PcmFormat {
        match self {
            Input::Sample { sample, .. } => sample.format(),
            Input::Stream { format, .. } => *format,
        }
    }

    fn rewind(&mut self) {
        match self {
            Input::Sample { pos, .. } => *pos = 0,
            Input::Stream {
                stream,
                buf,
                byte_pos,
                ..
            } => {
                stream.rewind();
                buf.clear();
                *byte_pos = 0;
            }
        }
    }

    /// Pulls the next mono frame in sequence. `None` means end-of-data: the sample ran
    /// out of frames, or the stream returned `false` with nothing left buffered.
    fn next_mono(&mut self) -> Option<f32> {
        match self {
            Input::Sample { sample, pos } => {
                if *pos >= sample.frame_count() {
                    return None;
                }
                let value = sample.mono(*pos);
                *pos += 1;
                Some(value)
            }
            Input::Stream {
                stream,
                format,
                buf,
                byte_pos,
            } => {
                let bytes_per_frame = format.bytes_per_frame();
                loop {
                    if buf.len() - *byte_pos >= bytes_per_frame {
                        let view = &buf.as_slice()[*byte_pos..];
                        let left = crate::sample::decode_sample(view, *format, 0, 0);
                        let sample = if format.channels == 1 {
                            left
                        } else {
                            let right = crate::sample::decode_sample(view, *format, 0, 1);
                            (left + right) * 0.5
                        };
                        *byte_pos += bytes_per_frame;
                        if *byte_pos > 4096 * bytes_per_frame {
                            buf.splice(0, *byte_pos, &[]);
                            *byte_pos = 0;
                        }
                        return Some(sample);
                    }
                    let hint = bytes_per_frame * 1024;
                    let more = stream.read(buf, hint);
                    if !more && buf.len() - *byte_pos < bytes_per_frame {
                        return None;
                    }
                }
            }
        }
    }
}

/// `play(key, source)` parameters a host supplies (§4.4, §4.6 "play(sample|stream, params)").
#[derive(Debug, Clone, Copy)]
pub struct SourceParams {
    pub loop_enabled: bool,
    pub pitch: f32,
    pub gain: f32,
    pub fade_in: f32,
    pub fade_out: f32,
}

impl Default for SourceParams {
    fn default() -> Self {
        Self {
            loop_enabled: false,
            pitch: 1.0,
            gain: 1.0,
            fade_in: 0.0,
            fade_out: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceState {
    Playing,
    FadeOut,
    Dead,
}

/// Per-emitter playback state (§3 "Source" row, §4.4).
pub struct Source {
    input: Input,
    frame_a: f32,
    frame_b: f32,
    frac: f64,
    loop_enabled: bool,
    pitch: f32,
    pub gain: f32,
    fade_in: f32,
    fade_out_total: f32,
    fade_out_remaining: f32,
    elapsed: f32,
    state: SourceState,
    silent_blocks: u32,
    mono_scratch: Vec<f32>,
    convolver: HrtfConvolver,
}

impl Source {
    fn new_with_input(mut input: Input, block_len: usize, params: SourceParams) -> SoundResult<Self> {
        input.format().validate()?;
        let frame_a = input.next_mono().unwrap_or(0.0);
        let frame_b = input.next_mono().unwrap_or(0.0);
        Ok(Self {
            input,
            frame_a,
            frame_b,
            frac: 0.0,
            loop_enabled: params.loop_enabled,
            pitch: params.pitch.max(1.0e-3),
            gain: params.gain,
            fade_in: params.fade_in.max(0.0),
            fade_out_total: params.fade_out.max(0.0),
            fade_out_remaining: 0.0,
            elapsed: 0.0,
            state: SourceState::Playing,
            silent_blocks: 0,
            mono_scratch: vec![0.0; block_len],
            convolver: HrtfConvolver::new(block_len),
        })
    }

    pub fn from_sample(sample: Arc<Sample>, block_len: usize, params: SourceParams) -> SoundResult<Self> {
        Self::new_with_input(Input::Sample { sample, pos: 0 }, block_len, params)
    }

    pub fn from_stream(stream: Box<dyn Stream>, block_len: usize, params: SourceParams) -> SoundResult<Self> {
        let format = stream.format();
        Self::new_with_input(
            Input::Stream {
                stream,
                format,
                buf: crate::buffer::Buffer::new(),
                byte_pos: 0,
            },
            block_len,
            params,
        )
    }

    pub fn is_dead(&self) -> bool {
        self.state == SourceState::Dead
    }

    pub fn is_looping(&self) -> bool {
        self.loop_enabled
    }

    pub fn set_loop(&mut self, flag: bool) {
        self.loop_enabled = flag;
    }

    /// `cancel(key, 0)`: destroys immediately, truncating any convolution tail (§4.4).
    pub fn cancel_immediate(&mut self) {
        self.state = SourceState::Dead;
    }

    /// `fade_out(key, tau)` / `cancel(key, tau>0)`: enters (or restarts) the fade-out
    /// ramp, unless already dead.
    pub fn trigger_fade_out(&mut self, tau: f32) {
        if self.state == SourceState::Dead {
            return;
        }
        self.state = SourceState::FadeOut;
        self.fade_out_total = tau.max(1.0e-4);
        self.fade_out_remaining = tau.max(0.0);
    }

    fn envelope_factor(&self, elapsed: f32, fade_out_remaining: f32) -> f32 {
        let fade_in = if self.fade_in > 0.0 {
            clampf(elapsed / self.fade_in, 0.0, 1.0)
        } else {
            1.0
        };
        let fade_out = match self.state {
            SourceState::FadeOut => clampf(fade_out_remaining / self.fade_out_total, 0.0, 1.0),
            _ => 1.0,
        };
        fade_in * fade_out
    }

    /// Pulls the next resampled mono frame, honoring looping and signalling exhaustion.
    fn next_resampled(&mut self, step: f64) -> (f32, bool) {
        let value = crate::math::lerpf(self.frame_a, self.frame_b, self.frac as f32);
        self.frac += step;
        let mut exhausted = false;
        while self.frac >= 1.0 {
            self.frac -= 1.0;
            self.frame_a = self.frame_b;
            match self.input.next_mono() {
                Some(v) => self.frame_b = v,
                None if self.loop_enabled => {
                    self.input.rewind();
                    self.frame_b = self.input.next_mono().unwrap_or(0.0);
                }
                None => {
                    self.frame_b = 0.0;
                    exhausted = true;
                }
            }
        }
        (value, exhausted)
    }

    /// Renders this source's contribution for one callback block (§4.4, §4.6). `frames`
    /// must equal the `block_len` this source was constructed with. Returns `true` if the
    /// source is still alive after this call; `false` means the caller should reap it.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
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
    ) -> bool {
        if self.state == SourceState::Dead {
            return false;
        }
        debug_assert_eq!(frames, self.mono_scratch.len());

        let block_duration = frames as f32 / output_rate as f32;
        let env_start = self.envelope_factor(self.elapsed, self.fade_out_remaining);

        let effective_pitch = (self.pitch * distance_pitch).max(1.0e-3) as f64;
        let step = effective_pitch * self.input.format().sample_rate as f64 / output_rate as f64;

        let mut exhausted_source = false;
        for slot in self.mono_scratch.iter_mut() {
            let (value, exhausted) = self.next_resampled(step);
            *slot = value;
            exhausted_source |= exhausted;
        }

        self.elapsed += block_duration;
        if self.state == SourceState::FadeOut {
            self.fade_out_remaining = (self.fade_out_remaining - block_duration).max(0.0);
        } else if exhausted_source && !self.loop_enabled {
            // No fade_out configured collapses to an immediate zero envelope below;
            // a positive fade_out ramps down over that many seconds from here.
            self.trigger_fade_out(self.fade_out_total);
        }
        let env_end = self.envelope_factor(self.elapsed, self.fade_out_remaining);

        let effective_gain = self.gain * distance_gain;
        let mut all_zero = true;
        for (i, slot) in self.mono_scratch.iter_mut().enumerate() {
            let t = i as f32 / frames.max(1) as f32;
            let env = crate::math::lerpf(env_start, env_end, t);
            *slot *= effective_gain * env;
            if *slot != 0.0 {
                all_zero = false;
            }
        }

        self.convolver.process(
            &self.mono_scratch,
            bin,
            left_ir,
            right_ir,
            left_out,
            right_out,
        );

        if all_zero {
            self.silent_blocks += 1;
        } else {
            self.silent_blocks = 0;
        }

        if self.state == SourceState::FadeOut && self.fade_out_remaining <= 0.0 && self.silent_blocks >= 1 {
            self.state = SourceState::Dead;
        }

        self.state != SourceState::Dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::sample::SampleWidth;

    fn mono_sine_sample(frames: usize, rate: u32, freq: f32) -> Arc<Sample> {
        let mut buf = Buffer::new();
        for n in 0..frames {
            let t = n as f32 / rate as f32;
            let v = (2.0 * std::f32::consts::PI * freq * t).sin();
            buf.append(&((v * i16::MAX as f32) as i16).to_le_bytes());
        }
        Arc::new(
            Sample::new(
                buf,
                PcmFormat {
                    sample_rate: rate,
                    channels: 1,
                    width: SampleWidth::I16,
                },
            )
            .unwrap(),
        )
    }

    fn unit_ir() -> Vec<f32> {
        let mut ir = vec![0.0f32; crate::hrtf::IR_LEN];
        ir[0] = 1.0;
        ir
    }

    #[test]
    fn non_looping_source_dies_after_playback_and_tail_flush() {
        let frames = 64;
        let sample = mono_sine_sample(frames * 3, 44100, 440.0);
        let mut source = Source::from_sample(
            sample,
            frames,
            SourceParams {
                loop_enabled: false,
                ..Default::default()
            },
        )
        .unwrap();

        let (left_ir, right_ir) = (unit_ir(), unit_ir());
        let mut left_out = vec![0.0f32; frames];
        let mut right_out = vec![0.0f32; frames];

        let mut alive = true;
        let mut calls = 0;
        while alive && calls < 50 {
            alive = source.render(
                frames,
                1.0,
                1.0,
                44100,
                (0, 0),
                &left_ir,
                &right_ir,
                &mut left_out,
                &mut right_out,
            );
            calls += 1;
        }
        assert!(!alive, "non-looping source should eventually die");
        assert!(source.is_dead());
    }

    #[test]
    fn looping_source_never_dies_on_its_own() {
        let frames = 64;
        let sample = mono_sine_sample(frames * 2, 44100, 440.0);
        let mut source = Source::from_sample(
            sample,
            frames,
            SourceParams {
                loop_enabled: true,
                ..Default::default()
            },
        )
        .unwrap();

        let (left_ir, right_ir) = (unit_ir(), unit_ir());
        let mut left_out = vec![0.0f32; frames];
        let mut right_out = vec![0.0f32; frames];

        for _ in 0..20 {
            let alive = source.render(
                frames,
                1.0,
                1.0,
                44100,
                (0, 0),
                &left_ir,
                &right_ir,
                &mut left_out,
                &mut right_out,
            );
            assert!(alive);
        }
    }

    #[test]
    fn cancel_immediate_kills_on_next_check() {
        let frames = 32;
        let sample = mono_sine_sample(frames * 4, 44100, 440.0);
        let mut source = Source::from_sample(sample, frames, SourceParams::default()).unwrap();
        source.cancel_immediate();
        assert!(source.is_dead());

        let (left_ir, right_ir) = (unit_ir(), unit_ir());
        let mut left_out = vec![0.0f32; frames];
        let mut right_out = vec![0.0f32; frames];
        let alive = source.render(
            frames,
            1.0,
            1.0,
            44100,
            (0, 0),
            &left_ir,
            &right_ir,
            &mut left_out,
            &mut right_out,
        );
        assert!(!alive);
    }

    #[test]
    fn fade_out_gain_is_monotonically_non_increasing() {
        let frames = 256;
        let sample = mono_sine_sample(frames * 40, 44100, 440.0);
        let mut source = Source::from_sample(
            sample,
            frames,
            SourceParams {
                loop_enabled: true,
                ..Default::default()
            },
        )
        .unwrap();
        source.trigger_fade_out(0.1);

        let (left_ir, right_ir) = (unit_ir(), unit_ir());
        let mut left_out = vec![0.0f32; frames];
        let mut right_out = vec![0.0f32; frames];

        let mut prev_peak = f32::MAX;
        let mut alive = true;
        while alive {
            alive = source.render(
                frames,
                1.0,
                1.0,
                44100,
                (0, 0),
                &left_ir,
                &right_ir,
                &mut left_out,
                &mut right_out,
            );
            let peak = left_out.iter().fold(0.0f32, |m, &v| m.max(v.abs()));
            assert!(peak <= prev_peak + 1.0e-3);
            prev_peak = peak;
        }
    }

    #[test]
    fn invalid_format_is_rejected_before_a_source_is_built() {
        let buf = Buffer::new();
        let bad = PcmFormat {
            sample_rate: 44100,
            channels: 3,
            width: SampleWidth::I16,
        };
        assert!(Sample::new(buf, bad).is_err());
    }
}
