//! Moves a looping tone in a circle around the listener and drives `Context::process` in a
//! loop, printing the per-block render time — host glue analogous to the teacher's
//! `examples/reverb.rs`, not part of the library and not exercised by the test suite.

use std::time::{Duration, Instant};

use anyhow::Context as _;
use aural3d::buffer::Buffer;
use aural3d::context::Context;
use aural3d::device::OutputFormat;
use aural3d::math::Vec3;
use aural3d::object::Pose;
use aural3d::sample::{PcmFormat, SampleWidth};
use aural3d::source::SourceParams;
use aural3d::stream::Stream;

/// A trivial in-memory PCM generator standing in for a real decoder (§1 scope: decoding
/// compressed formats is the host's problem, not this crate's).
struct SineStream {
    sample_rate: u32,
    frequency: f32,
    phase: f32,
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
    }

    fn read(&mut self, out: &mut Buffer, hint_bytes: usize) -> bool {
        let frames_wanted = hint_bytes / 2;
        for _ in 0..frames_wanted {
            let sample = (self.phase.sin() * i16::MAX as f32 * 0.5) as i16;
            out.append(&sample.to_le_bytes());
            self.phase += 2.0 * std::f32::consts::PI * self.frequency / self.sample_rate as f32;
        }
        true
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let output = OutputFormat::new(44100, 1024);
    let context = Context::new(output).context("failed to create audio context")?;

    let object = {
        let mut ctx = context.lock().unwrap();
        let object = ctx.create_object();
        ctx.play_stream(
            object,
            "tone",
            0,
            Box::new(SineStream {
                sample_rate: 44100,
                frequency: 440.0,
                phase: 0.0,
            }),
            SourceParams {
                loop_enabled: true,
                ..Default::default()
            },
        )
        .context("failed to start playback")?;
        object
    };

    let mut buf = vec![0i16; output.frames_per_callback * 2];
    let start = Instant::now();
    let mut angle_deg = 0.0f32;
    while start.elapsed() < Duration::from_secs(5) {
        let block_start = Instant::now();
        {
            let mut ctx = context.lock().unwrap();
            if let Some(object) = ctx.object_mut(object) {
                let radius = 3.0;
                object.pose = Pose {
                    position: Vec3::new(
                        radius * angle_deg.to_radians().sin(),
                        0.0,
                        radius * angle_deg.to_radians().cos(),
                    ),
                    velocity: Vec3::ZERO,
                    direction: Vec3::new(0.0, 0.0, 1.0),
                };
            }
            ctx.process(&mut buf, output.frames_per_callback)?;
        }
        angle_deg += 2.0;
        println!("block render time: {:?}", block_start.elapsed());
    }

    Ok(())
}
