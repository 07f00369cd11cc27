//! `Sample`: an immutable PCM asset owned by the host and shared read-only across sources.
//!
//! Decoding compressed formats into PCM is explicitly out of scope (§1); a `Sample` only
//! knows how to interpret the byte layout a decoder has already produced (§6 "PCM input
//! format"): little-endian signed 16-bit or unsigned 8-bit, mono or stereo, interleaved.

use byteorder::{ByteOrder, LittleEndian};
use std::collections::HashMap;
use std::sync::Arc;

use crate::buffer::Buffer;
use crate::error::{SoundError, SoundResult};

/// Sample bit width declared by the decoder that produced the PCM bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWidth {
    U8,
    I16,
}

/// Describes the raw PCM layout of a [`Sample`] or a [`crate::stream::Stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u8,
    pub width: SampleWidth,
}

impl PcmFormat {
    pub fn validate(self) -> SoundResult<Self> {
        if self.sample_rate == 0 {
            return Err(SoundError::InvalidFormat("sample rate is zero".into()));
        }
        if self.channels == 0 || self.channels > 2 {
            return Err(SoundError::InvalidFormat(format!(
                "unsupported channel count: {}",
                self.channels
            )));
        }
        Ok(self)
    }

    pub fn bytes_per_frame(self) -> usize {
        let bytes_per_sample = match self.width {
            SampleWidth::U8 => 1,
            SampleWidth::I16 => 2,
        };
        bytes_per_sample * self.channels as usize
    }
}

/// Decodes the sample at `frame * format.channels + channel` from raw interleaved PCM
/// bytes into `[-1.0, 1.0]`.
pub fn decode_sample(data: &[u8], format: PcmFormat, frame: usize, channel: usize) -> f32 {
    let bytes_per_sample = match format.width {
        SampleWidth::U8 => 1,
        SampleWidth::I16 => 2,
    };
    let offset = (frame * format.channels as usize + channel) * bytes_per_sample;
    match format.width {
        SampleWidth::U8 => {
            let byte = *data.get(offset).unwrap_or(&128);
            (byte as f32 - 128.0) / 128.0
        }
        SampleWidth::I16 => {
            if offset + 2 > data.len() {
                0.0
            } else {
                LittleEndian::read_i16(&data[offset..offset + 2]) as f32 / i16::MAX as f32
            }
        }
    }
}

/// An immutable, fully-decoded PCM asset. Cheap to share: `Context` hands out `Arc<Sample>`
/// from its sample registry and every `Source` that plays it only ever reads.
#[derive(Debug)]
pub struct Sample {
    buffer: Buffer,
    format: PcmFormat,
    frame_count: usize,
}

impl Sample {
    pub fn new(buffer: Buffer, format: PcmFormat) -> SoundResult<Self> {
        let format = format.validate()?;
        let bpf = format.bytes_per_frame();
        if bpf == 0 {
            return Err(SoundError::InvalidFormat("zero bytes per frame".into()));
        }
        let frame_count = buffer.len() / bpf;
        Ok(Self {
            buffer,
            format,
            frame_count,
        })
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Reads one channel of one frame, as a value in `[-1.0, 1.0]`. `frame` is taken modulo
    /// `frame_count` so callers implementing looping do not need a separate wrap branch.
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        if self.frame_count == 0 {
            return 0.0;
        }
        decode_sample(self.buffer.as_slice(), self.format, frame % self.frame_count, channel)
    }

    /// Reads `frame`, downmixed to mono by averaging channels (§4.4 "mixes to mono if
    /// stereo source"). `frame` is taken modulo `frame_count`.
    pub fn mono(&self, frame: usize) -> f32 {
        if self.frame_count == 0 {
            return 0.0;
        }
        match self.format.channels {
            1 => self.sample(frame, 0),
            _ => (self.sample(frame, 0) + self.sample(frame, 1)) * 0.5,
        }
    }
}

/// `Context`'s table of samples reachable by name, shared read-only with every `Source`
/// that borrows one (§5 "Ownership": "Source borrows Samples ... by lookup name from
/// Context's sample table").
#[derive(Default)]
pub struct SampleRegistry {
    samples: HashMap<String, Arc<Sample>>,
}

impl SampleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, sample: Sample) -> Arc<Sample> {
        let arc = Arc::new(sample);
        self.samples.insert(name.into(), arc.clone());
        arc
    }

    pub fn get(&self, name: &str) -> SoundResult<Arc<Sample>> {
        self.samples
            .get(name)
            .cloned()
            .ok_or_else(|| SoundError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono_i16(values: &[i16]) -> Buffer {
        let mut buf = Buffer::new();
        for v in values {
            buf.append(&v.to_le_bytes());
        }
        buf
    }

    #[test]
    fn decodes_i16_mono() {
        let buf = mono_i16(&[0, i16::MAX, i16::MIN]);
        let format = PcmFormat {
            sample_rate: 44100,
            channels: 1,
            width: SampleWidth::I16,
        };
        let sample = Sample::new(buf, format).unwrap();
        assert_eq!(sample.frame_count(), 3);
        assert!((sample.sample(0, 0) - 0.0).abs() < 1e-6);
        assert!((sample.sample(1, 0) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn rejects_bad_channel_count() {
        let format = PcmFormat {
            sample_rate: 44100,
            channels: 3,
            width: SampleWidth::I16,
        };
        assert!(Sample::new(Buffer::new(), format).is_err());
    }
}
