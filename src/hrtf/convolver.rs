//! Overlap-save block convolution against the HRTF table (§4.3, §4.4).
//!
//! Grounded on the teacher's `hrtf.rs` (`copy_replace` / `convolve_overlap_save` /
//! `HrtfRenderer`): the persistent per-ear overlap tail and the "pad, FFT, multiply
//! spectra, IFFT, keep the back half" shape are the same. What changed: the spectra come
//! from our own `dsp::fft::Fft` and the `table` module's grid instead of `rustfft` and a
//! barycentric sphere mesh, and each direction's HRTF spectrum is memoized per `Source` so
//! a stationary or slow-moving source does not refit the same FFT every block (§5
//! "Ownership": "HRTF spectra cached per Source x direction bin are owned by the Source").

use std::collections::HashMap;
use std::sync::Arc;

use crate::dsp::fft::{next_pow2, Complex32, Fft};
use crate::hrtf::table::{Bin, IR_LEN};

type Spectrum = Arc<(Vec<Complex32>, Vec<Complex32>)>;

/// One source's private convolution engine: its own FFT scratch, overlap tails, and
/// direction-spectrum cache, all preallocated at construction (§5 "per-source scratch
/// buffers are preallocated at source construction").
pub struct HrtfConvolver {
    block_len: usize,
    pad_length: usize,
    overlap_len: usize,
    fft: Fft,
    left_in: Vec<Complex32>,
    right_in: Vec<Complex32>,
    left_overlap: Vec<f32>,
    right_overlap: Vec<f32>,
    spectrum_cache: HashMap<Bin, Spectrum>,
}

impl HrtfConvolver {
    /// `block_len` is the number of new mono samples convolved per `process` call; the
    /// internal FFT length is the next power of two at least `block_len + IR_LEN - 1`.
    pub fn new(block_len: usize) -> Self {
        let overlap_len = IR_LEN - 1;
        let pad_length = next_pow2(block_len + overlap_len);
        let bit_count = pad_length.trailing_zeros();
        Self {
            block_len,
            pad_length,
            overlap_len,
            fft: Fft::new(bit_count),
            left_in: vec![Complex32::ZERO; pad_length],
            right_in: vec![Complex32::ZERO; pad_length],
            left_overlap: vec![0.0; overlap_len],
            right_overlap: vec![0.0; overlap_len],
            spectrum_cache: HashMap::new(),
        }
    }

    /// Memoizes the spectrum pair for `bin`, trusting `bin` to uniquely identify the IR
    /// content passed in — `crate::hrtf::table::HrtfTable::lookup` upholds this by giving
    /// the degenerate-direction IR its own reserved `NEUTRAL_BIN`, distinct from every
    /// real `(row_index, azimuth_index)` pair, so silence (or any other stand-in IR) can
    /// never be cached under a bin a genuine measurement also uses.
    fn spectrum_for(&mut self, bin: Bin, left_ir: &[f32], right_ir: &[f32]) -> Spectrum {
        if let Some(spectrum) = self.spectrum_cache.get(&bin) {
            return spectrum.clone();
        }
        let left = self.zero_padded_spectrum(left_ir);
        let right = self.zero_padded_spectrum(right_ir);
        let spectrum: Spectrum = Arc::new((left, right));
        self.spectrum_cache.insert(bin, spectrum.clone());
        spectrum
    }

    fn zero_padded_spectrum(&mut self, ir: &[f32]) -> Vec<Complex32> {
        let mut padded = vec![Complex32::ZERO; self.pad_length];
        for (c, &s) in padded.iter_mut().zip(ir) {
            *c = Complex32::real(s);
        }
        self.fft.forward(&mut padded);
        padded
    }

    /// Convolves one new mono block against the HRTF impulse responses for `bin`, writing
    /// stereo output and advancing the persistent overlap tails. `input.len()` must equal
    /// the `block_len` passed to `new`; `left_out`/`right_out` must be the same length.
    pub fn process(
        &mut self,
        input: &[f32],
        bin: Bin,
        left_ir: &[f32],
        right_ir: &[f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
    ) {
        assert_eq!(input.len(), self.block_len);
        assert_eq!(left_out.len(), input.len());
        assert_eq!(right_out.len(), input.len());

        let spectrum = self.spectrum_for(bin, left_ir, right_ir);

        build_padded(&mut self.left_in, &self.left_overlap, input);
        build_padded(&mut self.right_in, &self.right_overlap, input);
        advance_tail(&mut self.left_overlap, input);
        advance_tail(&mut self.right_overlap, input);

        self.fft.forward(&mut self.left_in);
        for (s, h) in self.left_in.iter_mut().zip(spectrum.0.iter()) {
            *s = *s * *h;
        }
        self.fft.inverse(&mut self.left_in);

        self.fft.forward(&mut self.right_in);
        for (s, h) in self.right_in.iter_mut().zip(spectrum.1.iter()) {
            *s = *s * *h;
        }
        self.fft.inverse(&mut self.right_in);

        for (o, c) in left_out.iter_mut().zip(&self.left_in[self.overlap_len..]) {
            *o = c.re;
        }
        for (o, c) in right_out.iter_mut().zip(&self.right_in[self.overlap_len..]) {
            *o = c.re;
        }
    }
}

fn build_padded(dst: &mut [Complex32], tail: &[f32], input: &[f32]) {
    let overlap_len = tail.len();
    for (c, &s) in dst[..overlap_len].iter_mut().zip(tail) {
        *c = Complex32::real(s);
    }
    for (c, &s) in dst[overlap_len..overlap_len + input.len()].iter_mut().zip(input) {
        *c = Complex32::real(s);
    }
    for c in dst[overlap_len + input.len()..].iter_mut() {
        *c = Complex32::ZERO;
    }
}

/// Slides the persistent overlap tail forward by the samples just consumed.
fn advance_tail(tail: &mut [f32], input: &[f32]) {
    let overlap_len = tail.len();
    if input.len() >= overlap_len {
        tail.copy_from_slice(&input[input.len() - overlap_len..]);
    } else {
        let carry = overlap_len - input.len();
        tail.copy_within(input.len()..overlap_len, 0);
        tail[carry..].copy_from_slice(input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_ir() -> Vec<f32> {
        let mut ir = vec![0.0f32; IR_LEN];
        ir[0] = 1.0;
        ir
    }

    #[test]
    fn identity_impulse_passes_signal_through() {
        let block_len = 64;
        let mut conv = HrtfConvolver::new(block_len);
        let left_ir = unit_ir();
        let right_ir = unit_ir();

        let input: Vec<f32> = (0..block_len).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut left_out = vec![0.0f32; block_len];
        let mut right_out = vec![0.0f32; block_len];
        conv.process(&input, (0, 0), &left_ir, &right_ir, &mut left_out, &mut right_out);

        for (a, b) in input.iter().zip(left_out.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
        for (a, b) in input.iter().zip(right_out.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn cache_reuses_spectrum_for_same_bin() {
        let block_len = 64;
        let mut conv = HrtfConvolver::new(block_len);
        let left_ir = unit_ir();
        let right_ir = unit_ir();
        let input = vec![0.0f32; block_len];
        let mut left_out = vec![0.0f32; block_len];
        let mut right_out = vec![0.0f32; block_len];

        conv.process(&input, (2, 3), &left_ir, &right_ir, &mut left_out, &mut right_out);
        assert_eq!(conv.spectrum_cache.len(), 1);
        conv.process(&input, (2, 3), &left_ir, &right_ir, &mut left_out, &mut right_out);
        assert_eq!(conv.spectrum_cache.len(), 1);
        conv.process(&input, (2, 4), &left_ir, &right_ir, &mut left_out, &mut right_out);
        assert_eq!(conv.spectrum_cache.len(), 2);
    }
}
