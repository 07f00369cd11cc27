//! Complex-to-complex radix-2 Cooley-Tukey FFT (§4.1).
//!
//! `forward`/`inverse` operate in place on a contiguous buffer of length `N = 2^bit_count`.
//! The implementation is the textbook Danielson-Lanczos recursion flattened into passes:
//! bit-reversal permutation, then `log2(N)` combine stages, each stage advancing its twiddle
//! factor with the `w <- w + w*wp` recurrence instead of calling `sin`/`cos` per butterfly.

use std::f32::consts::PI;
use std::ops::{Add, AddAssign, Mul, MulAssign, Sub, SubAssign};

/// A single-precision complex number, laid out as a plain `(re, im)` pair so a buffer of
/// them is a contiguous, interleaved array — the layout the overlap-save convolution path
/// and the SIMD butterfly both assume.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex32 {
    pub re: f32,
    pub im: f32,
}

impl Complex32 {
    pub const ZERO: Complex32 = Complex32 { re: 0.0, im: 0.0 };

    pub const fn new(re: f32, im: f32) -> Self {
        Self { re, im }
    }

    pub fn real(re: f32) -> Self {
        Self { re, im: 0.0 }
    }

    pub fn conj(self) -> Self {
        Self {
            re: self.re,
            im: -self.im,
        }
    }
}

impl Add for Complex32 {
    type Output = Complex32;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.im + rhs.im)
    }
}
impl AddAssign for Complex32 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
impl Sub for Complex32 {
    type Output = Complex32;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.re - rhs.re, self.im - rhs.im)
    }
}
impl SubAssign for Complex32 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}
impl Mul for Complex32 {
    type Output = Complex32;
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}
impl MulAssign for Complex32 {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}
impl Mul<f32> for Complex32 {
    type Output = Complex32;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.re * rhs, self.im * rhs)
    }
}

fn reverse_bits(mut value: usize, bit_count: u32) -> usize {
    let mut out = 0usize;
    for _ in 0..bit_count {
        out = (out << 1) | (value & 1);
        value >>= 1;
    }
    out
}

/// Returns the smallest power of two `>= n`. Used to size overlap-save convolution blocks
/// (§4.4) and MDCT-internal transforms (§4.2).
pub fn next_pow2(n: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    let mut p = 1usize;
    while p < n {
        p <<= 1;
    }
    p
}

pub fn is_pow2(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

/// A reusable radix-2 FFT of fixed length `N = 2^bit_count`.
///
/// Construction precomputes the bit-reversal table; `forward`/`inverse` reuse an internal
/// twiddle scratch buffer so neither allocates, matching the "no allocation on the audio
/// thread's hot path" requirement (§5) for a transform invoked once per convolution block.
pub struct Fft {
    bit_count: u32,
    len: usize,
    bit_reversal: Vec<usize>,
    twiddle_scratch: Vec<Complex32>,
}

impl Fft {
    /// `bit_count` is `B` in `N = 2^B`; typical `B` is in `[3, 12]` (§4.1).
    pub fn new(bit_count: u32) -> Self {
        let len = 1usize << bit_count;
        let bit_reversal = (0..len).map(|i| reverse_bits(i, bit_count)).collect();
        Self {
            bit_count,
            len,
            bit_reversal,
            twiddle_scratch: vec![Complex32::ZERO; len / 2],
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// `X[k] = sum_n x[n] * exp(-2*pi*i*k*n/N)`.
    pub fn forward(&mut self, buf: &mut [Complex32]) {
        self.transform(buf, -1.0);
    }

    /// The forward transform with the twiddle sign flipped, scaled by `1/N`, so that
    /// `inverse(forward(x)) == x` up to float rounding (§4.1, §8 "FFT round-trip").
    pub fn inverse(&mut self, buf: &mut [Complex32]) {
        self.transform(buf, 1.0);
        let scale = 1.0 / self.len as f32;
        for x in buf.iter_mut() {
            *x = *x * scale;
        }
    }

    fn transform(&mut self, buf: &mut [Complex32], sign: f32) {
        assert_eq!(buf.len(), self.len, "buffer length must match Fft::len()");

        for i in 0..self.len {
            let j = self.bit_reversal[i];
            if j > i {
                buf.swap(i, j);
            }
        }

        let mut size = 2usize;
        while size <= self.len {
            let half = size / 2;
            let alpha = sign * 2.0 * PI / size as f32;
            let wp = Complex32::new(alpha.cos() - 1.0, alpha.sin());

            let twiddles = &mut self.twiddle_scratch[..half];
            let mut w = Complex32::new(1.0, 0.0);
            for t in twiddles.iter_mut() {
                *t = w;
                w = w + w * wp;
            }

            let mut block_start = 0;
            while block_start < self.len {
                butterflies(&mut buf[block_start..block_start + size], half, twiddles);
                block_start += size;
            }
            size <<= 1;
        }
    }
}

#[cfg(not(feature = "simd"))]
fn butterflies(block: &mut [Complex32], half: usize, twiddles: &[Complex32]) {
    for k in 0..half {
        let t = block[k + half] * twiddles[k];
        block[k + half] = block[k] - t;
        block[k] = block[k] + t;
    }
}

/// SIMD butterfly stage: four adjacent `k` indices are combined at once using a pair of
/// 4-wide `f32` vectors (real lanes, imaginary lanes), matching the spec's description of
/// the optional SIMD FFT variant. Numerically identical to the scalar path within rounding.
#[cfg(feature = "simd")]
fn butterflies(block: &mut [Complex32], half: usize, twiddles: &[Complex32]) {
    use wide::f32x4;

    let mut k = 0;
    while k + 4 <= half {
        let a_re = f32x4::new([
            block[k].re,
            block[k + 1].re,
            block[k + 2].re,
            block[k + 3].re,
        ]);
        let a_im = f32x4::new([
            block[k].im,
            block[k + 1].im,
            block[k + 2].im,
            block[k + 3].im,
        ]);
        let b_re = f32x4::new([
            block[k + half].re,
            block[k + half + 1].re,
            block[k + half + 2].re,
            block[k + half + 3].re,
        ]);
        let b_im = f32x4::new([
            block[k + half].im,
            block[k + half + 1].im,
            block[k + half + 2].im,
            block[k + half + 3].im,
        ]);
        let w_re = f32x4::new([
            twiddles[k].re,
            twiddles[k + 1].re,
            twiddles[k + 2].re,
            twiddles[k + 3].re,
        ]);
        let w_im = f32x4::new([
            twiddles[k].im,
            twiddles[k + 1].im,
            twiddles[k + 2].im,
            twiddles[k + 3].im,
        ]);

        // t = b * w (complex multiply, fused across lanes)
        let t_re = b_re * w_re - b_im * w_im;
        let t_im = b_re * w_im + b_im * w_re;

        let out_lo_re = a_re + t_re;
        let out_lo_im = a_im + t_im;
        let out_hi_re = a_re - t_re;
        let out_hi_im = a_im - t_im;

        let lo_re = out_lo_re.to_array();
        let lo_im = out_lo_im.to_array();
        let hi_re = out_hi_re.to_array();
        let hi_im = out_hi_im.to_array();
        for lane in 0..4 {
            block[k + lane] = Complex32::new(lo_re[lane], lo_im[lane]);
            block[k + half + lane] = Complex32::new(hi_re[lane], hi_im[lane]);
        }

        k += 4;
    }
    // Remainder: scalar 4-point-or-fewer butterfly, same as the non-SIMD path.
    while k < half {
        let t = block[k + half] * twiddles[k];
        block[k + half] = block[k] - t;
        block[k] = block[k] + t;
        k += 1;
    }
}
