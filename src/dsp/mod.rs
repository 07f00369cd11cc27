//! The DSP kernel: FFT (§4.1) and MDCT (§4.2).
//!
//! Unlike the teacher library, which reaches for the `rustfft` crate, this crate implements
//! both transforms itself — the specification calls the FFT/MDCT kernel out as one of the
//! three things the system exists to get right, not an incidental detail to delegate.

pub mod fft;
pub mod mdct;
