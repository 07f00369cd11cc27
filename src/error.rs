//! Error type surfaced by every fallible public entry point.
//!
//! Nothing inside the real-time audio callback (see [`crate::context::Context::process`])
//! ever returns one of these: faults discovered while mixing are logged and the offending
//! source is silenced instead, per the library's error handling design.

use std::fmt;

/// All errors the public API can return.
#[derive(Debug)]
pub enum SoundError {
    /// A [`crate::sample::Sample`] or [`crate::stream::Stream`] declared a PCM layout this
    /// library does not support (channel count, bit width, or a zero sample rate).
    InvalidFormat(String),
    /// Preallocation of scratch buffers failed at `Source` or `Context` construction.
    AllocationFailed(String),
    /// A named sample was looked up in a `Context`'s registry and was not there.
    NotFound(String),
    /// Propagated from the host audio layer at initialization. The core never produces
    /// this itself; it exists so host integrations have a variant to wrap their own error
    /// into when bubbling it through code that returns `SoundError`.
    HostAudioFailed(String),
    /// The audio lock was found poisoned, i.e. a prior holder panicked while holding it.
    /// There is no recovery path: a poisoned real-time audio lock means a thread panicked
    /// mid-mix or mid-mutation, and the mixer state cannot be trusted afterwards.
    LockPoisoned,
    /// I/O failure while loading a compiled asset (currently only HRTF resampling data).
    Io(std::io::Error),
}

impl fmt::Display for SoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundError::InvalidFormat(msg) => write!(f, "invalid PCM format: {msg}"),
            SoundError::AllocationFailed(msg) => write!(f, "allocation failed: {msg}"),
            SoundError::NotFound(msg) => write!(f, "not found: {msg}"),
            SoundError::HostAudioFailed(msg) => write!(f, "host audio layer failed: {msg}"),
            SoundError::LockPoisoned => write!(f, "audio lock is poisoned"),
            SoundError::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for SoundError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SoundError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SoundError {
    fn from(err: std::io::Error) -> Self {
        SoundError::Io(err)
    }
}

impl<T> From<std::sync::PoisonError<T>> for SoundError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        SoundError::LockPoisoned
    }
}

/// Convenience alias used throughout the crate's public signatures.
pub type SoundResult<T> = Result<T, SoundError>;
