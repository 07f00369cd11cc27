//! HRTF binaural rendering: the direction table (§4.3) and the per-source overlap-save
//! convolver built on top of it (§4.4).

pub mod convolver;
pub mod table;

pub use convolver::HrtfConvolver;
pub use table::{table, Bin, HrtfTable, IR_LEN, NATIVE_SAMPLE_RATE, NEUTRAL_BIN};
