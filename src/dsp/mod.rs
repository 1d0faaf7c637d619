//! # DSP (Digital Signal Processing) Primitives
//!
//! The building blocks the effect modules are assembled from. None of
//! them know about parameters, threads or the host; they take plain
//! numbers and sample slices.
//!
//! - **`smoother`**: linear ramps that hide parameter jumps.
//! - **`delay_line`**: a ring buffer with nearest, linear and cubic
//!   fractional reads. The heart of delay, vibrato and flanger.
//! - **`lfo`**: the sine oscillator that sweeps those delays.
//! - **`biquad`** / **`filter_chain`**: RBJ shelf and peak filters for
//!   the EQs and the amp tone stack.
//! - **`waveshaper`**: the saturation curves.
//! - **`mix`**: the equal-power dry/wet law.
//! - **`convolution`** / **`ir`**: partitioned FFT convolution and the
//!   impulse responses fed into it.

pub mod biquad;
pub mod convolution;
pub mod delay_line;
pub mod filter_chain;
pub mod ir;
pub mod lfo;
pub mod mix;
pub mod smoother;
pub mod waveshaper;

use crate::error::DspError;

/// Ramp time of every smoothed parameter.
pub const SMOOTHING_SECONDS: f32 = 0.05;

/// A zero-filled buffer of `len` samples, or an error instead of an abort
/// when the allocator says no.
pub fn try_zeroed(len: usize) -> Result<Vec<f32>, DspError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| DspError::Allocation { samples: len })?;
    buffer.resize(len, 0.0);
    Ok(buffer)
}
