//! # Equal-Power Dry/Wet Mix
//!
//! A plain linear crossfade (`dry * (1 - m) + wet * m`) dips in loudness
//! around the middle when dry and wet are uncorrelated, as a reverb tail is
//! with its source. Equal-power gains follow a quarter sine instead:
//!
//! ```text
//! dry = cos(π/2 · m)      wet = sin(π/2 · m)      dry² + wet² = 1
//! ```
//!
//! so at `m = 0.5` both sides sit at −3 dB and the summed power stays
//! constant across the sweep.

use std::f32::consts::FRAC_PI_2;

/// `(dry_gain, wet_gain)` for a mix amount in `[0, 1]`.
#[inline]
pub fn equal_power_gains(mix: f32) -> (f32, f32) {
    let (wet, dry) = (FRAC_PI_2 * mix.clamp(0.0, 1.0)).sin_cos();
    (dry, wet)
}
