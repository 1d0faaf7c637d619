//! # Low-Frequency Oscillator
//!
//! Vibrato and flanging are both "a delay whose length wobbles". The
//! wobble comes from an LFO: a sine wave running far below the audible
//! range (a fraction of a hertz up to ~20 Hz), scaled to `[0, 1]` so it can
//! multiply a sweep width directly.
//!
//! ```text
//!  1.0 ┤    ╭─╮
//!  0.5 ┼───╯   ╰───╮     ╭──
//!  0.0 ┤            ╰─╯
//!      0   0.25  0.5  0.75  1.0   phase
//! ```
//!
//! ## Phase accumulation
//!
//! The oscillator keeps a phase in `[0, 1)` and adds `frequency /
//! sample_rate` every sample. When the phase passes 1.0 we subtract 1.0
//! once. Frequency is clamped below the sample rate, so the increment is
//! always less than one cycle and a single subtraction is enough. (`%`
//! would also work but is noticeably slower for floats.)

use std::f32::consts::TAU;

/// Unipolar sine: `0.5 + 0.5 * sin(2π phase)`, in `[0, 1]`.
#[inline]
pub fn lfo(phase: f32) -> f32 {
    0.5 + 0.5 * (TAU * phase).sin()
}

/// A sine LFO with its own phase accumulator.
#[derive(Debug, Clone, Default)]
pub struct Lfo {
    phase: f32,
    increment: f32,
    sample_rate: f32,
}

impl Lfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sample rate and restart at phase 0.
    pub fn reset(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.phase = 0.0;
        self.increment = 0.0;
    }

    /// Set the oscillation frequency in Hz. Takes effect on the next
    /// sample; the phase is kept so changes don't click.
    #[inline]
    pub fn set_frequency(&mut self, frequency: f32) {
        if self.sample_rate <= 0.0 {
            self.increment = 0.0;
            return;
        }
        let nyquist_bound = self.sample_rate * 0.999;
        self.increment = frequency.clamp(0.0, nyquist_bound) / self.sample_rate;
    }

    /// The current value in `[0, 1]`, then advance one sample.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let value = lfo(self.phase);
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        value
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }
}
