//! # Filter Chain
//!
//! An ordered list of biquad stages applied one after the other, used for
//! both parametric EQs and the amp simulator's tone stack.
//!
//! Coefficients belong to the chain and are shared by every channel;
//! filter memory is kept per channel and per stage, so the left channel's
//! history never leaks into the right one. On every parameter update the
//! coefficient set of each stage is recomputed from scratch and replaced
//! whole. There is no per-coefficient smoothing: swapping a complete,
//! valid set between blocks is stable, while interpolating individual
//! coefficients is not guaranteed to be.

use super::biquad::{BiquadCoefficients, BiquadState, FilterShape};

/// Most stages a chain can hold.
pub const MAX_STAGES: usize = 4;

/// Settings for one stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandSettings {
    pub shape: FilterShape,
    pub frequency: f32,
    pub q: f32,
    pub gain_db: f32,
}

#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    coefficients: [BiquadCoefficients; MAX_STAGES],
    stages: usize,
    /// One `[BiquadState; MAX_STAGES]` per channel.
    states: Vec<[BiquadState; MAX_STAGES]>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size the per-channel state. Call from `prepare`, never from the
    /// audio thread.
    pub fn prepare(&mut self, num_channels: usize) {
        self.states = vec![[BiquadState::default(); MAX_STAGES]; num_channels];
    }

    /// Recompute every stage's coefficients. Bands past [`MAX_STAGES`]
    /// are ignored.
    pub fn update(&mut self, sample_rate: f32, bands: &[BandSettings]) {
        nih_plug::nih_debug_assert!(bands.len() <= MAX_STAGES);
        self.stages = bands.len().min(MAX_STAGES);
        for (slot, band) in self.coefficients.iter_mut().zip(bands) {
            *slot = BiquadCoefficients::design(
                band.shape,
                sample_rate,
                band.frequency,
                band.q,
                band.gain_db,
            );
        }
    }

    /// Filter `samples` of `channel` in place. Channels that were not
    /// prepared pass through unchanged.
    pub fn process(&mut self, channel: usize, samples: &mut [f32]) {
        let Some(states) = self.states.get_mut(channel) else {
            return;
        };
        let coefficients = &self.coefficients[..self.stages];
        for sample in samples.iter_mut() {
            *sample = Self::tick(coefficients, states, *sample);
        }
    }

    /// Filter a single sample of `channel`.
    #[inline]
    pub fn process_sample(&mut self, channel: usize, sample: f32) -> f32 {
        match self.states.get_mut(channel) {
            Some(states) => Self::tick(&self.coefficients[..self.stages], states, sample),
            None => sample,
        }
    }

    #[inline]
    fn tick(
        coefficients: &[BiquadCoefficients],
        states: &mut [BiquadState; MAX_STAGES],
        mut sample: f32,
    ) -> f32 {
        for (c, state) in coefficients.iter().zip(states.iter_mut()) {
            sample = state.process(c, sample);
        }
        sample
    }

    pub fn coefficients(&self) -> &[BiquadCoefficients] {
        &self.coefficients[..self.stages]
    }

    pub fn reset(&mut self) {
        for channel in &mut self.states {
            for state in channel.iter_mut() {
                state.reset();
            }
        }
    }
}
