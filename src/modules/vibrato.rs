//! # Vibrato
//!
//! Pitch wobble without any pitch shifter. A delay line is read at a
//! position that moves back and forth under an LFO; while the read head
//! moves away from the write head the audio plays slower (lower pitch),
//! while it moves towards it the audio plays faster (higher pitch).
//!
//! Only the delayed signal is output. Mixing in the dry signal would turn
//! the effect into a chorus.

use nih_plug::nih_warn;

use super::{block_len, retarget};
use crate::dsp::delay_line::{capacity_for, DelayLine, Interpolation};
use crate::dsp::lfo::Lfo;
use crate::dsp::smoother::Smoother;
use crate::dsp::SMOOTHING_SECONDS;
use crate::params::{ParamDescriptor, ParamSnapshot, Preset};
use crate::processor::{EffectModule, UpdateMode};

pub const FREQUENCY: usize = 0;
pub const SWEEP_WIDTH: usize = 1;
pub const INTERPOLATION: usize = 2;

pub const MAX_SWEEP_SECONDS: f32 = 0.05;

#[derive(Debug, Clone)]
pub struct Vibrato {
    sample_rate: f32,
    lines: Vec<DelayLine>,
    lfo: Lfo,
    frequency: Smoother,
    sweep_width: f32,
    interpolation: Interpolation,
}

impl Default for Vibrato {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            lines: Vec::new(),
            lfo: Lfo::new(),
            frequency: Smoother::new(SMOOTHING_SECONDS),
            sweep_width: 0.0,
            interpolation: Interpolation::default(),
        }
    }
}

impl EffectModule for Vibrato {
    const PARAMETERS: &'static [ParamDescriptor] = &[
        ParamDescriptor::float("frequency", "Frequency", 0.0, 20.0, 6.0).with_unit(" Hz"),
        ParamDescriptor::float("sweep_width", "Sweep Width", 0.0, MAX_SWEEP_SECONDS, 0.001)
            .with_unit(" s"),
        ParamDescriptor::choice("interpolation", "Interpolation", Interpolation::NAMES, 0),
    ];

    fn presets() -> Vec<Preset> {
        vec![Preset::new("angry violin", [6.0, 0.001, 0.0])]
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize, num_channels: usize) {
        self.sample_rate = sample_rate;
        self.lfo.reset(sample_rate);
        self.frequency.reset(sample_rate);

        let capacity = capacity_for(MAX_SWEEP_SECONDS, sample_rate);
        self.lines = match (0..num_channels)
            .map(|_| DelayLine::try_new(capacity))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(lines) => lines,
            Err(err) => {
                nih_warn!("vibrato disabled: {err}");
                Vec::new()
            }
        };
    }

    fn update(&mut self, params: &ParamSnapshot, mode: UpdateMode) {
        retarget(&mut self.frequency, params.get(FREQUENCY), mode);
        self.sweep_width = params.get(SWEEP_WIDTH);
        self.interpolation = Interpolation::from_index(params.choice(INTERPOLATION));
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        let sweep_samples = self.sweep_width * self.sample_rate;
        for i in 0..block_len(channels) {
            self.lfo.set_frequency(self.frequency.next());
            let delay = sweep_samples * self.lfo.next();
            for (channel, line) in channels.iter_mut().zip(self.lines.iter_mut()) {
                line.write(channel[i]);
                channel[i] = line.read(delay, self.interpolation);
                line.advance();
            }
        }
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        self.lfo.reset(self.sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(values: [f32; 3]) -> Vibrato {
        let mut vibrato = Vibrato::default();
        vibrato.prepare(44100.0, 512, 2);
        vibrato.update(&ParamSnapshot::from_values(values), UpdateMode::Snap);
        vibrato
    }

    #[test]
    fn unallocatable_buffers_leave_the_signal_untouched() {
        let mut vibrato = Vibrato::default();
        vibrato.prepare(1e30, 512, 2);
        vibrato.update(&ParamSnapshot::from_values([6.0, 0.01, 1.0]), UpdateMode::Snap);

        let input: Vec<f32> = (0..512).map(|i| (i as f32 * 0.05).sin()).collect();
        let mut left = input.clone();
        let mut right = input.clone();
        vibrato.process(&mut [&mut left[..], &mut right[..]]);
        assert_eq!(left, input);
        assert_eq!(right, input);
    }

    #[test]
    fn zero_sweep_is_identity() {
        for interpolation in 0..3 {
            let mut vibrato = prepared([6.0, 0.0, interpolation as f32]);
            let input: Vec<f32> = (0..512).map(|i| (i as f32 * 0.05).sin()).collect();
            let mut left = input.clone();
            let mut right = input.clone();
            vibrato.process(&mut [&mut left[..], &mut right[..]]);
            assert_eq!(left, input);
            assert_eq!(right, input);
        }
    }

    #[test]
    fn sweep_delays_the_signal() {
        // At phase 0 the LFO sits at 0.5, so a 10 ms sweep starts at a
        // 5 ms delay (220.5 samples).
        let mut vibrato = prepared([0.0, 0.01, 0.0]);
        let mut samples = vec![0.0_f32; 400];
        samples[0] = 1.0;
        vibrato.process(&mut [&mut samples[..]]);

        let peak = samples
            .iter()
            .position(|&s| s == 1.0)
            .expect("impulse should come out");
        assert!((220..=221).contains(&peak), "impulse at {peak}");
    }

    #[test]
    fn channels_see_the_same_modulation() {
        let mut vibrato = prepared([5.0, 0.005, 1.0]);
        let input: Vec<f32> = (0..2048).map(|i| (i as f32 * 0.01).sin()).collect();
        let mut left = input.clone();
        let mut right = input;
        vibrato.process(&mut [&mut left[..], &mut right[..]]);
        assert_eq!(left, right);
    }
}
