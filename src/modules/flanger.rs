//! # Flanger
//!
//! A very short swept delay mixed back with the input. At any moment the
//! sum is a comb filter whose notches sit at odd multiples of
//! `1 / (2 · delay)`; sweeping the delay slides the notches up and down
//! the spectrum, which gives the familiar jet-plane whoosh.
//!
//! ```text
//! Input ──►(+)──► [ Delay Line ] ──► tap ──┬── × depth ──►(+)──► ÷(1+depth) ──► Output
//!     │     ▲                              │               ▲
//!     │     └──────── × feedback ◄─────────┘               │
//!     └────────────────────────────────────────────────────┘
//! ```
//!
//! The delay is written before it is read, so a delay of zero is the
//! current input. With no sweep the tap equals the input and the output
//! is the input unchanged. Dividing by `1 + depth` keeps the peaks of the
//! comb at unity gain.

use nih_plug::nih_warn;

use super::{block_len, retarget};
use crate::dsp::delay_line::{capacity_for, DelayLine, Interpolation};
use crate::dsp::lfo::Lfo;
use crate::dsp::smoother::Smoother;
use crate::dsp::SMOOTHING_SECONDS;
use crate::params::{ParamDescriptor, ParamSnapshot, Preset};
use crate::processor::{EffectModule, UpdateMode};

pub const SWEEP_WIDTH: usize = 0;
pub const DEPTH: usize = 1;
pub const FEEDBACK: usize = 2;
pub const FREQUENCY: usize = 3;
pub const INTERPOLATION: usize = 4;

pub const MAX_SWEEP_SECONDS: f32 = 0.0195;

#[derive(Debug, Clone)]
pub struct Flanger {
    sample_rate: f32,
    lines: Vec<DelayLine>,
    /// Last tap per channel, fed back into the next write.
    last_tap: Vec<f32>,
    lfo: Lfo,
    frequency: Smoother,
    depth: Smoother,
    feedback: Smoother,
    sweep_width: f32,
    interpolation: Interpolation,
}

impl Default for Flanger {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            lines: Vec::new(),
            last_tap: Vec::new(),
            lfo: Lfo::new(),
            frequency: Smoother::new(SMOOTHING_SECONDS),
            depth: Smoother::new(SMOOTHING_SECONDS),
            feedback: Smoother::new(SMOOTHING_SECONDS),
            sweep_width: 0.01,
            interpolation: Interpolation::default(),
        }
    }
}

impl EffectModule for Flanger {
    const PARAMETERS: &'static [ParamDescriptor] = &[
        ParamDescriptor::float("sweep_width", "Sweep Width", 0.0, MAX_SWEEP_SECONDS, 0.01)
            .with_unit(" s"),
        ParamDescriptor::float("depth", "Depth", 0.0, 1.0, 1.0),
        ParamDescriptor::float("feedback", "Feedback", 0.0, 0.5, 0.0),
        ParamDescriptor::float("frequency", "Frequency", 0.05, 2.0, 0.2).with_unit(" Hz"),
        ParamDescriptor::choice("interpolation", "Interpolation", Interpolation::NAMES, 0),
    ];

    fn presets() -> Vec<Preset> {
        vec![Preset::new("default flanger", [0.01, 1.0, 0.0, 0.2, 1.0])]
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize, num_channels: usize) {
        self.sample_rate = sample_rate;
        self.lfo.reset(sample_rate);
        for smoother in [&mut self.frequency, &mut self.depth, &mut self.feedback] {
            smoother.reset(sample_rate);
        }
        self.last_tap = vec![0.0; num_channels];

        let capacity = capacity_for(MAX_SWEEP_SECONDS, sample_rate);
        self.lines = match (0..num_channels)
            .map(|_| DelayLine::try_new(capacity))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(lines) => lines,
            Err(err) => {
                nih_warn!("flanger disabled: {err}");
                Vec::new()
            }
        };
    }

    fn update(&mut self, params: &ParamSnapshot, mode: UpdateMode) {
        self.sweep_width = params.get(SWEEP_WIDTH);
        retarget(&mut self.depth, params.get(DEPTH), mode);
        retarget(&mut self.feedback, params.get(FEEDBACK), mode);
        retarget(&mut self.frequency, params.get(FREQUENCY), mode);
        self.interpolation = Interpolation::from_index(params.choice(INTERPOLATION));
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        let sweep_samples = self.sweep_width * self.sample_rate;

        for i in 0..block_len(channels) {
            self.lfo.set_frequency(self.frequency.next());
            let delay = sweep_samples * self.lfo.next();
            let depth = self.depth.next();
            let feedback = self.feedback.next();
            let normalise = 1.0 / (1.0 + depth);

            for ((channel, line), last_tap) in channels
                .iter_mut()
                .zip(self.lines.iter_mut())
                .zip(self.last_tap.iter_mut())
            {
                let input = channel[i];
                line.write(input + feedback * *last_tap);
                let tap = line.read(delay, self.interpolation);
                line.advance();

                *last_tap = tap;
                channel[i] = (input + depth * tap) * normalise;
            }
        }
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        self.last_tap.fill(0.0);
        self.lfo.reset(self.sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn prepared(values: [f32; 5]) -> Flanger {
        let mut flanger = Flanger::default();
        flanger.prepare(48000.0, 256, 1);
        flanger.update(&ParamSnapshot::from_values(values), UpdateMode::Snap);
        flanger
    }

    #[test]
    fn unallocatable_buffers_leave_the_signal_untouched() {
        let mut flanger = Flanger::default();
        flanger.prepare(1e30, 256, 1);
        flanger.update(&ParamSnapshot::from_values([0.01, 1.0, 0.5, 0.2, 1.0]), UpdateMode::Snap);

        let input: Vec<f32> = (0..256).map(|i| (i as f32 * 0.1).sin() * 0.8).collect();
        let mut samples = input.clone();
        flanger.process(&mut [&mut samples[..]]);
        assert_eq!(samples, input);
    }

    #[test]
    fn no_sweep_passes_input_through() {
        let mut flanger = prepared([0.0, 1.0, 0.0, 0.2, 1.0]);
        let input: Vec<f32> = (0..256).map(|i| (i as f32 * 0.1).sin() * 0.8).collect();
        let mut samples = input.clone();
        flanger.process(&mut [&mut samples[..]]);

        for (out, expected) in samples.iter().zip(&input) {
            assert_relative_eq!(*out, *expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn zero_depth_is_dry() {
        let mut flanger = prepared([0.01, 0.0, 0.5, 1.0, 2.0]);
        let input: Vec<f32> = (0..256).map(|i| (i as f32 * 0.3).cos()).collect();
        let mut samples = input.clone();
        flanger.process(&mut [&mut samples[..]]);
        assert_eq!(samples, input);
    }

    #[test]
    fn swept_delay_adds_a_half_level_echo() {
        // 1 ms sweep at the slowest rate: the LFO barely leaves 0.5 over
        // 64 samples, so the delay rounds to 24 samples.
        let mut flanger = prepared([0.001, 1.0, 0.0, 0.05, 0.0]);
        let mut samples = vec![0.0_f32; 64];
        samples[0] = 1.0;
        flanger.process(&mut [&mut samples[..]]);

        assert_relative_eq!(samples[0], 0.5);
        assert_relative_eq!(samples[24], 0.5);
        assert!(samples[1..24].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn output_stays_bounded_with_feedback() {
        let mut flanger = prepared([0.0195, 1.0, 0.5, 2.0, 2.0]);
        let mut samples: Vec<f32> = (0..48000).map(|i| (i as f32 * 0.02).sin()).collect();
        flanger.process(&mut [&mut samples[..]]);
        assert!(samples.iter().all(|s| s.is_finite() && s.abs() <= 2.0));
    }
}
