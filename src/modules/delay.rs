//! # Delay
//!
//! A feedback echo. The input goes into a ring buffer; the output mixes
//! the dry input with whatever was written `delay_length` seconds ago, and
//! a share of that delayed sample is written back so echoes repeat.
//!
//! ```text
//! Input ──┬─────────────────────────────── × dry ───────┐
//!         │                                             │
//!         └──►(+)──► [ Delay Line ] ──┬──── × wet ─────►(+)──► Output
//!              ▲                      │
//!              └────── × feedback ◄───┘
//! ```
//!
//! All four parameters are smoothed. Ramping the delay time moves the read
//! head gradually, which bends the pitch of the repeats briefly (the
//! classic tape-delay "swoop") instead of clicking.

use nih_plug::nih_warn;

use super::{block_len, retarget};
use crate::dsp::delay_line::{capacity_for, DelayLine, Interpolation};
use crate::dsp::smoother::Smoother;
use crate::dsp::SMOOTHING_SECONDS;
use crate::params::{ParamDescriptor, ParamSnapshot, Preset};
use crate::processor::{EffectModule, UpdateMode};

pub const DELAY_LENGTH: usize = 0;
pub const DRY_MIX: usize = 1;
pub const WET_MIX: usize = 2;
pub const FEEDBACK: usize = 3;

/// Longest selectable delay, in seconds.
pub const MAX_DELAY_SECONDS: f32 = 2.0;

/// Shortest delay actually used. Reading happens before writing, so
/// one sample is the newest data available.
const MIN_DELAY_SAMPLES: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct Delay {
    sample_rate: f32,
    lines: Vec<DelayLine>,
    delay_length: Smoother,
    dry: Smoother,
    wet: Smoother,
    feedback: Smoother,
}

impl Default for Delay {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            lines: Vec::new(),
            delay_length: Smoother::new(SMOOTHING_SECONDS),
            dry: Smoother::new(SMOOTHING_SECONDS),
            wet: Smoother::new(SMOOTHING_SECONDS),
            feedback: Smoother::new(SMOOTHING_SECONDS),
        }
    }
}

impl EffectModule for Delay {
    const PARAMETERS: &'static [ParamDescriptor] = &[
        ParamDescriptor::float("delay_length", "Delay", 0.0, MAX_DELAY_SECONDS, 0.5).with_unit(" s"),
        ParamDescriptor::float("dry_mix", "Dry", 0.0, 1.0, 1.0),
        ParamDescriptor::float("wet_mix", "Wet", 0.0, 1.0, 0.5),
        ParamDescriptor::float("feedback", "Feedback", 0.0, 0.95, 0.1),
    ];

    fn presets() -> Vec<Preset> {
        vec![
            Preset::new("short delay, no feedback", [0.5, 1.0, 0.7, 0.0]),
            Preset::new("long delay with feedback", [1.0, 1.0, 0.7, 0.5]),
        ]
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize, num_channels: usize) {
        self.sample_rate = sample_rate;
        for smoother in [
            &mut self.delay_length,
            &mut self.dry,
            &mut self.wet,
            &mut self.feedback,
        ] {
            smoother.reset(sample_rate);
        }

        let capacity = capacity_for(MAX_DELAY_SECONDS, sample_rate);
        self.lines = match (0..num_channels)
            .map(|_| DelayLine::try_new(capacity))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(lines) => lines,
            Err(err) => {
                // Without buffers every channel passes through untouched.
                nih_warn!("delay disabled: {err}");
                Vec::new()
            }
        };
    }

    fn update(&mut self, params: &ParamSnapshot, mode: UpdateMode) {
        retarget(&mut self.delay_length, params.get(DELAY_LENGTH), mode);
        retarget(&mut self.dry, params.get(DRY_MIX), mode);
        retarget(&mut self.wet, params.get(WET_MIX), mode);
        retarget(&mut self.feedback, params.get(FEEDBACK), mode);
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        for i in 0..block_len(channels) {
            let delay = (self.delay_length.next() * self.sample_rate).max(MIN_DELAY_SAMPLES);
            let dry = self.dry.next();
            let wet = self.wet.next();
            let feedback = self.feedback.next();

            for (channel, line) in channels.iter_mut().zip(self.lines.iter_mut()) {
                let input = channel[i];
                let delayed = line.read(delay, Interpolation::Linear);
                line.push(input + feedback * delayed);
                channel[i] = dry * input + wet * delayed;
            }
        }
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
    }

    /// Time for the echoes to decay by 60 dB. Each repeat is scaled by
    /// `feedback`, so after `n` repeats the level is `feedback^n`, and
    /// `feedback^n = 0.001` gives `n = -3 / log10(feedback)`.
    fn tail_samples(&self) -> Option<u32> {
        let delay = (self.delay_length.target() * self.sample_rate).max(MIN_DELAY_SAMPLES);
        let feedback = self.feedback.target();

        let tail = if feedback > 0.001 {
            let repeats = -3.0 / feedback.log10();
            repeats * delay
        } else {
            // No feedback: a single echo.
            delay
        };
        Some(tail.min(u32::MAX as f32) as u32)
    }
}
