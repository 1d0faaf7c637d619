//! # Amp Simulator
//!
//! A guitar amp in five stages:
//!
//! ```text
//! Input ─► [ bass shelf ] ─► [ mid peak ] ─► [ treble shelf ]      tone stack
//!       ─► × pre gain ─► soft clip ─► × post gain                  preamp
//!       ─► [ cabinet convolution ] ─► Output                       speaker
//! ```
//!
//! The tone stack sits before the clipper, so it changes what distorts,
//! not just the final colour. Pre gain sets how hard the clipper is
//! driven; post gain only restores level. The cabinet IR does most of the
//! work of making the result sound like a speaker instead of a fuzz box:
//! it removes the harsh top end the clipper creates.
//!
//! When the selected cabinet is unavailable the preamp output goes through
//! a plain delay of the convolver's latency instead, so the latency the
//! host compensates for is the same with or without a cabinet.

use nih_plug::nih_warn;
use nih_plug::util::db_to_gain;

use super::{block_len, retarget};
use crate::dsp::biquad::FilterShape;
use crate::dsp::convolution::{ConvolutionEngine, PartitionedConvolver, DEFAULT_PARTITION_SIZE};
use crate::dsp::delay_line::{DelayLine, Interpolation};
use crate::dsp::filter_chain::{BandSettings, FilterChain};
use crate::dsp::ir::Cabinet;
use crate::dsp::smoother::Smoother;
use crate::dsp::waveshaper::soft_clip;
use crate::dsp::SMOOTHING_SECONDS;
use crate::params::{ParamDescriptor, ParamSnapshot, Preset};
use crate::processor::{EffectModule, UpdateMode};

pub const BASS_FREQ: usize = 0;
pub const BASS_Q: usize = 1;
pub const BASS_GAIN: usize = 2;
pub const MID_FREQ: usize = 3;
pub const MID_Q: usize = 4;
pub const MID_GAIN: usize = 5;
pub const TREBLE_FREQ: usize = 6;
pub const TREBLE_Q: usize = 7;
pub const TREBLE_GAIN: usize = 8;
pub const PRE_GAIN: usize = 9;
pub const POST_GAIN: usize = 10;
pub const IR: usize = 11;

pub const CABINET_NAMES: &[&str] = &["Open Back 2x12", "Closed Back 4x12", "Combo 1x12"];

pub struct AmpSim {
    sample_rate: f32,
    num_channels: usize,
    tone_stack: FilterChain,
    /// Linear gains, smoothed after the dB conversion.
    pre_gain: Smoother,
    post_gain: Smoother,
    cabinet: PartitionedConvolver,
    cabinets: Vec<Option<Vec<f32>>>,
    cabinet_len: Option<usize>,
    /// Latency-matched stand-in for the cabinet, one per channel.
    bypass_lines: Vec<DelayLine>,
}

impl Default for AmpSim {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            num_channels: 0,
            tone_stack: FilterChain::new(),
            pre_gain: Smoother::new(SMOOTHING_SECONDS),
            post_gain: Smoother::new(SMOOTHING_SECONDS),
            cabinet: PartitionedConvolver::new(DEFAULT_PARTITION_SIZE),
            cabinets: Vec::new(),
            cabinet_len: None,
            bypass_lines: Vec::new(),
        }
    }
}

impl EffectModule for AmpSim {
    const PARAMETERS: &'static [ParamDescriptor] = &[
        ParamDescriptor::float("bass_freq", "Bass Frequency", 20.0, 200.0, 50.0).with_unit(" Hz"),
        ParamDescriptor::float("bass_q", "Bass Q", 0.1, 20.0, 1.0),
        ParamDescriptor::float("bass_gain", "Bass Gain", -40.0, 40.0, 0.0).with_unit(" dB"),
        ParamDescriptor::float("mid_freq", "Mid Frequency", 100.0, 600.0, 450.0).with_unit(" Hz"),
        ParamDescriptor::float("mid_q", "Mid Q", 0.1, 20.0, 1.0),
        ParamDescriptor::float("mid_gain", "Mid Gain", -40.0, 40.0, 0.0).with_unit(" dB"),
        ParamDescriptor::float("treble_freq", "Treble Frequency", 1000.0, 5000.0, 3000.0)
            .with_unit(" Hz"),
        ParamDescriptor::float("treble_q", "Treble Q", 0.1, 20.0, 1.0),
        ParamDescriptor::float("treble_gain", "Treble Gain", -40.0, 40.0, 0.0).with_unit(" dB"),
        ParamDescriptor::float("pre_gain", "Pre Gain", 0.0, 100.0, 0.0).with_unit(" dB"),
        ParamDescriptor::float("post_gain", "Post Gain", 0.0, 50.0, 0.0).with_unit(" dB"),
        ParamDescriptor::impulse_response("ir", "Cabinet", CABINET_NAMES, 0),
    ];

    fn presets() -> Vec<Preset> {
        vec![
            Preset::new(
                "default",
                [
                    50.0, 1.0, 0.0, //
                    450.0, 1.0, 0.0, //
                    3000.0, 1.0, 0.0, //
                    0.0, 0.0, 0.0,
                ],
            ),
            Preset::new(
                "crunch",
                [
                    80.0, 0.7, 3.0, //
                    450.0, 1.0, -4.0, //
                    3000.0, 0.7, 4.0, //
                    30.0, 0.0, 1.0,
                ],
            ),
        ]
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize, num_channels: usize) {
        self.sample_rate = sample_rate;
        self.num_channels = num_channels;
        self.tone_stack.prepare(num_channels);
        self.pre_gain.reset(sample_rate);
        self.post_gain.reset(sample_rate);

        self.cabinets = Cabinet::ALL
            .iter()
            .map(|cabinet| match cabinet
                .synthesize(sample_rate)
                .and_then(|ir| ir.prepare_for(sample_rate))
            {
                Ok(ir) => Some(ir),
                Err(err) => {
                    nih_warn!("cabinet \"{}\" unavailable: {err}", cabinet.name());
                    None
                }
            })
            .collect();
        self.cabinet_len = None;

        let latency = self.cabinet.latency_samples();
        self.bypass_lines = match (0..num_channels)
            .map(|_| DelayLine::try_new(latency))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(lines) => lines,
            Err(err) => {
                nih_warn!("cabinet bypass delay disabled: {err}");
                Vec::new()
            }
        };
    }

    fn update(&mut self, params: &ParamSnapshot, mode: UpdateMode) {
        let band = |shape, first: usize| BandSettings {
            shape,
            frequency: params.get(first),
            q: params.get(first + 1),
            gain_db: params.get(first + 2),
        };
        self.tone_stack.update(
            self.sample_rate,
            &[
                band(FilterShape::LowShelf, BASS_FREQ),
                band(FilterShape::Peaking, MID_FREQ),
                band(FilterShape::HighShelf, TREBLE_FREQ),
            ],
        );

        retarget(&mut self.pre_gain, db_to_gain(params.get(PRE_GAIN)), mode);
        retarget(&mut self.post_gain, db_to_gain(params.get(POST_GAIN)), mode);
    }

    fn reload_impulse_response(&mut self, index: usize) {
        let Some(Some(ir)) = self.cabinets.get(index) else {
            self.cabinet_len = None;
            return;
        };
        self.cabinet_len = match self.cabinet.load_impulse_response(ir, self.num_channels) {
            Ok(()) => Some(ir.len()),
            Err(_) => None,
        };
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        for i in 0..block_len(channels) {
            let pre = self.pre_gain.next();
            let post = self.post_gain.next();
            for (index, channel) in channels.iter_mut().enumerate() {
                let toned = self.tone_stack.process_sample(index, channel[i]);
                channel[i] = post * soft_clip(pre * toned);
            }
        }

        if self.cabinet_len.is_some() {
            for (index, channel) in channels.iter_mut().enumerate() {
                self.cabinet.process(index, channel);
            }
        } else {
            let latency = self.cabinet.latency_samples() as f32;
            for (channel, line) in channels.iter_mut().zip(self.bypass_lines.iter_mut()) {
                for sample in channel.iter_mut() {
                    let delayed = line.read(latency, Interpolation::Nearest);
                    line.push(*sample);
                    *sample = delayed;
                }
            }
        }
    }

    fn reset(&mut self) {
        self.tone_stack.reset();
        self.cabinet.reset();
        for line in &mut self.bypass_lines {
            line.clear();
        }
    }

    fn tail_samples(&self) -> Option<u32> {
        let latency = self.cabinet.latency_samples();
        let tail = self.cabinet_len.map_or(latency, |len| len + latency);
        Some(u32::try_from(tail).unwrap_or(u32::MAX))
    }

    fn latency_samples(&self) -> usize {
        self.cabinet.latency_samples()
    }
}
