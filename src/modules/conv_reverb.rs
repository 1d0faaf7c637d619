//! # Convolution Reverb
//!
//! Convolve the input with the impulse response of a room and blend the
//! result with the dry signal.
//!
//! ```text
//!           ┌──► [ Partitioned Convolver ] ── wet ──► × sin(π/2·mix) ──┐
//! Input ────┤                                                          (+)──► Output
//!           └──► [ Delay: latency ] ───────── dry ──► × cos(π/2·mix) ──┘
//! ```
//!
//! The convolver answers one partition late, so the dry path goes through
//! a delay line of the same length. Without it a short room would comb
//! filter against its own dry signal. The host is told about the latency
//! and compensates for both paths together.
//!
//! ## Impulse responses
//!
//! The three rooms are synthesized in `prepare` at the host rate. The
//! fourth slot holds a user WAV file, named either by
//! [`ConvReverb::with_user_impulse_response`] or by the
//! [`USER_IR_ENV`](crate::dsp::ir::USER_IR_ENV) environment variable. When
//! the selected slot has nothing usable the module outputs the (aligned)
//! dry signal unchanged.

use nih_plug::{nih_log, nih_warn};

use super::{block_len, retarget};
use crate::dsp::convolution::{ConvolutionEngine, PartitionedConvolver, DEFAULT_PARTITION_SIZE};
use crate::dsp::delay_line::{DelayLine, Interpolation};
use crate::dsp::ir::{user_impulse_response, ImpulseResponse, Room};
use crate::dsp::mix::equal_power_gains;
use crate::dsp::smoother::Smoother;
use crate::dsp::SMOOTHING_SECONDS;
use crate::error::DspError;
use crate::params::{ParamDescriptor, ParamSnapshot, Preset};
use crate::processor::{EffectModule, UpdateMode};

pub const MIX: usize = 0;
pub const IR: usize = 1;

/// Choice names of the `ir` parameter. The rooms come first, in
/// [`Room::ALL`] order.
pub const IR_NAMES: &[&str] = &["Small Room", "Concert Hall", "Plate", "User File"];
pub const USER_SLOT: usize = 3;

pub struct ConvReverb {
    sample_rate: f32,
    max_block_size: usize,
    num_channels: usize,
    convolver: PartitionedConvolver,
    /// Prepared IRs by choice index. `None` where loading failed.
    bank: Vec<Option<Vec<f32>>>,
    /// Overrides the environment variable when set.
    user_ir: Option<ImpulseResponse>,
    active_ir_len: Option<usize>,
    dry_lines: Vec<DelayLine>,
    /// Wet scratch, one `max_block_size` buffer per channel.
    wet: Vec<Vec<f32>>,
    mix: Smoother,
}

impl Default for ConvReverb {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            max_block_size: 0,
            num_channels: 0,
            convolver: PartitionedConvolver::new(DEFAULT_PARTITION_SIZE),
            bank: Vec::new(),
            user_ir: None,
            active_ir_len: None,
            dry_lines: Vec::new(),
            wet: Vec::new(),
            mix: Smoother::new(SMOOTHING_SECONDS),
        }
    }
}

impl ConvReverb {
    /// A reverb whose user slot holds `ir` instead of the file named by
    /// the environment.
    pub fn with_user_impulse_response(ir: ImpulseResponse) -> Self {
        Self {
            user_ir: Some(ir),
            ..Self::default()
        }
    }

    fn prepare_bank(&self) -> Vec<Option<Vec<f32>>> {
        let mut bank: Vec<_> = Room::ALL
            .iter()
            .map(|room| {
                let ir = room
                    .synthesize(self.sample_rate)
                    .and_then(|ir| ir.prepare_for(self.sample_rate));
                keep_or_warn(room.name(), ir)
            })
            .collect();

        let user = match &self.user_ir {
            Some(ir) => Some(ir.prepare_for(self.sample_rate)),
            None => user_impulse_response()
                .map(|loaded| loaded.and_then(|ir| ir.prepare_for(self.sample_rate))),
        };
        bank.push(match user {
            Some(ir) => keep_or_warn(IR_NAMES[USER_SLOT], ir),
            None => {
                nih_log!("no user impulse response configured");
                None
            }
        });
        bank
    }

    fn process_chunk(&mut self, channels: &mut [&mut [f32]], start: usize, end: usize) {
        let len = end - start;
        let wet_available = self.active_ir_len.is_some();

        if wet_available {
            for (index, (channel, wet)) in channels.iter().zip(self.wet.iter_mut()).enumerate() {
                wet[..len].copy_from_slice(&channel[start..end]);
                self.convolver.process(index, &mut wet[..len]);
            }
        }

        let latency = self.convolver.latency_samples() as f32;
        for i in 0..len {
            let mix = self.mix.next();
            let (dry_gain, wet_gain) = if wet_available {
                equal_power_gains(mix)
            } else {
                (1.0, 0.0)
            };

            for ((channel, line), wet) in channels
                .iter_mut()
                .zip(self.dry_lines.iter_mut())
                .zip(self.wet.iter())
            {
                let input = channel[start + i];
                let dry = line.read(latency, Interpolation::Nearest);
                line.push(input);
                channel[start + i] = dry_gain * dry + wet_gain * wet[i];
            }
        }
    }
}

fn keep_or_warn(name: &str, ir: Result<Vec<f32>, DspError>) -> Option<Vec<f32>> {
    match ir {
        Ok(samples) => Some(samples),
        Err(err) => {
            nih_warn!("impulse response \"{name}\" unavailable: {err}");
            None
        }
    }
}

impl EffectModule for ConvReverb {
    const PARAMETERS: &'static [ParamDescriptor] = &[
        ParamDescriptor::float("mix", "Mix", 0.0, 1.0, 0.5),
        ParamDescriptor::impulse_response("ir", "Impulse Response", IR_NAMES, 0),
    ];

    fn presets() -> Vec<Preset> {
        vec![
            Preset::new("default", [0.0, 0.0]),
            Preset::new("Small room", [0.3, 0.0]),
            Preset::new("Concert hall", [0.4, 1.0]),
        ]
    }

    fn prepare(&mut self, sample_rate: f32, max_block_size: usize, num_channels: usize) {
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.num_channels = num_channels;
        self.mix.reset(sample_rate);

        self.bank = self.prepare_bank();
        // The IR itself is loaded by the reload that `prepare` schedules.
        self.active_ir_len = None;
        self.wet = vec![vec![0.0; max_block_size]; num_channels];

        let latency = self.convolver.latency_samples();
        self.dry_lines = match (0..num_channels)
            .map(|_| DelayLine::try_new(latency))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(lines) => lines,
            Err(err) => {
                nih_warn!("reverb dry path disabled: {err}");
                Vec::new()
            }
        };
    }

    fn update(&mut self, params: &ParamSnapshot, mode: UpdateMode) {
        retarget(&mut self.mix, params.get(MIX), mode);
    }

    fn reload_impulse_response(&mut self, index: usize) {
        let Some(Some(ir)) = self.bank.get(index) else {
            self.active_ir_len = None;
            return;
        };
        self.active_ir_len = match self.convolver.load_impulse_response(ir, self.num_channels) {
            Ok(()) => Some(ir.len()),
            Err(_) => None,
        };
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        let len = block_len(channels);
        let chunk = self.max_block_size.max(1);
        let mut start = 0;
        while start < len {
            let end = (start + chunk).min(len);
            self.process_chunk(channels, start, end);
            start = end;
        }
    }

    fn reset(&mut self) {
        self.convolver.reset();
        for line in &mut self.dry_lines {
            line.clear();
        }
    }

    fn tail_samples(&self) -> Option<u32> {
        let latency = self.convolver.latency_samples();
        let tail = self.active_ir_len.map_or(latency, |len| len + latency);
        Some(u32::try_from(tail).unwrap_or(u32::MAX))
    }

    fn latency_samples(&self) -> usize {
        self.convolver.latency_samples()
    }
}
