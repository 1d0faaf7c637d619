//! # Parametric EQ
//!
//! Two equalisers built on the same [`FilterChain`]:
//!
//! - [`Eq1Band`]: a single peaking band. Boost or cut around one
//!   frequency, with Q setting how wide the bell is.
//! - [`Eq4Band`]: low shelf, two peaking mids and a high shelf, the
//!   classic console layout.
//!
//! ```text
//!   gain
//!    ▲       low shelf     mid 1      mid 2     high shelf
//!    │  ────╮             ╭─╮                    ╭──────
//!  0 ┼──────╰─────────────╯ ╰──────╮  ╭─────────╯
//!    │                             ╰──╯
//!    └──────────────────────────────────────────────► frequency
//! ```
//!
//! Filter parameters are not ramped. Every update redesigns every stage and
//! the new coefficients replace the old ones between blocks.

use super::block_len;
use crate::dsp::biquad::FilterShape;
use crate::dsp::filter_chain::{BandSettings, FilterChain};
use crate::params::{ParamDescriptor, ParamSnapshot, Preset};
use crate::processor::{EffectModule, UpdateMode};

/// Apply `chain` to each channel's block.
fn process_chain(chain: &mut FilterChain, channels: &mut [&mut [f32]]) {
    if block_len(channels) == 0 {
        return;
    }
    for (index, channel) in channels.iter_mut().enumerate() {
        chain.process(index, channel);
    }
}

/// Read one band's `(frequency, q, gain)` triple starting at `first`.
fn band_at(params: &ParamSnapshot, shape: FilterShape, first: usize) -> BandSettings {
    BandSettings {
        shape,
        frequency: params.get(first),
        q: params.get(first + 1),
        gain_db: params.get(first + 2),
    }
}

pub mod one_band {
    pub const FREQ: usize = 0;
    pub const Q: usize = 1;
    pub const GAIN: usize = 2;
}

/// A single peaking band.
#[derive(Debug, Clone)]
pub struct Eq1Band {
    sample_rate: f32,
    chain: FilterChain,
}

impl Default for Eq1Band {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            chain: FilterChain::new(),
        }
    }
}

impl EffectModule for Eq1Band {
    const PARAMETERS: &'static [ParamDescriptor] = &[
        ParamDescriptor::float("freq", "Frequency", 20.0, 20000.0, 1000.0).with_unit(" Hz"),
        ParamDescriptor::float("q", "Q", 0.1, 20.0, 1.0),
        ParamDescriptor::float("gain", "Gain", -50.0, 50.0, 0.0).with_unit(" dB"),
    ];

    fn presets() -> Vec<Preset> {
        vec![Preset::new("Scoop 1000 Hz", [1000.0, 1.0, -10.0])]
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize, num_channels: usize) {
        self.sample_rate = sample_rate;
        self.chain.prepare(num_channels);
    }

    fn update(&mut self, params: &ParamSnapshot, _mode: UpdateMode) {
        let band = band_at(params, FilterShape::Peaking, one_band::FREQ);
        self.chain.update(self.sample_rate, &[band]);
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        process_chain(&mut self.chain, channels);
    }

    fn reset(&mut self) {
        self.chain.reset();
    }
}

pub mod four_band {
    pub const LOW_FREQ: usize = 0;
    pub const LOW_Q: usize = 1;
    pub const LOW_GAIN: usize = 2;
    pub const MID1_FREQ: usize = 3;
    pub const MID1_Q: usize = 4;
    pub const MID1_GAIN: usize = 5;
    pub const MID2_FREQ: usize = 6;
    pub const MID2_Q: usize = 7;
    pub const MID2_GAIN: usize = 8;
    pub const HIGH_FREQ: usize = 9;
    pub const HIGH_Q: usize = 10;
    pub const HIGH_GAIN: usize = 11;
}

/// Low shelf, two peaking mids, high shelf.
#[derive(Debug, Clone)]
pub struct Eq4Band {
    sample_rate: f32,
    chain: FilterChain,
}

impl Default for Eq4Band {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            chain: FilterChain::new(),
        }
    }
}

impl EffectModule for Eq4Band {
    const PARAMETERS: &'static [ParamDescriptor] = &[
        ParamDescriptor::float("freq_low", "Low Shelf Frequency", 20.0, 20000.0, 20.0)
            .with_unit(" Hz"),
        ParamDescriptor::float("q_low", "Low Shelf Q", 0.1, 20.0, 1.0),
        ParamDescriptor::float("gain_low", "Low Shelf Gain", -24.0, 24.0, 0.0).with_unit(" dB"),
        ParamDescriptor::float("freq_mid_1", "Mid 1 Frequency", 20.0, 20000.0, 160.0)
            .with_unit(" Hz"),
        ParamDescriptor::float("q_mid_1", "Mid 1 Q", 0.1, 20.0, 1.0),
        ParamDescriptor::float("gain_mid_1", "Mid 1 Gain", -24.0, 24.0, 0.0).with_unit(" dB"),
        ParamDescriptor::float("freq_mid_2", "Mid 2 Frequency", 20.0, 20000.0, 1000.0)
            .with_unit(" Hz"),
        ParamDescriptor::float("q_mid_2", "Mid 2 Q", 0.1, 20.0, 1.0),
        ParamDescriptor::float("gain_mid_2", "Mid 2 Gain", -24.0, 24.0, 0.0).with_unit(" dB"),
        ParamDescriptor::float("freq_high", "High Shelf Frequency", 20.0, 20000.0, 20000.0)
            .with_unit(" Hz"),
        ParamDescriptor::float("q_high", "High Shelf Q", 0.1, 20.0, 1.0),
        ParamDescriptor::float("gain_high", "High Shelf Gain", -24.0, 24.0, 0.0)
            .with_unit(" dB"),
    ];

    fn presets() -> Vec<Preset> {
        vec![Preset::new(
            "default",
            [
                20.0, 1.0, 0.0, //
                160.0, 1.0, 0.0, //
                1000.0, 1.0, 0.0, //
                20000.0, 1.0, 0.0,
            ],
        )]
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize, num_channels: usize) {
        self.sample_rate = sample_rate;
        self.chain.prepare(num_channels);
    }

    fn update(&mut self, params: &ParamSnapshot, _mode: UpdateMode) {
        let bands = [
            band_at(params, FilterShape::LowShelf, four_band::LOW_FREQ),
            band_at(params, FilterShape::Peaking, four_band::MID1_FREQ),
            band_at(params, FilterShape::Peaking, four_band::MID2_FREQ),
            band_at(params, FilterShape::HighShelf, four_band::HIGH_FREQ),
        ];
        self.chain.update(self.sample_rate, &bands);
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        process_chain(&mut self.chain, channels);
    }

    fn reset(&mut self) {
        self.chain.reset();
    }
}
