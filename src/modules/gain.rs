//! # Gain
//!
//! The smallest possible effect: multiply every sample by a factor. It is
//! the template the other modules grow from.
//!
//! Unlike the other modules the factor is not smoothed. An edit takes
//! effect whole at the next block boundary, which makes this the module
//! to reach for when checking the parameter handoff itself.

use super::block_len;
use crate::params::{ParamDescriptor, ParamSnapshot, Preset};
use crate::processor::{EffectModule, UpdateMode};

pub const GAIN: usize = 0;

#[derive(Debug, Clone)]
pub struct Gain {
    gain: f32,
}

impl Default for Gain {
    fn default() -> Self {
        Self { gain: 1.0 }
    }
}

impl EffectModule for Gain {
    const PARAMETERS: &'static [ParamDescriptor] =
        &[ParamDescriptor::float("gain", "Gain", 0.0, 2.0, 1.0)];

    fn presets() -> Vec<Preset> {
        vec![
            Preset::new("unity gain", [1.0]),
            Preset::new("double gain", [2.0]),
        ]
    }

    fn prepare(&mut self, _sample_rate: f32, _max_block_size: usize, _num_channels: usize) {}

    fn update(&mut self, params: &ParamSnapshot, _mode: UpdateMode) {
        self.gain = params.get(GAIN);
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        let len = block_len(channels);
        for channel in channels.iter_mut() {
            for sample in channel[..len].iter_mut() {
                *sample *= self.gain;
            }
        }
    }

    fn reset(&mut self) {}
}
