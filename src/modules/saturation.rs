//! # Saturation
//!
//! Drive the input through a gain stage into a waveshaper. Low drive keeps
//! the signal on the nearly linear part of the curve; high drive pushes it
//! into the flat part, and the clipped peaks add harmonics.

use super::{block_len, retarget};
use crate::dsp::smoother::Smoother;
use crate::dsp::waveshaper::Shape;
use crate::dsp::SMOOTHING_SECONDS;
use crate::params::{ParamDescriptor, ParamSnapshot, Preset};
use crate::processor::{EffectModule, UpdateMode};

pub const GAIN: usize = 0;
pub const SHAPE: usize = 1;

#[derive(Debug, Clone)]
pub struct Saturation {
    drive: Smoother,
    shape: Shape,
}

impl Default for Saturation {
    fn default() -> Self {
        Self {
            drive: Smoother::new(SMOOTHING_SECONDS),
            shape: Shape::default(),
        }
    }
}

impl EffectModule for Saturation {
    const PARAMETERS: &'static [ParamDescriptor] = &[
        ParamDescriptor::float("gain", "Gain", 0.0, 10.0, 1.0),
        ParamDescriptor::choice("shape", "Shape", Shape::NAMES, 0),
    ];

    fn presets() -> Vec<Preset> {
        vec![
            Preset::new("Tanh shaping", [1.0, 0.0]),
            Preset::new("Soft-clipping distortion", [1.0, 1.0]),
            Preset::new("Hard-clipping distortion", [1.0, 2.0]),
        ]
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize, _num_channels: usize) {
        self.drive.reset(sample_rate);
    }

    fn update(&mut self, params: &ParamSnapshot, mode: UpdateMode) {
        retarget(&mut self.drive, params.get(GAIN), mode);
        self.shape = Shape::from_index(params.choice(SHAPE));
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        let shape = self.shape;
        for i in 0..block_len(channels) {
            let drive = self.drive.next();
            for channel in channels.iter_mut() {
                channel[i] = shape.apply(drive * channel[i]);
            }
        }
    }

    fn reset(&mut self) {}
}
