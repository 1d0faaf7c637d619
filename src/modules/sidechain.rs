//! # Fake Sidechain
//!
//! The "pumping" sound of dance music comes from a compressor keyed by the
//! kick drum: every beat, the pad ducks and swells back. This module fakes
//! it without a key input. The timeline is cut into windows of `window`
//! seconds; the first half of each window is attenuated by `depth`, the
//! second half passes at full level.
//!
//! ```text
//!  level
//!  1.0 ┤        ┌────┐    ┌────┐    ┌────
//!      │        │    │    │    │    │
//!  1-d ┤────────┘    └────┘    └────┘
//!      └──────────────────────────────────► time
//!      |<- window ->|
//! ```
//!
//! The window position is a single counter shared by every channel, so
//! left and right always duck together.

use super::block_len;
use crate::params::{ParamDescriptor, ParamSnapshot, Preset};
use crate::processor::{EffectModule, UpdateMode};

pub const WINDOW: usize = 0;
pub const DEPTH: usize = 1;

/// Shortest window in samples. Two keeps both halves non-empty.
const MIN_WINDOW_SAMPLES: usize = 2;

#[derive(Debug, Clone)]
pub struct FakeSidechain {
    sample_rate: f32,
    window_samples: usize,
    position: usize,
    depth: f32,
}

impl Default for FakeSidechain {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            window_samples: 44100,
            position: 0,
            depth: 1.0,
        }
    }
}

impl FakeSidechain {
    /// Level for a position inside the window.
    #[inline]
    fn envelope(&self, position: usize) -> f32 {
        if position < self.window_samples / 2 {
            1.0 - self.depth
        } else {
            1.0
        }
    }
}

impl EffectModule for FakeSidechain {
    const PARAMETERS: &'static [ParamDescriptor] = &[
        ParamDescriptor::float("window", "Window", 0.05, 2.0, 1.0).with_unit(" s"),
        ParamDescriptor::float("depth", "Depth", 0.0, 1.0, 1.0),
    ];

    fn presets() -> Vec<Preset> {
        vec![Preset::new("default", [1.0, 1.0])]
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize, _num_channels: usize) {
        self.sample_rate = sample_rate;
        self.position = 0;
    }

    fn update(&mut self, params: &ParamSnapshot, _mode: UpdateMode) {
        let window = (params.get(WINDOW) * self.sample_rate).round() as usize;
        self.window_samples = window.max(MIN_WINDOW_SAMPLES);
        if self.position >= self.window_samples {
            self.position = 0;
        }
        self.depth = params.get(DEPTH);
    }

    fn process(&mut self, channels: &mut [&mut [f32]]) {
        for i in 0..block_len(channels) {
            let level = self.envelope(self.position);
            for channel in channels.iter_mut() {
                channel[i] *= level;
            }

            self.position += 1;
            if self.position >= self.window_samples {
                self.position = 0;
            }
        }
    }

    fn reset(&mut self) {
        self.position = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(window: f32, depth: f32) -> FakeSidechain {
        let mut pump = FakeSidechain::default();
        pump.prepare(1000.0, 256, 2);
        pump.update(&ParamSnapshot::from_values([window, depth]), UpdateMode::Snap);
        pump
    }

    #[test]
    fn first_half_of_each_window_is_muted() {
        // 100 ms at 1 kHz: 50 muted samples, 50 open.
        let mut pump = prepared(0.1, 1.0);
        let mut samples = [1.0_f32; 200];
        pump.process(&mut [&mut samples[..]]);

        assert!(samples[..50].iter().all(|&s| s == 0.0));
        assert!(samples[50..100].iter().all(|&s| s == 1.0));
        assert!(samples[100..150].iter().all(|&s| s == 0.0));
        assert!(samples[150..].iter().all(|&s| s == 1.0));
    }

    #[test]
    fn depth_scales_the_dip() {
        let mut pump = prepared(0.1, 0.25);
        let mut samples = [1.0_f32; 100];
        pump.process(&mut [&mut samples[..]]);
        assert!(samples[..50].iter().all(|&s| s == 0.75));
        assert!(samples[50..].iter().all(|&s| s == 1.0));
    }

    #[test]
    fn window_continues_across_blocks_and_channels() {
        let mut pump = prepared(0.1, 1.0);
        let mut left = [1.0_f32; 30];
        let mut right = [1.0_f32; 30];
        pump.process(&mut [&mut left[..], &mut right[..]]);
        assert_eq!(left, right);

        let mut left = [1.0_f32; 30];
        let mut right = [1.0_f32; 30];
        pump.process(&mut [&mut left[..], &mut right[..]]);
        // Samples 30..50 muted, 50..60 open.
        assert!(left[..20].iter().all(|&s| s == 0.0));
        assert!(left[20..].iter().all(|&s| s == 1.0));
        assert_eq!(left, right);
    }
}
