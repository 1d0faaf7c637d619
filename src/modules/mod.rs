//! # Effect Modules
//!
//! One file per effect. Each module is a plain struct implementing
//! [`EffectModule`](crate::processor::EffectModule): a `const` parameter
//! table, a preset list, and the DSP. Parameters are addressed by the
//! index constants declared next to each table.
//!
//! Processing is sample-major: the outer loop walks time, the inner loop
//! walks channels. Anything that moves with time (smoothers, LFO phase,
//! the sidechain window) then advances exactly once per sample, however
//! many channels there are.

pub mod amp_sim;
pub mod conv_reverb;
pub mod delay;
pub mod eq;
pub mod flanger;
pub mod gain;
pub mod saturation;
pub mod sidechain;
pub mod vibrato;

pub use amp_sim::AmpSim;
pub use conv_reverb::ConvReverb;
pub use delay::Delay;
pub use eq::{Eq1Band, Eq4Band};
pub use flanger::Flanger;
pub use gain::Gain;
pub use saturation::Saturation;
pub use sidechain::FakeSidechain;
pub use vibrato::Vibrato;

use crate::dsp::smoother::Smoother;
use crate::processor::UpdateMode;

/// Move `smoother` to `value`, ramping or snapping as the update asks.
pub(crate) fn retarget(smoother: &mut Smoother, value: f32, mode: UpdateMode) {
    match mode {
        UpdateMode::Ramp => smoother.set_target(value),
        UpdateMode::Snap => smoother.set_current_and_target(value),
    }
}

/// Samples per channel in a block. Channels always share one length.
pub(crate) fn block_len(channels: &[&mut [f32]]) -> usize {
    channels.first().map_or(0, |channel| channel.len())
}
