//! # Loveless FX — A Collection of Small AU/VST3/CLAP Effects
//!
//! Ten effect plugins built with [nih-plug](https://github.com/robbert-vdh/nih-plug)
//! for learning DSP fundamentals: gain, saturation, delay, vibrato,
//! flanger, one- and four-band EQ, convolution reverb, an amp simulator
//! and a tempo-free "pump". All of them ship from one library in AUv2,
//! VST3 and CLAP formats, and every algorithm is implemented from scratch.
//!
//! ## How the pieces fit
//!
//! ```text
//!   host automation / editor / presets          host audio callback
//!              │                                        │
//!              ▼                                        ▼
//!   host::HostParams ──► params::ControlHandle   host::EffectPlugin<M>
//!                               │                       │
//!                          (atomics + flags)            ▼
//!                               └──────────► processor::BlockProcessor<M>
//!                                                       │
//!                                                       ▼
//!                                         modules::M  (built from dsp::*)
//! ```
//!
//! - [`params`]: descriptor tables, the lock-free parameter store, presets.
//! - [`processor`]: the [`EffectModule`] trait and the per-block driver.
//! - [`dsp`]: smoothers, delay lines, LFOs, biquads, waveshapers and
//!   partitioned convolution.
//! - [`modules`]: the effects themselves.
//! - [`host`]: the nih-plug shim. No DSP lives there.

pub mod dsp;
pub mod error;
pub mod host;
pub mod modules;
pub mod params;
pub mod processor;

pub use error::{ConfigError, ControlError, DspError};
pub use params::{ControlHandle, ParamDescriptor, ParamSnapshot, Preset};
pub use processor::{BlockProcessor, EffectModule, UpdateMode};

use host::{
    AmpSimPlugin, ConvReverbPlugin, DelayPlugin, Eq1BandPlugin, Eq4BandPlugin,
    FakeSidechainPlugin, FlangerPlugin, GainPlugin, SaturationPlugin, VibratoPlugin,
};
use nih_plug::{nih_export_clap, nih_export_vst3};

// Entry points the DAW looks for: `clap_entry` for CLAP hosts and
// `GetPluginFactory` for VST3 hosts. Every effect is listed in both.
nih_export_clap!(
    GainPlugin,
    SaturationPlugin,
    DelayPlugin,
    VibratoPlugin,
    FlangerPlugin,
    Eq1BandPlugin,
    Eq4BandPlugin,
    ConvReverbPlugin,
    AmpSimPlugin,
    FakeSidechainPlugin
);
nih_export_vst3!(
    GainPlugin,
    SaturationPlugin,
    DelayPlugin,
    VibratoPlugin,
    FlangerPlugin,
    Eq1BandPlugin,
    Eq4BandPlugin,
    ConvReverbPlugin,
    AmpSimPlugin,
    FakeSidechainPlugin
);

// Wrap the CLAP entry point as an AUv2 factory for Logic Pro.
clap_wrapper::export_auv2!();
