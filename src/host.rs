//! # Host Adapter
//!
//! Everything nih-plug needs to turn an [`EffectModule`] into a plugin the
//! DAW can load. There is no DSP here.
//!
//! ## Parameters
//!
//! nih-plug normally wants a `#[derive(Params)]` struct with one field per
//! knob. Our parameters are data (a `const` table per module), so
//! [`HostParams`] builds the nih-plug parameter objects from that table at
//! runtime and implements [`Params`] by hand.
//!
//! Each parameter object gets a callback. Whenever the host changes a
//! value (automation, the generic editor, state restore) the callback
//! forwards it to [`ControlHandle::set_parameter`], which stores it and
//! raises the change flag. The audio thread picks it up at the next block
//! boundary, exactly as it would for any other control edit.
//!
//! ## State
//!
//! The [`ParameterStore`](crate::params::ParameterStore) is the source of
//! truth, not the parameter objects: a preset loaded through
//! [`ControlHandle::load_preset`] never passes through them. So the store's
//! values are saved as persistent fields next to the host's own parameter
//! state. nih-plug restores fields after parameter values, which puts the
//! saved set back on top of whatever the callbacks replayed.
//!
//! ```text
//!  DAW ──► FloatParam / IntParam ──callback──► ControlHandle::set_parameter
//!                                                   │
//!                                                   ▼
//!  DAW ──► EffectPlugin::process ──► BlockProcessor::process_block ──► module
//! ```
//!
//! ## Identity
//!
//! Plugin names, CLAP ids and VST3 class ids are per module, supplied by
//! the [`PluginModule`] impls at the bottom of this file. Like parameter
//! ids, published plugin ids must never change.

use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use nih_plug::prelude::*;

use crate::modules::{
    AmpSim, ConvReverb, Delay, Eq1Band, Eq4Band, FakeSidechain, Flanger, Gain, Saturation,
    Vibrato,
};
use crate::params::{ControlHandle, ParamDescriptor, ParamKind};
use crate::processor::{BlockProcessor, EffectModule};

/// What the host needs to know about a module besides its DSP.
pub trait PluginModule: EffectModule + Default {
    const NAME: &'static str;
    const CLAP_ID: &'static str;
    const DESCRIPTION: &'static str;
    const CLAP_FEATURES: &'static [ClapFeature];
    /// Must be exactly 16 bytes and unique across every VST3 plugin.
    const VST3_CLASS_ID: [u8; 16];
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory];
}

/// Stereo in, stereo out.
pub const STEREO: AudioIOLayout = AudioIOLayout {
    main_input_channels: NonZeroU32::new(2),
    main_output_channels: NonZeroU32::new(2),
    aux_input_ports: &[],
    aux_output_ports: &[],
    names: PortNames::const_default(),
};

/// Mono in, mono out.
pub const MONO: AudioIOLayout = AudioIOLayout {
    main_input_channels: NonZeroU32::new(1),
    main_output_channels: NonZeroU32::new(1),
    aux_input_ports: &[],
    aux_output_ports: &[],
    names: PortNames::const_default(),
};

/// One nih-plug parameter object built from a descriptor.
enum HostParam {
    Float(FloatParam),
    Choice(IntParam),
}

impl HostParam {
    fn new(index: usize, descriptor: &ParamDescriptor, control: &ControlHandle) -> Self {
        match descriptor.kind {
            ParamKind::Float { min, max } => {
                let range = if descriptor.unit == " Hz" {
                    // Pitch perception is roughly logarithmic, so give
                    // the low end more of the knob.
                    FloatRange::Skewed {
                        min,
                        max,
                        factor: FloatRange::skew_factor(-2.0),
                    }
                } else {
                    FloatRange::Linear { min, max }
                };

                let control = control.clone();
                let param = FloatParam::new(descriptor.name, descriptor.default, range)
                    .with_unit(descriptor.unit)
                    .with_callback(Arc::new(move |value: f32| {
                        // Rejections (non-finite values) leave the old value in place.
                        let _ = control.set_parameter(index, value);
                    }));
                Self::Float(param)
            }
            ParamKind::Choice(choices) => {
                let max = choices.len().saturating_sub(1) as i32;
                let control = control.clone();
                let param = IntParam::new(
                    descriptor.name,
                    descriptor.default as i32,
                    IntRange::Linear { min: 0, max },
                )
                .with_value_to_string(Arc::new(move |value: i32| {
                    choices
                        .get(value.max(0) as usize)
                        .copied()
                        .unwrap_or_default()
                        .to_owned()
                }))
                .with_string_to_value(Arc::new(move |text: &str| {
                    choices
                        .iter()
                        .position(|choice| choice.eq_ignore_ascii_case(text.trim()))
                        .map(|index| index as i32)
                }))
                .with_callback(Arc::new(move |value: i32| {
                    let _ = control.set_parameter(index, value as f32);
                }));
                Self::Choice(param)
            }
        }
    }

    fn as_ptr(&self) -> ParamPtr {
        match self {
            Self::Float(param) => param.as_ptr(),
            Self::Choice(param) => param.as_ptr(),
        }
    }
}

/// Prefix of the persistent field holding one parameter's stored value.
const STATE_PREFIX: &str = "value:";

/// The host-facing parameter objects of one plugin instance.
pub struct HostParams {
    descriptors: &'static [ParamDescriptor],
    /// Never resized after construction: nih-plug holds raw pointers into
    /// it for the lifetime of the plugin.
    params: Vec<HostParam>,
    control: ControlHandle,
}

impl HostParams {
    pub fn new(descriptors: &'static [ParamDescriptor], control: &ControlHandle) -> Self {
        let params = descriptors
            .iter()
            .enumerate()
            .map(|(index, descriptor)| HostParam::new(index, descriptor, control))
            .collect();
        Self {
            descriptors,
            params,
            control: control.clone(),
        }
    }
}

// SAFETY: every pointer returned by `param_map` points into `self.params`,
// which is never resized and lives as long as the `Arc<HostParams>` the
// plugin hands out.
unsafe impl Params for HostParams {
    fn param_map(&self) -> Vec<(String, ParamPtr, String)> {
        self.descriptors
            .iter()
            .zip(&self.params)
            .map(|(descriptor, param)| (descriptor.id.to_owned(), param.as_ptr(), String::new()))
            .collect()
    }

    fn serialize_fields(&self) -> BTreeMap<String, String> {
        self.descriptors
            .iter()
            .filter_map(|descriptor| {
                let value = self.control.value(descriptor.id)?;
                Some((format!("{STATE_PREFIX}{}", descriptor.id), value.to_string()))
            })
            .collect()
    }

    fn deserialize_fields(&self, serialized: &BTreeMap<String, String>) {
        let mut values: Vec<f32> = self
            .descriptors
            .iter()
            .map(|descriptor| self.control.value(descriptor.id).unwrap_or(descriptor.default))
            .collect();

        let mut restored = false;
        for (key, text) in serialized {
            let Some(id) = key.strip_prefix(STATE_PREFIX) else {
                continue;
            };
            let Some(index) = self.descriptors.iter().position(|d| d.id == id) else {
                nih_warn!("ignoring saved value for unknown parameter \"{id}\"");
                continue;
            };
            match text.parse::<f32>() {
                Ok(value) => {
                    values[index] = value;
                    restored = true;
                }
                Err(err) => nih_warn!("ignoring saved value \"{text}\" for \"{id}\": {err}"),
            }
        }

        if restored {
            if let Err(err) = self.control.restore(&values) {
                nih_warn!("could not restore saved state: {err}");
            }
        }
    }
}

/// A nih-plug plugin wrapping one effect module.
pub struct EffectPlugin<M: PluginModule> {
    processor: BlockProcessor<M>,
    control: ControlHandle,
    params: Arc<HostParams>,
    num_input_channels: usize,
}

impl<M: PluginModule> Default for EffectPlugin<M> {
    fn default() -> Self {
        // The tables are compile-time constants and covered by tests, so a
        // failure here is a bug in the module itself.
        let processor = match BlockProcessor::new(M::default()) {
            Ok(processor) => processor,
            Err(err) => {
                nih_error!("{} has inconsistent tables: {err}", M::NAME);
                panic!("{} has inconsistent tables: {err}", M::NAME)
            }
        };
        let control = processor.control();
        let params = Arc::new(HostParams::new(M::PARAMETERS, &control));

        Self {
            processor,
            control,
            params,
            num_input_channels: 0,
        }
    }
}

impl<M: PluginModule> EffectPlugin<M> {
    /// The control entry points of this instance.
    pub fn control(&self) -> &ControlHandle {
        &self.control
    }

    /// Prepare for a new layout and sample rate. Parameter values are left
    /// alone: the store already holds everything the callbacks, presets and
    /// state restores have written.
    fn configure(&mut self, layout: &AudioIOLayout, sample_rate: f32, max_block_size: usize) {
        self.num_input_channels = layout.main_input_channels.map_or(0, |c| c.get() as usize);
        let num_output_channels = layout.main_output_channels.map_or(0, |c| c.get() as usize);
        self.processor.prepare(sample_rate, max_block_size, num_output_channels);
    }
}

impl<M: PluginModule> Plugin for EffectPlugin<M> {
    const NAME: &'static str = M::NAME;
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[STEREO, MONO];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // Edits are applied at block boundaries, so there is nothing to gain
    // from nih-plug splitting blocks at automation points.
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        context: &mut impl InitContext<Self>,
    ) -> bool {
        self.configure(
            audio_io_layout,
            buffer_config.sample_rate,
            buffer_config.max_buffer_size as usize,
        );
        context.set_latency_samples(self.processor.latency_samples() as u32);

        true
    }

    fn reset(&mut self) {
        self.processor.reset();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        self.processor
            .process_block(buffer.as_slice(), self.num_input_channels);

        match self.processor.tail_samples() {
            Some(tail) => ProcessStatus::Tail(tail),
            None => ProcessStatus::Normal,
        }
    }
}

impl<M: PluginModule> ClapPlugin for EffectPlugin<M> {
    const CLAP_ID: &'static str = M::CLAP_ID;
    const CLAP_DESCRIPTION: Option<&'static str> = Some(M::DESCRIPTION);
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = M::CLAP_FEATURES;
}

impl<M: PluginModule> Vst3Plugin for EffectPlugin<M> {
    const VST3_CLASS_ID: [u8; 16] = M::VST3_CLASS_ID;
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] = M::VST3_SUBCATEGORIES;
}

pub type GainPlugin = EffectPlugin<Gain>;
pub type SaturationPlugin = EffectPlugin<Saturation>;
pub type DelayPlugin = EffectPlugin<Delay>;
pub type VibratoPlugin = EffectPlugin<Vibrato>;
pub type FlangerPlugin = EffectPlugin<Flanger>;
pub type Eq1BandPlugin = EffectPlugin<Eq1Band>;
pub type Eq4BandPlugin = EffectPlugin<Eq4Band>;
pub type ConvReverbPlugin = EffectPlugin<ConvReverb>;
pub type AmpSimPlugin = EffectPlugin<AmpSim>;
pub type FakeSidechainPlugin = EffectPlugin<FakeSidechain>;

impl PluginModule for Gain {
    const NAME: &'static str = "Loveless Gain";
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-gain-v1";
    const DESCRIPTION: &'static str = "A plain volume control";
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Utility,
    ];
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssGain___v001";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Tools];
}

impl PluginModule for Saturation {
    const NAME: &'static str = "Loveless Saturation";
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-saturation-v1";
    const DESCRIPTION: &'static str = "Waveshaping distortion with three curves";
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Distortion,
    ];
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssSaturatev01";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Distortion];
}

impl PluginModule for Delay {
    const NAME: &'static str = "Loveless Delay";
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-delay-v1";
    const DESCRIPTION: &'static str = "A feedback delay, built for learning DSP";
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Delay,
    ];
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssDelay__v001";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Delay];
}

impl PluginModule for Vibrato {
    const NAME: &'static str = "Loveless Vibrato";
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-vibrato-v1";
    const DESCRIPTION: &'static str = "Pitch vibrato from an LFO-swept delay line";
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Custom("vibrato"),
    ];
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssVibrato_v01";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Modulation];
}

impl PluginModule for Flanger {
    const NAME: &'static str = "Loveless Flanger";
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-flanger-v1";
    const DESCRIPTION: &'static str = "A swept comb filter with feedback";
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Flanger,
    ];
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssFlanger_v01";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Modulation];
}

impl PluginModule for Eq1Band {
    const NAME: &'static str = "Loveless EQ 1-Band";
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-eq1band-v1";
    const DESCRIPTION: &'static str = "A single peaking EQ band";
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Equalizer,
    ];
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssEq1Band_v01";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Eq];
}

impl PluginModule for Eq4Band {
    const NAME: &'static str = "Loveless EQ 4-Band";
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-eq4band-v1";
    const DESCRIPTION: &'static str = "Shelves and two mid bands";
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Equalizer,
    ];
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssEq4Band_v01";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Eq];
}

impl PluginModule for ConvReverb {
    const NAME: &'static str = "Loveless Convolution Reverb";
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-convreverb-v1";
    const DESCRIPTION: &'static str = "Convolution reverb with built-in rooms and a user slot";
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Reverb,
    ];
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssReverb__v01";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Reverb];
}

impl PluginModule for AmpSim {
    const NAME: &'static str = "Loveless Amp Sim";
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-ampsim-v1";
    const DESCRIPTION: &'static str = "Tone stack, preamp clipping and cabinet IRs";
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Distortion,
    ];
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssAmpSim__v01";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Distortion];
}

impl PluginModule for FakeSidechain {
    const NAME: &'static str = "Loveless Pump";
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-pump-v1";
    const DESCRIPTION: &'static str = "A tempo-free sidechain pumping effect";
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Compressor,
    ];
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssPump____v01";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Dynamics];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_params_mirror_the_table() {
        let plugin = DelayPlugin::default();
        let map = plugin.params.param_map();
        let ids: Vec<_> = map.iter().map(|(id, _, _)| id.as_str()).collect();
        assert_eq!(ids, ["delay_length", "dry_mix", "wet_mix", "feedback"]);
    }

    #[test]
    fn choice_params_show_their_names() {
        let plugin = SaturationPlugin::default();
        let HostParam::Choice(shape) = &plugin.params.params[1] else {
            panic!("shape should be a choice");
        };
        assert_eq!(shape.to_string(), "tanh");
        assert_eq!(shape.string_to_normalized_value("Hard-Clipping"), Some(1.0));
    }

    #[test]
    fn reinitialising_keeps_a_loaded_preset() {
        let mut plugin = DelayPlugin::default();
        plugin.control().load_preset(1).unwrap();

        plugin.configure(&STEREO, 48000.0, 512);
        plugin.configure(&MONO, 44100.0, 256);
        assert_eq!(plugin.control().value("delay_length"), Some(1.0));
        assert_eq!(plugin.control().value("feedback"), Some(0.5));
    }

    #[test]
    fn saved_state_carries_the_loaded_preset() {
        let saved = DelayPlugin::default();
        saved.control().load_preset(1).unwrap();
        saved.control().parameter_changed("wet_mix", 0.25).unwrap();
        let fields = saved.params.serialize_fields();
        assert_eq!(fields.get("value:feedback").map(String::as_str), Some("0.5"));

        let mut restored = DelayPlugin::default();
        restored.params.deserialize_fields(&fields);
        restored.configure(&STEREO, 48000.0, 512);
        for id in ["delay_length", "dry_mix", "wet_mix", "feedback"] {
            assert_eq!(restored.control().value(id), saved.control().value(id), "{id}");
        }
    }

    #[test]
    fn unreadable_saved_values_are_skipped() {
        let plugin = GainPlugin::default();
        let fields = BTreeMap::from([
            ("value:gain".to_owned(), "loud".to_owned()),
            ("value:volume".to_owned(), "1.0".to_owned()),
        ]);
        plugin.params.deserialize_fields(&fields);
        assert_eq!(plugin.control().value("gain"), Some(1.0));
    }

    #[test]
    fn every_plugin_builds() {
        let _ = GainPlugin::default();
        let _ = SaturationPlugin::default();
        let _ = DelayPlugin::default();
        let _ = VibratoPlugin::default();
        let _ = FlangerPlugin::default();
        let _ = Eq1BandPlugin::default();
        let _ = Eq4BandPlugin::default();
        let _ = ConvReverbPlugin::default();
        let _ = AmpSimPlugin::default();
        let _ = FakeSidechainPlugin::default();
    }

    #[test]
    fn class_ids_are_unique() {
        let ids = [
            Gain::VST3_CLASS_ID,
            Saturation::VST3_CLASS_ID,
            Delay::VST3_CLASS_ID,
            Vibrato::VST3_CLASS_ID,
            Flanger::VST3_CLASS_ID,
            Eq1Band::VST3_CLASS_ID,
            Eq4Band::VST3_CLASS_ID,
            ConvReverb::VST3_CLASS_ID,
            AmpSim::VST3_CLASS_ID,
            FakeSidechain::VST3_CLASS_ID,
        ];
        for (i, a) in ids.iter().enumerate() {
            assert!(ids[i + 1..].iter().all(|b| a != b));
        }
    }
}
