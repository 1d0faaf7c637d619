//! # Block Processor
//!
//! Every effect in this crate is an [`EffectModule`]: a plain struct that
//! owns its DSP state and knows how to turn a parameter snapshot into
//! derived state (`update`) and a block of samples into output
//! (`process`). The [`BlockProcessor`] wraps one module and does the
//! bookkeeping every module would otherwise repeat:
//!
//! ```text
//!  process_block(buffer)
//!    │
//!    ├─ zero output channels the host gave us no input for
//!    ├─ values flag raised?  ── yes ──► snapshot ──► module.update(snap or ramp)
//!    ├─ IR flag raised?      ── yes ──► module.reload_impulse_response(index)
//!    └─ module.process(active channels)
//! ```
//!
//! The control side never touches the module. It writes through a
//! [`ControlHandle`] into the shared [`ParameterStore`], and the next call
//! to `process_block` notices the raised flag. Edits made while a block is
//! running are therefore applied at the following block boundary.

use std::sync::Arc;

use nih_plug::{nih_debug_assert, nih_log};

use crate::error::ConfigError;
use crate::params::{ControlHandle, ParamDescriptor, ParamSnapshot, ParameterStore, Preset, PresetBank};

/// How `update` should move smoothed values to their new targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Ramp over the smoothing time. Ordinary automation.
    Ramp,
    /// Jump straight there. First block after `prepare` and preset loads.
    Snap,
}

/// One effect: its parameter table, presets and DSP.
///
/// All methods except the associated items are called from the audio
/// thread, or from the host's setup calls that never overlap with it.
/// `process` must not allocate, lock or panic.
pub trait EffectModule: Send + 'static {
    /// The module's parameter table. Modules refer to entries by index.
    const PARAMETERS: &'static [ParamDescriptor];

    /// Factory presets, one value per parameter in table order.
    fn presets() -> Vec<Preset>;

    /// Size buffers for a new stream configuration and reset all state.
    fn prepare(&mut self, sample_rate: f32, max_block_size: usize, num_channels: usize);

    /// Recompute derived state from a parameter snapshot.
    fn update(&mut self, params: &ParamSnapshot, mode: UpdateMode);

    /// Swap in impulse response `index`. Only modules that declare an
    /// impulse-response parameter need this.
    fn reload_impulse_response(&mut self, _index: usize) {}

    /// Process one block in place. All channel slices have the same length.
    fn process(&mut self, channels: &mut [&mut [f32]]);

    /// Clear delay, filter and convolution history.
    fn reset(&mut self);

    /// How long the effect keeps ringing after the input goes silent.
    /// `None` means the output stops when the input does.
    fn tail_samples(&self) -> Option<u32> {
        None
    }

    /// Processing delay the host should compensate for.
    fn latency_samples(&self) -> usize {
        0
    }
}

/// Drives one [`EffectModule`] per audio block.
pub struct BlockProcessor<M: EffectModule> {
    module: M,
    store: Arc<ParameterStore>,
    presets: Arc<PresetBank>,
    /// Refilled in place on every update, so reading parameters never
    /// allocates.
    snapshot: ParamSnapshot,
    prepared: bool,
}

impl<M: EffectModule> BlockProcessor<M> {
    /// Validate the module's tables and wrap it.
    pub fn new(module: M) -> Result<Self, ConfigError> {
        let store = ParameterStore::new(M::PARAMETERS)?;
        let presets = PresetBank::new(M::PARAMETERS, M::presets())?;

        Ok(Self {
            module,
            store: Arc::new(store),
            presets: Arc::new(presets),
            snapshot: ParamSnapshot::from_defaults(M::PARAMETERS),
            prepared: false,
        })
    }

    /// A handle for the control thread. Clones share the same store.
    pub fn control(&self) -> ControlHandle {
        ControlHandle::new(Arc::clone(&self.store), Arc::clone(&self.presets))
    }

    /// (Re)configure for a new stream and force a full, snapping update
    /// before the first block.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize, num_channels: usize) {
        nih_log!(
            "preparing {} parameters at {sample_rate} Hz, {max_block_size} samples, {num_channels} channels",
            M::PARAMETERS.len()
        );
        self.module
            .prepare(sample_rate, max_block_size.max(1), num_channels);
        self.store.request_full_update();
        self.prepared = true;
    }

    /// Process one host block in place.
    ///
    /// `buffer` holds the output channels; the first `num_input_channels`
    /// of them hold input on entry. The rest are zeroed and left silent.
    pub fn process_block(&mut self, buffer: &mut [&mut [f32]], num_input_channels: usize) {
        nih_debug_assert!(self.prepared, "process_block called before prepare");

        let active = num_input_channels.min(buffer.len());
        for channel in buffer[active..].iter_mut() {
            channel.fill(0.0);
        }

        if self.store.take_values_changed() {
            let mode = if self.store.take_snap() {
                UpdateMode::Snap
            } else {
                UpdateMode::Ramp
            };
            self.store.snapshot_into(&mut self.snapshot);
            self.module.update(&self.snapshot, mode);
        }

        if self.store.take_impulse_response_changed() {
            if let Some(param) = self.store.impulse_response_param() {
                self.store.snapshot_into(&mut self.snapshot);
                let index = self.snapshot.choice(param);
                // Building the new convolution partitions allocates. This is
                // the one place the audio thread is allowed to.
                nih_plug::util::permit_alloc(|| self.module.reload_impulse_response(index));
            }
        }

        self.module.process(&mut buffer[..active]);
    }

    pub fn reset(&mut self) {
        self.module.reset();
    }

    pub fn tail_samples(&self) -> Option<u32> {
        self.module.tail_samples()
    }

    pub fn latency_samples(&self) -> usize {
        self.module.latency_samples()
    }

    pub fn module(&self) -> &M {
        &self.module
    }

    pub fn parameters(&self) -> &'static [ParamDescriptor] {
        M::PARAMETERS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControlError;

    /// Records what the processor asked of it.
    #[derive(Default)]
    struct Recorder {
        updates: Vec<(f32, UpdateMode)>,
        reloads: Vec<usize>,
        gain: f32,
    }

    const RECORDER_PARAMS: [ParamDescriptor; 2] = [
        ParamDescriptor::float("gain", "Gain", 0.0, 4.0, 1.0),
        ParamDescriptor::impulse_response("ir", "IR", &["a", "b"], 0),
    ];

    impl EffectModule for Recorder {
        const PARAMETERS: &'static [ParamDescriptor] = &RECORDER_PARAMS;

        fn presets() -> Vec<Preset> {
            vec![Preset::new("loud", [3.0, 1.0])]
        }

        fn prepare(&mut self, _: f32, _: usize, _: usize) {}

        fn update(&mut self, params: &ParamSnapshot, mode: UpdateMode) {
            self.gain = params.get(0);
            self.updates.push((self.gain, mode));
        }

        fn reload_impulse_response(&mut self, index: usize) {
            self.reloads.push(index);
        }

        fn process(&mut self, channels: &mut [&mut [f32]]) {
            for channel in channels.iter_mut() {
                for sample in channel.iter_mut() {
                    *sample *= self.gain;
                }
            }
        }

        fn reset(&mut self) {}
    }

    fn run(processor: &mut BlockProcessor<Recorder>, inputs: usize) -> Vec<Vec<f32>> {
        let mut left = vec![1.0_f32; 4];
        let mut right = vec![1.0_f32; 4];
        let mut buffer: [&mut [f32]; 2] = [&mut left, &mut right];
        processor.process_block(&mut buffer, inputs);
        vec![left, right]
    }

    #[test]
    fn first_block_snaps_to_defaults_and_loads_ir() {
        let mut processor = BlockProcessor::new(Recorder::default()).unwrap();
        processor.prepare(48000.0, 4, 2);
        run(&mut processor, 2);

        assert_eq!(processor.module().updates, [(1.0, UpdateMode::Snap)]);
        assert_eq!(processor.module().reloads, [0]);
    }

    #[test]
    fn edits_apply_at_next_block_with_a_ramp() {
        let mut processor = BlockProcessor::new(Recorder::default()).unwrap();
        let control = processor.control();
        processor.prepare(48000.0, 4, 2);
        run(&mut processor, 2);

        control.parameter_changed("gain", 2.0).unwrap();
        control.parameter_changed("gain", 2.5).unwrap();
        let out = run(&mut processor, 2);

        assert_eq!(processor.module().updates.last(), Some(&(2.5, UpdateMode::Ramp)));
        assert_eq!(processor.module().updates.len(), 2);
        assert_eq!(out[0], [2.5; 4]);

        // No edits, no update.
        run(&mut processor, 2);
        assert_eq!(processor.module().updates.len(), 2);
    }

    #[test]
    fn preset_load_snaps_and_reloads() {
        let mut processor = BlockProcessor::new(Recorder::default()).unwrap();
        let control = processor.control();
        processor.prepare(48000.0, 4, 2);
        run(&mut processor, 2);

        control.load_preset(0).unwrap();
        run(&mut processor, 2);
        assert_eq!(processor.module().updates.last(), Some(&(3.0, UpdateMode::Snap)));
        assert_eq!(processor.module().reloads, [0, 1]);

        assert_eq!(
            control.load_preset(1),
            Err(ControlError::PresetOutOfRange { index: 1, count: 1 })
        );
    }

    #[test]
    fn channels_without_input_are_zeroed() {
        let mut processor = BlockProcessor::new(Recorder::default()).unwrap();
        processor.prepare(48000.0, 4, 2);
        let out = run(&mut processor, 1);
        assert_eq!(out[0], [1.0; 4]);
        assert_eq!(out[1], [0.0; 4]);
    }

    #[test]
    fn bad_preset_tables_are_rejected() {
        #[derive(Default)]
        struct Broken;

        impl EffectModule for Broken {
            const PARAMETERS: &'static [ParamDescriptor] = &RECORDER_PARAMS;

            fn presets() -> Vec<Preset> {
                vec![Preset::new("short", [1.0])]
            }
            fn prepare(&mut self, _: f32, _: usize, _: usize) {}
            fn update(&mut self, _: &ParamSnapshot, _: UpdateMode) {}
            fn process(&mut self, _: &mut [&mut [f32]]) {}
            fn reset(&mut self) {}
        }

        assert!(matches!(
            BlockProcessor::new(Broken),
            Err(ConfigError::PresetLength { .. })
        ));
    }
}
