//! # Parameter Store
//!
//! The store owns the current value of every parameter of one module
//! instance. It is shared (via `Arc`) between the control side, which
//! writes through a [`ControlHandle`], and the audio side, which reads
//! through a [`ParamSnapshot`] once per block.
//!
//! ## Storing floats atomically
//!
//! The standard library has no `AtomicF32`, but an `f32` is just 32 bits.
//! We store `value.to_bits()` in an `AtomicU32` and turn it back with
//! `f32::from_bits()`. Loads and stores of a single word can't tear, so
//! the audio thread always sees either the old or the new value of a
//! parameter, never half of each.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use super::{ChangeCategory, ChangeFlag, ParamDescriptor, PresetBank};
use crate::error::{ConfigError, ControlError};

/// Current values for one module's parameter table.
#[derive(Debug)]
pub struct ParameterStore {
    descriptors: &'static [ParamDescriptor],
    values: Box<[AtomicU32]>,
    /// Raised by any edit of a `ChangeCategory::Values` parameter.
    values_changed: ChangeFlag,
    /// Raised by any edit of the impulse-response parameter.
    ir_changed: ChangeFlag,
    /// Raised alongside `values_changed` when the next update should jump
    /// straight to the new values instead of ramping (preset loads and
    /// the first block after `prepare`).
    snap: ChangeFlag,
    ir_param: Option<usize>,
}

impl ParameterStore {
    /// Build a store initialised to every parameter's default.
    ///
    /// The table is checked once here: defaults must lie inside their
    /// ranges, ids must be unique, and at most one parameter may select
    /// impulse responses.
    pub fn new(descriptors: &'static [ParamDescriptor]) -> Result<Self, ConfigError> {
        let mut ir_param = None;
        for (index, descriptor) in descriptors.iter().enumerate() {
            if !descriptor.contains(descriptor.default) {
                return Err(ConfigError::DefaultOutOfRange { id: descriptor.id });
            }
            if descriptors[..index].iter().any(|d| d.id == descriptor.id) {
                return Err(ConfigError::DuplicateId { id: descriptor.id });
            }
            if descriptor.category == ChangeCategory::ImpulseResponse {
                if ir_param.is_some() {
                    return Err(ConfigError::MultipleImpulseResponseParams);
                }
                ir_param = Some(index);
            }
        }

        let values = descriptors
            .iter()
            .map(|d| AtomicU32::new(d.default.to_bits()))
            .collect();

        Ok(Self {
            descriptors,
            values,
            // Start raised so the very first block picks up the defaults.
            values_changed: ChangeFlag::new(true),
            ir_changed: ChangeFlag::new(ir_param.is_some()),
            snap: ChangeFlag::new(true),
            ir_param,
        })
    }

    pub fn descriptors(&self) -> &'static [ParamDescriptor] {
        self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| d.id == id)
    }

    /// Index of the parameter that selects the impulse response, if the
    /// module has one.
    pub fn impulse_response_param(&self) -> Option<usize> {
        self.ir_param
    }

    /// Read the current value of parameter `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range. Modules only ever pass their own
    /// index constants, so this is a programming error.
    pub fn get(&self, index: usize) -> f32 {
        f32::from_bits(self.values[index].load(Ordering::Relaxed))
    }

    /// Store a new value for parameter `index` and raise the flag of its
    /// change category. Returns the value actually stored after clamping.
    pub fn set(&self, index: usize, value: f32) -> Result<f32, ControlError> {
        let (clamped, category) = self.write(index, value)?;
        // The value must be visible before the flag is: the flag's
        // `Release` store orders the relaxed store in `write` before it.
        self.raise(category);
        Ok(clamped)
    }

    /// Validate, clamp and store a value without raising any flag.
    fn write(&self, index: usize, value: f32) -> Result<(f32, ChangeCategory), ControlError> {
        let descriptor = self
            .descriptors
            .get(index)
            .ok_or(ControlError::ParameterIndexOutOfRange {
                index,
                count: self.descriptors.len(),
            })?;
        if !value.is_finite() {
            return Err(ControlError::NonFinite {
                id: descriptor.id,
                value,
            });
        }

        let clamped = descriptor.clamp(value);
        self.values[index].store(clamped.to_bits(), Ordering::Relaxed);
        Ok((clamped, descriptor.category))
    }

    fn raise(&self, category: ChangeCategory) {
        match category {
            ChangeCategory::Values => self.values_changed.raise(),
            ChangeCategory::ImpulseResponse => self.ir_changed.raise(),
        }
    }

    /// Store a whole set of values, in table order, and only then raise
    /// the flags. A block boundary falling in the middle of the writes
    /// sees no flag, so the audio thread never picks up half of the set.
    ///
    /// `snap` is raised before the value flag so the update that consumes
    /// the values also jumps to them.
    pub fn set_all(&self, values: &[f32], snap: bool) -> Result<(), ControlError> {
        let mut values_touched = false;
        let mut ir_touched = false;
        for (index, &value) in values.iter().enumerate() {
            match self.write(index, value)?.1 {
                ChangeCategory::Values => values_touched = true,
                ChangeCategory::ImpulseResponse => ir_touched = true,
            }
        }

        if snap {
            self.snap.raise();
        }
        if ir_touched {
            self.raise(ChangeCategory::ImpulseResponse);
        }
        if values_touched || snap {
            self.raise(ChangeCategory::Values);
        }
        Ok(())
    }

    /// [`set`](Self::set) by parameter id.
    pub fn set_by_id(&self, id: &str, value: f32) -> Result<f32, ControlError> {
        let index = self
            .index_of(id)
            .ok_or_else(|| ControlError::UnknownParameter(id.to_owned()))?;
        self.set(index, value)
    }

    /// Consume a pending value change. Audio thread only.
    pub fn take_values_changed(&self) -> bool {
        self.values_changed.take()
    }

    /// Consume a pending impulse-response change. Audio thread only.
    pub fn take_impulse_response_changed(&self) -> bool {
        self.ir_changed.take()
    }

    /// Consume a pending snap request. Audio thread only.
    pub fn take_snap(&self) -> bool {
        self.snap.take()
    }

    /// Force one complete update at the next block boundary: every value
    /// is re-read, smoothers snap, and the impulse response is reloaded.
    pub fn request_full_update(&self) {
        self.snap.raise();
        self.values_changed.raise();
        if self.ir_param.is_some() {
            self.ir_changed.raise();
        }
    }

    /// Copy every current value into `snapshot` without allocating.
    pub fn snapshot_into(&self, snapshot: &mut ParamSnapshot) {
        for (slot, value) in snapshot.values.iter_mut().zip(self.values.iter()) {
            *slot = f32::from_bits(value.load(Ordering::Relaxed));
        }
    }
}

/// A block-boundary copy of all parameter values, owned by the audio
/// thread. Allocated once, refilled in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSnapshot {
    values: Vec<f32>,
}

impl ParamSnapshot {
    /// A snapshot holding every parameter's default.
    pub fn from_defaults(descriptors: &[ParamDescriptor]) -> Self {
        Self {
            values: descriptors.iter().map(|d| d.default).collect(),
        }
    }

    /// A snapshot holding exactly `values`, in table order. Used to drive
    /// a module directly, without a store.
    pub fn from_values(values: impl Into<Vec<f32>>) -> Self {
        Self {
            values: values.into(),
        }
    }

    pub fn get(&self, index: usize) -> f32 {
        self.values[index]
    }

    /// The value of a choice parameter as an option index.
    pub fn choice(&self, index: usize) -> usize {
        self.values[index].max(0.0).round() as usize
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

/// The control-context entry points of one module instance.
///
/// Cheap to clone and `Send + Sync`: the host shim hands one clone to each
/// parameter callback. None of these methods ever blocks.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    store: Arc<ParameterStore>,
    presets: Arc<PresetBank>,
}

impl ControlHandle {
    pub(crate) fn new(store: Arc<ParameterStore>, presets: Arc<PresetBank>) -> Self {
        Self { store, presets }
    }

    pub fn parameters(&self) -> &'static [ParamDescriptor] {
        self.store.descriptors()
    }

    pub fn presets(&self) -> &PresetBank {
        &self.presets
    }

    /// Current value of the parameter with the given id.
    pub fn value(&self, id: &str) -> Option<f32> {
        self.store.index_of(id).map(|index| self.store.get(index))
    }

    /// A host edit of the parameter `id`. Returns the stored value.
    pub fn parameter_changed(&self, id: &str, value: f32) -> Result<f32, ControlError> {
        self.store.set_by_id(id, value)
    }

    /// A host edit addressed by table index.
    pub fn set_parameter(&self, index: usize, value: f32) -> Result<f32, ControlError> {
        self.store.set(index, value)
    }

    /// Apply preset `index`. Every value is stored before the audio thread
    /// is told, and the next update snaps instead of ramping.
    pub fn load_preset(&self, index: usize) -> Result<(), ControlError> {
        let preset = self.presets.get(index)?;
        self.store.set_all(preset.values(), true)
    }

    /// Put back a full set of saved values, in table order. Applied like
    /// a preset.
    pub fn restore(&self, values: &[f32]) -> Result<(), ControlError> {
        self.store.set_all(values, true)
    }

    /// Pick impulse response `index`. The reload itself happens on the
    /// audio thread at the next block boundary.
    pub fn select_impulse_response(&self, index: usize) -> Result<(), ControlError> {
        let param = self
            .store
            .impulse_response_param()
            .ok_or(ControlError::NoImpulseResponse)?;
        let count = self.store.descriptors()[param]
            .choices()
            .map_or(0, |choices| choices.len());
        if index >= count {
            return Err(ControlError::ImpulseResponseOutOfRange { index, count });
        }
        self.store.set(param, index as f32).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Preset;

    static TABLE: [ParamDescriptor; 3] = [
        ParamDescriptor::float("gain", "Gain", 0.0, 2.0, 1.0),
        ParamDescriptor::choice("mode", "Mode", &["a", "b"], 0),
        ParamDescriptor::impulse_response("ir", "IR", &["x", "y", "z"], 0),
    ];

    fn handle() -> (Arc<ParameterStore>, ControlHandle) {
        let store = Arc::new(ParameterStore::new(&TABLE).unwrap());
        let presets = PresetBank::new(&TABLE, vec![Preset::new("p", [2.0, 1.0, 2.0])]).unwrap();
        let handle = ControlHandle::new(Arc::clone(&store), Arc::new(presets));
        (store, handle)
    }

    #[test]
    fn starts_at_defaults_with_flags_raised() {
        let (store, _) = handle();
        assert_eq!(store.get(0), 1.0);
        assert!(store.take_values_changed());
        assert!(store.take_impulse_response_changed());
        assert!(store.take_snap());
    }

    #[test]
    fn edits_collapse_into_one_flag() {
        let (store, handle) = handle();
        store.take_values_changed();

        handle.parameter_changed("gain", 1.5).unwrap();
        handle.parameter_changed("gain", 1.7).unwrap();
        handle.parameter_changed("mode", 1.0).unwrap();

        assert!(store.take_values_changed());
        assert!(!store.take_values_changed());
        assert_eq!(store.get(0), 1.7);
    }

    #[test]
    fn values_are_clamped_and_reported() {
        let (_, handle) = handle();
        assert_eq!(handle.parameter_changed("gain", 10.0), Ok(2.0));
        assert_eq!(handle.value("gain"), Some(2.0));
    }

    #[test]
    fn rejects_unknown_ids_and_nan() {
        let (_, handle) = handle();
        assert_eq!(
            handle.parameter_changed("nope", 1.0),
            Err(ControlError::UnknownParameter("nope".into()))
        );
        assert!(matches!(
            handle.parameter_changed("gain", f32::NAN),
            Err(ControlError::NonFinite { id: "gain", .. })
        ));
    }

    #[test]
    fn impulse_response_edits_raise_only_their_flag() {
        let (store, handle) = handle();
        store.take_values_changed();
        store.take_impulse_response_changed();

        handle.select_impulse_response(2).unwrap();
        assert!(!store.take_values_changed());
        assert!(store.take_impulse_response_changed());
        assert_eq!(store.get(2), 2.0);

        assert_eq!(
            handle.select_impulse_response(3),
            Err(ControlError::ImpulseResponseOutOfRange { index: 3, count: 3 })
        );
    }

    #[test]
    fn preset_load_goes_through_the_same_path() {
        let (store, handle) = handle();
        store.take_values_changed();
        store.take_impulse_response_changed();
        store.take_snap();

        handle.load_preset(0).unwrap();
        assert!(store.take_snap());
        assert!(store.take_values_changed());
        assert!(store.take_impulse_response_changed());

        let mut snapshot = ParamSnapshot::from_defaults(&TABLE);
        store.snapshot_into(&mut snapshot);
        assert_eq!(snapshot.as_slice(), &[2.0, 1.0, 2.0]);
        assert_eq!(snapshot.choice(1), 1);

        assert_eq!(
            handle.load_preset(1),
            Err(ControlError::PresetOutOfRange { index: 1, count: 1 })
        );
    }

    #[test]
    fn preset_flags_go_up_only_after_every_value_is_stored() {
        let (store, _) = handle();
        store.take_values_changed();
        store.take_impulse_response_changed();
        store.take_snap();

        // Stand-in for the audio thread landing between two writes.
        store.write(0, 2.0).unwrap();
        assert!(!store.take_values_changed());
        assert!(!store.take_impulse_response_changed());
        assert!(!store.take_snap());

        store.set_all(&[2.0, 1.0, 2.0], true).unwrap();
        assert!(store.take_snap());
        assert!(store.take_values_changed());
        assert!(store.take_impulse_response_changed());
    }

    #[test]
    fn a_rejected_value_stops_the_set_without_raising() {
        let (store, _) = handle();
        store.take_values_changed();
        store.take_snap();

        assert!(store.set_all(&[1.5, f32::NAN, 0.0], true).is_err());
        assert!(!store.take_values_changed());
        assert!(!store.take_snap());
    }

    #[test]
    fn rejects_bad_tables() {
        static DUPLICATE: [ParamDescriptor; 2] = [
            ParamDescriptor::float("a", "A", 0.0, 1.0, 0.0),
            ParamDescriptor::float("a", "A again", 0.0, 1.0, 0.0),
        ];
        static BAD_DEFAULT: [ParamDescriptor; 1] =
            [ParamDescriptor::float("a", "A", 0.0, 1.0, 4.0)];

        assert_eq!(
            ParameterStore::new(&DUPLICATE).unwrap_err(),
            ConfigError::DuplicateId { id: "a" }
        );
        assert_eq!(
            ParameterStore::new(&BAD_DEFAULT).unwrap_err(),
            ConfigError::DefaultOutOfRange { id: "a" }
        );
    }
}
