//! # Parameters
//!
//! Parameters are the knobs and switches a module exposes to the host.
//! Every module declares them once, as a `const` table of
//! [`ParamDescriptor`]s, and from then on refers to them by *index*:
//!
//! ```text
//! pub const GAIN: usize = 0;
//! const PARAMETERS: &'static [ParamDescriptor] = &[
//!     ParamDescriptor::float("gain", "Gain", 0.0, 2.0, 1.0),
//! ];
//! ```
//!
//! The descriptor says what *kind* of value the parameter holds (a
//! continuous float or one of a fixed set of choices), its range, its
//! default, and which change category an edit belongs to. Nothing is ever
//! looked up by name on the audio thread.
//!
//! ## Crossing threads
//!
//! The current values live in the [`ParameterStore`], written by the
//! control thread (host automation, the generic editor, preset loads) and
//! read by the audio thread. The only thing the two threads share is
//! atomics: one word per value plus one [`ChangeFlag`] per change
//! category. The audio thread looks at the values only after it has
//! successfully *taken* a flag at a block boundary.

mod change_flag;
mod preset;
mod store;

pub use change_flag::ChangeFlag;
pub use preset::{Preset, PresetBank, PRESET_NAME_MAX};
pub use store::{ControlHandle, ParamSnapshot, ParameterStore};

/// Which flag an edit raises.
///
/// Ordinary values only require a cheap recomputation of derived state.
/// Switching impulse responses requires rebuilding the convolution engine,
/// which is expensive and allocates, so it gets a flag of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCategory {
    Values,
    ImpulseResponse,
}

/// The value type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// A continuous value in `[min, max]`.
    Float { min: f32, max: f32 },
    /// An index into a fixed list of named options.
    Choice(&'static [&'static str]),
}

/// One entry in a module's parameter table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    /// Stable identifier. Hosts store automation and presets under this
    /// string, so it must never change once published.
    pub id: &'static str,
    /// Human-readable name shown by the host.
    pub name: &'static str,
    pub kind: ParamKind,
    /// Default value. For choices this is the option index.
    pub default: f32,
    /// Display unit, e.g. `" Hz"` or `" dB"`.
    pub unit: &'static str,
    pub category: ChangeCategory,
}

impl ParamDescriptor {
    /// A continuous parameter.
    pub const fn float(
        id: &'static str,
        name: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            id,
            name,
            kind: ParamKind::Float { min, max },
            default,
            unit: "",
            category: ChangeCategory::Values,
        }
    }

    /// A parameter selecting one of `choices`.
    pub const fn choice(
        id: &'static str,
        name: &'static str,
        choices: &'static [&'static str],
        default_index: usize,
    ) -> Self {
        Self {
            id,
            name,
            kind: ParamKind::Choice(choices),
            default: default_index as f32,
            unit: "",
            category: ChangeCategory::Values,
        }
    }

    /// A choice parameter that selects the active impulse response. Edits
    /// to it raise the impulse-response flag instead of the value flag.
    pub const fn impulse_response(
        id: &'static str,
        name: &'static str,
        choices: &'static [&'static str],
        default_index: usize,
    ) -> Self {
        Self {
            id,
            name,
            kind: ParamKind::Choice(choices),
            default: default_index as f32,
            unit: "",
            category: ChangeCategory::ImpulseResponse,
        }
    }

    pub const fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    /// The inclusive numeric range of the parameter.
    pub fn range(&self) -> (f32, f32) {
        match self.kind {
            ParamKind::Float { min, max } => (min, max),
            ParamKind::Choice(choices) => (0.0, choices.len().saturating_sub(1) as f32),
        }
    }

    /// Bring `value` into the parameter's domain. Choices snap to the
    /// nearest valid index.
    pub fn clamp(&self, value: f32) -> f32 {
        let (min, max) = self.range();
        match self.kind {
            ParamKind::Float { .. } => value.clamp(min, max),
            ParamKind::Choice(_) => value.round().clamp(min, max),
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        let (min, max) = self.range();
        value >= min && value <= max
    }

    pub fn choices(&self) -> Option<&'static [&'static str]> {
        match self.kind {
            ParamKind::Choice(choices) => Some(choices),
            ParamKind::Float { .. } => None,
        }
    }
}
