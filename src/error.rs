//! # Errors
//!
//! Three families of things can go wrong, and each is handled at a
//! different place:
//!
//! - [`ConfigError`]: the module's own tables are inconsistent (a preset
//!   with the wrong number of values, a default outside its range). These
//!   are programming mistakes, detected once when a
//!   [`BlockProcessor`](crate::processor::BlockProcessor) is built. The
//!   plugin refuses to start.
//! - [`ControlError`]: a control-side request that cannot be honoured (an
//!   unknown parameter id, a preset index past the end). Returned to the
//!   caller; nothing changes.
//! - [`DspError`]: a resource could not be obtained while preparing (a
//!   delay buffer allocation, an impulse response that fails to decode).
//!   The affected stage falls back to passing audio through untouched.
//!
//! Nothing in this module is ever constructed on the audio thread's hot
//! path.

use thiserror::Error;

/// Inconsistent parameter or preset tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("preset \"{preset}\" has {found} values but the module declares {expected} parameters")]
    PresetLength {
        preset: String,
        expected: usize,
        found: usize,
    },

    #[error("preset name \"{name}\" is longer than {max} bytes")]
    PresetNameTooLong { name: String, max: usize },

    #[error("preset \"{preset}\" sets parameter \"{id}\" outside its range")]
    PresetValueOutOfRange { preset: String, id: &'static str },

    #[error("default of parameter \"{id}\" lies outside its range")]
    DefaultOutOfRange { id: &'static str },

    #[error("parameter id \"{id}\" is declared twice")]
    DuplicateId { id: &'static str },

    #[error("a module may declare at most one impulse-response parameter")]
    MultipleImpulseResponseParams,
}

/// A control-context request that was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    #[error("unknown parameter \"{0}\"")]
    UnknownParameter(String),

    #[error("parameter index {index} is out of range (module has {count} parameters)")]
    ParameterIndexOutOfRange { index: usize, count: usize },

    #[error("parameter \"{id}\" cannot be set to non-finite value {value}")]
    NonFinite { id: &'static str, value: f32 },

    #[error("preset index {index} is out of range (module has {count} presets)")]
    PresetOutOfRange { index: usize, count: usize },

    #[error("this module has no impulse-response selection")]
    NoImpulseResponse,

    #[error("impulse response index {index} is out of range (module has {count})")]
    ImpulseResponseOutOfRange { index: usize, count: usize },
}

/// A resource failure while preparing a DSP stage.
#[derive(Debug, Error)]
pub enum DspError {
    #[error("could not allocate {samples} samples of buffer memory")]
    Allocation { samples: usize },

    #[error("impulse response \"{0}\" contains no samples")]
    EmptyImpulseResponse(String),

    #[error("impulse response is unavailable")]
    ImpulseResponseUnavailable,

    #[error("failed to decode impulse response: {0}")]
    Decode(#[from] hound::Error),

    #[error("unsupported impulse response format: {0}")]
    UnsupportedFormat(String),
}
