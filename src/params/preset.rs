//! # Presets
//!
//! A preset is a name plus one value per declared parameter, in table
//! order. The bank validates every preset against the parameter table
//! when it is built: a preset table that does not match its module is a
//! programming error, and we want to find out at construction rather than
//! the first time a user picks the broken preset.

use super::ParamDescriptor;
use crate::error::{ConfigError, ControlError};

/// Longest preset name we accept, in bytes.
pub const PRESET_NAME_MAX: usize = 40;

/// A named set of parameter values.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    name: String,
    values: Vec<f32>,
}

impl Preset {
    pub fn new(name: impl Into<String>, values: impl Into<Vec<f32>>) -> Self {
        Self {
            name: name.into(),
            values: values.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// The immutable, validated list of presets for one module.
#[derive(Debug, Clone)]
pub struct PresetBank {
    presets: Vec<Preset>,
}

impl PresetBank {
    /// Validate `presets` against `descriptors`.
    ///
    /// Every preset must carry exactly one value per parameter, each value
    /// must lie inside its parameter's range, and names are bounded to
    /// [`PRESET_NAME_MAX`] bytes.
    pub fn new(descriptors: &[ParamDescriptor], presets: Vec<Preset>) -> Result<Self, ConfigError> {
        for preset in &presets {
            if preset.name.len() > PRESET_NAME_MAX {
                return Err(ConfigError::PresetNameTooLong {
                    name: preset.name.clone(),
                    max: PRESET_NAME_MAX,
                });
            }
            if preset.values.len() != descriptors.len() {
                return Err(ConfigError::PresetLength {
                    preset: preset.name.clone(),
                    expected: descriptors.len(),
                    found: preset.values.len(),
                });
            }
            if let Some(descriptor) = descriptors
                .iter()
                .zip(&preset.values)
                .find(|(descriptor, value)| !descriptor.contains(**value))
                .map(|(descriptor, _)| descriptor)
            {
                return Err(ConfigError::PresetValueOutOfRange {
                    preset: preset.name.clone(),
                    id: descriptor.id,
                });
            }
        }

        Ok(Self { presets })
    }

    /// Look a preset up by index. An index past the end is an error, never
    /// silently clamped to the last preset.
    pub fn get(&self, index: usize) -> Result<&Preset, ControlError> {
        self.presets.get(index).ok_or(ControlError::PresetOutOfRange {
            index,
            count: self.presets.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.iter().map(Preset::name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static TABLE: [ParamDescriptor; 2] = [
        ParamDescriptor::float("gain", "Gain", 0.0, 2.0, 1.0),
        ParamDescriptor::float("mix", "Mix", 0.0, 1.0, 0.5),
    ];

    #[test]
    fn accepts_matching_presets() {
        let bank = PresetBank::new(
            &TABLE,
            vec![Preset::new("a", [1.0, 0.5]), Preset::new("b", [2.0, 0.0])],
        )
        .expect("valid bank");
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.names().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn rejects_wrong_value_count() {
        let err = PresetBank::new(&TABLE, vec![Preset::new("short", [1.0])]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::PresetLength {
                preset: "short".into(),
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn rejects_long_names() {
        let name = "x".repeat(PRESET_NAME_MAX + 1);
        let err = PresetBank::new(&TABLE, vec![Preset::new(name, [1.0, 0.5])]).unwrap_err();
        assert!(matches!(err, ConfigError::PresetNameTooLong { .. }));
    }

    #[test]
    fn rejects_values_outside_range() {
        let err = PresetBank::new(&TABLE, vec![Preset::new("loud", [3.0, 0.5])]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::PresetValueOutOfRange {
                preset: "loud".into(),
                id: "gain"
            }
        );
    }

    /// Asking for the preset one past the end must fail, not clamp.
    #[test]
    fn index_equal_to_count_is_out_of_range() {
        let bank = PresetBank::new(&TABLE, vec![Preset::new("only", [1.0, 0.5])]).unwrap();
        assert_eq!(
            bank.get(1).unwrap_err(),
            ControlError::PresetOutOfRange { index: 1, count: 1 }
        );
    }
}
