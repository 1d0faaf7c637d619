//! # Waveshaping
//!
//! A waveshaper maps every input sample through a fixed curve. Curves that
//! flatten out for large inputs squash the peaks of a waveform, which adds
//! harmonics: that is what we hear as saturation or distortion. Drive the
//! input harder (the saturation module's `gain`) and more of the signal
//! lands on the flat part of the curve.
//!
//! ```text
//!   out                         tanh:  smooth, symmetric, approaches ±1
//!    ^        ______            soft:  gentler knee, approaches ±1
//!    |      /                   hard:  linear until ±0.5, then flat
//!  --+----/------> in
//!    | __/
//! ```

/// One of the built-in transfer curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    #[default]
    Tanh,
    SoftClip,
    HardClip,
}

impl Shape {
    /// Choice labels, in parameter order.
    pub const NAMES: &'static [&'static str] = &["tanh", "soft-clipping", "hard-clipping"];

    pub fn from_index(index: usize) -> Self {
        match index {
            1 => Self::SoftClip,
            2 => Self::HardClip,
            _ => Self::Tanh,
        }
    }

    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Self::Tanh => x.tanh(),
            Self::SoftClip => soft_clip(x),
            Self::HardClip => hard_clip(x),
        }
    }
}

/// Hard clipping threshold.
pub const HARD_CLIP_LEVEL: f32 = 0.5;

/// `sign(x) * (1 - 0.25 / (|x| + 0.25))`. Zero at zero, tends to ±1.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    let magnitude = 1.0 - 0.25 / (x.abs() + 0.25);
    magnitude.copysign(x)
}

#[inline]
pub fn hard_clip(x: f32) -> f32 {
    x.clamp(-HARD_CLIP_LEVEL, HARD_CLIP_LEVEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn curves_pass_through_zero() {
        for shape in [Shape::Tanh, Shape::SoftClip, Shape::HardClip] {
            assert_eq!(shape.apply(0.0), 0.0);
        }
    }

    #[test]
    fn curves_are_odd_symmetric() {
        for shape in [Shape::Tanh, Shape::SoftClip, Shape::HardClip] {
            for x in [0.1, 0.4, 1.0, 3.0, 50.0] {
                assert_relative_eq!(shape.apply(-x), -shape.apply(x));
            }
        }
    }

    #[test]
    fn soft_clip_values() {
        assert_relative_eq!(soft_clip(0.25), 0.5);
        assert_relative_eq!(soft_clip(0.75), 0.75);
        assert!(soft_clip(1e6) < 1.0);
    }

    #[test]
    fn hard_clip_flattens_at_half() {
        assert_eq!(hard_clip(0.3), 0.3);
        assert_eq!(hard_clip(2.0), 0.5);
        assert_eq!(hard_clip(-2.0), -0.5);
    }

    #[test]
    fn choice_indices_map_to_shapes() {
        assert_eq!(Shape::from_index(0), Shape::Tanh);
        assert_eq!(Shape::from_index(1), Shape::SoftClip);
        assert_eq!(Shape::from_index(2), Shape::HardClip);
        assert_eq!(Shape::NAMES.len(), 3);
    }
}
