//! # Biquad Filters
//!
//! A biquad is a second-order IIR filter: two poles, two zeros, five
//! coefficients. Chained together, biquads make up every band of the
//! parametric EQs and the tone stack of the amp simulator.
//!
//! ## Coefficients
//!
//! The coefficients come from Robert Bristow-Johnson's "Audio EQ Cookbook".
//! For a band at frequency `f` with quality `Q` and gain `g` dB:
//!
//! ```text
//! A     = 10^(g / 40)            (square root of the linear gain)
//! w0    = 2π f / sample_rate
//! alpha = sin(w0) / (2 Q)
//! ```
//!
//! Each shape then gives `b0, b1, b2, a0, a1, a2`, and we divide through
//! by `a0` so the filter loop never has to.
//!
//! The design math runs in `f64`. Low frequencies at high sample rates put
//! `w0` very close to zero, where `f32` loses enough precision to move the
//! poles noticeably.
//!
//! ## Transposed Direct Form II
//!
//! ```text
//! y  = b0 x + s1
//! s1 = b1 x - a1 y + s2
//! s2 = b2 x - a2 y
//! ```
//!
//! Two state registers per channel, and it behaves well with `f32`.

use std::f64::consts::PI;

/// Lowest band frequency accepted by [`BiquadCoefficients::design`].
pub const MIN_FREQUENCY_HZ: f32 = 10.0;
/// Highest band frequency, as a fraction of the sample rate.
pub const MAX_FREQUENCY_RATIO: f32 = 0.49;
/// Lowest accepted Q.
pub const MIN_Q: f32 = 0.01;

/// The response curve of one EQ band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterShape {
    LowShelf,
    Peaking,
    HighShelf,
}

/// Normalised biquad coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BiquadCoefficients {
    /// Passes the input through unchanged.
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Design a band. A pure function: identical arguments always give
    /// bit-identical coefficients.
    ///
    /// Frequency is clamped to `[MIN_FREQUENCY_HZ, 0.49 * sample_rate]`
    /// and Q to at least `MIN_Q`, so the result is always finite.
    pub fn design(
        shape: FilterShape,
        sample_rate: f32,
        frequency: f32,
        q: f32,
        gain_db: f32,
    ) -> Self {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Self::IDENTITY;
        }

        let max_frequency = (MAX_FREQUENCY_RATIO * sample_rate).max(MIN_FREQUENCY_HZ);
        let frequency = sanitize(frequency, MIN_FREQUENCY_HZ).clamp(MIN_FREQUENCY_HZ, max_frequency);
        let q = sanitize(q, MIN_Q).max(MIN_Q);
        let gain_db = sanitize(gain_db, 0.0);

        let a = 10f64.powf(f64::from(gain_db) / 40.0);
        let w0 = 2.0 * PI * f64::from(frequency) / f64::from(sample_rate);
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * f64::from(q));

        let (b0, b1, b2, a0, a1, a2) = match shape {
            FilterShape::Peaking => (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            ),
            FilterShape::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            FilterShape::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        Self {
            b0: (b0 / a0) as f32,
            b1: (b1 / a0) as f32,
            b2: (b2 / a0) as f32,
            a1: (a1 / a0) as f32,
            a2: (a2 / a0) as f32,
        }
    }

    pub fn is_finite(&self) -> bool {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite())
    }
}

fn sanitize(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Filter memory for one channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadState {
    s1: f32,
    s2: f32,
}

impl BiquadState {
    #[inline]
    pub fn process(&mut self, c: &BiquadCoefficients, x: f32) -> f32 {
        let y = c.b0 * x + self.s1;
        self.s1 = c.b1 * x - c.a1 * y + self.s2;
        self.s2 = c.b2 * x - c.a2 * y;
        y
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Magnitude response at `frequency`, evaluated on the unit circle.
    fn magnitude_db(c: &BiquadCoefficients, frequency: f32, sample_rate: f32) -> f64 {
        let w = 2.0 * PI * f64::from(frequency) / f64::from(sample_rate);
        let (z1r, z1i) = (w.cos(), -w.sin());
        let (z2r, z2i) = ((2.0 * w).cos(), -(2.0 * w).sin());
        let num_r = f64::from(c.b0) + f64::from(c.b1) * z1r + f64::from(c.b2) * z2r;
        let num_i = f64::from(c.b1) * z1i + f64::from(c.b2) * z2i;
        let den_r = 1.0 + f64::from(c.a1) * z1r + f64::from(c.a2) * z2r;
        let den_i = f64::from(c.a1) * z1i + f64::from(c.a2) * z2i;
        let num = (num_r * num_r + num_i * num_i).sqrt();
        let den = (den_r * den_r + den_i * den_i).sqrt();
        20.0 * (num / den).log10()
    }

    #[test]
    fn recompute_is_bit_identical() {
        for shape in [FilterShape::LowShelf, FilterShape::Peaking, FilterShape::HighShelf] {
            let a = BiquadCoefficients::design(shape, 48000.0, 1234.5, 0.8, -7.25);
            let b = BiquadCoefficients::design(shape, 48000.0, 1234.5, 0.8, -7.25);
            assert_eq!(a.b0.to_bits(), b.b0.to_bits());
            assert_eq!(a.b1.to_bits(), b.b1.to_bits());
            assert_eq!(a.b2.to_bits(), b.b2.to_bits());
            assert_eq!(a.a1.to_bits(), b.a1.to_bits());
            assert_eq!(a.a2.to_bits(), b.a2.to_bits());
        }
    }

    #[test]
    fn zero_gain_is_flat() {
        for shape in [FilterShape::LowShelf, FilterShape::Peaking, FilterShape::HighShelf] {
            let c = BiquadCoefficients::design(shape, 44100.0, 1000.0, 1.0, 0.0);
            for f in [50.0, 1000.0, 10000.0] {
                assert!(magnitude_db(&c, f, 44100.0).abs() < 1e-3, "{shape:?} at {f} Hz");
            }
        }
    }

    #[test]
    fn peaking_hits_its_gain_at_centre() {
        let c = BiquadCoefficients::design(FilterShape::Peaking, 44100.0, 1000.0, 1.0, -10.0);
        assert_relative_eq!(magnitude_db(&c, 1000.0, 44100.0), -10.0, epsilon = 0.05);
        assert!(magnitude_db(&c, 20.0, 44100.0).abs() < 0.5);
    }

    #[test]
    fn shelves_boost_their_own_end() {
        let low = BiquadCoefficients::design(FilterShape::LowShelf, 44100.0, 200.0, 0.707, 12.0);
        assert_relative_eq!(magnitude_db(&low, 20.0, 44100.0), 12.0, epsilon = 0.3);
        assert!(magnitude_db(&low, 15000.0, 44100.0).abs() < 0.3);

        let high = BiquadCoefficients::design(FilterShape::HighShelf, 44100.0, 4000.0, 0.707, 12.0);
        assert_relative_eq!(magnitude_db(&high, 20000.0, 44100.0), 12.0, epsilon = 0.5);
        assert!(magnitude_db(&high, 50.0, 44100.0).abs() < 0.3);
    }

    #[test]
    fn extreme_inputs_stay_finite() {
        let cases = [
            (0.0, 0.0),
            (-5.0, -1.0),
            (1e9, 1e9),
            (f32::NAN, f32::INFINITY),
        ];
        for (frequency, q) in cases {
            for shape in [FilterShape::LowShelf, FilterShape::Peaking, FilterShape::HighShelf] {
                let c = BiquadCoefficients::design(shape, 44100.0, frequency, q, 24.0);
                assert!(c.is_finite(), "{shape:?} f={frequency} q={q}");
            }
        }
        assert_eq!(
            BiquadCoefficients::design(FilterShape::Peaking, 0.0, 1000.0, 1.0, 6.0),
            BiquadCoefficients::IDENTITY
        );
    }

    #[test]
    fn identity_passes_signal() {
        let mut state = BiquadState::default();
        for x in [1.0, -0.5, 0.25, 0.0] {
            assert_eq!(state.process(&BiquadCoefficients::IDENTITY, x), x);
        }
    }
}
