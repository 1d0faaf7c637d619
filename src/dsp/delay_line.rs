//! # Delay Line (Ring Buffer)
//!
//! A delay line stores audio samples and lets you read them back after a
//! specified time delay. It is the building block of the delay, vibrato
//! and flanger modules, and of the dry-path alignment in the reverb.
//!
//! ## How a Ring Buffer Works
//!
//! Picture a circular tape loop. A "write head" records incoming audio
//! onto the tape and a "read head" plays it back from a position further
//! behind. The distance between the two heads is the delay time.
//!
//! In code the tape is a `Vec<f32>` of length `L` and the write head is an
//! index in `[0, L)`. Per sample:
//!
//! 1. [`write()`](DelayLine::write) stores the new sample at the write
//!    index (without moving it).
//! 2. [`read()`](DelayLine::read) looks `delay` samples behind the write
//!    index, wrapping around the end of the buffer.
//! 3. [`advance()`](DelayLine::advance) moves the write index on by one.
//!
//! Whether you read before or after writing decides what `delay = 0`
//! means. Read first and `delay = 1` is the previous input (the echo
//! module does this, since its write depends on the read). Write first and
//! `delay = 0` is the *current* input: a zero-delay tap, which is what an
//! LFO sweep that passes through zero needs.
//!
//! ## Guard samples
//!
//! The buffer is [`GUARD_SAMPLES`] longer than the longest delay the
//! caller asked for. The cubic interpolator reads one sample "newer" and
//! two "older" than the read position, and the guard keeps those
//! neighbours from landing on freshly overwritten data when the delay
//! sits at its maximum.
//!
//! ## Fractional delays
//!
//! A delay of 441.3 samples falls between two stored samples, so we
//! interpolate. The read position is `pos = write_index - delay` (mod `L`);
//! its integer part picks the neighbours and its fraction weights them.
//!
//! ```text
//!   buffer:  ... [ i-1 ] [  i  ] [ i+1 ] [ i+2 ] ...
//!                           ^  pos = i + frac
//!
//!   Nearest:  buffer[round(pos)]
//!   Linear:   buffer[i] * (1 - frac) + buffer[i+1] * frac
//!   Cubic:    Catmull-Rom through i-1, i, i+1, i+2
//! ```
//!
//! Nearest is cheapest but zippers when the delay moves. Linear is the
//! usual compromise. Catmull-Rom passes exactly through every stored
//! sample and is smoother still, at four reads per output sample.

use super::try_zeroed;
use crate::error::DspError;

/// Extra samples allocated beyond the requested maximum delay.
pub const GUARD_SAMPLES: usize = 3;

/// How [`DelayLine::read`] reconstructs a sample between stored positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Nearest,
    Linear,
    Cubic,
}

impl Interpolation {
    /// Names in choice-parameter order.
    pub const NAMES: &'static [&'static str] = &["Nearest", "Linear", "Cubic"];

    /// Map a choice-parameter index to a mode. Out-of-range indices fall
    /// back to the cheapest mode.
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => Self::Linear,
            2 => Self::Cubic,
            _ => Self::Nearest,
        }
    }
}

/// Number of samples needed to hold `seconds` of audio at `sample_rate`.
pub fn capacity_for(seconds: f32, sample_rate: f32) -> usize {
    (seconds * sample_rate).ceil().max(0.0) as usize
}

/// A ring buffer that functions as an audio delay line.
///
/// The buffer is allocated once, in `prepare`, to the longest delay the
/// module can ask for. Changing the delay time only moves the read
/// position, so nothing is ever allocated on the audio thread.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    /// Where the next sample will be written. Always in `[0, buffer.len())`.
    write_index: usize,
}

impl DelayLine {
    /// Allocate a zeroed delay line able to delay by up to
    /// `max_delay_samples`.
    ///
    /// The allocation is fallible so that an absurd sample rate or delay
    /// time turns into a [`DspError::Allocation`] the caller can recover
    /// from, instead of an abort.
    pub fn try_new(max_delay_samples: usize) -> Result<Self, DspError> {
        let len = max_delay_samples
            .checked_add(GUARD_SAMPLES)
            .ok_or(DspError::Allocation {
                samples: max_delay_samples,
            })?;

        Ok(Self {
            buffer: try_zeroed(len)?,
            write_index: 0,
        })
    }

    /// Total buffer length `L`, guard samples included.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Longest delay [`read()`](Self::read) honours; longer delays are
    /// clamped to this.
    pub fn max_delay(&self) -> usize {
        self.buffer.len() - GUARD_SAMPLES
    }

    /// Store a sample at the write index. Does **not** advance.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_index] = sample;
    }

    /// Move the write index on by one sample, wrapping at the end.
    #[inline]
    pub fn advance(&mut self) {
        self.write_index += 1;
        if self.write_index == self.buffer.len() {
            self.write_index = 0;
        }
    }

    /// [`write()`](Self::write) then [`advance()`](Self::advance).
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.write(sample);
        self.advance();
    }

    /// Read `delay` samples behind the write index.
    ///
    /// `delay` is clamped to `[0, max_delay()]`, so a wild value read from
    /// a smoother mid-ramp can never index outside the buffer.
    #[inline]
    pub fn read(&self, delay: f32, interpolation: Interpolation) -> f32 {
        let len = self.buffer.len();
        let len_f = len as f32;
        let delay = if delay.is_finite() {
            delay.clamp(0.0, self.max_delay() as f32)
        } else {
            0.0
        };

        // Adding `len` before subtracting keeps the position non-negative.
        let mut pos = self.write_index as f32 - delay + len_f;
        if pos >= len_f {
            pos -= len_f;
        }

        let base = pos as usize;
        let frac = pos - base as f32;
        let base = base % len;

        match interpolation {
            Interpolation::Nearest => {
                let mut index = (pos + 0.5) as usize;
                if index >= len {
                    index -= len;
                }
                self.buffer[index]
            }
            Interpolation::Linear => {
                let a = self.buffer[base];
                let b = self.buffer[(base + 1) % len];
                a + frac * (b - a)
            }
            Interpolation::Cubic => {
                let y0 = self.buffer[(base + len - 1) % len];
                let y1 = self.buffer[base];
                let y2 = self.buffer[(base + 1) % len];
                let y3 = self.buffer[(base + 2) % len];

                let a0 = -0.5 * y0 + 1.5 * y1 - 1.5 * y2 + 0.5 * y3;
                let a1 = y0 - 2.5 * y1 + 2.0 * y2 - 0.5 * y3;
                let a2 = -0.5 * y0 + 0.5 * y2;
                let a3 = y1;

                ((a0 * frac + a1) * frac + a2) * frac + a3
            }
        }
    }

    /// Clear the buffer to silence and reset the write position.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line(max: usize) -> DelayLine {
        DelayLine::try_new(max).expect("small delay line allocates")
    }

    #[test]
    fn allocates_guard_samples() {
        let dl = line(100);
        assert_eq!(dl.len(), 100 + GUARD_SAMPLES);
        assert_eq!(dl.max_delay(), 100);
        assert_eq!(capacity_for(0.5, 44100.0), 22050);
    }

    #[test]
    fn absurd_sizes_fail_instead_of_aborting() {
        assert!(matches!(
            DelayLine::try_new(usize::MAX),
            Err(DspError::Allocation { .. })
        ));
    }

    /// Verify basic write-then-read at an exact sample position.
    #[test]
    fn test_write_and_read_exact() {
        let mut dl = line(100);

        dl.push(0.75);

        // Reading 1 sample back should give us the 0.75 we just wrote.
        let result = dl.read(1.0, Interpolation::Linear);
        assert_relative_eq!(result, 0.75);
    }

    /// Verify linear interpolation between two samples.
    #[test]
    fn test_interpolation() {
        let mut dl = line(100);

        dl.push(0.0);
        dl.push(1.0);

        // Halfway between "1 ago" (1.0) and "2 ago" (0.0).
        let result = dl.read(1.5, Interpolation::Linear);
        assert_relative_eq!(result, 0.5);
    }

    /// Linear interpolation is the exact weighted average of the two
    /// neighbours for every fraction in [0, 1).
    #[test]
    fn linear_is_exact_weighted_average() {
        let mut dl = line(16);
        let older = -0.25_f32;
        let newer = 0.8_f32;
        dl.push(older);
        dl.push(newer);

        for step in 0..100 {
            let frac = step as f32 / 100.0;
            // Delay 1 is `newer`, delay 2 is `older`.
            let expected = newer * (1.0 - frac) + older * frac;
            let got = dl.read(1.0 + frac, Interpolation::Linear);
            assert!(
                (got - expected).abs() < 1e-5,
                "frac {frac}: expected {expected}, got {got}"
            );
        }
    }

    /// Verify the buffer wraps correctly past its boundaries.
    #[test]
    fn test_wrapping() {
        let mut dl = line(4);

        for i in 0..20 {
            dl.push(i as f32);
        }

        assert_relative_eq!(dl.read(1.0, Interpolation::Nearest), 19.0);
        assert_relative_eq!(dl.read(4.0, Interpolation::Nearest), 16.0);
    }

    #[test]
    fn test_clear() {
        let mut dl = line(10);

        dl.push(0.5);
        dl.clear();

        assert_eq!(dl.read(1.0, Interpolation::Linear), 0.0);
    }

    #[test]
    fn test_silence_in_silence_out() {
        let dl = line(100);

        for delay in [1.0, 10.0, 50.0, 99.0] {
            for mode in [Interpolation::Nearest, Interpolation::Linear, Interpolation::Cubic] {
                assert_eq!(dl.read(delay, mode), 0.0, "{mode:?} at {delay}");
            }
        }
    }

    /// Writing multiple samples and reading them back gives FIFO order.
    #[test]
    fn test_fifo_sequence() {
        let mut dl = line(10);

        for i in 1..=5 {
            dl.push(i as f32);
        }

        for (delay, expected) in [(1.0, 5.0), (2.0, 4.0), (3.0, 3.0), (4.0, 2.0), (5.0, 1.0)] {
            assert_relative_eq!(dl.read(delay, Interpolation::Linear), expected);
        }
    }

    /// After write() and before advance(), delay 0 is the current input.
    #[test]
    fn zero_delay_tap_after_write() {
        let mut dl = line(8);
        dl.push(0.1);
        dl.write(0.9);
        for mode in [Interpolation::Nearest, Interpolation::Linear, Interpolation::Cubic] {
            assert_relative_eq!(dl.read(0.0, mode), 0.9);
        }
    }

    /// An impulse read back with nearest-neighbour lands within one
    /// sample of where it should, for every delay up to the maximum.
    #[test]
    fn nearest_finds_impulse_at_every_delay() {
        let max = 64;
        for delay in 0..=max {
            let mut dl = line(max);
            dl.push(1.0);
            // The impulse is now `k + 1` samples ago after k more pushes.
            for _ in 0..delay.saturating_sub(1) {
                dl.push(0.0);
            }

            let target = delay.max(1) as f32;
            let found = [-1.0, 0.0, 1.0]
                .iter()
                .any(|offset| dl.read(target + offset, Interpolation::Nearest) == 1.0);
            assert!(found, "impulse not found near delay {target}");
        }
    }

    /// Catmull-Rom passes exactly through the stored samples.
    #[test]
    fn cubic_is_identity_at_integer_positions() {
        let mut dl = line(32);
        let samples: Vec<f32> = (0..32).map(|i| ((i * 7) % 11) as f32 - 5.0).collect();
        for &s in &samples {
            dl.push(s);
        }

        for delay in 1..=30 {
            let expected = samples[samples.len() - delay];
            assert_relative_eq!(
                dl.read(delay as f32, Interpolation::Cubic),
                expected,
                epsilon = 1e-5
            );
        }
    }

    #[test]
    fn delay_is_clamped_to_capacity() {
        let mut dl = line(4);
        for i in 0..10 {
            dl.push(i as f32);
        }
        let at_max = dl.read(4.0, Interpolation::Linear);
        assert_eq!(dl.read(1000.0, Interpolation::Linear), at_max);
        assert_eq!(dl.read(f32::NAN, Interpolation::Linear), dl.read(0.0, Interpolation::Linear));
    }

    #[test]
    fn interpolation_choice_indices() {
        assert_eq!(Interpolation::from_index(0), Interpolation::Nearest);
        assert_eq!(Interpolation::from_index(1), Interpolation::Linear);
        assert_eq!(Interpolation::from_index(2), Interpolation::Cubic);
        assert_eq!(Interpolation::from_index(7), Interpolation::Nearest);
        assert_eq!(Interpolation::NAMES.len(), 3);
    }
}
