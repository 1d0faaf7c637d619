//! # Linear Parameter Smoother
//!
//! When a user moves a knob, the parameter value jumps instantly. In audio,
//! an instant jump of a gain or a delay time produces a discontinuity you
//! can hear as a click or "zipper noise". A smoother hides the jump by
//! ramping from the old value to the new one over a short, fixed time.
//!
//! ## The ramp
//!
//! ```text
//! value
//!   ^            target ┌────────────
//!   |                 ╱
//!   |               ╱     ramp_samples steps
//!   |             ╱
//!   |  current ──┘
//!   +──────────────────────────────────> samples
//! ```
//!
//! The ramp *time* is fixed (e.g. 50 ms); the ramp *length in samples*
//! depends on the sample rate, so it is recomputed in
//! [`reset()`](Smoother::reset) whenever the host changes the rate.
//!
//! Instead of adding `step` to `current` on every sample (which lets
//! rounding errors pile up and can overshoot the target by a hair), we
//! compute `target - step * remaining`. That is monotonic by construction
//! and lands on `target` exactly when `remaining` reaches zero.

/// A linear ramp towards a target value.
#[derive(Debug, Clone)]
pub struct Smoother {
    ramp_seconds: f32,
    ramp_samples: u32,
    current: f32,
    target: f32,
    /// Per-sample increment of the running ramp.
    step: f32,
    /// Steps left until `current == target`.
    remaining: u32,
}

impl Smoother {
    /// Create a smoother with the given ramp time, sitting at 0.0.
    ///
    /// The ramp length in samples is unknown until [`reset()`](Self::reset)
    /// is called with a sample rate; until then every target is applied
    /// immediately.
    pub fn new(ramp_seconds: f32) -> Self {
        Self {
            ramp_seconds: ramp_seconds.max(0.0),
            ramp_samples: 0,
            current: 0.0,
            target: 0.0,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Recompute the ramp length for `sample_rate` and jump to the target.
    pub fn reset(&mut self, sample_rate: f32) {
        self.ramp_samples = (self.ramp_seconds * sample_rate).floor().max(0.0) as u32;
        self.set_current_and_target(self.target);
    }

    /// Jump straight to `value` with no ramp. Used at initialization and on
    /// preset loads, where ramping in from a stale value would be audible.
    pub fn set_current_and_target(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.remaining = 0;
    }

    /// Start a ramp from the current value to `value`.
    pub fn set_target(&mut self, value: f32) {
        if value == self.target {
            return;
        }
        if self.ramp_samples == 0 {
            self.set_current_and_target(value);
            return;
        }

        self.target = value;
        self.remaining = self.ramp_samples;
        self.step = (self.target - self.current) / self.ramp_samples as f32;
    }

    /// Advance by one sample and return the new current value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.current = self.target - self.step * self.remaining as f32;
        }
        self.current
    }

    /// Advance by `samples` at once, for per-block smoothing.
    pub fn skip(&mut self, samples: u32) -> f32 {
        self.remaining = self.remaining.saturating_sub(samples);
        self.current = self.target - self.step * self.remaining as f32;
        if self.remaining == 0 {
            self.current = self.target;
        }
        self.current
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn ramp_samples(&self) -> u32 {
        self.ramp_samples
    }

    pub fn is_smoothing(&self) -> bool {
        self.remaining > 0
    }
}
