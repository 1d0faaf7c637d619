//! # Impulse Responses
//!
//! An impulse response is the recording of a single click played through
//! a space or a speaker cabinet. This module gets IRs into the shape the
//! convolver wants:
//!
//! 1. **Decode** a WAV file (any channel count, integer or float samples)
//!    with `hound`, mixing all channels down to mono.
//! 2. **Trim** the silence before the first and after the last audible
//!    sample. Leading silence would be heard as pre-delay, trailing
//!    silence just burns CPU.
//! 3. **Resample** to the host rate with linear interpolation. An IR
//!    recorded at 44.1 kHz played at 96 kHz would otherwise sound more than
//!    twice as short and pitched up.
//! 4. **Normalise** to unit energy so switching IRs doesn't jump in level.
//!
//! The shipped rooms and cabinets are synthesized rather than stored as
//! binary blobs. A user IR can be supplied through the
//! [`USER_IR_ENV`] environment variable.

use std::f32::consts::TAU;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use hound::{SampleFormat, WavReader};

use super::try_zeroed;
use crate::error::DspError;

/// Environment variable naming a WAV file for the reverb's user slot.
pub const USER_IR_ENV: &str = "LOVELESS_FX_USER_IR";

/// Samples quieter than this fraction of the peak count as silence.
const SILENCE_THRESHOLD: f32 = 1e-4;

/// A mono impulse response at its native sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    samples: Vec<f32>,
    sample_rate: f32,
}

impl ImpulseResponse {
    pub fn new(samples: Vec<f32>, sample_rate: f32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Decode a WAV stream, mixing every channel down to mono.
    pub fn from_wav_reader<R: Read>(reader: R) -> Result<Self, DspError> {
        let reader = WavReader::new(reader)?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
            SampleFormat::Int => {
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    return Err(DspError::UnsupportedFormat(format!(
                        "{}-bit integer samples",
                        spec.bits_per_sample
                    )));
                }
                let scale = 1.0 / (1_u64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let samples: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        Ok(Self::new(samples, spec.sample_rate as f32))
    }

    pub fn from_wav_file(path: impl AsRef<Path>) -> Result<Self, DspError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DspError::Decode(hound::Error::IoError(e)))?;
        Self::from_wav_reader(BufReader::new(file))
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Trim, resample to `sample_rate` and normalise. Fails if nothing
    /// audible is left.
    pub fn prepare_for(&self, sample_rate: f32) -> Result<Vec<f32>, DspError> {
        let trimmed = trim_silence(&self.samples);
        if trimmed.is_empty() {
            return Err(DspError::EmptyImpulseResponse(String::from("silent or empty")));
        }

        let mut prepared = resample_linear(trimmed, self.sample_rate, sample_rate)?;
        normalize_energy(&mut prepared);
        Ok(prepared)
    }
}

/// The slice between the first and last sample above the silence
/// threshold. Empty if every sample is silent.
pub fn trim_silence(samples: &[f32]) -> &[f32] {
    let peak = samples.iter().fold(0.0_f32, |peak, s| peak.max(s.abs()));
    if peak <= 0.0 {
        return &[];
    }

    let threshold = peak * SILENCE_THRESHOLD;
    let audible = |s: &f32| s.abs() > threshold;
    match (
        samples.iter().position(audible),
        samples.iter().rposition(audible),
    ) {
        (Some(first), Some(last)) => &samples[first..=last],
        _ => &[],
    }
}

/// Linear-interpolation resampling. Good enough for IRs, which are
/// resampled once per sample-rate change.
pub fn resample_linear(samples: &[f32], from_rate: f32, to_rate: f32) -> Result<Vec<f32>, DspError> {
    if samples.is_empty() || from_rate <= 0.0 || to_rate <= 0.0 || from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let ratio = f64::from(from_rate) / f64::from(to_rate);
    let out_len = ((samples.len() as f64) / ratio).ceil().max(1.0) as usize;
    let last = samples.len() - 1;

    let mut resampled = try_zeroed(out_len)?;
    for (i, out) in resampled.iter_mut().enumerate() {
        let pos = i as f64 * ratio;
        let index = (pos as usize).min(last);
        let frac = (pos - index as f64) as f32;
        let a = samples[index];
        let b = samples[(index + 1).min(last)];
        *out = a + frac * (b - a);
    }
    Ok(resampled)
}

/// Scale to unit energy (`Σ x² = 1`). Silent input is left alone.
pub fn normalize_energy(samples: &mut [f32]) {
    let energy: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    if energy > 0.0 {
        let gain = (1.0 / energy.sqrt()) as f32;
        for s in samples.iter_mut() {
            *s *= gain;
        }
    }
}

/// Load the user IR named by [`USER_IR_ENV`], if the variable is set.
pub fn user_impulse_response() -> Option<Result<ImpulseResponse, DspError>> {
    let path = std::env::var_os(USER_IR_ENV)?;
    Some(ImpulseResponse::from_wav_file(path))
}

/// Deterministic white noise in `[-1, 1)`, so synthesized IRs are the same
/// on every run.
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (self.0 >> 8) as f32 / (1 << 23) as f32 - 1.0
    }
}

/// The built-in rooms of the convolution reverb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Room {
    SmallRoom,
    ConcertHall,
    Plate,
}

impl Room {
    pub const ALL: [Self; 3] = [Self::SmallRoom, Self::ConcertHall, Self::Plate];

    pub fn name(self) -> &'static str {
        match self {
            Self::SmallRoom => "Small Room",
            Self::ConcertHall => "Concert Hall",
            Self::Plate => "Plate",
        }
    }

    /// Exponentially decaying noise, `rt60` seconds to fall by 60 dB, with
    /// a few discrete early reflections in front.
    pub fn synthesize(self, sample_rate: f32) -> Result<ImpulseResponse, DspError> {
        let (rt60, pre_delay, reflections, seed): (f32, f32, &[(f32, f32)], u32) = match self {
            Self::SmallRoom => (0.4, 0.002, &[(0.004, 0.7), (0.009, 0.5), (0.013, 0.35)], 0x5eed_0001),
            Self::ConcertHall => (2.4, 0.020, &[(0.031, 0.6), (0.047, 0.45), (0.071, 0.3)], 0x5eed_0002),
            // A plate has no early reflections, just a dense, bright wash.
            Self::Plate => (1.5, 0.0, &[], 0x5eed_0003),
        };

        let len = (rt60 * sample_rate).ceil().max(1.0) as usize;
        let pre = (pre_delay * sample_rate) as usize;
        // e^(-t * ln(1000) / rt60) reaches -60 dB at t = rt60.
        let decay_per_sample = (-(1000.0_f32).ln() / (rt60 * sample_rate)).exp();

        let mut noise = Lcg(seed);
        let mut envelope = 1.0;
        let mut samples = try_zeroed(len)?;
        for sample in samples.iter_mut().skip(pre) {
            *sample = noise.next() * envelope;
            envelope *= decay_per_sample;
        }
        samples[0] = 1.0;
        for &(time, gain) in reflections {
            let index = (time * sample_rate) as usize;
            if let Some(sample) = samples.get_mut(index) {
                *sample += gain;
            }
        }

        Ok(ImpulseResponse::new(samples, sample_rate))
    }
}

/// The built-in guitar cabinets of the amp simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cabinet {
    OpenBack2x12,
    ClosedBack4x12,
    Combo1x12,
}

impl Cabinet {
    pub const ALL: [Self; 3] = [Self::OpenBack2x12, Self::ClosedBack4x12, Self::Combo1x12];

    pub fn name(self) -> &'static str {
        match self {
            Self::OpenBack2x12 => "Open Back 2x12",
            Self::ClosedBack4x12 => "Closed Back 4x12",
            Self::Combo1x12 => "Combo 1x12",
        }
    }

    /// A sum of damped resonances. Real speaker cabinets are dominated by
    /// a low cone/box resonance, a presence peak, and a steep roll-off
    /// above ~5 kHz, which short-lived high modes approximate.
    pub fn synthesize(self, sample_rate: f32) -> Result<ImpulseResponse, DspError> {
        // (frequency Hz, amplitude, decay time constant in seconds)
        let modes: &[(f32, f32, f32)] = match self {
            Self::OpenBack2x12 => &[(110.0, 0.6, 0.012), (1800.0, 0.8, 0.004), (3200.0, 0.5, 0.002)],
            Self::ClosedBack4x12 => &[(85.0, 1.0, 0.018), (700.0, 0.5, 0.006), (2500.0, 0.7, 0.003)],
            Self::Combo1x12 => &[(140.0, 0.5, 0.010), (1200.0, 0.6, 0.005), (4000.0, 0.4, 0.0015)],
        };

        let len = (0.05 * sample_rate).ceil().max(1.0) as usize;
        let mut samples = try_zeroed(len)?;
        for (n, sample) in samples.iter_mut().enumerate() {
            let t = n as f32 / sample_rate;
            *sample = modes
                .iter()
                .map(|&(frequency, amplitude, tau)| {
                    amplitude * (-t / tau).exp() * (TAU * frequency * t).sin()
                })
                .sum::<f32>();
        }
        samples[0] += 0.3;

        Ok(ImpulseResponse::new(samples, sample_rate))
    }
}
