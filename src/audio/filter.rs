//! Biquad high-pass filtering with zero-phase (forward-backward) application.
//!
//! Coefficients follow the Audio EQ Cookbook formulas. With `Q = 1/sqrt(2)`
//! the cookbook high-pass is the bilinear-transform 2nd-order Butterworth.

use crate::audio::ProcessingError;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Q factor of a 2nd-order Butterworth section.
pub const BUTTERWORTH_Q: f64 = FRAC_1_SQRT_2;

/// Edge padding used by [`filtfilt`]: three times the filter length.
pub const FILTFILT_PADDING: usize = 3 * 3;

/// Normalized biquad coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Creates highpass filter coefficients.
    ///
    /// # Arguments
    /// * `cutoff` - Cutoff frequency in Hz
    /// * `q` - Q factor (resonance)
    /// * `sample_rate` - Audio sample rate in Hz
    pub fn highpass(cutoff: f64, q: f64, sample_rate: f64) -> Self {
        // Clamp Q to minimum safe value to prevent division by zero
        let q = q.max(0.5);
        let omega = 2.0 * PI * cutoff / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * q);

        let b0 = (1.0 + cos_omega) / 2.0;
        let b1 = -(1.0 + cos_omega);
        let b2 = (1.0 + cos_omega) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// 2nd-order Butterworth high-pass.
    pub fn butterworth_highpass(cutoff: f64, sample_rate: f64) -> Self {
        Self::highpass(cutoff, BUTTERWORTH_Q, sample_rate)
    }

    /// Filter state that a constant unit input would settle into.
    ///
    /// Scaling this by the first sample starts the filter as if the signal had
    /// always been at that level, which suppresses the start-up transient.
    pub fn steady_state(&self) -> [f64; 2] {
        let gain = (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2);
        let z1 = self.b2 - self.a2 * gain;
        let z0 = self.b1 - self.a1 * gain + z1;
        [z0, z1]
    }
}

/// Run the biquad over `input` in transposed direct form II, starting from
/// state `zi`.
pub fn lfilter(coeffs: &BiquadCoeffs, input: &[f64], zi: [f64; 2]) -> Vec<f64> {
    let [mut z0, mut z1] = zi;

    input
        .iter()
        .map(|&x| {
            let y = coeffs.b0 * x + z0;
            z0 = coeffs.b1 * x - coeffs.a1 * y + z1;
            z1 = coeffs.b2 * x - coeffs.a2 * y;
            y
        })
        .collect()
}

/// Apply the filter forward and then backward, cancelling its phase response.
///
/// The signal is extended at both ends by odd reflection
/// ([`FILTFILT_PADDING`] samples each side) and each pass starts from the
/// steady state scaled to its first sample.
///
/// # Errors
/// Returns [`ProcessingError::SignalTooShort`] when the signal is not longer
/// than the edge padding.
pub fn filtfilt(coeffs: &BiquadCoeffs, signal: &[f64]) -> Result<Vec<f64>, ProcessingError> {
    let pad = FILTFILT_PADDING;
    if signal.len() <= pad {
        return Err(ProcessingError::SignalTooShort {
            samples: signal.len(),
            required: pad,
        });
    }

    let extended = odd_extend(signal, pad);
    let zi = coeffs.steady_state();

    let first = extended[0];
    let forward = lfilter(coeffs, &extended, [zi[0] * first, zi[1] * first]);

    let reversed: Vec<f64> = forward.into_iter().rev().collect();
    let last = reversed[0];
    let mut backward = lfilter(coeffs, &reversed, [zi[0] * last, zi[1] * last]);
    backward.reverse();

    Ok(backward[pad..backward.len() - pad].to_vec())
}

/// Extend `signal` by `pad` samples on each side, reflecting through the end
/// points (`2*x[0] - x[i]` on the left, `2*x[n-1] - x[i]` on the right).
///
/// Caller guarantees `signal.len() > pad`.
fn odd_extend(signal: &[f64], pad: usize) -> Vec<f64> {
    let n = signal.len();
    let first = signal[0];
    let last = signal[n - 1];

    let mut extended = Vec::with_capacity(n + 2 * pad);
    extended.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
    extended.extend_from_slice(signal);
    extended.extend((n - 1 - pad..n - 1).rev().map(|i| 2.0 * last - signal[i]));
    extended
}
