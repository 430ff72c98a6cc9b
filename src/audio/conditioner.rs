//! # Fade & Noise Conditioning
//!
//! Removes the clicks and pops that appear when synthesized speech starts or
//! stops abruptly, and brings every utterance to the same peak level.
//!
//! ## Processing Steps (in order):
//! 1. **DC removal**: Subtract the mean so the waveform is centered on zero
//! 2. **Silence padding**: Prepend a few milliseconds of zeros to avoid a hard onset
//! 3. **Fades**: Smoothstep fade-in after the padding, `1 - (1-t)^2 (3 - 2(1-t))` over the tail
//! 4. **High-pass**: 2nd-order Butterworth, applied forward and backward (zero phase)
//! 5. **Peak normalization**: Scale so the loudest sample sits at 95% of full scale
//! 6. **Back to 16-bit**: Truncate toward zero
//!
//! The output is deterministic for a given input and configuration.

use crate::audio::filter::{filtfilt, BiquadCoeffs};
use crate::audio::{
    decode_pcm, encode_pcm, samples_for, ProcessingError, StageOutcome, MAX_DURATION_SECS,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Full scale of a signed 16-bit sample.
const FULL_SCALE: f64 = 32767.0;

/// Settings for fading, filtering and normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionerConfig {
    /// Silence prepended before the fade-in (milliseconds)
    pub silence_padding_ms: f64,

    /// Length of each fade (milliseconds)
    pub fade_ms: f64,

    /// High-pass cutoff (Hz), removes DC drift and sub-audible rumble
    pub highpass_cutoff_hz: f64,

    /// Peak level after normalization, as a fraction of full scale
    pub peak_target: f64,
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        Self {
            silence_padding_ms: 10.0,
            fade_ms: 50.0,
            highpass_cutoff_hz: 20.0,
            peak_target: 0.95,
        }
    }
}

impl ConditionerConfig {
    pub fn validate(&self, sample_rate: u32) -> Result<(), String> {
        let max_ms = MAX_DURATION_SECS * 1000.0;
        if !(0.0..=max_ms).contains(&self.silence_padding_ms) {
            return Err(format!("Silence padding must be between 0 and {} ms", max_ms));
        }
        if !(0.0..=max_ms).contains(&self.fade_ms) {
            return Err(format!("Fade length must be between 0 and {} ms", max_ms));
        }
        let nyquist = f64::from(sample_rate) / 2.0;
        if !(self.highpass_cutoff_hz > 0.0 && self.highpass_cutoff_hz < nyquist) {
            return Err(format!("High-pass cutoff must be between 0 and {} Hz", nyquist));
        }
        if !(self.peak_target > 0.0 && self.peak_target <= 1.0) {
            return Err("Peak target must be in (0, 1]".to_string());
        }
        Ok(())
    }

    fn silence_padding_samples(&self, sample_rate: u32) -> usize {
        samples_for(self.silence_padding_ms / 1000.0, sample_rate)
    }

    fn fade_samples(&self, sample_rate: u32) -> usize {
        samples_for(self.fade_ms / 1000.0, sample_rate)
    }
}

/// Condition a PCM buffer: fades, high-pass and peak normalization.
///
/// ## Returns:
/// - **Processed**: The conditioned buffer (longer than the input by the silence padding)
/// - **Unchanged**: The buffer was empty, there is nothing to condition
/// - **Fallback**: Processing failed and the input passes through untouched
pub fn condition(pcm: &[u8], sample_rate: u32, config: &ConditionerConfig) -> StageOutcome {
    match condition_samples(pcm, sample_rate, config) {
        Ok(Some(samples)) => StageOutcome::Processed(encode_pcm(&samples)),
        Ok(None) => StageOutcome::Unchanged,
        Err(e) => {
            warn!(error = %e, "Fade processing failed, passing audio through");
            StageOutcome::Fallback(e)
        }
    }
}

fn condition_samples(
    pcm: &[u8],
    sample_rate: u32,
    config: &ConditionerConfig,
) -> Result<Option<Vec<i16>>, ProcessingError> {
    let samples = decode_pcm(pcm)?;
    if samples.is_empty() {
        return Ok(None);
    }
    config.validate(sample_rate).map_err(ProcessingError::InvalidConfig)?;

    let padding = config.silence_padding_samples(sample_rate);
    let fade = config.fade_samples(sample_rate);
    let padded_len = padding
        .checked_add(samples.len())
        .ok_or_else(|| ProcessingError::InvalidConfig("silence padding too long".to_string()))?;

    let mut signal = Vec::with_capacity(padded_len);
    signal.resize(padding, 0.0);
    signal.extend(samples.iter().map(|&s| f64::from(s)));
    remove_dc_offset(&mut signal[padding..]);

    let fits_fades = fade.checked_mul(2).map_or(false, |both| signal.len() > both);
    if fade > 0 && fits_fades {
        apply_fades(&mut signal, padding, fade);
    } else {
        debug!(samples = signal.len(), fade, "Audio too short for fades, skipping");
    }

    let coeffs = BiquadCoeffs::butterworth_highpass(config.highpass_cutoff_hz, f64::from(sample_rate));
    let mut filtered = filtfilt(&coeffs, &signal)?;
    if filtered.iter().any(|v| !v.is_finite()) {
        return Err(ProcessingError::NonFinite("high-pass filter"));
    }

    normalize_peak(&mut filtered, config.peak_target);

    // `as` truncates toward zero and saturates at the i16 bounds
    Ok(Some(filtered.iter().map(|&v| v as i16).collect()))
}

/// Center the signal on zero.
fn remove_dc_offset(signal: &mut [f64]) {
    if signal.is_empty() {
        return;
    }
    let mean = signal.iter().sum::<f64>() / signal.len() as f64;
    for sample in signal.iter_mut() {
        *sample -= mean;
    }
}

/// Smoothstep `t^2 (3 - 2t)` evaluated at `len` evenly spaced points over [0, 1].
fn smoothstep_curve(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let t = if len > 1 { i as f64 / (len - 1) as f64 } else { 0.0 };
            t * t * (3.0 - 2.0 * t)
        })
        .collect()
}

/// Tail gain `1 - (1-t)^2 (3 - 2(1-t))` at `len` evenly spaced points over [0, 1].
///
/// Algebraically this is the smoothstep itself, so the tail gain climbs back
/// to 1 on the last sample.
fn tail_curve(len: usize) -> Vec<f64> {
    smoothstep_curve(len).iter().rev().map(|s| 1.0 - s).collect()
}

/// Apply the fade-in to the `fade` samples after the padding and the tail
/// curve to the last `fade` samples.
fn apply_fades(signal: &mut [f64], padding: usize, fade: usize) {
    for (sample, gain) in signal.iter_mut().skip(padding).zip(smoothstep_curve(fade)) {
        *sample *= gain;
    }

    let tail_start = signal.len() - fade;
    for (sample, gain) in signal[tail_start..].iter_mut().zip(tail_curve(fade)) {
        *sample *= gain;
    }
}

/// Scale so the largest magnitude equals `target` of full scale.
/// Silence is left alone.
fn normalize_peak(signal: &mut [f64], target: f64) {
    let peak = signal.iter().fold(0.0f64, |max, v| max.max(v.abs()));
    if peak > 0.0 {
        let gain = FULL_SCALE * target / peak;
        for sample in signal.iter_mut() {
            *sample *= gain;
        }
    }
}
