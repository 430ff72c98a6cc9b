//! # Duplicate-Segment Detection
//!
//! The speech provider occasionally returns the whole utterance two or three
//! times back to back. This stage detects that by splitting the buffer into
//! equal parts and comparing them with Pearson correlation; no reference to
//! the source text is needed.
//!
//! ## Detection Order:
//! 1. **Triple repeat**: three equal thirds, all three pairs must correlate
//! 2. **Double repeat**: two equal halves (only when the triple check did not fire)
//!
//! ## Guards:
//! - Parts shorter than `min_segment_secs` are never compared, short clips
//!   cannot be judged reliably
//! - The split remainder must stay below `remainder_tolerance_secs`, otherwise
//!   the parts would be misaligned

use crate::audio::{decode_pcm, samples_for, ProcessingError, StageOutcome, MAX_DURATION_SECS};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Settings for repetition detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Every compared pair must correlate above this value (0.0 - 1.0)
    pub correlation_threshold: f64,

    /// Largest split remainder still considered aligned, in seconds
    pub remainder_tolerance_secs: f64,

    /// Parts must be longer than this to be compared, in seconds
    pub min_segment_secs: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            correlation_threshold: 0.95,
            remainder_tolerance_secs: 0.1,
            min_segment_secs: 0.5,
        }
    }
}

impl DedupConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.correlation_threshold > 0.0 && self.correlation_threshold <= 1.0) {
            return Err("Correlation threshold must be in (0, 1]".to_string());
        }
        if !(0.0..=MAX_DURATION_SECS).contains(&self.remainder_tolerance_secs) {
            return Err(format!("Remainder tolerance must be between 0 and {} s", MAX_DURATION_SECS));
        }
        if !(0.0..=MAX_DURATION_SECS).contains(&self.min_segment_secs) {
            return Err(format!("Minimum segment length must be between 0 and {} s", MAX_DURATION_SECS));
        }
        Ok(())
    }
}

/// A detected repetition: the buffer is `copies` back-to-back copies of its
/// first `segment_samples` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Repetition {
    pub copies: usize,
    pub segment_samples: usize,
    pub correlations: Vec<f64>,
}

/// Strip accidental whole-utterance repetition from a PCM buffer.
///
/// ## Returns:
/// - **Processed**: The first segment only, when a 3x or 2x repeat was found
/// - **Unchanged**: No repetition, or the buffer is empty
/// - **Fallback**: The buffer could not be analyzed (it passes through as is)
pub fn remove_duplicates(pcm: &[u8], sample_rate: u32, config: &DedupConfig) -> StageOutcome {
    match find_repetition(pcm, sample_rate, config) {
        Ok(Some(repetition)) => {
            let total_samples = pcm.len() / 2;
            info!(
                copies = repetition.copies,
                correlations = ?repetition.correlations,
                original_secs = total_samples as f64 / f64::from(sample_rate),
                trimmed_secs = repetition.segment_samples as f64 / f64::from(sample_rate),
                "Repeated utterance detected, keeping first copy"
            );
            StageOutcome::Processed(pcm[..repetition.segment_samples * 2].to_vec())
        }
        Ok(None) => StageOutcome::Unchanged,
        Err(e) => {
            warn!(error = %e, "Duplicate detection failed, passing audio through");
            StageOutcome::Fallback(e)
        }
    }
}

/// Look for a 3x, then a 2x, whole-buffer repetition.
pub fn find_repetition(
    pcm: &[u8],
    sample_rate: u32,
    config: &DedupConfig,
) -> Result<Option<Repetition>, ProcessingError> {
    let samples = decode_pcm(pcm)?;
    let total = samples.len();
    if total == 0 {
        return Ok(None);
    }

    let min_segment = samples_for(config.min_segment_secs, sample_rate);
    let remainder_tolerance = config.remainder_tolerance_secs * f64::from(sample_rate);

    for copies in [3usize, 2] {
        let segment = total / copies;
        let remainder = total % copies;

        if segment <= min_segment || remainder as f64 >= remainder_tolerance {
            debug!(copies, segment, remainder, "Split not eligible for comparison");
            continue;
        }

        let parts: Vec<Vec<f64>> = samples
            .chunks_exact(segment)
            .take(copies)
            .map(standardize)
            .collect();

        let mut correlations = Vec::with_capacity(3);
        for &(a, b) in pairs(copies) {
            correlations.push(pearson(&parts[a], &parts[b]));
        }
        debug!(copies, correlations = ?correlations, "Segment correlations");

        // NaN (a silent part) never exceeds the threshold
        if correlations.iter().all(|&c| c > config.correlation_threshold) {
            return Ok(Some(Repetition {
                copies,
                segment_samples: segment,
                correlations,
            }));
        }
    }

    Ok(None)
}

/// Unordered part pairs compared for a given split.
fn pairs(copies: usize) -> &'static [(usize, usize)] {
    match copies {
        3 => &[(0, 1), (1, 2), (0, 2)],
        _ => &[(0, 1)],
    }
}

/// Scale a part to zero mean and unit variance.
///
/// A part with zero variance is returned as is (converted to floats), there is
/// nothing to scale.
fn standardize(part: &[i16]) -> Vec<f64> {
    let values: Vec<f64> = part.iter().map(|&s| f64::from(s)).collect();
    let (mean, std_dev) = mean_and_std(&values);

    if std_dev > 0.0 {
        values.iter().map(|v| (v - mean) / std_dev).collect()
    } else {
        values
    }
}

/// Population mean and standard deviation.
fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Pearson correlation of two equal-length series.
///
/// Returns NaN when either series is constant, the coefficient is undefined.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let (mean_a, std_a) = mean_and_std(a);
    let (mean_b, std_b) = mean_and_std(b);
    if std_a == 0.0 || std_b == 0.0 {
        return f64::NAN;
    }

    let n = a.len().min(b.len()) as f64;
    let covariance = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum::<f64>()
        / n;

    (covariance / (std_a * std_b)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encode_pcm;
    use crate::tts::testing::{noise, tone};

    fn detect(samples: &[i16]) -> StageOutcome {
        remove_duplicates(&encode_pcm(samples), 24_000, &DedupConfig::default())
    }

    #[test]
    fn test_empty_buffer_is_unchanged() {
        assert_eq!(detect(&[]), StageOutcome::Unchanged);
    }

    #[test]
    fn test_double_repeat_is_trimmed() {
        let segment = noise(15_000, 7);
        let doubled = [segment.clone(), segment.clone()].concat();

        match detect(&doubled) {
            StageOutcome::Processed(output) => assert_eq!(output, encode_pcm(&segment)),
            other => panic!("expected trimmed output, got {:?}", other.status()),
        }
    }

    #[test]
    fn test_triple_repeat_is_trimmed() {
        let segment = noise(13_000, 11);
        let tripled = [segment.clone(), segment.clone(), segment.clone()].concat();

        let repetition = find_repetition(&encode_pcm(&tripled), 24_000, &DedupConfig::default())
            .unwrap()
            .expect("repetition");
        assert_eq!(repetition.copies, 3);
        assert_eq!(repetition.segment_samples, 13_000);
        assert_eq!(repetition.correlations.len(), 3);
    }

    #[test]
    fn test_distinct_segments_are_unchanged() {
        let distinct = [noise(15_000, 1), noise(15_000, 2)].concat();
        assert_eq!(detect(&distinct), StageOutcome::Unchanged);
    }

    #[test]
    fn test_short_repeat_is_ignored() {
        // Each half is exactly the 0.5 s minimum, which is not enough
        let segment = noise(12_000, 3);
        let doubled = [segment.clone(), segment].concat();
        assert_eq!(detect(&doubled), StageOutcome::Unchanged);
    }

    #[test]
    fn test_repeated_tone_keeps_first_half() {
        // Two seconds of 440 Hz, twice. The thirds are out of phase, the halves are not.
        let utterance = tone(440.0, 10_000.0, 48_000);
        let doubled = [utterance.clone(), utterance].concat();

        let repetition = find_repetition(&encode_pcm(&doubled), 24_000, &DedupConfig::default())
            .unwrap()
            .expect("repetition");
        assert_eq!(repetition.copies, 2);
        assert_eq!(repetition.segment_samples, 48_000);
    }

    #[test]
    fn test_silence_never_matches() {
        assert_eq!(detect(&vec![0i16; 40_000]), StageOutcome::Unchanged);
    }

    #[test]
    fn test_split_remainder_within_tolerance_is_trimmed() {
        // One stray sample after two copies: halves still line up
        let segment = noise(15_000, 21);
        let mut doubled = [segment.clone(), segment.clone()].concat();
        doubled.push(1_234);
        assert_eq!(detect(&doubled), StageOutcome::Processed(encode_pcm(&segment)));

        // Two stray samples after three copies
        let segment = noise(13_000, 22);
        let mut tripled = [segment.clone(), segment.clone(), segment.clone()].concat();
        tripled.extend([-50, 75]);
        assert_eq!(detect(&tripled), StageOutcome::Processed(encode_pcm(&segment)));
    }

    #[test]
    fn test_split_remainder_above_tolerance_is_unchanged() {
        let segment = noise(15_000, 23);
        let mut doubled = [segment.clone(), segment].concat();
        doubled.push(1_234);

        // Half a sample of tolerance, the one-sample remainder exceeds it
        let config = DedupConfig { remainder_tolerance_secs: 0.5 / 24_000.0, ..DedupConfig::default() };
        let outcome = remove_duplicates(&encode_pcm(&doubled), 24_000, &config);
        assert_eq!(outcome, StageOutcome::Unchanged);
    }

    #[test]
    fn test_remainder_tolerance_blocks_misaligned_split() {
        let segment = noise(15_000, 5);
        let mut doubled = [segment.clone(), segment].concat();
        doubled.push(0);

        let config = DedupConfig { remainder_tolerance_secs: 0.0, ..DedupConfig::default() };
        let outcome = remove_duplicates(&encode_pcm(&doubled), 24_000, &config);
        assert_eq!(outcome, StageOutcome::Unchanged);
    }

    #[test]
    fn test_odd_bytes_fall_back() {
        let input = vec![1u8, 2, 3];
        let outcome = remove_duplicates(&input, 24_000, &DedupConfig::default());

        assert_eq!(outcome, StageOutcome::Fallback(ProcessingError::OddByteLength(3)));
        assert_eq!(outcome.into_output(&input), input);
    }

    #[test]
    fn test_pearson_bounds() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        let c = [4.0, 3.0, 2.0, 1.0];

        assert!((pearson(&a, &b) - 1.0).abs() < 1e-12);
        assert!((pearson(&a, &c) + 1.0).abs() < 1e-12);
        assert!(pearson(&a, &[5.0; 4]).is_nan());
    }

    #[test]
    fn test_config_validation() {
        assert!(DedupConfig::default().validate().is_ok());

        let bad = DedupConfig { correlation_threshold: 1.5, ..DedupConfig::default() };
        assert!(bad.validate().is_err());

        let bad = DedupConfig { min_segment_secs: 1e300, ..DedupConfig::default() };
        assert!(bad.validate().is_err());
    }
}
