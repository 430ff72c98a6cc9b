//! # Synthesized Speech Post-Processing
//!
//! This module turns the raw PCM returned by the speech provider into a clean,
//! playable WAV asset. Every stage is a pure function over an in-memory buffer:
//! the input is borrowed, a new buffer is returned.
//!
//! ## Pipeline Stages (in order):
//! 1. **dedup**: Strips accidental whole-utterance repetition (2x or 3x)
//! 2. **conditioner**: DC removal, silence padding, smooth fades, high-pass, peak normalization
//! 3. **wav**: Wraps the conditioned samples in a 44-byte RIFF/WAVE header
//!
//! ## Audio Format:
//! - **Sample Rate**: 24kHz (24,000 Hz), the provider's LINEAR16 output rate
//! - **Bit Depth**: 16-bit PCM
//! - **Channels**: Mono (1 channel)
//! - **Encoding**: Little-endian signed integers
//!
//! ## Failure Policy:
//! Stages never return errors to the caller. When a stage cannot process its
//! input it reports [`StageOutcome::Fallback`] and the input passes through
//! unchanged, so a post-processing problem can only leave artifacts in the
//! audio, never block its delivery.

pub mod conditioner;  // Fades, filtering and normalization
pub mod dedup;        // Whole-utterance repetition detection
pub mod filter;       // Biquad high-pass and zero-phase filtering
pub mod wav;          // RIFF/WAVE container encoding

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use conditioner::ConditionerConfig;
pub use dedup::DedupConfig;

/// Sample rate of the provider's LINEAR16 output.
pub const SAMPLE_RATE: u32 = 24_000;

/// All synthesized audio is mono.
pub const CHANNELS: u16 = 1;

/// LINEAR16 means 16-bit signed samples.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Upper bound for every configurable duration (padding, fades, dedup windows).
pub const MAX_DURATION_SECS: f64 = 10.0;

/// Tunable parameters for the whole post-processing pipeline.
///
/// ## Why configurable:
/// The correlation threshold and the remainder tolerance are empirical values.
/// They work for the provider's 24kHz voices, but are kept adjustable so they can
/// be retuned for other sample rates or voices without a rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Sample rate the provider is asked for and the WAV header declares
    pub sample_rate: u32,

    /// Duplicate-segment detector settings
    pub dedup: DedupConfig,

    /// Fade and noise conditioner settings
    pub conditioner: ConditionerConfig,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            dedup: DedupConfig::default(),
            conditioner: ConditionerConfig::default(),
        }
    }
}

impl ProcessingConfig {
    /// Check that every parameter is usable for the configured sample rate.
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("Sample rate must be greater than 0".to_string());
        }
        self.dedup.validate()?;
        self.conditioner.validate(self.sample_rate)?;
        Ok(())
    }
}

/// Problems a stage can hit while processing a buffer.
///
/// These never leave the pipeline as errors. They are carried inside
/// [`StageOutcome::Fallback`] so callers can log and count them.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingError {
    /// The buffer cannot be split into whole 16-bit samples
    OddByteLength(usize),

    /// The signal is shorter than the filter's edge padding
    SignalTooShort { samples: usize, required: usize },

    /// A computation produced NaN or infinity
    NonFinite(&'static str),

    /// The stage was handed parameters it cannot run with
    InvalidConfig(String),
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingError::OddByteLength(len) => {
                write!(f, "PCM byte length {} is not a whole number of 16-bit samples", len)
            }
            ProcessingError::SignalTooShort { samples, required } => {
                write!(f, "signal has {} samples, filter needs more than {}", samples, required)
            }
            ProcessingError::NonFinite(stage) => write!(f, "non-finite values produced by {}", stage),
            ProcessingError::InvalidConfig(msg) => write!(f, "invalid processing parameters: {}", msg),
        }
    }
}

impl std::error::Error for ProcessingError {}

/// What a single pipeline stage did with its input.
///
/// ## Variants:
/// - **Processed**: The stage produced a new buffer
/// - **Unchanged**: The stage decided there was nothing to do
/// - **Fallback**: The stage failed internally and the input passes through
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Processed(Vec<u8>),
    Unchanged,
    Fallback(ProcessingError),
}

impl StageOutcome {
    /// Summary of the outcome without the audio payload.
    pub fn status(&self) -> StageStatus {
        match self {
            StageOutcome::Processed(_) => StageStatus::Processed,
            StageOutcome::Unchanged => StageStatus::Unchanged,
            StageOutcome::Fallback(_) => StageStatus::Fallback,
        }
    }

    /// Resolve the outcome into the buffer the next stage should see.
    pub fn into_output(self, input: &[u8]) -> Vec<u8> {
        match self {
            StageOutcome::Processed(output) => output,
            StageOutcome::Unchanged | StageOutcome::Fallback(_) => input.to_vec(),
        }
    }
}

/// Payload-free form of [`StageOutcome`], used in reports and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Processed,
    Unchanged,
    Fallback,
}

/// Decode little-endian 16-bit PCM bytes into samples.
///
/// ## Errors:
/// Fails with [`ProcessingError::OddByteLength`] when the byte count is odd.
pub fn decode_pcm(data: &[u8]) -> Result<Vec<i16>, ProcessingError> {
    if data.len() % 2 != 0 {
        return Err(ProcessingError::OddByteLength(data.len()));
    }

    let mut samples = vec![0i16; data.len() / 2];
    LittleEndian::read_i16_into(data, &mut samples);
    Ok(samples)
}

/// Encode samples as little-endian 16-bit PCM bytes.
pub fn encode_pcm(samples: &[i16]) -> Vec<u8> {
    let mut bytes = vec![0u8; samples.len() * 2];
    LittleEndian::write_i16_into(samples, &mut bytes);
    bytes
}

/// Number of samples covering `seconds` of audio, truncated toward zero.
pub(crate) fn samples_for(seconds: f64, sample_rate: u32) -> usize {
    (seconds * f64::from(sample_rate)).max(0.0) as usize
}
