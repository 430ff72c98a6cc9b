//! # Synthesis Pipeline
//!
//! Orchestrates one synthesis request from text to a playable WAV file.
//!
//! ## Order of Operations:
//! 1. **Validate**: Empty text and unknown voices are rejected before the provider is called
//! 2. **Synthesize**: One provider call, no retries
//! 3. **Dedup**: Strip repeated utterances
//! 4. **Condition**: Fades, high-pass and peak normalization
//! 5. **Encode**: Prepend the WAV header
//!
//! Dedup must run before conditioning: the silence padding added by the
//! conditioner would shift the equal-length split that duplicate detection
//! relies on.

use crate::audio::{conditioner, dedup, wav, ProcessingConfig, StageStatus};
use crate::tts::{SynthesisError, SynthesisProvider, SynthesisRequest, Voice};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// What the pipeline did to one request's audio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    /// Samples returned by the provider
    pub raw_samples: usize,

    /// Samples in the final WAV payload
    pub output_samples: usize,

    /// Outcome of duplicate detection
    pub dedup: StageStatus,

    /// Outcome of fading, filtering and normalization
    pub conditioning: StageStatus,

    /// Length of the final audio in seconds
    pub duration_secs: f64,
}

/// A finished synthesis: the WAV file plus the processing report.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub wav: Vec<u8>,
    pub report: PipelineReport,
}

impl SynthesizedAudio {
    pub fn into_bytes(self) -> Vec<u8> {
        self.wav
    }
}

/// Turns text into finished WAV audio using an injected provider.
///
/// ## Rust Concepts:
/// - **Arc<dyn SynthesisProvider>**: Any provider (Google, a test double, ...) can be plugged in
/// - **&self**: Requests share no mutable state, so one synthesizer serves many requests at once
pub struct Synthesizer {
    provider: Arc<dyn SynthesisProvider>,
    processing: ProcessingConfig,
}

impl Synthesizer {
    pub fn new(provider: Arc<dyn SynthesisProvider>, processing: ProcessingConfig) -> Self {
        Self { provider, processing }
    }

    /// Synthesize `text` with a catalog voice and return the WAV file.
    ///
    /// ## Errors:
    /// - **EmptyInput**: `text` is empty or whitespace
    /// - **InvalidVoice**: `voice_name` is not in the catalog
    /// - **ProviderFailure**: The provider call failed
    ///
    /// Post-processing never fails; see [`postprocess`].
    pub async fn synthesize(
        &self,
        text: &str,
        voice_name: &str,
        language_code: &str,
    ) -> Result<SynthesizedAudio, SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyInput);
        }
        let voice: Voice = voice_name.parse()?;

        let request = SynthesisRequest::new(text, voice, language_code, self.processing.sample_rate);
        debug!(
            provider = self.provider.name(),
            voice = %request.voice_selector,
            chars = text.chars().count(),
            "Requesting speech synthesis"
        );

        let started = Instant::now();
        let raw = self.provider.synthesize(&request).await.map_err(|e| {
            error!(provider = self.provider.name(), error = %e, "Speech synthesis failed");
            SynthesisError::ProviderFailure(e)
        })?;
        let provider_ms = started.elapsed().as_millis();

        let audio = postprocess(&raw, &self.processing);
        info!(
            voice = %voice,
            provider_ms = %provider_ms,
            raw_samples = audio.report.raw_samples,
            output_samples = audio.report.output_samples,
            dedup = ?audio.report.dedup,
            conditioning = ?audio.report.conditioning,
            "Speech synthesized"
        );

        Ok(audio)
    }
}

/// Run dedup, conditioning and WAV encoding over raw provider PCM.
///
/// This is a pure, synchronous function. Stage failures are absorbed: the
/// stage's input is passed on and the failure is recorded in the report.
pub fn postprocess(raw: &[u8], config: &ProcessingConfig) -> SynthesizedAudio {
    let sample_rate = config.sample_rate;

    let dedup_outcome = dedup::remove_duplicates(raw, sample_rate, &config.dedup);
    let dedup_status = dedup_outcome.status();
    let deduplicated = dedup_outcome.into_output(raw);

    let conditioning_outcome = conditioner::condition(&deduplicated, sample_rate, &config.conditioner);
    let conditioning_status = conditioning_outcome.status();
    let conditioned = conditioning_outcome.into_output(&deduplicated);

    let wav = wav::encode(&conditioned, &wav::WavSpec::mono16(sample_rate));
    let output_samples = conditioned.len() / 2;

    SynthesizedAudio {
        wav,
        report: PipelineReport {
            raw_samples: raw.len() / 2,
            output_samples,
            dedup: dedup_status,
            conditioning: conditioning_status,
            duration_secs: output_samples as f64 / f64::from(sample_rate),
        },
    }
}
