//! # Text-to-Speech Brokering
//!
//! Validates synthesis requests, calls the speech provider and runs the raw
//! audio through the post-processing pipeline.
//!
//! ## Key Components:
//! - **SynthesisProvider**: The provider capability, injected into the pipeline
//! - **voices**: The fixed Chirp3-HD voice catalog
//! - **pipeline**: The orchestrator (validate → synthesize → dedup → condition → encode)
//! - **google**: Google Cloud Text-to-Speech REST implementation of the provider

pub mod error;
pub mod google;
pub mod pipeline;
pub mod voices;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::Serialize;

pub use error::{ProviderError, SynthesisError};
pub use pipeline::{PipelineReport, Synthesizer};
pub use voices::Voice;

/// Output encodings the pipeline can post-process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AudioEncoding {
    /// Uncompressed 16-bit signed little-endian PCM
    #[serde(rename = "LINEAR16")]
    Linear16,
}

impl AudioEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEncoding::Linear16 => "LINEAR16",
        }
    }
}

/// Everything the provider needs for one synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    /// Provider voice name, e.g. `ja-JP-Chirp3-HD-Kore`
    pub voice_selector: String,
    pub language_code: String,
    pub encoding: AudioEncoding,
    pub sample_rate: u32,
}

impl SynthesisRequest {
    /// Build a LINEAR16 request for a catalog voice.
    pub fn new(text: &str, voice: Voice, language_code: &str, sample_rate: u32) -> Self {
        Self {
            text: text.to_string(),
            voice_selector: voice.selector(language_code),
            language_code: language_code.to_string(),
            encoding: AudioEncoding::Linear16,
            sample_rate,
        }
    }
}

/// A speech synthesis backend.
///
/// Implementations return raw PCM samples matching the request's encoding and
/// sample rate, without any container header. Calls are not retried by the
/// pipeline.
#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    /// Synthesize `request.text` and return the raw PCM bytes.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, ProviderError>;

    /// Short provider name used in logs and the health endpoint.
    fn name(&self) -> &str;
}
