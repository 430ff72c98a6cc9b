//! Errors that cross the synthesis boundary.
//!
//! Only three things can go wrong from a caller's point of view: the text is
//! empty, the voice is unknown, or the provider call failed. Post-processing
//! problems are absorbed by the pipeline and never show up here.

use std::fmt;

/// Failure of a synthesis request.
#[derive(Debug)]
pub enum SynthesisError {
    /// The requested voice is not in the catalog
    InvalidVoice {
        requested: String,
        allowed: Vec<&'static str>,
    },

    /// The text to synthesize is empty
    EmptyInput,

    /// The provider call failed (network, quota, credentials, ...)
    ProviderFailure(ProviderError),
}

impl fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesisError::InvalidVoice { requested, allowed } => write!(
                f,
                "Invalid voice name '{}'. Available: {}",
                requested,
                allowed.join(", ")
            ),
            SynthesisError::EmptyInput => write!(f, "Text is required"),
            SynthesisError::ProviderFailure(e) => write!(f, "Speech synthesis failed: {}", e),
        }
    }
}

impl std::error::Error for SynthesisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SynthesisError::ProviderFailure(e) => Some(e),
            _ => None,
        }
    }
}

impl SynthesisError {
    /// Whether the caller sent something invalid (as opposed to a server-side failure).
    pub fn is_client_error(&self) -> bool {
        matches!(self, SynthesisError::InvalidVoice { .. } | SynthesisError::EmptyInput)
    }
}

/// Failure reported by a [`SynthesisProvider`](super::SynthesisProvider).
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider could not be set up (bad endpoint, missing credentials)
    Configuration(String),

    /// The request never got a response (connect error, timeout)
    Transport(String),

    /// The provider answered with a non-success HTTP status
    Status { status: u16, message: String },

    /// The response could not be understood
    InvalidResponse(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Configuration(msg) => write!(f, "provider configuration error: {}", msg),
            ProviderError::Transport(msg) => write!(f, "provider request failed: {}", msg),
            ProviderError::Status { status, message } => {
                write!(f, "provider returned HTTP {}: {}", status, message)
            }
            ProviderError::InvalidResponse(msg) => write!(f, "invalid provider response: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_voice_lists_allowed_names() {
        let err = SynthesisError::InvalidVoice {
            requested: "Alloy".to_string(),
            allowed: vec!["Aoede", "Kore"],
        };

        assert_eq!(err.to_string(), "Invalid voice name 'Alloy'. Available: Aoede, Kore");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_provider_failure_is_server_side() {
        let err = SynthesisError::ProviderFailure(ProviderError::Status {
            status: 429,
            message: "quota exceeded".to_string(),
        });

        assert!(!err.is_client_error());
        assert!(err.to_string().contains("HTTP 429"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
