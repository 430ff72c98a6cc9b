//! The fixed catalog of Chirp3-HD voices offered by this service.

use crate::tts::SynthesisError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Model family of every catalog voice.
pub const MODEL_TAG: &str = "Chirp3-HD";

/// Language the catalog is advertised for.
pub const DEFAULT_LANGUAGE_CODE: &str = "ja-JP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

/// A voice from the catalog.
///
/// ## Rust Concepts:
/// - **Copy enum**: Voices are plain values, passing one around costs nothing
/// - **const array**: `Voice::ALL` is the whole catalog, fixed at compile time
/// - **FromStr**: `"Kore".parse::<Voice>()` validates a request's voice name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Voice {
    Aoede,
    Puck,
    Charon,
    Kore,
    Fenrir,
    Leda,
    Orus,
    Zephyr,
}

impl Voice {
    pub const ALL: [Voice; 8] = [
        Voice::Aoede,
        Voice::Puck,
        Voice::Charon,
        Voice::Kore,
        Voice::Fenrir,
        Voice::Leda,
        Voice::Orus,
        Voice::Zephyr,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Voice::Aoede => "Aoede",
            Voice::Puck => "Puck",
            Voice::Charon => "Charon",
            Voice::Kore => "Kore",
            Voice::Fenrir => "Fenrir",
            Voice::Leda => "Leda",
            Voice::Orus => "Orus",
            Voice::Zephyr => "Zephyr",
        }
    }

    pub const fn gender(self) -> Gender {
        match self {
            Voice::Aoede | Voice::Kore | Voice::Leda | Voice::Zephyr => Gender::Female,
            Voice::Puck | Voice::Charon | Voice::Fenrir | Voice::Orus => Gender::Male,
        }
    }

    /// The provider's voice name, e.g. `ja-JP-Chirp3-HD-Kore`.
    pub fn selector(self, language_code: &str) -> String {
        format!("{}-{}-{}", language_code, MODEL_TAG, self.name())
    }

    /// Names of every catalog voice, in catalog order.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|v| v.name()).collect()
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Voice {
    type Err = SynthesisError;

    /// Names are matched exactly, as the provider expects them.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.name() == s)
            .ok_or_else(|| SynthesisError::InvalidVoice {
                requested: s.to_string(),
                allowed: Self::names(),
            })
    }
}

/// Catalog entry as returned by the voices endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceInfo {
    pub name: &'static str,
    pub gender: Gender,
    pub language_code: &'static str,
    pub model: &'static str,
}

impl From<Voice> for VoiceInfo {
    fn from(voice: Voice) -> Self {
        Self {
            name: voice.name(),
            gender: voice.gender(),
            language_code: DEFAULT_LANGUAGE_CODE,
            model: MODEL_TAG,
        }
    }
}

/// The full catalog.
pub fn list_voices() -> Vec<VoiceInfo> {
    Voice::ALL.iter().copied().map(VoiceInfo::from).collect()
}
