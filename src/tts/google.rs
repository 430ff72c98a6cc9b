//! Google Cloud Text-to-Speech provider (REST `v1/text:synthesize`).

use crate::audio::wav;
use crate::config::TtsConfig;
use crate::tts::{ProviderError, SynthesisProvider, SynthesisRequest};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// How requests are authenticated.
#[derive(Debug, Clone, PartialEq)]
pub enum Credentials {
    /// API key sent as the `key` query parameter
    ApiKey(String),
    /// OAuth access token sent as a bearer token
    AccessToken(String),
}

pub struct GoogleCloudTts {
    client: Client,
    endpoint: String,
    credentials: Credentials,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeBody<'a> {
    input: TextInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    sample_rate_hertz: u32,
    speaking_rate: f64,
    pitch: f64,
    volume_gain_db: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

impl GoogleCloudTts {
    pub fn new(endpoint: &str, credentials: Credentials, timeout: Duration) -> Result<Self, ProviderError> {
        let endpoint = endpoint.trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(ProviderError::Configuration("endpoint is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            credentials,
        })
    }

    /// Build the provider from configuration.
    ///
    /// Returns `Ok(None)` when no credentials are configured; the service then
    /// runs without speech synthesis. An API key wins over an access token.
    pub fn from_config(config: &TtsConfig) -> Result<Option<Self>, ProviderError> {
        let credentials = match (non_empty(&config.api_key), non_empty(&config.access_token)) {
            (Some(key), _) => Credentials::ApiKey(key.to_string()),
            (None, Some(token)) => Credentials::AccessToken(token.to_string()),
            (None, None) => return Ok(None),
        };

        Self::new(
            &config.endpoint,
            credentials,
            Duration::from_secs(config.request_timeout_secs),
        )
        .map(Some)
    }

    fn synthesize_url(&self) -> String {
        format!("{}/v1/text:synthesize", self.endpoint)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[async_trait]
impl SynthesisProvider for GoogleCloudTts {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, ProviderError> {
        let body = SynthesizeBody {
            input: TextInput { text: &request.text },
            voice: VoiceSelection {
                language_code: &request.language_code,
                name: &request.voice_selector,
            },
            audio_config: AudioConfig {
                audio_encoding: request.encoding.as_str(),
                sample_rate_hertz: request.sample_rate,
                speaking_rate: 1.0,
                pitch: 0.0,
                volume_gain_db: 0.0,
            },
        };

        let builder = self.client.post(self.synthesize_url()).json(&body);
        let builder = match &self.credentials {
            Credentials::ApiKey(key) => builder.query(&[("key", key)]),
            Credentials::AccessToken(token) => builder.bearer_auth(token),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&error_body)
                .map(|body| body.error.message)
                .unwrap_or(error_body);

            return Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let payload: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let audio = STANDARD
            .decode(payload.audio_content.as_bytes())
            .map_err(|e| ProviderError::InvalidResponse(format!("audioContent is not base64: {}", e)))?;

        // LINEAR16 responses may carry their own WAV header
        let pcm = wav::pcm_payload(&audio).to_vec();
        debug!(
            response_bytes = audio.len(),
            pcm_bytes = pcm.len(),
            "Received synthesized audio"
        );

        Ok(pcm)
    }

    fn name(&self) -> &str {
        "google-cloud-tts"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encode_pcm;
    use crate::tts::Voice;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, credentials: Credentials) -> GoogleCloudTts {
        GoogleCloudTts::new(&server.uri(), credentials, Duration::from_secs(5)).unwrap()
    }

    fn request() -> SynthesisRequest {
        SynthesisRequest::new("こんにちは", Voice::Kore, "ja-JP", 24_000)
    }

    #[tokio::test]
    async fn test_synthesize_with_api_key() {
        let server = MockServer::start().await;
        let pcm = encode_pcm(&[1, -1, 2, -2]);

        Mock::given(method("POST"))
            .and(path("/v1/text:synthesize"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "input": { "text": "こんにちは" },
                "voice": { "languageCode": "ja-JP", "name": "ja-JP-Chirp3-HD-Kore" },
                "audioConfig": { "audioEncoding": "LINEAR16", "sampleRateHertz": 24000 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "audioContent": STANDARD.encode(&pcm)
            })))
            .expect(1)
            .mount(&server)
            .await;

        let audio = provider(&server, Credentials::ApiKey("test-key".into()))
            .synthesize(&request())
            .await
            .unwrap();

        assert_eq!(audio, pcm);
    }

    #[tokio::test]
    async fn test_embedded_wav_header_is_stripped() {
        let server = MockServer::start().await;
        let pcm = encode_pcm(&[100, 200, 300]);
        let with_header = wav::encode(&pcm, &wav::WavSpec::default());

        Mock::given(method("POST"))
            .and(path("/v1/text:synthesize"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "audioContent": STANDARD.encode(&with_header)
            })))
            .mount(&server)
            .await;

        let audio = provider(&server, Credentials::AccessToken("test-token".into()))
            .synthesize(&request())
            .await
            .unwrap();

        assert_eq!(audio, pcm);
    }

    #[tokio::test]
    async fn test_api_error_message_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/text:synthesize"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": { "code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED" }
            })))
            .mount(&server)
            .await;

        let result = provider(&server, Credentials::ApiKey("bad".into()))
            .synthesize(&request())
            .await;

        assert_eq!(
            result,
            Err(ProviderError::Status {
                status: 403,
                message: "API key not valid".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_invalid_base64_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/text:synthesize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "audioContent": "not base64!!"
            })))
            .mount(&server)
            .await;

        let result = provider(&server, Credentials::ApiKey("k".into()))
            .synthesize(&request())
            .await;

        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn test_from_config_without_credentials() {
        let config = TtsConfig::default();
        assert!(GoogleCloudTts::from_config(&config).unwrap().is_none());

        let config = TtsConfig { api_key: Some("  ".to_string()), ..TtsConfig::default() };
        assert!(GoogleCloudTts::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_from_config_prefers_api_key() {
        let config = TtsConfig {
            api_key: Some("key".to_string()),
            access_token: Some("token".to_string()),
            ..TtsConfig::default()
        };

        let provider = GoogleCloudTts::from_config(&config).unwrap().unwrap();
        assert_eq!(provider.credentials, Credentials::ApiKey("key".to_string()));
        assert_eq!(
            provider.synthesize_url(),
            "https://texttospeech.googleapis.com/v1/text:synthesize"
        );
    }
}
