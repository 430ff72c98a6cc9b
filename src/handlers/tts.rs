use crate::{error::AppError, state::AppState};
use crate::tts::voices::list_voices;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

/// Body of `POST /api/tts/synthesize`.
///
/// `voiceName` and `languageCode` fall back to the configured defaults.
/// A missing `text` is treated like an empty one so the client gets the
/// same "Text is required" error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeBody {
    #[serde(default)]
    pub text: String,
    pub voice_name: Option<String>,
    pub language_code: Option<String>,
}

pub async fn synthesize(
    state: web::Data<AppState>,
    body: web::Json<SynthesizeBody>,
) -> Result<HttpResponse, AppError> {
    let synthesizer = state.synthesizer().ok_or_else(|| {
        warn!("Synthesis requested but no speech provider is configured");
        AppError::ServiceUnavailable("TTS service is not available".to_string())
    })?;

    let defaults = state.get_config().tts;
    let body = body.into_inner();
    let voice_name = body.voice_name.unwrap_or(defaults.default_voice);
    let language_code = body.language_code.unwrap_or(defaults.default_language);

    let audio = match synthesizer.synthesize(&body.text, &voice_name, &language_code).await {
        Ok(audio) => audio,
        Err(e) => {
            state.record_failure();
            return Err(e.into());
        }
    };

    state.record_synthesis(&audio.report);
    let wav = audio.into_bytes();

    // Sized body, actix writes Content-Length
    Ok(HttpResponse::Ok().content_type("audio/wav").body(wav))
}

pub async fn voices() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "voices": list_voices() }))
}
