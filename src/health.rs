use crate::state::{AppState, SynthesisMetrics};
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = state.get_config();
    let uptime_seconds = state.get_uptime_seconds();

    HttpResponse::Ok().json(json!({
        "status": if state.tts_available() { "healthy" } else { "degraded" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "tts": {
            "available": state.tts_available(),
            "provider": state.provider.as_ref().map(|p| p.name().to_string()),
            "default_voice": config.tts.default_voice,
            "sample_rate": config.processing.sample_rate
        },
        "metrics": metrics_summary(&metrics)
    }))
}

fn metrics_summary(metrics: &SynthesisMetrics) -> serde_json::Value {
    let attempts = metrics.syntheses_completed + metrics.synthesis_failures;

    json!({
        "syntheses_completed": metrics.syntheses_completed,
        "synthesis_failures": metrics.synthesis_failures,
        "failure_rate": if attempts > 0 {
            metrics.synthesis_failures as f64 / attempts as f64
        } else {
            0.0
        },
        "duplicates_removed": metrics.duplicates_removed,
        "dedup_fallbacks": metrics.dedup_fallbacks,
        "conditioning_fallbacks": metrics.conditioning_fallbacks,
        "audio_seconds_delivered": metrics.audio_seconds_delivered
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::tts::testing::StubProvider;
    use crate::tts::SynthesisProvider;
    use actix_web::{test, App};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_health_reports_provider() {
        let provider: Arc<dyn SynthesisProvider> = Arc::new(StubProvider::new(Vec::new()));
        let state = web::Data::new(AppState::new(AppConfig::default(), Some(provider)));
        state.record_failure();

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["tts"]["provider"], "stub");
        assert_eq!(body["metrics"]["synthesis_failures"], 1);
        assert_eq!(body["metrics"]["failure_rate"], 1.0);
    }

    #[actix_web::test]
    async fn test_health_without_provider_is_degraded() {
        let state = web::Data::new(AppState::new(AppConfig::default(), None));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "degraded");
        assert_eq!(body["tts"]["available"], false);
        assert!(body["tts"]["provider"].is_null());
    }
}
