use crate::{config::AppConfig, error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

/// Public view of the configuration. Credentials are reported only as present/absent.
fn public_config(config: &AppConfig) -> serde_json::Value {
    json!({
        "server": {
            "host": config.server.host,
            "port": config.server.port
        },
        "tts": {
            "endpoint": config.tts.endpoint,
            "credentials_configured": config.tts.has_credentials(),
            "default_voice": config.tts.default_voice,
            "default_language": config.tts.default_language,
            "request_timeout_secs": config.tts.request_timeout_secs
        },
        "processing": config.processing
    })
}

pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": public_config(&config)
    })))
}

pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, AppError> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let mut current_config = state.get_config();
    current_config
        .update_from_json(&json_str)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    state.update_config(current_config.clone())
        .map_err(AppError::ValidationError)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Configuration updated successfully",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": public_config(&current_config)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    macro_rules! service {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .route("/api/config", web::get().to(get_config))
                    .route("/api/config", web::put().to(update_config)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_get_config_hides_credentials() {
        let mut config = AppConfig::default();
        config.tts.api_key = Some("secret-key".to_string());
        let state = web::Data::new(AppState::new(config, None));
        let app = service!(state);

        let req = test::TestRequest::get().uri("/api/config").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(!text.contains("secret-key"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["config"]["tts"]["credentials_configured"], true);
        assert_eq!(value["config"]["processing"]["dedup"]["correlation_threshold"], 0.95);
    }

    #[actix_web::test]
    async fn test_update_processing_parameters() {
        let state = web::Data::new(AppState::new(AppConfig::default(), None));
        let app = service!(state);

        let req = test::TestRequest::put()
            .uri("/api/config")
            .set_json(json!({ "processing": { "conditioner": { "fade_ms": 25.0 } } }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
        assert_eq!(state.get_config().processing.conditioner.fade_ms, 25.0);
    }

    #[actix_web::test]
    async fn test_invalid_update_is_rejected() {
        let state = web::Data::new(AppState::new(AppConfig::default(), None));
        let app = service!(state);

        let req = test::TestRequest::put()
            .uri("/api/config")
            .set_json(json!({ "processing": { "dedup": { "correlation_threshold": 1.5 } } }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
        assert_eq!(state.get_config().processing.dedup.correlation_threshold, 0.95);
    }
}
