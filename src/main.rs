//! # TTS Post-Processing Backend
//!
//! HTTP front for Google Cloud Text-to-Speech (Chirp3-HD voices). Each request
//! is synthesized once, then cleaned up before the WAV file is returned:
//! accidental whole-utterance repeats are cut, the edges are faded, low-frequency
//! rumble is filtered out and the level is normalized.
//!
//! ## Application Architecture:
//! - **audio**: Post-processing stages (dedup, conditioner, WAV encoding)
//! - **tts**: Voice catalog, provider abstraction and the synthesis pipeline
//! - **config**: Layered configuration (defaults, config.toml, environment)
//! - **state**: Shared configuration, provider and synthesis metrics
//! - **health**: Health endpoint
//! - **middleware**: Request logging
//! - **handlers**: Synthesis, voice catalog and configuration endpoints
//! - **error**: HTTP error responses

mod audio;
mod config;
mod error;
mod handlers;
mod health;
mod middleware;
mod state;
mod tts;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Result;
use crate::config::AppConfig;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tts::google::GoogleCloudTts;
use tts::SynthesisProvider;

/// Set by the signal handler task, polled by [`wait_for_shutdown`].
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// Start the server and run until SIGINT/SIGTERM.
///
/// Missing provider credentials are not fatal: the server starts, health
/// reports `degraded` and the synthesis endpoint answers 503.
#[actix_web::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();
    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting tts-postprocess-backend v{}", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.server.host,
        port = config.server.port,
        sample_rate = config.processing.sample_rate,
        "Configuration loaded"
    );

    let provider = build_provider(&config)?;
    let app_state = AppState::new(config.clone(), provider);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();
    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .expose_headers(["x-request-id"])
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            // Middleware runs in reverse order on the way out
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::RequestLogging)
            .configure(configure_routes)
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, draining in-flight requests...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Routes under `/api`, plus `/health` at the root for load balancers.
fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .route("/config", web::get().to(handlers::get_config))
            .route("/config", web::put().to(handlers::update_config))
            .service(
                web::scope("/tts")
                    .route("/synthesize", web::post().to(handlers::synthesize))
                    .route("/voices", web::get().to(handlers::voices)),
            ),
    )
    .route("/health", web::get().to(health::health_check));
}

/// Build the Google provider, or `None` (with a warning) without credentials.
fn build_provider(config: &AppConfig) -> Result<Option<Arc<dyn SynthesisProvider>>> {
    match GoogleCloudTts::from_config(&config.tts)? {
        Some(provider) => {
            info!(
                endpoint = %config.tts.endpoint,
                default_voice = %config.tts.default_voice,
                "Google Cloud TTS provider configured"
            );
            Ok(Some(Arc::new(provider)))
        }
        None => {
            warn!("No TTS credentials configured (set GOOGLE_TTS_API_KEY); synthesis is disabled");
            Ok(None)
        }
    }
}

/// Console logging filtered by `RUST_LOG`
/// (default `tts_postprocess_backend=debug,actix_web=info`).
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tts_postprocess_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Flip [`SHUTDOWN_SIGNAL`] on the first SIGTERM or SIGINT.
///
/// If the handlers can't be installed the server keeps running and only
/// stops when the process is killed.
fn setup_signal_handlers() {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async {
        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            (Err(e), _) | (_, Err(e)) => {
                error!("Failed to install signal handlers: {}", e);
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;

    #[actix_web::test]
    async fn test_routes_are_mounted() {
        let state = web::Data::new(AppState::new(AppConfig::default(), None));
        let app = test::init_service(
            App::new()
                .app_data(state)
                .wrap(middleware::RequestLogging)
                .configure(configure_routes),
        )
        .await;

        for uri in ["/health", "/api/health", "/api/config", "/api/tts/voices"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success(), "{} returned {}", uri, resp.status());
        }

        let req = test::TestRequest::post()
            .uri("/api/tts/synthesize")
            .set_json(serde_json::json!({ "text": "hello" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 503);
    }
}
