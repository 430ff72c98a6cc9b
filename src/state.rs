//! # Application State Management
//!
//! This module manages shared state that needs to be accessed by multiple HTTP request handlers
//! simultaneously.
//!
//! ## Key Rust Concepts:
//!
//! ### Arc (Atomically Reference Counted)
//! - **Purpose**: Allows multiple parts of the program to safely share ownership of data
//! - **Why needed**: Multiple HTTP requests run simultaneously and all need access to the same state
//!
//! ### RwLock (Reader-Writer Lock)
//! - **Purpose**: Allows multiple readers OR one writer at a time (but not both)
//! - **Why needed**: Every synthesis reads the processing config, only `PUT /api/config` writes it
//!
//! ### Arc<dyn Trait>
//! - **Purpose**: The speech provider is chosen at startup (Google, or a test double in tests)
//! - **Why no lock**: Providers are `Send + Sync` and take `&self`, nothing to protect
//!
//! ## Lock poisoning:
//! A panic while a lock is held "poisons" it. The data here (counters and a config
//! snapshot) stays consistent even then, so poisoned locks are simply recovered.

use crate::audio::StageStatus;
use crate::config::AppConfig;
use crate::tts::{PipelineReport, SynthesisProvider, Synthesizer};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// The main application state that's shared across all HTTP request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (processing parameters can be updated at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// Synthesis counters, updated after every synthesis request
    pub metrics: Arc<RwLock<SynthesisMetrics>>,

    /// Speech provider, `None` when no credentials are configured
    pub provider: Option<Arc<dyn SynthesisProvider>>,

    /// When the server started (never changes, so no Arc<RwLock> needed)
    pub start_time: Instant,
}

/// Counters describing what the pipeline has been doing.
///
/// ## Why these metrics matter:
/// Stage fallbacks are swallowed on purpose so audio is always delivered.
/// These counters are where they become visible.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct SynthesisMetrics {
    /// Requests that produced audio
    pub syntheses_completed: u64,

    /// Requests that failed (bad input or provider failure)
    pub synthesis_failures: u64,

    /// Responses in which a repeated utterance was removed
    pub duplicates_removed: u64,

    /// Duplicate detection could not analyze the audio
    pub dedup_fallbacks: u64,

    /// Conditioning could not process the audio
    pub conditioning_fallbacks: u64,

    /// Total seconds of audio delivered
    pub audio_seconds_delivered: f64,
}

impl AppState {
    /// Create a new AppState with the given configuration and provider.
    pub fn new(config: AppConfig, provider: Option<Arc<dyn SynthesisProvider>>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(SynthesisMetrics::default())),
            provider,
            start_time: Instant::now(),
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// ## Why clone:
    /// Cloning releases the lock immediately, so other threads aren't blocked.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the configuration after validating it.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        new_config.validate().map_err(|e| e.to_string())?;
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = new_config;
        Ok(())
    }

    /// A synthesizer using the current processing configuration.
    ///
    /// Returns `None` when the service runs without a speech provider.
    pub fn synthesizer(&self) -> Option<Synthesizer> {
        let provider = self.provider.clone()?;
        Some(Synthesizer::new(provider, self.get_config().processing))
    }

    /// Whether synthesis requests can be served.
    pub fn tts_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Record a completed synthesis and what each stage did.
    pub fn record_synthesis(&self, report: &PipelineReport) {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        metrics.syntheses_completed += 1;
        metrics.audio_seconds_delivered += report.duration_secs;

        match report.dedup {
            StageStatus::Processed => metrics.duplicates_removed += 1,
            StageStatus::Fallback => metrics.dedup_fallbacks += 1,
            StageStatus::Unchanged => {}
        }
        if report.conditioning == StageStatus::Fallback {
            metrics.conditioning_fallbacks += 1;
        }
    }

    /// Record a failed synthesis request.
    pub fn record_failure(&self) {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        metrics.synthesis_failures += 1;
    }

    /// Get a snapshot of current metrics (used for the health endpoint).
    pub fn get_metrics_snapshot(&self) -> SynthesisMetrics {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Get server uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
