//! Test doubles and signal fixtures shared by the unit tests.

use crate::tts::{ProviderError, SynthesisProvider, SynthesisRequest};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::sync::Mutex;

/// `len` samples of a sine at `frequency` Hz, sampled at 24 kHz.
pub fn tone(frequency: f64, amplitude: f64, len: usize) -> Vec<i16> {
    (0..len)
        .map(|i| (amplitude * (2.0 * PI * frequency * i as f64 / 24_000.0).sin()) as i16)
        .collect()
}

/// `len` samples of uniform noise, reproducible from `seed`.
pub fn noise(len: usize, seed: u64) -> Vec<i16> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-8_000i16..8_000)).collect()
}

/// Provider that returns fixed PCM and records every request.
pub struct StubProvider {
    pcm: Vec<u8>,
    requests: Mutex<Vec<SynthesisRequest>>,
}

impl StubProvider {
    pub fn new(pcm: Vec<u8>) -> Self {
        Self { pcm, requests: Mutex::new(Vec::new()) }
    }

    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl SynthesisProvider for StubProvider {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.pcm.clone())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Provider that always fails with the given error.
pub struct FailingProvider {
    error: ProviderError,
    calls: Mutex<usize>,
}

impl FailingProvider {
    pub fn new(error: ProviderError) -> Self {
        Self { error, calls: Mutex::new(0) }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl SynthesisProvider for FailingProvider {
    async fn synthesize(&self, _request: &SynthesisRequest) -> Result<Vec<u8>, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        Err(self.error.clone())
    }

    fn name(&self) -> &str {
        "failing"
    }
}
