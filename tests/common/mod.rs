//! Shared fakes for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use pfpgen::models::{EncodedPayload, GeneratedImage};
use pfpgen::{GenerationError, ImageGenerator};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::{Notify, Semaphore};

/// One call seen by a fake generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub face: EncodedPayload,
    pub overlay: EncodedPayload,
}

/// Returns scripted responses in order and records every call
///
/// Once the script runs out, every further call succeeds with a tiny PNG.
#[derive(Debug, Default)]
pub struct RecordingGenerator {
    script: Mutex<VecDeque<Result<GeneratedImage, GenerationError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(
        responses: impl IntoIterator<Item = Result<GeneratedImage, GenerationError>>,
    ) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageGenerator for RecordingGenerator {
    async fn generate(
        &self,
        face: &EncodedPayload,
        overlay: &EncodedPayload,
    ) -> Result<GeneratedImage, GenerationError> {
        self.calls.lock().unwrap().push(RecordedCall {
            face: face.clone(),
            overlay: overlay.clone(),
        });

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(png_image(b"generated")))
    }
}

/// Holds every call until the test releases it
///
/// `entered` is notified as soon as a call starts, so a test can act while
/// the session is in flight.
#[derive(Debug)]
pub struct GatedGenerator {
    pub entered: Notify,
    gate: Semaphore,
    calls: Mutex<usize>,
    response: Result<GeneratedImage, GenerationError>,
}

impl GatedGenerator {
    pub fn new(response: Result<GeneratedImage, GenerationError>) -> Self {
        Self {
            entered: Notify::new(),
            gate: Semaphore::new(0),
            calls: Mutex::new(0),
            response,
        }
    }

    /// Let one held call finish
    pub fn release_one(&self) {
        self.gate.add_permits(1);
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ImageGenerator for GatedGenerator {
    async fn generate(
        &self,
        _face: &EncodedPayload,
        _overlay: &EncodedPayload,
    ) -> Result<GeneratedImage, GenerationError> {
        *self.calls.lock().unwrap() += 1;
        self.entered.notify_one();

        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();

        self.response.clone()
    }
}

pub fn png_image(bytes: &[u8]) -> GeneratedImage {
    GeneratedImage {
        bytes: bytes.to_vec(),
        media_type: "image/png".to_string(),
    }
}
