use crate::models::{EncodedPayload, GeneratedImage};
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by an [`ImageGenerator`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The call could not reach the service
    #[error("Could not reach the image service: {0}")]
    Network(String),

    /// The service answered with an error or without usable image data
    #[error("{0}")]
    Service(String),
}

impl GenerationError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn service(message: impl Into<String>) -> Self {
        Self::Service(message.into())
    }
}

/// Remote service that composites a face and an overlay into one image
///
/// Implementations send both payloads in a single request and never retry.
/// Callers are responsible for keeping at most one call outstanding.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        face: &EncodedPayload,
        overlay: &EncodedPayload,
    ) -> Result<GeneratedImage, GenerationError>;
}
