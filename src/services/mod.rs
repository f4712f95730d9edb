//! Services module - encoding and remote generation.
//!
//! These services have no dependency on the UI layer or on session state; the
//! [`SessionController`](crate::session::SessionController) composes them.
//!
//! # Components
//!
//! - [`encoder`]: Reads a [`SelectedFile`](crate::models::SelectedFile) fully and produces an
//!   [`EncodedPayload`](crate::models::EncodedPayload) (base64 data + media type, no
//!   `data:` prefix). Fails with [`ReadError`] on unreadable or empty files.
//!
//! - [`ImageGenerator`]: The single asynchronous boundary. Takes the face and overlay
//!   payloads and returns a [`GeneratedImage`](crate::models::GeneratedImage) or a
//!   [`GenerationError`] (`Network` or `Service`). No retries.
//!
//! - [`GeminiClient`]: The shipped [`ImageGenerator`], talking to the Gemini
//!   `generateContent` endpoint with `reqwest`.
//!
//! # Usage Example
//!
//! ```ignore
//! use pfpgen::services::{encoder, GeminiClient, ImageGenerator};
//!
//! let client = GeminiClient::new(&config.service)?;
//! let face = encoder::encode_file(&face_file).await?;
//! let overlay = encoder::encode_file(&overlay_file).await?;
//! let image = client.generate(&face, &overlay).await?;
//! ```

pub mod encoder;
pub mod gemini;
pub mod generation;

pub use encoder::{DecodeError, ReadError};
pub use gemini::GeminiClient;
pub use generation::{GenerationError, ImageGenerator};

#[cfg(test)]
pub use generation::MockImageGenerator;
