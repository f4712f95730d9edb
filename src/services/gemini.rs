// Gemini generation client
//
// Sends the face and overlay payloads plus the compositing prompt to the
// Gemini `generateContent` endpoint and extracts the first inline image from
// the response. Transport failures map to GenerationError::Network; anything
// the service says (HTTP errors, blocked prompts, missing images) maps to
// GenerationError::Service.

use crate::models::{EncodedPayload, GeneratedImage, ServiceSettings};
use crate::services::encoder::{decode_payload, parse_data_url};
use crate::services::generation::{GenerationError, ImageGenerator};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Media type assumed when the service omits one
const DEFAULT_RESULT_MEDIA_TYPE: &str = "image/png";

/// [`ImageGenerator`] backed by the Gemini REST API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    api_key: String,
    prompt: String,
}

impl GeminiClient {
    /// Build a client from service settings
    ///
    /// # Errors
    /// Fails only if the HTTP client cannot be constructed.
    pub fn new(settings: &ServiceSettings) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));

        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let http = builder.build().context("Failed to create HTTP client")?;

        let endpoint = Self::endpoint_for_model(&settings.api_base, &settings.model);
        tracing::info!("Gemini client targeting {}", endpoint);

        Ok(Self {
            http,
            endpoint,
            api_key: settings.api_key.trim().to_string(),
            prompt: settings.prompt.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `{base}/models/{model}:generateContent`, accepting models with or without the `models/` prefix
    pub fn endpoint_for_model(api_base: &str, model: &str) -> String {
        let base = api_base.trim().trim_end_matches('/');
        let model = model.trim();
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };
        format!("{base}/{model_path}:generateContent")
    }

    fn build_request<'a>(
        &'a self,
        face: &'a EncodedPayload,
        overlay: &'a EncodedPayload,
    ) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    RequestPart::inline(face),
                    RequestPart::inline(overlay),
                    RequestPart::Text {
                        text: &self.prompt,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE", "TEXT"],
            },
        }
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate(
        &self,
        face: &EncodedPayload,
        overlay: &EncodedPayload,
    ) -> Result<GeneratedImage, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::service(
                "No API key is configured for the image service. Set service.api_key in \
                 pfpgen.yaml or the GEMINI_API_KEY environment variable.",
            ));
        }

        let body = self.build_request(face, overlay);

        tracing::info!(
            "Sending generation request (face: {}, overlay: {})",
            face.media_type(),
            overlay.media_type()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Generation request failed to send: {}", e);
                GenerationError::network(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            tracing::warn!("Image service answered HTTP {}", status.as_u16());
            return Err(error_from_status(status.as_u16(), &text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            GenerationError::service(format!(
                "The image service returned an unreadable response: {e}"
            ))
        })?;

        let image = extract_image(parsed)?;
        tracing::info!(
            "Received generated image ({} bytes, {})",
            image.bytes.len(),
            image.media_type
        );
        Ok(image)
    }
}

/// Map a non-2xx answer to a service error, preferring the API's own message
fn error_from_status(status: u16, body: &str) -> GenerationError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty());

    match detail {
        Some(message) => GenerationError::service(format!(
            "The image service rejected the request (HTTP {status}): {message}"
        )),
        None => GenerationError::service(format!("The image service returned HTTP {status}")),
    }
}

/// Pull the first image out of a successful response
fn extract_image(response: GenerateContentResponse) -> Result<GeneratedImage, GenerationError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GenerationError::service(format!(
            "The image service blocked the request ({reason}). Try different photos."
        )));
    }

    let mut finish_reason = None;

    for candidate in response.candidates {
        if finish_reason.is_none() {
            finish_reason = candidate.finish_reason;
        }

        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        for part in parts {
            let payload = match (part.inline_data, part.text) {
                (Some(inline), _) if !inline.data.is_empty() => EncodedPayload::new(
                    inline.data,
                    inline
                        .mime_type
                        .unwrap_or_else(|| DEFAULT_RESULT_MEDIA_TYPE.to_string()),
                ),
                // Some gateways inline the image as a data URL text part
                (_, Some(text)) if text.trim_start().starts_with("data:image/") => {
                    parse_data_url(&text).map_err(|e| {
                        GenerationError::service(format!("The returned image is invalid: {e}"))
                    })?
                }
                _ => continue,
            };

            let bytes = decode_payload(&payload).map_err(|e| {
                GenerationError::service(format!("The returned image is invalid: {e}"))
            })?;

            return Ok(GeneratedImage {
                bytes,
                media_type: payload.media_type().to_string(),
            });
        }
    }

    let message = match finish_reason {
        Some(reason) => format!("The model did not return an image (finish reason: {reason})."),
        None => "The model did not return an image. Try different photos.".to_string(),
    };
    Err(GenerationError::service(message))
}

// ===== Wire format =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    Text {
        text: &'a str,
    },
}

impl<'a> RequestPart<'a> {
    fn inline(payload: &'a EncodedPayload) -> Self {
        RequestPart::Inline {
            inline_data: InlineData {
                mime_type: payload.media_type(),
                data: payload.data(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(alias = "prompt_feedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(alias = "finish_reason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(alias = "inline_data")]
    inline_data: Option<ResponseInlineData>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseInlineData {
    #[serde(alias = "mime_type")]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(alias = "block_reason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}
