//! Payload encoder - turns a selected file into base64 transport data.
//!
//! The file is read completely before a payload is produced. Payload data is
//! plain base64 with no `data:<type>;base64,` prefix; the media type travels
//! separately. [`to_data_url`] and [`parse_data_url`] convert between the two
//! forms for callers that hold data URLs.

use crate::models::payload::FALLBACK_MEDIA_TYPE;
use crate::models::{EncodedPayload, FileSource, SelectedFile};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use thiserror::Error;

/// Errors raised while reading a selected file
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Failed to read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {name}: the file contains no data")]
    Empty { name: String },
}

/// Errors raised when turning encoded data back into bytes
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Not a base64 data URL")]
    NotDataUrl,

    #[error("Invalid base64 data: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Read a selected file fully and encode it
///
/// # Errors
/// [`ReadError::Io`] if the file cannot be read, [`ReadError::Empty`] if it has no bytes.
pub async fn encode_file(file: &SelectedFile) -> Result<EncodedPayload, ReadError> {
    match file.source() {
        FileSource::Path(path) => {
            let bytes = tokio::fs::read(path).await.map_err(|source| ReadError::Io {
                name: file.name().to_string(),
                source,
            })?;
            encode_checked(file, &bytes)
        }
        FileSource::Memory(bytes) => encode_checked(file, bytes),
    }
}

fn encode_checked(file: &SelectedFile, bytes: &[u8]) -> Result<EncodedPayload, ReadError> {
    if bytes.is_empty() {
        return Err(ReadError::Empty {
            name: file.name().to_string(),
        });
    }

    tracing::debug!(
        "Encoded {} ({} bytes, {})",
        file.name(),
        bytes.len(),
        file.media_type()
    );

    Ok(encode_bytes(bytes, file.media_type()))
}

/// Encode raw bytes with the given media type
pub fn encode_bytes(bytes: &[u8], media_type: &str) -> EncodedPayload {
    EncodedPayload::new(BASE64.encode(bytes), media_type)
}

/// Decode a payload's data back into the original bytes
pub fn decode_payload(payload: &EncodedPayload) -> Result<Vec<u8>, DecodeError> {
    Ok(BASE64.decode(payload.data().as_bytes())?)
}

/// Render a payload as a `data:` URL
pub fn to_data_url(payload: &EncodedPayload) -> String {
    format!("data:{};base64,{}", payload.media_type(), payload.data())
}

/// Parse a base64 `data:` URL, stripping the prefix metadata
///
/// Only the media type survives from the header; parameters such as
/// `charset` are dropped.
pub fn parse_data_url(url: &str) -> Result<EncodedPayload, DecodeError> {
    let rest = url.trim().strip_prefix("data:").ok_or(DecodeError::NotDataUrl)?;
    let (header, data) = rest.split_once(',').ok_or(DecodeError::NotDataUrl)?;
    let header = header.strip_suffix(";base64").ok_or(DecodeError::NotDataUrl)?;

    let media_type = header.split(';').next().unwrap_or_default().trim();
    let media_type = if media_type.is_empty() {
        FALLBACK_MEDIA_TYPE
    } else {
        media_type
    };

    // Validate before handing the data on
    BASE64.decode(data.as_bytes())?;

    Ok(EncodedPayload::new(data, media_type))
}
