use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;

/// Media type used when a file's type cannot be determined
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Where the bytes of a selected file live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// A file on disk, read lazily when the payload is encoded
    Path(Utf8PathBuf),

    /// Bytes already in memory (pasted or dropped content)
    Memory(Arc<[u8]>),
}

/// A file chosen by the user for one of the upload slots
///
/// Cloning is cheap: paths are copied and in-memory bytes are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    media_type: String,
    source: FileSource,
}

impl SelectedFile {
    /// Select a file on disk; the media type is inferred from the extension
    pub fn from_path(path: impl Into<Utf8PathBuf>) -> Self {
        let path = path.into();
        let name = path.file_name().unwrap_or(path.as_str()).to_string();
        let media_type = media_type_for_path(&path);

        Self {
            name,
            media_type,
            source: FileSource::Path(path),
        }
    }

    /// Select in-memory content with a declared media type
    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            source: FileSource::Memory(bytes.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }
}

/// Infer an image media type from a path's extension
pub fn media_type_for_path(path: &Utf8Path) -> String {
    image::ImageFormat::from_path(path.as_std_path())
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| FALLBACK_MEDIA_TYPE.to_string())
}

/// Base64 image data plus its declared media type, ready for the wire
///
/// `data` never carries a `data:<type>;base64,` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    data: String,
    media_type: String,
}

impl EncodedPayload {
    pub fn new(data: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            media_type: media_type.into(),
        }
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }
}

/// Raw image returned by the generation service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_infers_media_type() {
        let face = SelectedFile::from_path("/photos/face.jpg");
        assert_eq!(face.name(), "face.jpg");
        assert_eq!(face.media_type(), "image/jpeg");

        let overlay = SelectedFile::from_path("/photos/glasses.png");
        assert_eq!(overlay.media_type(), "image/png");
    }

    #[test]
    fn test_from_path_unknown_extension() {
        let file = SelectedFile::from_path("/tmp/notes.xyz");
        assert_eq!(file.media_type(), FALLBACK_MEDIA_TYPE);
    }

    #[test]
    fn test_from_bytes_shares_buffer() {
        let file = SelectedFile::from_bytes("pasted.png", "image/png", vec![1u8, 2, 3]);
        let copy = file.clone();

        match (file.source(), copy.source()) {
            (FileSource::Memory(a), FileSource::Memory(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("expected in-memory sources"),
        }
    }
}
